//! Streaming music playback on top of rodio
//!
//! Music is decoded from disk on demand. `update` keeps a small queue of
//! decoded copies in the sink, so a track loops for as long as it is updated.
//! Without an output device the system still validates and tracks streams but
//! plays nothing.

use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::error::{Result, SolarisError};

/// Decoded copies kept queued ahead of the playhead
const QUEUED_COPIES: usize = 2;

struct MusicStream {
    path: PathBuf,
    volume: f32,
    sink: Option<Sink>,
}

impl MusicStream {
    /// Queues decoded copies up to `QUEUED_COPIES`. A decode failure stops
    /// the stream until the next `play`.
    fn refill(&mut self, id: u32) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };

        while sink.len() < QUEUED_COPIES {
            match AudioSystem::decode(&self.path) {
                Ok(source) => sink.append(source),
                Err(err) => {
                    log::warn!("music {} stopped: {}", id, err);
                    if let Some(sink) = self.sink.take() {
                        sink.stop();
                    }
                    return;
                }
            }
        }
    }
}

pub struct AudioSystem {
    // the stream must outlive every sink created from its handle
    output: Option<(OutputStream, OutputStreamHandle)>,
    streams: HashMap<u32, MusicStream>,
}

impl AudioSystem {
    /// Opens the default output device, falling back to silent operation
    pub fn new() -> Self {
        match OutputStream::try_default() {
            Ok(output) => Self {
                output: Some(output),
                streams: HashMap::new(),
            },
            Err(err) => {
                log::warn!("no audio output device, music disabled: {}", err);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            output: None,
            streams: HashMap::new(),
        }
    }

    fn decode(path: &Path) -> Result<Decoder<BufReader<File>>> {
        let file = File::open(path).map_err(|e| SolarisError::io(path, e))?;
        Decoder::new(BufReader::new(file))
            .map_err(|e| SolarisError::Audio(format!("{}: {}", path.display(), e)))
    }

    /// Registers the stream `id` after checking that `path` decodes
    pub fn load(&mut self, id: u32, path: &Path) -> Result<()> {
        Self::decode(path)?;
        self.streams.insert(
            id,
            MusicStream {
                path: path.to_path_buf(),
                volume: 1.0,
                sink: None,
            },
        );
        log::debug!("music {} loaded from {}", id, path.display());
        Ok(())
    }

    pub fn unload(&mut self, id: u32) {
        if let Some(stream) = self.streams.remove(&id) {
            if let Some(sink) = stream.sink {
                sink.stop();
            }
        }
    }

    pub fn is_loaded(&self, id: u32) -> bool {
        self.streams.contains_key(&id)
    }

    /// Starts playback from the beginning
    pub fn play(&mut self, id: u32) {
        let Some((_, handle)) = self.output.as_ref() else {
            return;
        };
        let Some(stream) = self.streams.get_mut(&id) else {
            log::warn!("play requested for unknown music {}", id);
            return;
        };

        match Sink::try_new(handle) {
            Ok(sink) => {
                sink.set_volume(stream.volume);
                if let Some(previous) = stream.sink.replace(sink) {
                    previous.stop();
                }
            }
            Err(err) => {
                log::warn!("failed to open audio sink for music {}: {}", id, err);
                return;
            }
        }
        self.update(id);
    }

    pub fn set_volume(&mut self, id: u32, volume: f32) {
        if let Some(stream) = self.streams.get_mut(&id) {
            stream.volume = volume;
            if let Some(sink) = stream.sink.as_ref() {
                sink.set_volume(volume);
            }
        }
    }

    /// Tops the sink queue back up so playback never runs dry
    pub fn update(&mut self, id: u32) {
        if let Some(stream) = self.streams.get_mut(&id) {
            stream.refill(id);
        }
    }

    /// Ids of streams that were never unloaded
    pub fn loaded_ids(&self) -> Vec<u32> {
        self.streams.keys().copied().collect()
    }
}

impl Default for AudioSystem {
    fn default() -> Self {
        Self::new()
    }
}
