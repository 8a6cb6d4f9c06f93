//! Assets compiled into the binary and the temp-file model decode path
//!
//! The model parsers only accept paths and pick their format from the file
//! extension, so an embedded model is written to `<temp>/out<ext>`, loaded, and
//! the file removed again whatever the outcome.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    error::{Result, SolarisError},
    gfx::backend::{Backend, Model},
};

/// Binary glTF of the viewer model
pub const HELMET_GLB: &[u8] = include_bytes!("../assets/helmet.glb");

/// Separable blur fragment shader, `pass` selects the axis
pub const BLUR_FRAG: &str = include_str!("../assets/shaders/blur.wgsl");

/// Removes the wrapped file when dropped
struct TempFile {
    path: PathBuf,
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("removed temp file {}", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::warn!(
                "failed to remove temp file {}: {}",
                self.path.display(),
                err
            ),
        }
    }
}

/// Loads a model from an in-memory file image
///
/// `file_type` is the extension including the dot, e.g. `".glb"`.
pub fn load_model_from_memory<B: Backend>(
    backend: &mut B,
    file_type: &str,
    data: &[u8],
) -> Result<Model> {
    load_model_from_memory_in(backend, &std::env::temp_dir(), file_type, data)
}

/// Same as [`load_model_from_memory`] with an explicit scratch directory
pub fn load_model_from_memory_in<B: Backend>(
    backend: &mut B,
    dir: &Path,
    file_type: &str,
    data: &[u8],
) -> Result<Model> {
    let path = dir.join(format!("out{}", file_type));

    let mut file = File::create(&path).map_err(|e| SolarisError::io(&path, e))?;
    let temp = TempFile { path };

    file.write_all(data)
        .and_then(|_| file.flush())
        .map_err(|e| SolarisError::io(&temp.path, e))?;
    drop(file);

    log::debug!(
        "decoding {} byte model through {}",
        data.len(),
        temp.path.display()
    );
    backend.load_model(&temp.path)
}
