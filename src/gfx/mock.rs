//! Recording backend for tests
//!
//! Keeps an ordered event log and counts live resources per kind so tests can
//! assert on acquisition and release without a GPU or audio device.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use cgmath::Vector3;

use crate::error::{Result, SolarisError};

use super::{
    backend::{Backend, Color, Font, Model, Music, Rectangle, RenderTarget, Shader, Texture},
    camera::Camera3D,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoadTexture(u32),
    UnloadTexture(u32),
    LoadFont { id: u32, size: u32 },
    UnloadFont(u32),
    LoadMusic(u32),
    UnloadMusic(u32),
    PlayMusic(u32),
    SetMusicVolume(u32, f32),
    UpdateMusic(u32),
    LoadModel(u32),
    UnloadModel(u32),
    LoadShader(u32),
    UnloadShader(u32),
    SetShaderValue { shader: u32, location: i32, value: i32 },
    LoadRenderTarget { id: u32, width: u32, height: u32 },
    UnloadRenderTarget(u32),
    BeginDrawing,
    EndDrawing,
    BeginTextureMode(u32),
    EndTextureMode,
    Clear(Color),
    BeginMode3D,
    EndMode3D,
    BeginShaderMode(u32),
    EndShaderMode,
    DrawModel(u32),
    DrawGrid { slices: u32, spacing: f32 },
    DrawTexture { texture: u32, source: Option<Rectangle>, position: [f32; 2], scale: f32 },
    DrawText { text: String, position: [f32; 2], size: f32, spacing: f32 },
    DrawFps,
}

/// Live resource counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveCounts {
    pub textures: usize,
    pub fonts: usize,
    pub music: usize,
    pub models: usize,
    pub shaders: usize,
    pub render_targets: usize,
}

impl LiveCounts {
    pub fn total(&self) -> usize {
        self.textures + self.fonts + self.music + self.models + self.shaders + self.render_targets
    }
}

pub struct MockBackend {
    pub width: u32,
    pub height: u32,
    pub events: Vec<Event>,
    /// Every path handed to `load_model`, with whether it existed at that time
    pub model_paths_seen: Vec<(PathBuf, bool)>,
    pub fail_model_loads: bool,
    /// Makes `load_model` panic, as a crashing decoder would
    pub panic_model_loads: bool,
    /// Paths whose load should fail as if the file were missing
    pub missing_paths: HashSet<PathBuf>,
    /// Size reported for every loaded image texture
    pub image_size: (u32, u32),
    /// Uniform names the compiled shaders expose, in location order
    pub shader_uniforms: Vec<String>,
    live: HashSet<(&'static str, u32)>,
    next_id: u32,
}

impl MockBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            events: Vec::new(),
            model_paths_seen: Vec::new(),
            fail_model_loads: false,
            panic_model_loads: false,
            missing_paths: HashSet::new(),
            image_size: (2400, 1600),
            shader_uniforms: vec!["pass".to_string()],
            live: HashSet::new(),
            next_id: 1,
        }
    }

    pub fn live(&self) -> LiveCounts {
        let count = |kind: &str| self.live.iter().filter(|(k, _)| *k == kind).count();
        LiveCounts {
            textures: count("texture"),
            fonts: count("font"),
            music: count("music"),
            models: count("model"),
            shaders: count("shader"),
            render_targets: count("render_target"),
        }
    }

    /// Values uploaded through `set_shader_value_i32`, in order
    pub fn shader_values(&self) -> Vec<i32> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::SetShaderValue { value, .. } => Some(*value),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| predicate(e)).count()
    }

    fn acquire(&mut self, kind: &'static str) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.live.insert((kind, id));
        id
    }

    fn release(&mut self, kind: &'static str, id: u32) {
        assert!(
            self.live.remove(&(kind, id)),
            "{} {} released twice or never loaded",
            kind,
            id
        );
    }

    fn check_exists(&self, path: &Path) -> Result<()> {
        if self.missing_paths.contains(path) {
            return Err(SolarisError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "mock: missing asset"),
            ));
        }
        Ok(())
    }
}

impl Backend for MockBackend {
    fn screen_width(&self) -> u32 {
        self.width
    }

    fn screen_height(&self) -> u32 {
        self.height
    }

    fn frame_time(&self) -> f32 {
        1.0 / 60.0
    }

    fn fps(&self) -> u32 {
        60
    }

    fn mouse_wheel_move(&self) -> f32 {
        0.0
    }

    fn load_texture(&mut self, path: &Path) -> Result<Texture> {
        self.check_exists(path)?;
        let id = self.acquire("texture");
        self.events.push(Event::LoadTexture(id));
        Ok(Texture {
            id,
            width: self.image_size.0,
            height: self.image_size.1,
        })
    }

    fn unload_texture(&mut self, texture: Texture) {
        self.release("texture", texture.id);
        self.events.push(Event::UnloadTexture(texture.id));
    }

    fn load_font(&mut self, path: &Path, size: u32) -> Result<Font> {
        self.check_exists(path)?;
        if size == 0 {
            return Err(SolarisError::Font {
                path: path.to_path_buf(),
                reason: "font size must be positive".to_string(),
            });
        }
        let id = self.acquire("font");
        self.events.push(Event::LoadFont { id, size });
        Ok(Font {
            id,
            base_size: size,
        })
    }

    fn unload_font(&mut self, font: Font) {
        self.release("font", font.id);
        self.events.push(Event::UnloadFont(font.id));
    }

    fn load_music(&mut self, path: &Path) -> Result<Music> {
        self.check_exists(path)?;
        let id = self.acquire("music");
        self.events.push(Event::LoadMusic(id));
        Ok(Music { id })
    }

    fn unload_music(&mut self, music: Music) {
        self.release("music", music.id);
        self.events.push(Event::UnloadMusic(music.id));
    }

    fn play_music(&mut self, music: &Music) {
        self.events.push(Event::PlayMusic(music.id));
    }

    fn set_music_volume(&mut self, music: &Music, volume: f32) {
        self.events.push(Event::SetMusicVolume(music.id, volume));
    }

    fn update_music(&mut self, music: &Music) {
        self.events.push(Event::UpdateMusic(music.id));
    }

    fn load_model(&mut self, path: &Path) -> Result<Model> {
        self.model_paths_seen.push((path.to_path_buf(), path.exists()));
        if self.panic_model_loads {
            panic!("mock: decoder crashed on {}", path.display());
        }
        if self.fail_model_loads {
            return Err(SolarisError::ModelDecode {
                path: path.to_path_buf(),
                reason: "mock: decode failure".to_string(),
            });
        }
        let id = self.acquire("model");
        self.events.push(Event::LoadModel(id));
        Ok(Model { id, mesh_count: 1 })
    }

    fn unload_model(&mut self, model: Model) {
        self.release("model", model.id);
        self.events.push(Event::UnloadModel(model.id));
    }

    fn load_shader(&mut self, _fragment_source: &str) -> Result<Shader> {
        let id = self.acquire("shader");
        self.events.push(Event::LoadShader(id));
        Ok(Shader { id })
    }

    fn unload_shader(&mut self, shader: Shader) {
        self.release("shader", shader.id);
        self.events.push(Event::UnloadShader(shader.id));
    }

    fn shader_location(&self, _shader: &Shader, name: &str) -> i32 {
        self.shader_uniforms
            .iter()
            .position(|uniform| uniform == name)
            .map(|index| index as i32)
            .unwrap_or(-1)
    }

    fn set_shader_value_i32(&mut self, shader: &Shader, location: i32, value: i32) {
        self.events.push(Event::SetShaderValue {
            shader: shader.id,
            location,
            value,
        });
    }

    fn load_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget> {
        if width == 0 || height == 0 {
            return Err(SolarisError::RenderTarget { width, height });
        }
        let id = self.acquire("render_target");
        self.events.push(Event::LoadRenderTarget { id, width, height });
        Ok(RenderTarget {
            id,
            texture: Texture { id, width, height },
        })
    }

    fn unload_render_target(&mut self, target: RenderTarget) {
        self.release("render_target", target.id);
        self.events.push(Event::UnloadRenderTarget(target.id));
    }

    fn begin_drawing(&mut self) {
        self.events.push(Event::BeginDrawing);
    }

    fn end_drawing(&mut self) {
        self.events.push(Event::EndDrawing);
    }

    fn begin_texture_mode(&mut self, target: &RenderTarget) {
        self.events.push(Event::BeginTextureMode(target.id));
    }

    fn end_texture_mode(&mut self) {
        self.events.push(Event::EndTextureMode);
    }

    fn clear_background(&mut self, color: Color) {
        self.events.push(Event::Clear(color));
    }

    fn begin_mode_3d(&mut self, _camera: &Camera3D) {
        self.events.push(Event::BeginMode3D);
    }

    fn end_mode_3d(&mut self) {
        self.events.push(Event::EndMode3D);
    }

    fn begin_shader_mode(&mut self, shader: &Shader) {
        self.events.push(Event::BeginShaderMode(shader.id));
    }

    fn end_shader_mode(&mut self) {
        self.events.push(Event::EndShaderMode);
    }

    fn draw_model(&mut self, model: &Model, _position: Vector3<f32>, _scale: f32, _tint: Color) {
        self.events.push(Event::DrawModel(model.id));
    }

    fn draw_grid(&mut self, slices: u32, spacing: f32) {
        self.events.push(Event::DrawGrid { slices, spacing });
    }

    fn draw_texture_ex(
        &mut self,
        texture: &Texture,
        position: [f32; 2],
        _rotation: f32,
        scale: f32,
        _tint: Color,
    ) {
        self.events.push(Event::DrawTexture {
            texture: texture.id,
            source: None,
            position,
            scale,
        });
    }

    fn draw_texture_rec(
        &mut self,
        texture: &Texture,
        source: Rectangle,
        position: [f32; 2],
        _tint: Color,
    ) {
        self.events.push(Event::DrawTexture {
            texture: texture.id,
            source: Some(source),
            position,
            scale: 1.0,
        });
    }

    /// Every glyph is `size * 0.5` wide
    fn measure_text(&self, _font: &Font, text: &str, size: f32, spacing: f32) -> [f32; 2] {
        let glyphs = text.chars().count() as f32;
        if glyphs == 0.0 {
            return [0.0, size];
        }
        [glyphs * size * 0.5 + spacing * (glyphs - 1.0), size]
    }

    fn draw_text_ex(
        &mut self,
        _font: &Font,
        text: &str,
        position: [f32; 2],
        size: f32,
        spacing: f32,
        _tint: Color,
    ) {
        self.events.push(Event::DrawText {
            text: text.to_string(),
            position,
            size,
            spacing,
        });
    }

    fn draw_fps(&mut self, _x: i32, _y: i32) {
        self.events.push(Event::DrawFps);
    }
}
