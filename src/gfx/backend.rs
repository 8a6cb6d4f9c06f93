//! Immediate-mode rendering and audio surface used by the scenes
//!
//! The scenes never touch wgpu directly. They talk to a [`Backend`], which
//! exposes a small begin/end bracket API: frames, texture modes, 3D mode and
//! shader mode, plus resource loading. The wgpu implementation lives in
//! [`crate::gfx::rendering::RenderEngine`]; tests use a recording mock.
//!
//! Resource handles are move-only. Every `unload_*` consumes its handle, so a
//! resource cannot be freed twice.

use std::path::Path;

use cgmath::Vector3;

use crate::error::Result;

use super::camera::Camera3D;

/// RGBA color with 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    pub const RAYWHITE: Color = Color::new(245, 245, 245, 255);
    pub const GREEN: Color = Color::new(0, 228, 48, 255);
    pub const GRID_LINE: Color = Color::new(190, 190, 190, 255);
    pub const GRID_AXIS: Color = Color::new(130, 130, 130, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Normalized `[r, g, b, a]`
    pub fn to_array(self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.to_array();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }
    }
}

/// Axis-aligned rectangle in pixels. Negative width or height mirrors the
/// sampled region on that axis when used as a source rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Full-size source rectangle of `texture`, mirrored vertically
    pub fn flipped_y(texture: &Texture) -> Self {
        Self::new(0.0, 0.0, texture.width as f32, -(texture.height as f32))
    }
}

/// GPU texture handle
#[derive(Debug, PartialEq, Eq)]
pub struct Texture {
    pub id: u32,
    pub width: u32,
    pub height: u32,
}

/// Offscreen color buffer plus its own depth buffer
#[derive(Debug, PartialEq, Eq)]
pub struct RenderTarget {
    pub id: u32,
    /// Color attachment, sampled like any other texture
    pub texture: Texture,
}

/// Rasterized font handle
#[derive(Debug, PartialEq, Eq)]
pub struct Font {
    pub id: u32,
    /// Pixel size the glyphs were rasterized at
    pub base_size: u32,
}

/// Streaming music handle
#[derive(Debug, PartialEq, Eq)]
pub struct Music {
    pub id: u32,
}

/// Uploaded model handle
#[derive(Debug, PartialEq, Eq)]
pub struct Model {
    pub id: u32,
    pub mesh_count: usize,
}

/// Compiled post-processing shader handle
#[derive(Debug, PartialEq, Eq)]
pub struct Shader {
    pub id: u32,
}

/// Rendering, audio and input services consumed by the scenes
pub trait Backend {
    fn screen_width(&self) -> u32;
    fn screen_height(&self) -> u32;
    /// Duration of the last completed frame in seconds
    fn frame_time(&self) -> f32;
    fn fps(&self) -> u32;
    /// Wheel movement accumulated since the last frame ended, in lines
    fn mouse_wheel_move(&self) -> f32;

    fn load_texture(&mut self, path: &Path) -> Result<Texture>;
    fn unload_texture(&mut self, texture: Texture);

    /// Rasterizes printable ASCII of the font at `size` pixels
    fn load_font(&mut self, path: &Path, size: u32) -> Result<Font>;
    fn unload_font(&mut self, font: Font);

    fn load_music(&mut self, path: &Path) -> Result<Music>;
    fn unload_music(&mut self, music: Music);
    fn play_music(&mut self, music: &Music);
    fn set_music_volume(&mut self, music: &Music, volume: f32);
    /// Keeps the stream's playback queue fed
    fn update_music(&mut self, music: &Music);

    /// Loads a model file; the parser is chosen from the file extension
    fn load_model(&mut self, path: &Path) -> Result<Model>;
    fn unload_model(&mut self, model: Model);

    /// Compiles a fragment-only shader against the built-in vertex stage
    fn load_shader(&mut self, fragment_source: &str) -> Result<Shader>;
    fn unload_shader(&mut self, shader: Shader);
    /// Location of a uniform, or -1 when the shader has no such uniform
    fn shader_location(&self, shader: &Shader, name: &str) -> i32;
    fn set_shader_value_i32(&mut self, shader: &Shader, location: i32, value: i32);

    fn load_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget>;
    fn unload_render_target(&mut self, target: RenderTarget);

    fn begin_drawing(&mut self);
    /// Submits everything recorded since `begin_drawing` and presents
    fn end_drawing(&mut self);
    fn begin_texture_mode(&mut self, target: &RenderTarget);
    fn end_texture_mode(&mut self);
    fn clear_background(&mut self, color: Color);
    fn begin_mode_3d(&mut self, camera: &Camera3D);
    fn end_mode_3d(&mut self);
    fn begin_shader_mode(&mut self, shader: &Shader);
    fn end_shader_mode(&mut self);

    fn draw_model(&mut self, model: &Model, position: Vector3<f32>, scale: f32, tint: Color);
    fn draw_grid(&mut self, slices: u32, spacing: f32);
    fn draw_texture_ex(
        &mut self,
        texture: &Texture,
        position: [f32; 2],
        rotation: f32,
        scale: f32,
        tint: Color,
    );
    fn draw_texture_rec(
        &mut self,
        texture: &Texture,
        source: Rectangle,
        position: [f32; 2],
        tint: Color,
    );
    /// `[width, height]` of `text` drawn with `font` at `size` and `spacing`
    fn measure_text(&self, font: &Font, text: &str, size: f32, spacing: f32) -> [f32; 2];
    fn draw_text_ex(
        &mut self,
        font: &Font,
        text: &str,
        position: [f32; 2],
        size: f32,
        spacing: f32,
        tint: Color,
    );
    fn draw_fps(&mut self, x: i32, y: i32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_normalization() {
        assert_eq!(Color::WHITE.to_array(), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Color::BLACK.to_array(), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_flipped_source_rectangle() {
        let texture = Texture {
            id: 1,
            width: 1920,
            height: 1080,
        };
        let rect = Rectangle::flipped_y(&texture);
        assert_eq!(rect, Rectangle::new(0.0, 0.0, 1920.0, -1080.0));
    }
}
