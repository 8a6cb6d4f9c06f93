//! Records immediate-mode calls into render passes
//!
//! The backend API is immediate: scenes call `begin_texture_mode`, draw, and
//! move on. wgpu wants whole passes, so calls are recorded here until
//! `end_drawing` and encoded in one command buffer. A pass opens lazily on the
//! first clear or draw after its target becomes current.

use cgmath::Matrix4;

use crate::gfx::{
    backend::Color,
    camera::{Camera3D, FLIP_Y_MATRIX},
};

use super::{grid::LineVertex, sprite::SpriteVertex, sprite::Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassTarget {
    Screen,
    Texture(u32),
}

/// Uniform bytes of a post shader as they were when the draw was recorded
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSnapshot {
    pub shader: u32,
    pub uniforms: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum DrawCommand {
    Mesh {
        model: u32,
        view_proj: Matrix4<f32>,
        transform: Matrix4<f32>,
        tint: [f32; 4],
    },
    Lines {
        vertices: Vec<LineVertex>,
        view_proj: Matrix4<f32>,
    },
    Sprites {
        texture: u32,
        vertices: Vec<SpriteVertex>,
        shader: Option<ShaderSnapshot>,
    },
}

#[derive(Debug, Clone)]
pub struct RecordedPass {
    pub target: PassTarget,
    pub width: u32,
    pub height: u32,
    /// `None` loads the previous contents
    pub clear: Option<Color>,
    pub commands: Vec<DrawCommand>,
}

#[derive(Debug)]
pub struct FrameRecorder {
    screen_size: [u32; 2],
    target: PassTarget,
    target_size: [u32; 2],
    camera: Option<Camera3D>,
    passes: Vec<RecordedPass>,
    pass_open: bool,
}

impl FrameRecorder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen_size: [width, height],
            target: PassTarget::Screen,
            target_size: [width, height],
            camera: None,
            passes: Vec::new(),
            pass_open: false,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.screen_size = [width, height];
        if self.target == PassTarget::Screen {
            self.target_size = self.screen_size;
        }
    }

    pub fn target(&self) -> PassTarget {
        self.target
    }

    pub fn begin_screen(&mut self) {
        self.switch_target(PassTarget::Screen, self.screen_size);
    }

    pub fn begin_texture(&mut self, id: u32, width: u32, height: u32) {
        self.switch_target(PassTarget::Texture(id), [width, height]);
    }

    /// Back to the screen after a texture pass
    pub fn end_texture(&mut self) {
        self.camera = None;
        self.begin_screen();
    }

    fn switch_target(&mut self, target: PassTarget, size: [u32; 2]) {
        if self.target != target || self.target_size != size {
            self.pass_open = false;
        }
        self.target = target;
        self.target_size = size;
    }

    pub fn set_camera(&mut self, camera: Option<Camera3D>) {
        self.camera = camera;
    }

    pub fn camera(&self) -> Option<&Camera3D> {
        self.camera.as_ref()
    }

    /// Clip-space transform for the active camera on the current target
    pub fn view_proj(&self) -> Option<Matrix4<f32>> {
        let [width, height] = self.target_size;
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        self.camera.map(|camera| {
            let view_proj = camera.build_view_projection_matrix(aspect);
            match self.target {
                PassTarget::Screen => view_proj,
                PassTarget::Texture(_) => FLIP_Y_MATRIX * view_proj,
            }
        })
    }

    pub fn viewport(&self) -> Viewport {
        let [width, height] = self.target_size;
        Viewport::new(width, height, matches!(self.target, PassTarget::Texture(_)))
    }

    /// Anything already recorded in the current pass is overwritten
    pub fn clear(&mut self, color: Color) {
        let pass = self.current_pass();
        pass.commands.clear();
        pass.clear = Some(color);
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.current_pass().commands.push(command);
    }

    fn current_pass(&mut self) -> &mut RecordedPass {
        if !self.pass_open || self.passes.is_empty() {
            let [width, height] = self.target_size;
            self.passes.push(RecordedPass {
                target: self.target,
                width,
                height,
                clear: None,
                commands: Vec::new(),
            });
            self.pass_open = true;
        }
        let last = self.passes.len() - 1;
        &mut self.passes[last]
    }

    /// Takes the recorded passes, guaranteeing the screen is written once
    pub fn finish(&mut self) -> Vec<RecordedPass> {
        if !self
            .passes
            .iter()
            .any(|pass| pass.target == PassTarget::Screen)
        {
            let [width, height] = self.screen_size;
            self.passes.push(RecordedPass {
                target: PassTarget::Screen,
                width,
                height,
                clear: Some(Color::BLACK),
                commands: Vec::new(),
            });
        }

        self.camera = None;
        self.target = PassTarget::Screen;
        self.target_size = self.screen_size;
        self.pass_open = false;
        std::mem::take(&mut self.passes)
    }

    /// Drops every recorded pass that draws into or samples `texture`
    pub fn forget_texture(&mut self, texture: u32) {
        self.passes.retain(|pass| pass.target != PassTarget::Texture(texture));
        for pass in &mut self.passes {
            pass.commands.retain(|command| {
                !matches!(command, DrawCommand::Sprites { texture: t, .. } if *t == texture)
            });
        }
        self.pass_open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector3, Vector4};

    fn sprite(texture: u32) -> DrawCommand {
        DrawCommand::Sprites {
            texture,
            vertices: Vec::new(),
            shader: None,
        }
    }

    #[test]
    fn test_texture_then_screen_passes() {
        let mut recorder = FrameRecorder::new(800, 600);

        recorder.begin_texture(7, 800, 600);
        recorder.clear(Color::RAYWHITE);
        recorder.push(sprite(1));
        recorder.end_texture();

        recorder.begin_screen();
        recorder.clear(Color::BLACK);
        recorder.push(sprite(7));

        let passes = recorder.finish();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].target, PassTarget::Texture(7));
        assert_eq!(passes[0].clear, Some(Color::RAYWHITE));
        assert_eq!(passes[1].target, PassTarget::Screen);
        assert_eq!(passes[1].commands.len(), 1);
    }

    #[test]
    fn test_clear_discards_earlier_draws() {
        let mut recorder = FrameRecorder::new(800, 600);
        recorder.push(sprite(1));
        recorder.clear(Color::WHITE);

        let passes = recorder.finish();
        assert_eq!(passes.len(), 1);
        assert!(passes[0].commands.is_empty());
        assert_eq!(passes[0].clear, Some(Color::WHITE));
    }

    #[test]
    fn test_empty_frame_still_clears_screen() {
        let mut recorder = FrameRecorder::new(800, 600);
        let passes = recorder.finish();

        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].target, PassTarget::Screen);
        assert_eq!(passes[0].clear, Some(Color::BLACK));
        assert!(recorder.finish()[0].commands.is_empty());
    }

    #[test]
    fn test_draws_without_clear_load_previous_contents() {
        let mut recorder = FrameRecorder::new(800, 600);
        recorder.begin_screen();
        recorder.push(sprite(1));

        let passes = recorder.finish();
        assert_eq!(passes[0].clear, None);
    }

    #[test]
    fn test_texture_targets_flip_clip_y() {
        let mut recorder = FrameRecorder::new(800, 600);
        let camera = Camera3D::perspective(
            Vector3::new(0.0, 0.0, 5.0),
            Vector3::new(0.0, 0.0, 0.0),
            50.0,
        );
        recorder.set_camera(Some(camera));
        let above = Vector4::new(0.0, 1.0, 0.0, 1.0);

        let screen_y = (recorder.view_proj().unwrap() * above).y;
        recorder.begin_texture(3, 800, 600);
        recorder.set_camera(Some(camera));
        let texture_y = (recorder.view_proj().unwrap() * above).y;

        assert!(screen_y > 0.0);
        assert!((screen_y + texture_y).abs() < 1e-6);
        assert!(recorder.viewport().flip_y);
    }

    #[test]
    fn test_end_texture_leaves_3d_mode() {
        let mut recorder = FrameRecorder::new(800, 600);
        recorder.begin_texture(3, 64, 64);
        recorder.set_camera(Some(Camera3D::perspective(
            Vector3::new(1.0, 1.0, 1.0),
            Vector3::new(0.0, 0.0, 0.0),
            45.0,
        )));
        recorder.end_texture();

        assert!(recorder.camera().is_none());
        assert_eq!(recorder.target(), PassTarget::Screen);
    }

    #[test]
    fn test_forget_texture_drops_its_passes() {
        let mut recorder = FrameRecorder::new(800, 600);
        recorder.begin_texture(4, 10, 10);
        recorder.push(sprite(1));
        recorder.end_texture();
        recorder.push(sprite(4));
        recorder.push(sprite(2));

        recorder.forget_texture(4);

        let passes = recorder.finish();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].commands.len(), 1);
    }
}
