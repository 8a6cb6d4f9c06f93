//! Model viewer with a two-pass separable blur
//!
//! Per frame: the model and a grid are drawn into `target_0`; `target_0` is
//! drawn through the blur shader with `pass = 0` into `target_1`; `target_1` is
//! drawn through the same shader with `pass = 1` onto the screen. Render
//! targets keep a bottom-left origin, so both copies use a vertically flipped
//! source rectangle.
//!
//! The targets are sized once, at construction, and are not resized with the
//! window.

use cgmath::Vector3;

use crate::{
    assets::{self, BLUR_FRAG, HELMET_GLB},
    config::AppConfig,
    error::Result,
    gfx::{
        backend::{Backend, Color, Model, Rectangle, RenderTarget, Shader},
        camera::Camera3D,
    },
};

/// Blur axis selected through the shader's `pass` uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BlurPass {
    Horizontal = 0,
    Vertical = 1,
}

pub struct ModelViewer {
    model: Model,
    shader: Shader,
    target_0: RenderTarget,
    target_1: RenderTarget,
    camera: Camera3D,
    position: Vector3<f32>,
    pass_loc: i32,
    grid_slices: u32,
    grid_spacing: f32,
}

impl ModelViewer {
    pub fn new<B: Backend>(backend: &mut B, config: &AppConfig) -> Result<Self> {
        let screen_width = backend.screen_width();
        let screen_height = backend.screen_height();

        let model = assets::load_model_from_memory(backend, ".glb", HELMET_GLB)?;
        let shader = match backend.load_shader(BLUR_FRAG) {
            Ok(shader) => shader,
            Err(err) => {
                backend.unload_model(model);
                return Err(err);
            }
        };

        let pass_loc = backend.shader_location(&shader, "pass");
        if pass_loc < 0 {
            log::warn!("blur shader has no 'pass' uniform, both passes will run the same axis");
        }

        let target_0 = match backend.load_render_target(screen_width, screen_height) {
            Ok(target) => target,
            Err(err) => {
                backend.unload_shader(shader);
                backend.unload_model(model);
                return Err(err);
            }
        };
        let target_1 = match backend.load_render_target(screen_width, screen_height) {
            Ok(target) => target,
            Err(err) => {
                backend.unload_render_target(target_0);
                backend.unload_shader(shader);
                backend.unload_model(model);
                return Err(err);
            }
        };

        let viewer = &config.viewer;
        let position = viewer.model_position;
        let camera = Camera3D::perspective(viewer.camera_position, position, viewer.fovy);

        log::info!(
            "model viewer ready: {} meshes, blur targets {}x{}",
            model.mesh_count,
            screen_width,
            screen_height
        );

        Ok(Self {
            model,
            shader,
            target_0,
            target_1,
            camera,
            position,
            pass_loc,
            grid_slices: viewer.grid_slices,
            grid_spacing: viewer.grid_spacing,
        })
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn tick<B: Backend>(&mut self, _backend: &mut B) {}

    pub fn draw<B: Backend>(&mut self, backend: &mut B) {
        self.camera
            .update_orbital(backend.frame_time(), backend.mouse_wheel_move());

        // Scene into target_0
        backend.begin_texture_mode(&self.target_0);
        backend.clear_background(Color::RAYWHITE);
        backend.begin_mode_3d(&self.camera);
        backend.draw_model(&self.model, self.position, 1.0, Color::WHITE);
        backend.draw_grid(self.grid_slices, self.grid_spacing);
        backend.end_mode_3d();
        backend.end_texture_mode();

        // Horizontal blur into target_1
        backend.begin_texture_mode(&self.target_1);
        backend.clear_background(Color::RAYWHITE);
        self.blit_blurred(backend, BlurPass::Horizontal, Source::Target0);
        backend.end_texture_mode();

        // Vertical blur onto the screen
        backend.begin_drawing();
        backend.clear_background(Color::RAYWHITE);
        self.blit_blurred(backend, BlurPass::Vertical, Source::Target1);
        backend.draw_fps(8, 4);
        backend.end_drawing();
    }

    fn blit_blurred<B: Backend>(&self, backend: &mut B, pass: BlurPass, source: Source) {
        let texture = match source {
            Source::Target0 => &self.target_0.texture,
            Source::Target1 => &self.target_1.texture,
        };

        backend.set_shader_value_i32(&self.shader, self.pass_loc, pass as i32);
        backend.begin_shader_mode(&self.shader);
        backend.draw_texture_rec(texture, Rectangle::flipped_y(texture), [0.0, 0.0], Color::WHITE);
        backend.end_shader_mode();
    }

    pub fn release<B: Backend>(self, backend: &mut B) {
        backend.unload_model(self.model);
        backend.unload_shader(self.shader);
        backend.unload_render_target(self.target_0);
        backend.unload_render_target(self.target_1);
    }
}

#[derive(Clone, Copy)]
enum Source {
    Target0,
    Target1,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::mock::{Event, MockBackend};

    fn viewer(backend: &mut MockBackend) -> ModelViewer {
        ModelViewer::new(backend, &AppConfig::default()).unwrap()
    }

    #[test]
    fn test_targets_sized_to_screen_once() {
        let mut backend = MockBackend::new(1920, 1080);
        let viewer = viewer(&mut backend);

        let targets: Vec<_> = backend
            .events
            .iter()
            .filter_map(|e| match e {
                Event::LoadRenderTarget { width, height, .. } => Some((*width, *height)),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![(1920, 1080), (1920, 1080)]);

        // a resize after construction does not reallocate
        backend.width = 1280;
        backend.height = 720;
        let mut viewer = viewer;
        viewer.draw(&mut backend);
        assert_eq!(
            backend.count(|e| matches!(e, Event::LoadRenderTarget { .. })),
            2
        );
        viewer.release(&mut backend);
    }

    #[test]
    fn test_pass_uniform_is_zero_then_one() {
        let mut backend = MockBackend::new(1920, 1080);
        let mut viewer = viewer(&mut backend);

        viewer.draw(&mut backend);
        assert_eq!(backend.shader_values(), vec![0, 1]);

        viewer.draw(&mut backend);
        assert_eq!(backend.shader_values(), vec![0, 1, 0, 1]);
        viewer.release(&mut backend);
    }

    #[test]
    fn test_last_pass_before_present_is_vertical() {
        let mut backend = MockBackend::new(1920, 1080);
        let mut viewer = viewer(&mut backend);
        backend.events.clear();

        viewer.draw(&mut backend);

        let end = backend
            .events
            .iter()
            .position(|e| *e == Event::EndDrawing)
            .unwrap();
        let last_value = backend.events[..end]
            .iter()
            .rev()
            .find_map(|e| match e {
                Event::SetShaderValue { value, .. } => Some(*value),
                _ => None,
            });
        assert_eq!(last_value, Some(BlurPass::Vertical as i32));
        viewer.release(&mut backend);
    }

    #[test]
    fn test_frame_pass_order() {
        let mut backend = MockBackend::new(640, 480);
        let mut viewer = viewer(&mut backend);
        let target_0 = viewer.target_0.id;
        let target_1 = viewer.target_1.id;
        let shader = viewer.shader.id;
        backend.events.clear();

        viewer.draw(&mut backend);

        let flipped = Some(Rectangle::new(0.0, 0.0, 640.0, -480.0));
        assert_eq!(
            backend.events,
            vec![
                Event::BeginTextureMode(target_0),
                Event::Clear(Color::RAYWHITE),
                Event::BeginMode3D,
                Event::DrawModel(viewer.model.id),
                Event::DrawGrid {
                    slices: 10,
                    spacing: 1.0
                },
                Event::EndMode3D,
                Event::EndTextureMode,
                Event::BeginTextureMode(target_1),
                Event::Clear(Color::RAYWHITE),
                Event::SetShaderValue {
                    shader,
                    location: 0,
                    value: 0
                },
                Event::BeginShaderMode(shader),
                Event::DrawTexture {
                    texture: target_0,
                    source: flipped,
                    position: [0.0, 0.0],
                    scale: 1.0
                },
                Event::EndShaderMode,
                Event::EndTextureMode,
                Event::BeginDrawing,
                Event::Clear(Color::RAYWHITE),
                Event::SetShaderValue {
                    shader,
                    location: 0,
                    value: 1
                },
                Event::BeginShaderMode(shader),
                Event::DrawTexture {
                    texture: target_1,
                    source: flipped,
                    position: [0.0, 0.0],
                    scale: 1.0
                },
                Event::EndShaderMode,
                Event::DrawFps,
                Event::EndDrawing,
            ]
        );
        viewer.release(&mut backend);
    }

    #[test]
    fn test_release_frees_each_resource_once() {
        let mut backend = MockBackend::new(1920, 1080);
        let viewer = viewer(&mut backend);
        assert_eq!(backend.live().render_targets, 2);
        assert_eq!(backend.live().models, 1);
        assert_eq!(backend.live().shaders, 1);

        viewer.release(&mut backend);

        assert_eq!(backend.live().total(), 0);
        assert_eq!(
            backend.count(|e| matches!(e, Event::UnloadRenderTarget(_))),
            2
        );
    }

    #[test]
    fn test_camera_orbits_model() {
        let mut backend = MockBackend::new(1920, 1080);
        let mut viewer = viewer(&mut backend);
        let start = viewer.camera().position;

        viewer.draw(&mut backend);

        assert_eq!(viewer.camera().target, Vector3::new(0.0, 1.0, 0.0));
        assert_ne!(viewer.camera().position, start);
        viewer.release(&mut backend);
    }

    #[test]
    fn test_failed_model_decode_acquires_nothing() {
        let mut backend = MockBackend::new(1920, 1080);
        backend.fail_model_loads = true;

        assert!(ModelViewer::new(&mut backend, &AppConfig::default()).is_err());
        assert_eq!(backend.live().total(), 0);
    }

    #[test]
    fn test_missing_uniform_uploads_to_minus_one() {
        let mut backend = MockBackend::new(1920, 1080);
        backend.shader_uniforms.clear();
        let mut viewer = viewer(&mut backend);

        viewer.draw(&mut backend);

        assert!(backend
            .events
            .iter()
            .all(|e| !matches!(e, Event::SetShaderValue { location, .. } if *location != -1)));
        viewer.release(&mut backend);
    }
}
