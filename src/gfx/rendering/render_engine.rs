//! WGPU-based rendering backend for solaris
//!
//! Owns the surface, device and queue plus every GPU resource the scenes load.
//! Drawing calls are recorded by a [`FrameRecorder`] and encoded into a single
//! command buffer at `end_drawing`, followed by the FPS overlay and present.

use std::{
    collections::HashMap,
    path::Path,
    sync::Arc,
    time::{Duration, Instant},
};

use cgmath::{Matrix4, Vector3};
use wgpu::{util::DeviceExt, TextureFormat};
use winit::window::Window;

use crate::{
    audio::AudioSystem,
    config::WindowConfig,
    error::{Result, SolarisError},
    gfx::{
        backend::{Backend, Color, Font, Model, Music, Rectangle, RenderTarget, Shader, Texture},
        camera::{convert_matrix4_to_array, Camera3D, CameraUniform},
        scene::model::{MeshData, ModelData},
    },
    performance::PerformanceMonitor,
    ui::UiManager,
};

use super::{
    font_atlas::FontAtlas,
    frame::{DrawCommand, FrameRecorder, PassTarget, RecordedPass, ShaderSnapshot},
    grid::grid_lines,
    pipeline_manager::{PipelineKey, PipelineKind, PipelineManager, TEXTURE_LAYOUT, UNIFORM_LAYOUT},
    shader::{PostShaderSource, UniformBlock, UniformLayout},
    sprite::{textured_quad, SpriteVertex},
    texture_resource::TextureResource,
};

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshUniform {
    view_proj: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

struct GpuTexture {
    resource: TextureResource,
    bind_group: wgpu::BindGroup,
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    base_color: [f32; 4],
    material_bind_group: wgpu::BindGroup,
}

struct LoadedFont {
    atlas: FontAtlas,
    texture: u32,
}

struct LoadedShader {
    layout: UniformLayout,
    uniforms: UniformBlock,
}

/// One encoded draw with everything it binds
struct PreparedDraw {
    pipeline: PipelineKey,
    bind_groups: Vec<wgpu::BindGroup>,
    vertices: wgpu::Buffer,
    indices: Option<wgpu::Buffer>,
    count: u32,
}

/// Core rendering engine managing GPU resources and draw calls
///
/// Implements [`Backend`] for the scenes. Resource ids come from one counter,
/// so a texture, a model and a shader never share an id. A render target's
/// color texture uses the target's own id.
pub struct RenderEngine {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,
    sample_count: u32,
    msaa_texture: Option<TextureResource>,
    depth_texture: TextureResource,
    max_texture_size: u32,

    pipeline_manager: PipelineManager,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    white_texture: TextureResource,

    next_id: u32,
    textures: HashMap<u32, GpuTexture>,
    // depth buffers of render targets, keyed like their color texture
    render_targets: HashMap<u32, TextureResource>,
    fonts: HashMap<u32, LoadedFont>,
    models: HashMap<u32, Vec<GpuMesh>>,
    shaders: HashMap<u32, LoadedShader>,

    recorder: FrameRecorder,
    active_shader: Option<u32>,
    audio: AudioSystem,
    ui: UiManager,
    performance: PerformanceMonitor,
    fps_position: Option<[f32; 2]>,
    last_frame: Instant,
    frame_time: Duration,
    wheel: f32,
    close_requested: bool,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// Initializes wgpu, configures the surface with a non-sRGB format and
    /// opens the audio device.
    ///
    /// # Errors
    /// Returns [`SolarisError::Gpu`] if no adapter, device or surface format
    /// is available.
    pub async fn new(window: Arc<Window>, window_config: &WindowConfig) -> Result<RenderEngine> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| SolarisError::Gpu(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| SolarisError::Gpu(e.to_string()))?;
        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: adapter.limits().max_texture_dimension_2d,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| SolarisError::Gpu(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| SolarisError::Gpu("surface reports no formats".to_string()))?;

        let present_mode = if window_config.vsync {
            wgpu::PresentMode::Fifo
        } else if surface_capabilities
            .present_modes
            .contains(&wgpu::PresentMode::Immediate)
        {
            wgpu::PresentMode::Immediate
        } else {
            wgpu::PresentMode::Fifo
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode,
            alpha_mode: surface_capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let requested = window_config.msaa_samples.max(1);
        let sample_count = if requested == 1
            || format
                .guaranteed_format_features(device.features())
                .flags
                .sample_count_supported(requested)
        {
            requested
        } else {
            log::warn!("{}x MSAA not supported for {:?}, rendering without it", requested, format);
            1
        };

        let max_texture_size = device.limits().max_texture_dimension_2d;
        let depth_texture =
            TextureResource::create_depth_texture(&device, width, height, sample_count, "depth_texture");
        let msaa_texture = (sample_count > 1).then(|| {
            TextureResource::create_msaa_texture(&device, format, width, height, sample_count)
        });

        let ui = UiManager::new(&device, &queue, format, &window);
        let white_texture = TextureResource::create_white(&device, &queue);

        // Wrap device and queue in Arc for pipeline manager
        let device_handle: Arc<wgpu::Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let pipeline_manager = PipelineManager::new(device_handle.clone());
        let uniform_layout = pipeline_manager
            .get_bind_group_layout(UNIFORM_LAYOUT)
            .cloned()
            .ok_or_else(|| SolarisError::Gpu("uniform layout missing".to_string()))?;
        let texture_layout = pipeline_manager
            .get_bind_group_layout(TEXTURE_LAYOUT)
            .cloned()
            .ok_or_else(|| SolarisError::Gpu("texture layout missing".to_string()))?;

        log::info!(
            "surface {}x{} {:?}, {:?}, {}x MSAA",
            width,
            height,
            format,
            present_mode,
            sample_count
        );

        Ok(RenderEngine {
            window,
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            format,
            sample_count,
            msaa_texture,
            depth_texture,
            max_texture_size,
            pipeline_manager,
            uniform_layout,
            texture_layout,
            white_texture,
            next_id: 1,
            textures: HashMap::new(),
            render_targets: HashMap::new(),
            fonts: HashMap::new(),
            models: HashMap::new(),
            shaders: HashMap::new(),
            recorder: FrameRecorder::new(width, height),
            active_shader: None,
            audio: AudioSystem::new(),
            ui,
            performance: PerformanceMonitor::new(),
            fps_position: None,
            last_frame: Instant::now(),
            frame_time: Duration::ZERO,
            wheel: 0.0,
            close_requested: false,
        })
    }

    /// Resizes the surface and recreates the screen depth and MSAA buffers
    ///
    /// Zero sizes (minimized windows) are ignored. Render targets keep the
    /// size they were created with.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture = TextureResource::create_depth_texture(
            &self.device,
            width,
            height,
            self.sample_count,
            "depth_texture",
        );
        if self.sample_count > 1 {
            self.msaa_texture = Some(TextureResource::create_msaa_texture(
                &self.device,
                self.format,
                width,
                height,
                self.sample_count,
            ));
        }
        self.recorder.resize(width, height);
        self.ui.update_display_size(width, height);
    }

    /// Adds wheel movement, in lines, to the current frame's total
    pub fn handle_mouse_wheel(&mut self, lines: f32) {
        self.wheel += lines;
    }

    /// True once rendering hit an unrecoverable surface error
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn texture_bind_group(&self, resource: &TextureResource, label: &str) -> wgpu::BindGroup {
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&resource.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&resource.sampler),
                },
            ],
        })
    }

    fn uniform_bind_group(&self, contents: &[u8], label: &str) -> wgpu::BindGroup {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::UNIFORM,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        })
    }

    fn insert_texture(&mut self, id: u32, resource: TextureResource, label: &str) {
        let bind_group = self.texture_bind_group(&resource, label);
        self.textures.insert(
            id,
            GpuTexture {
                resource,
                bind_group,
            },
        );
    }

    fn remove_texture(&mut self, id: u32) {
        self.recorder.forget_texture(id);
        if self.textures.remove(&id).is_none() {
            log::warn!("texture {} was not loaded", id);
        }
    }

    fn upload_mesh(&self, mesh: &MeshData, label: &str) -> GpuMesh {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Index Buffer", label)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        let material_bind_group = match &mesh.material.texture {
            Some(image) => {
                let texture = TextureResource::create_from_rgba_data(
                    &self.device,
                    &self.queue,
                    &image.rgba,
                    image.width,
                    image.height,
                    label,
                );
                self.texture_bind_group(&texture, label)
            }
            None => self.texture_bind_group(&self.white_texture, label),
        };

        GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
            base_color: mesh.material.base_color,
            material_bind_group,
        }
    }

    fn shader_snapshot(&self) -> Option<ShaderSnapshot> {
        let id = self.active_shader?;
        self.shaders.get(&id).map(|shader| ShaderSnapshot {
            shader: id,
            uniforms: shader.uniforms.as_bytes().to_vec(),
        })
    }

    fn push_sprites(&mut self, texture: u32, vertices: Vec<SpriteVertex>) {
        if vertices.is_empty() {
            return;
        }
        let shader = self.shader_snapshot();
        self.recorder.push(DrawCommand::Sprites {
            texture,
            vertices,
            shader,
        });
    }

    fn target_format(&self, target: PassTarget) -> (TextureFormat, u32) {
        match target {
            PassTarget::Screen => (self.format, self.sample_count),
            PassTarget::Texture(_) => (TextureResource::COLOR_FORMAT, 1),
        }
    }

    /// Creates the buffers and bind groups of one recorded pass
    fn prepare_pass(&mut self, pass: &RecordedPass) -> Vec<PreparedDraw> {
        let (format, samples) = self.target_format(pass.target);
        let mut draws = Vec::with_capacity(pass.commands.len());

        for command in &pass.commands {
            match command {
                DrawCommand::Mesh {
                    model,
                    view_proj,
                    transform,
                    tint,
                } => {
                    let key = PipelineKey {
                        kind: PipelineKind::Mesh,
                        format,
                        samples,
                    };
                    if !self.pipeline_manager.ensure(key) {
                        continue;
                    }
                    let Some(meshes) = self.models.get(model) else {
                        continue;
                    };
                    for mesh in meshes {
                        let color = [
                            mesh.base_color[0] * tint[0],
                            mesh.base_color[1] * tint[1],
                            mesh.base_color[2] * tint[2],
                            mesh.base_color[3] * tint[3],
                        ];
                        let uniform = MeshUniform {
                            view_proj: convert_matrix4_to_array(*view_proj),
                            model: convert_matrix4_to_array(*transform),
                            color,
                        };
                        draws.push(PreparedDraw {
                            pipeline: key,
                            bind_groups: vec![
                                self.uniform_bind_group(bytemuck::bytes_of(&uniform), "Mesh Uniform"),
                                mesh.material_bind_group.clone(),
                            ],
                            vertices: mesh.vertex_buffer.clone(),
                            indices: Some(mesh.index_buffer.clone()),
                            count: mesh.index_count,
                        });
                    }
                }
                DrawCommand::Lines {
                    vertices,
                    view_proj,
                } => {
                    let key = PipelineKey {
                        kind: PipelineKind::Lines,
                        format,
                        samples,
                    };
                    if vertices.is_empty() || !self.pipeline_manager.ensure(key) {
                        continue;
                    }
                    let uniform = CameraUniform::new(*view_proj);
                    let buffer = self
                        .device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Line Vertex Buffer"),
                            contents: bytemuck::cast_slice(vertices),
                            usage: wgpu::BufferUsages::VERTEX,
                        });
                    draws.push(PreparedDraw {
                        pipeline: key,
                        bind_groups: vec![
                            self.uniform_bind_group(bytemuck::bytes_of(&uniform), "Line Uniform"),
                        ],
                        vertices: buffer,
                        indices: None,
                        count: vertices.len() as u32,
                    });
                }
                DrawCommand::Sprites {
                    texture,
                    vertices,
                    shader,
                } => {
                    let kind = match shader {
                        Some(snapshot) => PipelineKind::Post(snapshot.shader),
                        None => PipelineKind::Sprite,
                    };
                    let key = PipelineKey {
                        kind,
                        format,
                        samples,
                    };
                    if !self.pipeline_manager.ensure(key) {
                        continue;
                    }
                    let Some(gpu_texture) = self.textures.get(texture) else {
                        continue;
                    };

                    let mut bind_groups = vec![gpu_texture.bind_group.clone()];
                    if let Some(snapshot) = shader {
                        bind_groups.push(self.uniform_bind_group(&snapshot.uniforms, "Post Uniform"));
                    }
                    let buffer = self
                        .device
                        .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("Sprite Vertex Buffer"),
                            contents: bytemuck::cast_slice(vertices),
                            usage: wgpu::BufferUsages::VERTEX,
                        });
                    draws.push(PreparedDraw {
                        pipeline: key,
                        bind_groups,
                        vertices: buffer,
                        indices: None,
                        count: vertices.len() as u32,
                    });
                }
            }
        }

        draws
    }

    /// Color view, resolve target and depth view of a pass
    fn attachments<'a>(
        &'a self,
        target: PassTarget,
        surface_view: &'a wgpu::TextureView,
    ) -> Option<(&'a wgpu::TextureView, Option<&'a wgpu::TextureView>, &'a wgpu::TextureView)> {
        match target {
            PassTarget::Screen => match &self.msaa_texture {
                Some(msaa) => Some((&msaa.view, Some(surface_view), &self.depth_texture.view)),
                None => Some((surface_view, None, &self.depth_texture.view)),
            },
            PassTarget::Texture(id) => {
                let color = self.textures.get(&id)?;
                let depth = self.render_targets.get(&id)?;
                Some((&color.resource.view, None, &depth.view))
            }
        }
    }

    /// Encodes the recorded frame, draws the overlay and presents
    fn flush(&mut self) {
        let passes = self.recorder.finish();

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("surface out of memory, closing");
                self.close_requested = true;
                return;
            }
            Err(err) => {
                log::warn!("skipping frame: {}", err);
                return;
            }
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let prepared: Vec<Vec<PreparedDraw>> =
            passes.iter().map(|pass| self.prepare_pass(pass)).collect();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        for (pass, draws) in passes.iter().zip(&prepared) {
            let Some((view, resolve_target, depth_view)) =
                self.attachments(pass.target, &surface_view)
            else {
                log::warn!("skipping pass into unloaded target {:?}", pass.target);
                continue;
            };

            let (color_load, depth_load) = match pass.clear {
                Some(color) => (wgpu::LoadOp::Clear(color.to_wgpu()), wgpu::LoadOp::Clear(1.0)),
                None => (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(match pass.target {
                    PassTarget::Screen => "Screen Pass",
                    PassTarget::Texture(_) => "Render Target Pass",
                }),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in draws {
                let Some(pipeline) = self.pipeline_manager.get_pipeline(&draw.pipeline) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                for (index, bind_group) in draw.bind_groups.iter().enumerate() {
                    render_pass.set_bind_group(index as u32, bind_group, &[]);
                }
                render_pass.set_vertex_buffer(0, draw.vertices.slice(..));
                match &draw.indices {
                    Some(indices) => {
                        render_pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..draw.count, 0, 0..1);
                    }
                    None => render_pass.draw(0..draw.count, 0..1),
                }
            }
        }

        if let Some(position) = self.fps_position {
            let performance = &self.performance;
            self.ui.draw(
                &self.device,
                &self.queue,
                &mut encoder,
                &self.window,
                &surface_view,
                |ui| performance.render_overlay(ui, position),
            );
        }

        self.queue.submit(Some(encoder.finish()));
        self.window.pre_present_notify();
        surface_texture.present();
    }

    fn live_resources(&self) -> Vec<(&'static str, usize)> {
        let owned_textures = self.fonts.len() + self.render_targets.len();
        vec![
            ("textures", self.textures.len().saturating_sub(owned_textures)),
            ("fonts", self.fonts.len()),
            ("render targets", self.render_targets.len()),
            ("models", self.models.len()),
            ("shaders", self.shaders.len()),
            ("music streams", self.audio.loaded_ids().len()),
        ]
    }
}

impl Backend for RenderEngine {
    fn screen_width(&self) -> u32 {
        self.config.width
    }

    fn screen_height(&self) -> u32 {
        self.config.height
    }

    fn frame_time(&self) -> f32 {
        self.frame_time.as_secs_f32()
    }

    fn fps(&self) -> u32 {
        self.performance.fps()
    }

    fn mouse_wheel_move(&self) -> f32 {
        self.wheel
    }

    fn load_texture(&mut self, path: &Path) -> Result<Texture> {
        let image = image::open(path)
            .map_err(|err| match err {
                image::ImageError::IoError(source) => SolarisError::io(path, source),
                other => SolarisError::Image(other),
            })?
            .to_rgba8();
        let (width, height) = image.dimensions();

        let id = self.allocate_id();
        let label = path.display().to_string();
        let resource = TextureResource::create_from_rgba_data(
            &self.device,
            &self.queue,
            &image,
            width,
            height,
            &label,
        );
        self.insert_texture(id, resource, &label);
        log::debug!("texture {} loaded from {} ({}x{})", id, label, width, height);

        Ok(Texture { id, width, height })
    }

    fn unload_texture(&mut self, texture: Texture) {
        self.remove_texture(texture.id);
    }

    fn load_font(&mut self, path: &Path, size: u32) -> Result<Font> {
        let atlas = FontAtlas::load(path, size)?;

        let texture = self.allocate_id();
        let label = format!("{} atlas", path.display());
        let resource = TextureResource::create_from_rgba_data(
            &self.device,
            &self.queue,
            &atlas.rgba,
            atlas.width,
            atlas.height,
            &label,
        );
        self.insert_texture(texture, resource, &label);

        let id = self.allocate_id();
        log::debug!(
            "font {} loaded from {} at {} px ({}x{} atlas)",
            id,
            path.display(),
            size,
            atlas.width,
            atlas.height
        );
        self.fonts.insert(id, LoadedFont { atlas, texture });

        Ok(Font {
            id,
            base_size: size,
        })
    }

    fn unload_font(&mut self, font: Font) {
        match self.fonts.remove(&font.id) {
            Some(loaded) => self.remove_texture(loaded.texture),
            None => log::warn!("font {} was not loaded", font.id),
        }
    }

    fn load_music(&mut self, path: &Path) -> Result<Music> {
        let id = self.allocate_id();
        self.audio.load(id, path)?;
        Ok(Music { id })
    }

    fn unload_music(&mut self, music: Music) {
        self.audio.unload(music.id);
    }

    fn play_music(&mut self, music: &Music) {
        self.audio.play(music.id);
    }

    fn set_music_volume(&mut self, music: &Music, volume: f32) {
        self.audio.set_volume(music.id, volume);
    }

    fn update_music(&mut self, music: &Music) {
        self.audio.update(music.id);
    }

    fn load_model(&mut self, path: &Path) -> Result<Model> {
        let data = ModelData::load(path)?;

        let id = self.allocate_id();
        let meshes: Vec<GpuMesh> = data
            .meshes
            .iter()
            .enumerate()
            .map(|(index, mesh)| self.upload_mesh(mesh, &format!("Model {} Mesh {}", id, index)))
            .collect();
        let mesh_count = meshes.len();
        self.models.insert(id, meshes);
        log::debug!("model {} uploaded: {} meshes", id, mesh_count);

        Ok(Model { id, mesh_count })
    }

    fn unload_model(&mut self, model: Model) {
        if self.models.remove(&model.id).is_none() {
            log::warn!("model {} was not loaded", model.id);
        }
    }

    fn load_shader(&mut self, fragment_source: &str) -> Result<Shader> {
        let source = PostShaderSource::compile(fragment_source)?;
        let id = self.allocate_id();

        // Pipelines for both target kinds are built here so driver-side
        // failures surface as a load error rather than a missing draw.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.pipeline_manager.load_post_shader(id, &source.wgsl);
        let screen = self.target_format(PassTarget::Screen);
        for (format, samples) in [screen, (TextureResource::COLOR_FORMAT, 1)] {
            self.pipeline_manager.ensure(PipelineKey {
                kind: PipelineKind::Post(id),
                format,
                samples,
            });
        }
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            self.pipeline_manager.remove_post_shader(id);
            return Err(SolarisError::ShaderCompile(err.to_string()));
        }

        log::debug!("shader {} loaded", id);
        self.shaders.insert(
            id,
            LoadedShader {
                uniforms: UniformBlock::new(&source.layout),
                layout: source.layout,
            },
        );
        Ok(Shader { id })
    }

    fn unload_shader(&mut self, shader: Shader) {
        if self.active_shader == Some(shader.id) {
            self.active_shader = None;
        }
        self.pipeline_manager.remove_post_shader(shader.id);
        if self.shaders.remove(&shader.id).is_none() {
            log::warn!("shader {} was not loaded", shader.id);
        }
    }

    fn shader_location(&self, shader: &Shader, name: &str) -> i32 {
        let location = self
            .shaders
            .get(&shader.id)
            .map_or(-1, |loaded| loaded.layout.location(name));
        if location < 0 {
            log::warn!("shader {} has no uniform '{}'", shader.id, name);
        }
        location
    }

    fn set_shader_value_i32(&mut self, shader: &Shader, location: i32, value: i32) {
        let Some(loaded) = self.shaders.get_mut(&shader.id) else {
            log::warn!("shader {} was not loaded", shader.id);
            return;
        };
        if !loaded.uniforms.set_i32(location, value) {
            log::debug!("ignoring uniform write to location {}", location);
        }
    }

    fn load_render_target(&mut self, width: u32, height: u32) -> Result<RenderTarget> {
        if width == 0 || height == 0 || width > self.max_texture_size || height > self.max_texture_size
        {
            return Err(SolarisError::RenderTarget { width, height });
        }

        let id = self.allocate_id();
        let label = format!("Render Target {}", id);
        let color = TextureResource::create_render_target(&self.device, width, height, &label);
        let depth = TextureResource::create_depth_texture(
            &self.device,
            width,
            height,
            1,
            &format!("{} Depth", label),
        );
        self.insert_texture(id, color, &label);
        self.render_targets.insert(id, depth);
        log::debug!("render target {} created ({}x{})", id, width, height);

        Ok(RenderTarget {
            id,
            texture: Texture { id, width, height },
        })
    }

    fn unload_render_target(&mut self, target: RenderTarget) {
        self.render_targets.remove(&target.id);
        self.remove_texture(target.texture.id);
    }

    fn begin_drawing(&mut self) {
        self.recorder.begin_screen();
    }

    fn end_drawing(&mut self) {
        self.active_shader = None;
        self.flush();

        let now = Instant::now();
        self.frame_time = now - self.last_frame;
        self.last_frame = now;
        self.performance.record_frame(self.frame_time);
        self.fps_position = None;
        self.wheel = 0.0;
    }

    fn begin_texture_mode(&mut self, target: &RenderTarget) {
        self.recorder
            .begin_texture(target.id, target.texture.width, target.texture.height);
    }

    fn end_texture_mode(&mut self) {
        self.recorder.end_texture();
    }

    fn clear_background(&mut self, color: Color) {
        self.recorder.clear(color);
    }

    fn begin_mode_3d(&mut self, camera: &Camera3D) {
        self.recorder.set_camera(Some(*camera));
    }

    fn end_mode_3d(&mut self) {
        self.recorder.set_camera(None);
    }

    fn begin_shader_mode(&mut self, shader: &Shader) {
        if self.shaders.contains_key(&shader.id) {
            self.active_shader = Some(shader.id);
        } else {
            log::warn!("shader {} was not loaded", shader.id);
        }
    }

    fn end_shader_mode(&mut self) {
        self.active_shader = None;
    }

    fn draw_model(&mut self, model: &Model, position: Vector3<f32>, scale: f32, tint: Color) {
        let Some(view_proj) = self.recorder.view_proj() else {
            log::warn!("draw_model called outside 3D mode");
            return;
        };
        let transform = Matrix4::from_translation(position) * Matrix4::from_scale(scale);
        self.recorder.push(DrawCommand::Mesh {
            model: model.id,
            view_proj,
            transform,
            tint: tint.to_array(),
        });
    }

    fn draw_grid(&mut self, slices: u32, spacing: f32) {
        let Some(view_proj) = self.recorder.view_proj() else {
            log::warn!("draw_grid called outside 3D mode");
            return;
        };
        self.recorder.push(DrawCommand::Lines {
            vertices: grid_lines(slices, spacing),
            view_proj,
        });
    }

    fn draw_texture_ex(
        &mut self,
        texture: &Texture,
        position: [f32; 2],
        rotation: f32,
        scale: f32,
        tint: Color,
    ) {
        let width = texture.width as f32;
        let height = texture.height as f32;
        let quad = textured_quad(
            [texture.width, texture.height],
            Rectangle::new(0.0, 0.0, width, height),
            Rectangle::new(position[0], position[1], width * scale, height * scale),
            rotation,
            tint,
            self.recorder.viewport(),
        );
        self.push_sprites(texture.id, quad.to_vec());
    }

    fn draw_texture_rec(
        &mut self,
        texture: &Texture,
        source: Rectangle,
        position: [f32; 2],
        tint: Color,
    ) {
        let dest = Rectangle::new(
            position[0],
            position[1],
            source.width.abs(),
            source.height.abs(),
        );
        let quad = textured_quad(
            [texture.width, texture.height],
            source,
            dest,
            0.0,
            tint,
            self.recorder.viewport(),
        );
        self.push_sprites(texture.id, quad.to_vec());
    }

    fn measure_text(&self, font: &Font, text: &str, size: f32, spacing: f32) -> [f32; 2] {
        self.fonts
            .get(&font.id)
            .map_or([0.0, 0.0], |loaded| loaded.atlas.measure(text, size, spacing))
    }

    fn draw_text_ex(
        &mut self,
        font: &Font,
        text: &str,
        position: [f32; 2],
        size: f32,
        spacing: f32,
        tint: Color,
    ) {
        let Some(loaded) = self.fonts.get(&font.id) else {
            log::warn!("font {} was not loaded", font.id);
            return;
        };
        let viewport = self.recorder.viewport();
        let atlas_size = [loaded.atlas.width, loaded.atlas.height];
        let texture = loaded.texture;
        let vertices: Vec<SpriteVertex> = loaded
            .atlas
            .layout(text, position, size, spacing)
            .into_iter()
            .flat_map(|(source, dest)| textured_quad(atlas_size, source, dest, 0.0, tint, viewport))
            .collect();
        self.push_sprites(texture, vertices);
    }

    fn draw_fps(&mut self, x: i32, y: i32) {
        self.fps_position = Some([x as f32, y as f32]);
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        log::debug!("pipeline cache at shutdown: {:?}", self.pipeline_manager.get_stats());
        let leaked: Vec<String> = self
            .live_resources()
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        if !leaked.is_empty() {
            log::warn!("render engine dropped with live resources: {}", leaked.join(", "));
        }
    }
}
