//! Render pipeline management system for wgpu
//!
//! Pipelines are keyed by what they draw, the color format and the sample
//! count of the pass they are used in. They are created lazily the first time
//! a pass needs them and cached for the rest of the run.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::gfx::scene::vertex::Vertex3D;

use super::{grid::LineVertex, sprite::SpriteVertex, texture_resource::TextureResource};

/// Shared layout names
pub const UNIFORM_LAYOUT: &str = "uniform";
pub const TEXTURE_LAYOUT: &str = "texture";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Mesh,
    Lines,
    Sprite,
    /// User post shader by shader id
    Post(u32),
}

impl PipelineKind {
    fn shader_name(&self) -> String {
        match self {
            PipelineKind::Mesh => "mesh".to_string(),
            PipelineKind::Lines => "lines".to_string(),
            PipelineKind::Sprite => "sprite".to_string(),
            PipelineKind::Post(id) => format!("post:{}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub kind: PipelineKind,
    pub format: TextureFormat,
    pub samples: u32,
}

/// Configuration for creating a render pipeline
///
/// Defines all parameters needed to create a wgpu render pipeline,
/// including shaders, bind group layouts, and render state.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub shader: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub vertex_layout: VertexBufferLayout<'static>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub format: TextureFormat,
    pub samples: u32,
}

impl PipelineConfig {
    pub fn new(shader: &str, vertex_layout: VertexBufferLayout<'static>) -> Self {
        Self {
            label: shader.to_string(),
            shader: shader.to_string(),
            bind_group_layouts: Vec::new(),
            vertex_layout,
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: None,
            depth_write: true,
            depth_compare: CompareFunction::Less,
            format: TextureFormat::Bgra8Unorm,
            samples: 1,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    /// Sets all bind group layouts at once (builder pattern)
    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    /// Sets primitive topology for this pipeline (builder pattern)
    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }

    /// Draws on top regardless of depth and leaves the depth buffer untouched
    pub fn with_overlay_depth(mut self) -> Self {
        self.depth_write = false;
        self.depth_compare = CompareFunction::Always;
        self
    }

    pub fn with_target(mut self, format: TextureFormat, samples: u32) -> Self {
        self.format = format;
        self.samples = samples;
        self
    }
}

/// Manages render pipelines with caching and lazy creation
pub struct PipelineManager {
    device: Arc<Device>,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
    shader_modules: HashMap<String, ShaderModule>,
    common_layouts: HashMap<String, BindGroupLayout>,
}

impl PipelineManager {
    /// Creates a new pipeline manager with the built-in shaders and layouts
    pub fn new(device: Arc<Device>) -> Self {
        let mut manager = Self {
            device,
            pipelines: HashMap::new(),
            shader_modules: HashMap::new(),
            common_layouts: HashMap::new(),
        };

        let uniform_layout = manager
            .device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Uniform Layout"),
                entries: &[BindGroupLayoutEntry {
                    binding: 0,
                    visibility: ShaderStages::VERTEX | ShaderStages::FRAGMENT,
                    ty: BindingType::Buffer {
                        ty: BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let texture_layout = manager
            .device
            .create_bind_group_layout(&BindGroupLayoutDescriptor {
                label: Some("Texture Layout"),
                entries: &[
                    BindGroupLayoutEntry {
                        binding: 0,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Texture {
                            multisampled: false,
                            view_dimension: TextureViewDimension::D2,
                            sample_type: TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    BindGroupLayoutEntry {
                        binding: 1,
                        visibility: ShaderStages::FRAGMENT,
                        ty: BindingType::Sampler(SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });
        manager.register_bind_group_layout(UNIFORM_LAYOUT, uniform_layout);
        manager.register_bind_group_layout(TEXTURE_LAYOUT, texture_layout);

        manager.load_shader("mesh", include_str!("mesh.wgsl"));
        manager.load_shader("lines", include_str!("lines.wgsl"));
        manager.load_shader(
            "sprite",
            &format!("{}\n{}", super::shader::POST_PRELUDE, super::shader::SPRITE_FRAG),
        );

        manager
    }

    /// Registers a shared bind group layout
    pub fn register_bind_group_layout(&mut self, name: &str, layout: BindGroupLayout) {
        self.common_layouts.insert(name.to_string(), layout);
    }

    /// Gets a registered bind group layout by name
    pub fn get_bind_group_layout(&self, name: &str) -> Option<&BindGroupLayout> {
        self.common_layouts.get(name)
    }

    /// Compiles a shader module and stores it under `name`
    pub fn load_shader(&mut self, name: &str, source: &str) {
        let shader_module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.into()),
        });
        self.shader_modules.insert(name.to_string(), shader_module);
    }

    /// Registers a validated post shader's module
    pub fn load_post_shader(&mut self, id: u32, source: &str) {
        self.load_shader(&PipelineKind::Post(id).shader_name(), source);
    }

    /// Forgets a post shader and every pipeline built from it
    pub fn remove_post_shader(&mut self, id: u32) {
        self.shader_modules
            .remove(&PipelineKind::Post(id).shader_name());
        self.pipelines
            .retain(|key, _| key.kind != PipelineKind::Post(id));
    }

    /// Creates the pipeline for `key` if it does not exist yet
    ///
    /// Returns false when the key's shader is not loaded.
    pub fn ensure(&mut self, key: PipelineKey) -> bool {
        if self.pipelines.contains_key(&key) {
            return true;
        }

        let Some(config) = self.config_for(key) else {
            return false;
        };
        match self.create_pipeline_from_config(&config) {
            Ok(pipeline) => {
                self.pipelines.insert(key, pipeline);
                true
            }
            Err(e) => {
                log::error!("failed to create pipeline '{}': {}", config.label, e);
                false
            }
        }
    }

    pub fn get_pipeline(&self, key: &PipelineKey) -> Option<&RenderPipeline> {
        self.pipelines.get(key)
    }

    fn layout(&self, name: &str) -> Option<BindGroupLayout> {
        self.common_layouts.get(name).cloned()
    }

    fn config_for(&self, key: PipelineKey) -> Option<PipelineConfig> {
        let uniform = self.layout(UNIFORM_LAYOUT)?;
        let texture = self.layout(TEXTURE_LAYOUT)?;
        let shader = key.kind.shader_name();

        let config = match key.kind {
            PipelineKind::Mesh => PipelineConfig::new(&shader, Vertex3D::desc())
                .with_bind_group_layouts(vec![uniform, texture]),
            PipelineKind::Lines => PipelineConfig::new(&shader, LineVertex::desc())
                .with_bind_group_layouts(vec![uniform])
                .with_primitive_topology(PrimitiveTopology::LineList),
            PipelineKind::Sprite => PipelineConfig::new(&shader, SpriteVertex::desc())
                .with_bind_group_layouts(vec![texture])
                .with_overlay_depth(),
            PipelineKind::Post(_) => PipelineConfig::new(&shader, SpriteVertex::desc())
                .with_bind_group_layouts(vec![texture, uniform])
                .with_overlay_depth(),
        };

        Some(
            config
                .with_label(&format!("{} ({:?}, {}x)", shader, key.format, key.samples))
                .with_target(key.format, key.samples),
        )
    }

    /// Creates a render pipeline from configuration
    fn create_pipeline_from_config(&self, config: &PipelineConfig) -> Result<RenderPipeline, String> {
        let shader = self
            .shader_modules
            .get(&config.shader)
            .ok_or_else(|| format!("Shader '{}' not found", config.shader))?;

        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let color_targets = [Some(ColorTargetState {
            format: config.format,
            blend: Some(BlendState::ALPHA_BLENDING),
            write_mask: ColorWrites::ALL,
        })];

        let pipeline = self
            .device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: shader,
                    entry_point: Some("vs_main"),
                    buffers: std::slice::from_ref(&config.vertex_layout),
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: shader,
                    entry_point: Some("fs_main"),
                    targets: &color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(DepthStencilState {
                    format: TextureResource::DEPTH_FORMAT,
                    depth_write_enabled: config.depth_write,
                    depth_compare: config.depth_compare,
                    stencil: StencilState::default(),
                    bias: DepthBiasState::default(),
                }),
                multisample: MultisampleState {
                    count: config.samples,
                    ..Default::default()
                },
                multiview: None,
                cache: None,
            });

        Ok(pipeline)
    }

    /// Returns pipeline manager statistics
    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            total_pipelines: self.pipelines.len(),
            loaded_shaders: self.shader_modules.len(),
            common_layouts: self.common_layouts.len(),
        }
    }
}

/// Statistics about pipeline manager state
#[derive(Debug)]
pub struct PipelineStats {
    pub total_pipelines: usize,
    pub loaded_shaders: usize,
    pub common_layouts: usize,
}
