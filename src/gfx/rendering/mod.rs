// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! The wgpu backend, its pipelines and shaders, and the pure helpers it is
//! built from: frame recording, sprite and grid geometry, font atlases and
//! post shader reflection.

pub mod font_atlas;
pub mod frame;
pub mod grid;
pub mod pipeline_manager;
pub mod render_engine;
pub mod shader;
pub mod sprite;
pub mod texture_resource;

// Re-export main types
pub use pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats};
pub use render_engine::RenderEngine;
