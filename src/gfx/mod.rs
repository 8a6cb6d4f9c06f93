//! # Graphics Module
//!
//! Everything the scenes draw with.
//!
//! - **Backend** ([`backend`]) - the immediate-mode API and resource handles
//! - **Camera** ([`camera`]) - perspective camera and the orbital controller
//! - **Rendering** ([`rendering`]) - the wgpu implementation of the backend
//! - **Models** ([`scene`]) - model decoding and vertex layout
//!
//! Scenes are generic over [`backend::Backend`]; the binary plugs in
//! [`RenderEngine`], the tests a recording mock.

pub mod backend;
pub mod camera;
#[cfg(test)]
pub mod mock;
pub mod rendering;
pub mod scene;

// Re-export commonly used types
pub use backend::{Backend, Color, Rectangle};
pub use camera::Camera3D;
pub use rendering::render_engine::RenderEngine;
