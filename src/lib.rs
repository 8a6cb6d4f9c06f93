// src/lib.rs
//! Solaris
//!
//! A small real-time 3D demo built on wgpu and winit: a main-menu splash with
//! music, and a model viewer that blurs its frame with a two-pass shader.

pub mod app;
pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod performance;
pub mod scene;
pub mod ui;

// Re-export main types for convenience
pub use app::SolarisApp;
pub use error::{Result, SolarisError};
