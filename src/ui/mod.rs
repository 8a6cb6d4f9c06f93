//! # User Interface
//!
//! Dear ImGui overlay drawn on top of every presented frame. The demo only
//! uses it for the FPS counter requested through `Backend::draw_fps`.

pub mod manager;

pub use manager::UiManager;
