//! # Model Data
//!
//! CPU-side model decoding and the vertex layout shared with the mesh
//! pipeline.
//!
//! - [`ModelData`] - meshes with baked transforms and unlit materials
//! - [`Vertex3D`] - position, normal and texture coordinates

pub mod model;
pub mod vertex;

pub use model::ModelData;
pub use vertex::Vertex3D;
