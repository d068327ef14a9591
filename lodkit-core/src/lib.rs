//! Core data structures and error types for lodkit
//!
//! This crate provides the in-memory scene model that the LOD pipeline
//! operates on: meshes with optional per-vertex attribute channels,
//! materials with typed texture slots, embedded textures, and the node
//! hierarchy that ties them together.

pub mod error;
pub mod material;
pub mod mesh;
pub mod scene;
pub mod texture;

pub use error::*;
pub use material::*;
pub use mesh::*;
pub use scene::*;
pub use texture::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix4, Point3, Vector2, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// Common result type for lodkit operations
pub type Result<T> = std::result::Result<T, Error>;
