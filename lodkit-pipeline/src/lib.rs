//! LOD generation pipeline for lodkit
//!
//! Orchestrates the per-ratio flow: clone the source scene, simplify
//! every mesh, optionally retarget textures, persist into the LOD output
//! directory, and — as a separate step over the saved model — pack
//! per-type texture atlases. The source scene is never mutated.

pub mod config;
pub mod lod;

pub use config::*;
pub use lod::*;
