//! Mesh simplification for lodkit
//!
//! Reduces triangle meshes toward a target ratio with an attribute-aware
//! quadric edge collapser, then reorders the result for vertex-cache and
//! overdraw efficiency and compacts every per-vertex attribute — including
//! skinning weights — in a single atomic remap pass.

pub mod simplifier;

pub use simplifier::*;
