//! # lodkit
//!
//! LOD generation for 3D models.
//!
//! This is the umbrella crate that provides convenient access to the
//! whole pipeline. You can use this crate to get everything in one
//! place, or depend on individual crates for more granular control.
//!
//! ## Pipeline
//!
//! - **Core**: the in-memory scene model (meshes, materials, embedded
//!   textures) and the shared error type
//! - **I/O**: scene import/export with unused-material stripping
//! - **Simplification**: attribute-aware quadric edge collapse with
//!   cache/overdraw reordering and atomic attribute compaction
//! - **Texture**: per-LOD texture retargeting and per-type atlas packing
//! - **Pipeline**: the per-ratio orchestrator tying it all together
//!
//! ## Quick Start
//!
//! ```no_run
//! use lodkit::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> lodkit::Result<()> {
//! let scene = load_scene(Path::new("model.obj"))?;
//! let lods = generate_lods(
//!     &scene,
//!     Path::new("model.obj"),
//!     Path::new("output"),
//!     &[0.5, 0.25],
//!     None,
//! )?;
//! for lod in &lods {
//!     println!("{}: saved {}", lod.ratio, lod.output_path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: enables `io`, `simplification`, `texture`, and `pipeline`
//! - `io`: scene import/export
//! - `simplification`: mesh simplification
//! - `texture`: texture retargeting and atlas packing
//! - `pipeline`: the LOD orchestrator (pulls in everything above)

// Re-export core functionality
pub use lodkit_core::*;

// Re-export sub-crates
#[cfg(feature = "io")]
pub use lodkit_io as io;

#[cfg(feature = "simplification")]
pub use lodkit_simplification as simplification;

#[cfg(feature = "texture")]
pub use lodkit_texture as texture;

#[cfg(feature = "pipeline")]
pub use lodkit_pipeline as pipeline;

/// Convenient imports for common use cases
pub mod prelude {
    pub use lodkit_core::*;

    #[cfg(feature = "io")]
    pub use lodkit_io::{load_scene, save_scene, supported_formats};

    #[cfg(feature = "simplification")]
    pub use lodkit_simplification::{simplify, SimplifyResult};

    #[cfg(feature = "texture")]
    pub use lodkit_texture::{
        build_atlas, process_textures, AtlasInfo, AtlasOptions, TextureOptions, TextureStats,
    };

    #[cfg(feature = "pipeline")]
    pub use lodkit_pipeline::{
        build_lod_atlas, generate_lod, generate_lods, LodConfig, LodInfo,
    };
}
