//! Error types for lodkit

use thiserror::Error;

/// Main error type for lodkit operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Export failed: {0}")]
    ExportFailed(String),

    #[error("Scene copy failed: {0}")]
    SceneCopyFailed(String),

    #[error("Texture decode failed: {0}")]
    TextureDecodeFailed(String),

    #[error("Texture resize failed: {0}")]
    TextureResizeFailed(String),

    #[error("Texture encode failed: {0}")]
    TextureEncodeFailed(String),

    #[error("Texture load failed: {0}")]
    TextureLoadFailed(String),

    #[error("Atlas build failed: {0}")]
    AtlasBuildFailed(String),
}

/// Result type alias for lodkit operations
pub type Result<T> = std::result::Result<T, Error>;
