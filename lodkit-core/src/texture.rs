//! Embedded texture storage

use serde::{Deserialize, Serialize};

/// One ARGB8888 texel of an uncompressed embedded texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texel {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Pixel payload of an embedded texture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TextureData {
    /// Raw file bytes in the container format named by the owning
    /// texture's format hint (png, jpg, ...)
    Compressed(Vec<u8>),
    /// An uncompressed ARGB8888 rectangle
    Argb8888 {
        width: u32,
        height: u32,
        texels: Vec<Texel>,
    },
}

/// A texture stored inside the scene instead of on disk.
///
/// Materials reference embedded textures with `"*N"` paths, where `N`
/// indexes the scene's embedded texture table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedTexture {
    pub data: TextureData,
    /// Container format of `Compressed` data ("png", "jpg", ...);
    /// may be empty when unknown
    pub format_hint: String,
    /// Name exporters use when writing the texture to disk
    pub filename: Option<String>,
}

impl EmbeddedTexture {
    /// A compressed embedded texture from raw file bytes
    pub fn from_bytes(bytes: Vec<u8>, format_hint: impl Into<String>) -> Self {
        Self {
            data: TextureData::Compressed(bytes),
            format_hint: format_hint.into(),
            filename: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_is_compressed() {
        let texture = EmbeddedTexture::from_bytes(vec![1, 2, 3], "png");
        assert_eq!(texture.format_hint, "png");
        assert!(texture.filename.is_none());
        assert!(matches!(texture.data, TextureData::Compressed(ref b) if b == &[1, 2, 3]));
    }
}
