//! RGBA8 pixel buffer primitives
//!
//! Thin wrappers over the `image` crate that keep the rest of the
//! pipeline working on one representation: a tightly packed RGBA8 buffer
//! plus a format hint naming the container the pixels came from.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use lodkit_core::{EmbeddedTexture, Error, Result, TextureData};
use std::path::Path;

/// JPEG re-encode quality
const JPEG_QUALITY: u8 = 85;

/// A decoded texture: tightly packed RGBA8 pixels
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major RGBA
    pub pixels: Vec<u8>,
    /// Container format the pixels were decoded from ("png", "jpg", ...)
    pub format_hint: String,
}

impl PixelBuffer {
    fn into_rgba_image(self) -> Result<RgbaImage> {
        let (width, height) = (self.width, self.height);
        RgbaImage::from_raw(width, height, self.pixels).ok_or_else(|| {
            Error::TextureEncodeFailed(format!(
                "pixel buffer does not match {width}x{height} RGBA dimensions"
            ))
        })
    }
}

/// Decode an embedded texture to RGBA8.
///
/// Compressed blobs go through the image codecs; uncompressed ARGB8888
/// rectangles are transcoded to RGBA channel order.
pub fn decode_embedded(texture: &EmbeddedTexture) -> Result<PixelBuffer> {
    match &texture.data {
        TextureData::Compressed(bytes) => {
            let decoded = image::load_from_memory(bytes)
                .map_err(|e| Error::TextureDecodeFailed(e.to_string()))?;
            let rgba = decoded.to_rgba8();
            Ok(PixelBuffer {
                width: rgba.width(),
                height: rgba.height(),
                pixels: rgba.into_raw(),
                format_hint: texture.format_hint.clone(),
            })
        }
        TextureData::Argb8888 {
            width,
            height,
            texels,
        } => {
            let mut pixels = Vec::with_capacity(texels.len() * 4);
            for texel in texels {
                pixels.extend_from_slice(&[texel.r, texel.g, texel.b, texel.a]);
            }
            Ok(PixelBuffer {
                width: *width,
                height: *height,
                pixels,
                format_hint: texture.format_hint.clone(),
            })
        }
    }
}

/// Load and decode an external texture file; the extension becomes the
/// format hint.
pub fn load_texture(path: &Path) -> Result<PixelBuffer> {
    if !path.exists() {
        return Err(Error::TextureLoadFailed(format!(
            "Texture file not found: {}",
            path.display()
        )));
    }
    let decoded = image::open(path).map_err(|e| {
        Error::TextureLoadFailed(format!("{}: {e}", path.display()))
    })?;
    let rgba = decoded.to_rgba8();
    let format_hint = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    Ok(PixelBuffer {
        width: rgba.width(),
        height: rgba.height(),
        pixels: rgba.into_raw(),
        format_hint,
    })
}

/// Linear resize to the given dimensions
pub fn resize_texture(source: &PixelBuffer, new_width: u32, new_height: u32) -> Result<PixelBuffer> {
    if new_width == 0 || new_height == 0 {
        return Err(Error::TextureResizeFailed(
            "Invalid resize target dimensions".to_string(),
        ));
    }
    let image = RgbaImage::from_raw(source.width, source.height, source.pixels.clone())
        .ok_or_else(|| {
            Error::TextureResizeFailed(format!(
                "pixel buffer does not match {}x{} RGBA dimensions",
                source.width, source.height
            ))
        })?;
    let resized = image::imageops::resize(&image, new_width, new_height, FilterType::Triangle);
    Ok(PixelBuffer {
        width: new_width,
        height: new_height,
        pixels: resized.into_raw(),
        format_hint: source.format_hint.clone(),
    })
}

/// The container a hint selects: `jpg`/`jpeg` encode as JPEG, everything
/// else (including an empty hint) as PNG.
pub fn effective_hint(hint: &str) -> &'static str {
    if hint.eq_ignore_ascii_case("jpg") || hint.eq_ignore_ascii_case("jpeg") {
        "jpg"
    } else {
        "png"
    }
}

/// Encode a pixel buffer into the container selected by `hint`.
///
/// JPEG carries no alpha channel, so RGBA is flattened to RGB first.
pub fn encode_texture(source: &PixelBuffer, hint: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    if effective_hint(hint) == "jpg" {
        let rgb = DynamicImage::ImageRgba8(source.clone().into_rgba_image()?).to_rgb8();
        JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
            .encode(rgb.as_raw(), source.width, source.height, ExtendedColorType::Rgb8)
            .map_err(|e| Error::TextureEncodeFailed(e.to_string()))?;
    } else {
        PngEncoder::new(&mut out)
            .write_image(
                &source.pixels,
                source.width,
                source.height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| Error::TextureEncodeFailed(e.to_string()))?;
    }
    Ok(out)
}

/// Write encoded texture bytes to disk
pub fn save_texture_bytes(bytes: &[u8], path: &Path) -> Result<()> {
    std::fs::write(path, bytes).map_err(|e| {
        Error::TextureEncodeFailed(format!("Cannot write {}: {e}", path.display()))
    })
}

/// A w×h buffer filled with one RGBA color (test fixture)
#[cfg(test)]
pub(crate) fn solid(width: u32, height: u32, rgba: [u8; 4]) -> PixelBuffer {
    PixelBuffer {
        width,
        height,
        pixels: rgba
            .iter()
            .copied()
            .cycle()
            .take((width * height * 4) as usize)
            .collect(),
        format_hint: "png".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodkit_core::Texel;

    #[test]
    fn argb_transcodes_to_rgba() {
        let texture = EmbeddedTexture {
            data: TextureData::Argb8888 {
                width: 1,
                height: 1,
                texels: vec![Texel {
                    a: 1,
                    r: 2,
                    g: 3,
                    b: 4,
                }],
            },
            format_hint: String::new(),
            filename: None,
        };
        let decoded = decode_embedded(&texture).unwrap();
        assert_eq!(decoded.pixels, vec![2, 3, 4, 1]);
    }

    #[test]
    fn png_roundtrip() {
        let source = solid(4, 2, [10, 20, 30, 255]);
        let encoded = encode_texture(&source, "png").unwrap();
        let decoded =
            decode_embedded(&EmbeddedTexture::from_bytes(encoded, "png")).unwrap();
        assert_eq!(decoded.width, 4);
        assert_eq!(decoded.height, 2);
        assert_eq!(decoded.pixels, source.pixels);
    }

    #[test]
    fn jpeg_encode_drops_alpha_but_keeps_dimensions() {
        let source = solid(8, 8, [200, 100, 50, 255]);
        let encoded = encode_texture(&source, "jpeg").unwrap();
        assert!(!encoded.is_empty());
        let decoded =
            decode_embedded(&EmbeddedTexture::from_bytes(encoded, "jpg")).unwrap();
        assert_eq!(decoded.width, 8);
        assert_eq!(decoded.height, 8);
    }

    #[test]
    fn resize_halves_dimensions() {
        let source = solid(8, 4, [255, 0, 0, 255]);
        let resized = resize_texture(&source, 4, 2).unwrap();
        assert_eq!(resized.width, 4);
        assert_eq!(resized.height, 2);
        assert_eq!(resized.pixels.len(), 4 * 2 * 4);
        // Uniform input stays uniform through a linear filter
        assert_eq!(&resized.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn resize_rejects_zero_dimensions() {
        let source = solid(2, 2, [0, 0, 0, 255]);
        assert!(matches!(
            resize_texture(&source, 0, 2),
            Err(Error::TextureResizeFailed(_))
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        let texture = EmbeddedTexture::from_bytes(vec![0, 1, 2, 3], "png");
        assert!(matches!(
            decode_embedded(&texture),
            Err(Error::TextureDecodeFailed(_))
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let result = load_texture(Path::new("definitely/not/here.png"));
        assert!(matches!(result, Err(Error::TextureLoadFailed(_))));
    }

    #[test]
    fn hint_selection() {
        assert_eq!(effective_hint("jpg"), "jpg");
        assert_eq!(effective_hint("JPEG"), "jpg");
        assert_eq!(effective_hint("png"), "png");
        assert_eq!(effective_hint("bmp"), "png");
        assert_eq!(effective_hint(""), "png");
    }
}
