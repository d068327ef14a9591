//! Materials and typed texture slots

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Texture semantic types, in the canonical processing order.
///
/// Slot iteration, texture deduplication, and atlas packing all walk
/// [`TextureType::ALL`] so that every pass sees the same ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureType {
    Diffuse,
    Specular,
    Ambient,
    Emissive,
    Height,
    Normals,
    Shininess,
    Opacity,
    Displacement,
    Lightmap,
    Reflection,
    BaseColor,
    NormalCamera,
    EmissionColor,
    Metalness,
    DiffuseRoughness,
    AmbientOcclusion,
    Sheen,
    Clearcoat,
    Transmission,
}

impl TextureType {
    /// Every texture type, in canonical order
    pub const ALL: [TextureType; 20] = [
        TextureType::Diffuse,
        TextureType::Specular,
        TextureType::Ambient,
        TextureType::Emissive,
        TextureType::Height,
        TextureType::Normals,
        TextureType::Shininess,
        TextureType::Opacity,
        TextureType::Displacement,
        TextureType::Lightmap,
        TextureType::Reflection,
        TextureType::BaseColor,
        TextureType::NormalCamera,
        TextureType::EmissionColor,
        TextureType::Metalness,
        TextureType::DiffuseRoughness,
        TextureType::AmbientOcclusion,
        TextureType::Sheen,
        TextureType::Clearcoat,
        TextureType::Transmission,
    ];

    /// Filename suffix used for this type's atlas image
    /// (`atlas_<suffix>.png`)
    pub fn atlas_suffix(&self) -> &'static str {
        match self {
            TextureType::Diffuse => "diffuse",
            TextureType::Specular => "specular",
            TextureType::Ambient => "ambient",
            TextureType::Emissive => "emissive",
            TextureType::Height => "height",
            TextureType::Normals => "normal",
            TextureType::Shininess => "shininess",
            TextureType::Opacity => "opacity",
            TextureType::Displacement => "displacement",
            TextureType::Lightmap => "lightmap",
            TextureType::Reflection => "reflection",
            TextureType::BaseColor => "basecolor",
            TextureType::NormalCamera => "normal_camera",
            TextureType::EmissionColor => "emission",
            TextureType::Metalness => "metalness",
            TextureType::DiffuseRoughness => "roughness",
            TextureType::AmbientOcclusion => "ao",
            TextureType::Sheen => "sheen",
            TextureType::Clearcoat => "clearcoat",
            TextureType::Transmission => "transmission",
        }
    }
}

/// Texture coordinate wrapping behavior outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WrapMode {
    #[default]
    Repeat,
    Clamp,
    Mirror,
}

/// One texture reference inside a material.
///
/// `path` is either `"*N"` (embedded texture `N`) or a file path relative
/// to the model directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSlot {
    pub path: String,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

impl TextureSlot {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            wrap_u: WrapMode::default(),
            wrap_v: WrapMode::default(),
        }
    }
}

/// A material: scalar/color attributes plus per-type texture slot lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Material {
    pub name: String,
    pub ambient_color: Option<[f32; 3]>,
    pub diffuse_color: Option<[f32; 3]>,
    pub specular_color: Option<[f32; 3]>,
    pub emissive_color: Option<[f32; 3]>,
    pub shininess: Option<f32>,
    pub opacity: Option<f32>,
    slots: HashMap<TextureType, Vec<TextureSlot>>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Slots of one semantic type, in slot order (empty if none)
    pub fn texture_slots(&self, texture_type: TextureType) -> &[TextureSlot] {
        self.slots.get(&texture_type).map_or(&[], Vec::as_slice)
    }

    /// Mutable slot list of one semantic type, created on demand
    pub fn texture_slots_mut(&mut self, texture_type: TextureType) -> &mut Vec<TextureSlot> {
        self.slots.entry(texture_type).or_default()
    }

    /// Append a slot for the given type and return the material
    /// (builder-style, used heavily by tests and importers)
    pub fn with_texture(mut self, texture_type: TextureType, slot: TextureSlot) -> Self {
        self.texture_slots_mut(texture_type).push(slot);
        self
    }

    pub fn add_texture(&mut self, texture_type: TextureType, slot: TextureSlot) {
        self.texture_slots_mut(texture_type).push(slot);
    }

    /// True if any type has at least one slot
    pub fn has_textures(&self) -> bool {
        self.slots.values().any(|slots| !slots.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_order_is_stable() {
        assert_eq!(TextureType::ALL.len(), 20);
        assert_eq!(TextureType::ALL[0], TextureType::Diffuse);
        assert_eq!(TextureType::ALL[5], TextureType::Normals);
        assert_eq!(TextureType::ALL[19], TextureType::Transmission);
    }

    #[test]
    fn atlas_suffixes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for texture_type in TextureType::ALL {
            assert!(
                seen.insert(texture_type.atlas_suffix()),
                "duplicate suffix {}",
                texture_type.atlas_suffix()
            );
        }
    }

    #[test]
    fn slot_access() {
        let mut material = Material::new("wood");
        assert!(material.texture_slots(TextureType::Diffuse).is_empty());
        assert!(!material.has_textures());

        material.add_texture(TextureType::Diffuse, TextureSlot::new("wood_d.png"));
        material.add_texture(TextureType::Normals, TextureSlot::new("wood_n.png"));

        assert_eq!(material.texture_slots(TextureType::Diffuse).len(), 1);
        assert_eq!(
            material.texture_slots(TextureType::Diffuse)[0].path,
            "wood_d.png"
        );
        assert!(material.has_textures());

        material.texture_slots_mut(TextureType::Diffuse)[0].path = "atlas_diffuse.png".into();
        assert_eq!(
            material.texture_slots(TextureType::Diffuse)[0].path,
            "atlas_diffuse.png"
        );
    }
}
