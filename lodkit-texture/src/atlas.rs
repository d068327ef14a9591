//! Per-type texture atlas packing
//!
//! Collects every texture the scene's materials reference, groups the
//! sources by semantic type, shelf-packs each group into one PNG, and
//! rewrites material slots and mesh UVs to address the packed images.
//!
//! UVs are remapped once, using the diffuse atlas layout. That single
//! transform is valid for every per-type atlas because each type packs
//! its sources in the same first-appearance order over the canonical
//! material × type × slot walk.

use crate::pixel::{self, PixelBuffer};
use crate::processor::canonical_key;
use lodkit_core::{
    leaf_name, EmbeddedTexture, Error, Result, Scene, TextureType, WrapMode,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Upper bound on atlas width and height in pixels
const MAX_ATLAS_DIMENSION: u32 = 8192;

/// Options for [`build_atlas`]
#[derive(Debug, Clone, Default)]
pub struct AtlasOptions {
    /// Source model directory (original external textures)
    pub model_dir: PathBuf,
    /// LOD output directory: atlas images are written here, and resized
    /// external copies are looked up here first
    pub output_dir: PathBuf,
}

/// One built atlas image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasInfo {
    pub filename: String,
    pub texture_type: TextureType,
    /// Number of distinct textures packed into this atlas
    pub input_count: u32,
    pub width: u32,
    pub height: u32,
}

/// Placement of one texture inside an atlas image, in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtlasRegion {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

fn next_pow2(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// Shelf-pack `sizes` into a strip of width `atlas_width`.
///
/// Textures are placed tallest-first, left to right; a new shelf starts
/// whenever the current one cannot fit the next texture. Returns the
/// region per input (input order) and the used height before rounding.
fn shelf_pack(sizes: &[(u32, u32)], atlas_width: u32) -> (Vec<AtlasRegion>, u32) {
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].1.cmp(&sizes[a].1));

    let mut regions = vec![AtlasRegion::default(); sizes.len()];
    let (mut cursor_x, mut cursor_y, mut shelf_height) = (0u32, 0u32, 0u32);
    for index in order {
        let (w, h) = sizes[index];
        if cursor_x + w > atlas_width {
            cursor_y += shelf_height;
            cursor_x = 0;
            shelf_height = 0;
        }
        regions[index] = AtlasRegion {
            x: cursor_x,
            y: cursor_y,
            w,
            h,
        };
        cursor_x += w;
        shelf_height = shelf_height.max(h);
    }
    (regions, cursor_y + shelf_height)
}

/// Copy a decoded texture into its atlas region, row by row
fn blit(target: &mut [u8], atlas_width: u32, source: &PixelBuffer, region: AtlasRegion) {
    for row in 0..region.h {
        let target_offset = (((region.y + row) * atlas_width + region.x) * 4) as usize;
        let source_offset = (row * region.w * 4) as usize;
        let row_bytes = (region.w * 4) as usize;
        target[target_offset..target_offset + row_bytes]
            .copy_from_slice(&source.pixels[source_offset..source_offset + row_bytes]);
    }
}

/// A decoded atlas source; `disk_path` is set when it was read from disk
/// so the consumed file can be removed afterwards
struct SourceTexture {
    decoded: PixelBuffer,
    disk_path: Option<PathBuf>,
}

/// One material texture slot's reference into the source list
struct SlotRef {
    material: usize,
    texture_type: TextureType,
    slot: usize,
    source: usize,
}

fn resolve_source(scene: &Scene, raw_path: &str, opts: &AtlasOptions) -> Result<SourceTexture> {
    if let Some(embedded) = scene.lookup_embedded(raw_path) {
        return Ok(SourceTexture {
            decoded: pixel::decode_embedded(&scene.embedded_textures[embedded])?,
            disk_path: None,
        });
    }
    // Prefer the resized copy in the output directory, fall back to the
    // original next to the model
    let leaf = leaf_name(raw_path);
    let from_output = opts.output_dir.join(leaf);
    let file = if from_output.exists() {
        from_output
    } else {
        opts.model_dir.join(leaf)
    };
    Ok(SourceTexture {
        decoded: pixel::load_texture(&file)?,
        disk_path: Some(file),
    })
}

/// Pack every referenced texture into one atlas per semantic type.
///
/// Mutates the scene: the embedded texture table is replaced by the atlas
/// images, every slot of an atlased type points at the matching
/// `atlas_<suffix>.png` with clamped wrap modes, and mesh UVs are
/// remapped into the diffuse atlas regions. Returns one [`AtlasInfo`] per
/// built atlas; an empty scene returns an empty list untouched.
pub fn build_atlas(scene: &mut Scene, opts: &AtlasOptions) -> Result<Vec<AtlasInfo>> {
    // Phase 1: collect distinct sources in canonical walk order
    let mut key_to_source: HashMap<String, usize> = HashMap::new();
    let mut sources: Vec<SourceTexture> = Vec::new();
    let mut slot_refs: Vec<SlotRef> = Vec::new();
    let mut active_types: HashSet<TextureType> = HashSet::new();

    for material in 0..scene.materials.len() {
        for texture_type in TextureType::ALL {
            let slot_count = scene.materials[material].texture_slots(texture_type).len();
            for slot in 0..slot_count {
                let raw_path = scene.materials[material].texture_slots(texture_type)[slot]
                    .path
                    .clone();
                let key = canonical_key(&raw_path);
                let source = match key_to_source.get(&key) {
                    Some(&index) => index,
                    None => {
                        let index = sources.len();
                        sources.push(resolve_source(scene, &raw_path, opts)?);
                        key_to_source.insert(key, index);
                        index
                    }
                };
                slot_refs.push(SlotRef {
                    material,
                    texture_type,
                    slot,
                    source,
                });
                active_types.insert(texture_type);
            }
        }
    }

    if sources.is_empty() {
        return Ok(Vec::new());
    }

    // Phase 2: source that drives each material's UV remap — its first
    // diffuse slot, or its first slot of any type
    let mut material_source: Vec<Option<usize>> = vec![None; scene.materials.len()];
    for slot_ref in &slot_refs {
        if slot_ref.texture_type == TextureType::Diffuse
            && material_source[slot_ref.material].is_none()
        {
            material_source[slot_ref.material] = Some(slot_ref.source);
        }
    }
    for slot_ref in &slot_refs {
        if material_source[slot_ref.material].is_none() {
            material_source[slot_ref.material] = Some(slot_ref.source);
        }
    }

    // Phase 3+4: build one atlas per active type; the old embedded table
    // is dropped wholesale and replaced by the atlas images
    scene.embedded_textures.clear();

    let mut infos: Vec<AtlasInfo> = Vec::new();
    let mut diffuse_regions: Vec<AtlasRegion> = vec![AtlasRegion::default(); sources.len()];
    let mut diffuse_size: Option<(u32, u32)> = None;

    for texture_type in TextureType::ALL {
        if !active_types.contains(&texture_type) {
            continue;
        }

        // Distinct sources of this type, first-appearance order
        let mut type_sources: Vec<usize> = Vec::new();
        for slot_ref in &slot_refs {
            if slot_ref.texture_type == texture_type && !type_sources.contains(&slot_ref.source) {
                type_sources.push(slot_ref.source);
            }
        }

        let max_width = type_sources
            .iter()
            .map(|&s| sources[s].decoded.width)
            .max()
            .unwrap_or(1);
        let columns = (type_sources.len() as f64).sqrt().ceil() as u32;
        let atlas_width = next_pow2(max_width * columns).min(MAX_ATLAS_DIMENSION);

        let sizes: Vec<(u32, u32)> = type_sources
            .iter()
            .map(|&s| (sources[s].decoded.width, sources[s].decoded.height))
            .collect();
        let (regions, used_height) = shelf_pack(&sizes, atlas_width);
        let atlas_height = next_pow2(used_height);
        if atlas_height > MAX_ATLAS_DIMENSION {
            return Err(Error::AtlasBuildFailed(format!(
                "Atlas height {atlas_height} exceeds {MAX_ATLAS_DIMENSION}px for type: {}",
                texture_type.atlas_suffix()
            )));
        }

        let mut pixels = vec![0u8; (atlas_width * atlas_height * 4) as usize];
        for (packed, &source) in type_sources.iter().enumerate() {
            blit(&mut pixels, atlas_width, &sources[source].decoded, regions[packed]);
        }

        let atlas_buffer = PixelBuffer {
            width: atlas_width,
            height: atlas_height,
            pixels,
            format_hint: "png".to_string(),
        };
        let encoded = pixel::encode_texture(&atlas_buffer, "png")
            .map_err(|e| Error::AtlasBuildFailed(e.to_string()))?;

        let filename = format!("atlas_{}.png", texture_type.atlas_suffix());
        let file_path = opts.output_dir.join(&filename);
        std::fs::write(&file_path, &encoded).map_err(|e| {
            Error::AtlasBuildFailed(format!("Cannot write {}: {e}", file_path.display()))
        })?;

        let mut embedded = EmbeddedTexture::from_bytes(encoded, "png");
        embedded.filename = Some(filename.clone());
        scene.embedded_textures.push(embedded);

        // Point every slot of this type at the atlas. The plain filename
        // (not "*N") survives text-based exporters, which emit the path
        // string verbatim.
        for slot_ref in &slot_refs {
            if slot_ref.texture_type != texture_type {
                continue;
            }
            let slot = &mut scene.materials[slot_ref.material]
                .texture_slots_mut(texture_type)[slot_ref.slot];
            slot.path = filename.clone();
            slot.wrap_u = WrapMode::Clamp;
            slot.wrap_v = WrapMode::Clamp;
        }

        if texture_type == TextureType::Diffuse && diffuse_size.is_none() {
            diffuse_size = Some((atlas_width, atlas_height));
            for (packed, &source) in type_sources.iter().enumerate() {
                diffuse_regions[source] = regions[packed];
            }
        }

        log::info!(
            "atlas {filename}: {} textures, {atlas_width}x{atlas_height}",
            type_sources.len()
        );
        infos.push(AtlasInfo {
            filename,
            texture_type,
            input_count: type_sources.len() as u32,
            width: atlas_width,
            height: atlas_height,
        });
    }

    // Phase 5: remap mesh UVs into the diffuse atlas regions
    if let Some((atlas_width, atlas_height)) = diffuse_size {
        for mesh in &mut scene.meshes {
            if mesh.material_index as usize >= scene.materials.len() {
                continue;
            }
            let Some(source) = material_source[mesh.material_index as usize] else {
                continue;
            };
            let region = diffuse_regions[source];
            if region.w == 0 || region.h == 0 {
                continue;
            }

            let u0 = region.x as f32 / atlas_width as f32;
            let v0 = region.y as f32 / atlas_height as f32;
            let u_scale = region.w as f32 / atlas_width as f32;
            let v_scale = region.h as f32 / atlas_height as f32;

            for channel in &mut mesh.uv_channels {
                for uv in &mut channel.coords {
                    uv[0] = u0 + uv[0] * u_scale;
                    uv[1] = v0 + uv[1] * v_scale;
                }
            }
        }
    }

    // Phase 6: the packed external files are no longer needed
    for source in &sources {
        if let Some(path) = &source.disk_path {
            remove_consumed_file(path);
        }
    }

    Ok(infos)
}

fn remove_consumed_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        log::debug!("could not remove {}: {e}", path.display());
    }
}
