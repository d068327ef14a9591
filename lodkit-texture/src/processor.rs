//! Per-LOD texture retargeting
//!
//! Two passes over a scene's textures, matching the order materials are
//! walked everywhere else in the pipeline:
//!
//! - Pass A resizes every embedded texture in place. Material `"*N"`
//!   references stay valid because the table indexing is preserved.
//! - Pass B walks material texture slots in canonical type order, loads
//!   each distinct external file once, resizes and re-encodes it into the
//!   output directory, and rewrites the slot paths to the new leaf names.

use crate::pixel;
use lodkit_core::{leaf_name, Result, Scene, TextureData, TextureType};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Options for [`process_textures`]
#[derive(Debug, Clone, Default)]
pub struct TextureOptions {
    /// Downscale textures proportionally to the LOD ratio
    pub resize: bool,
    /// Source model directory, used to resolve external texture paths
    pub model_dir: PathBuf,
    /// LOD output directory; external textures are written here.
    /// Empty skips external texture processing entirely.
    pub output_dir: PathBuf,
}

/// Counts reported by [`process_textures`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureStats {
    /// Distinct texture sources read
    pub input_count: u32,
    /// Distinct texture outputs produced (embedded replacements plus
    /// files written)
    pub output_count: u32,
}

/// Dedup key for texture paths: separators normalized to `/`, case
/// folded. Distinct spellings of one source collapse to one entry.
pub(crate) fn canonical_key(path: &str) -> String {
    path.replace('\\', "/").to_ascii_lowercase()
}

fn scaled_dimensions(width: u32, height: u32, ratio: f32) -> (u32, u32) {
    (
        ((width as f32 * ratio) as u32).max(1),
        ((height as f32 * ratio) as u32).max(1),
    )
}

/// Pick an output leaf name for an external source, generating
/// `<stem>_<k>.<ext>` when another source already claimed the basename.
fn unique_output_name(source_path: &str, taken: &mut HashSet<String>) -> String {
    let leaf = leaf_name(source_path).to_string();
    if taken.insert(canonical_key(&leaf)) {
        return leaf;
    }
    let (stem, extension) = match leaf.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{ext}")),
        None => (leaf.clone(), String::new()),
    };
    let mut k = 1u32;
    loop {
        let candidate = format!("{stem}_{k}{extension}");
        if taken.insert(canonical_key(&candidate)) {
            return candidate;
        }
        k += 1;
    }
}

/// Resize and re-encode every texture the scene's materials reference.
///
/// Mutates the scene: embedded texture blobs are replaced, external slot
/// paths are rewritten to the leaf names written into
/// `opts.output_dir`. The first failure aborts and is returned.
pub fn process_textures(scene: &mut Scene, ratio: f32, opts: &TextureOptions) -> Result<TextureStats> {
    let mut stats = TextureStats::default();

    // Pass A: embedded textures, in table order
    for index in 0..scene.embedded_textures.len() {
        stats.input_count += 1;

        let decoded = pixel::decode_embedded(&scene.embedded_textures[index])?;
        let (new_width, new_height) = scaled_dimensions(decoded.width, decoded.height, ratio);
        let resized = pixel::resize_texture(&decoded, new_width, new_height)?;

        let requested = if decoded.format_hint.is_empty() {
            "png"
        } else {
            decoded.format_hint.as_str()
        };
        let encoded = pixel::encode_texture(&resized, requested)?;
        let hint = pixel::effective_hint(requested);

        let texture = &mut scene.embedded_textures[index];
        texture.data = TextureData::Compressed(encoded);
        texture.format_hint = hint.to_string();
        if texture.filename.is_none() {
            // Exporters need a name to write the texture under
            texture.filename = Some(format!("texture_{index}.{hint}"));
        }

        log::debug!(
            "embedded texture {index}: {}x{} -> {new_width}x{new_height} ({hint})",
            decoded.width,
            decoded.height
        );
        stats.output_count += 1;
    }

    // Pass B: external textures referenced from material slots
    if opts.output_dir.as_os_str().is_empty() {
        return Ok(stats);
    }

    // canonical source key -> output leaf name
    let mut outputs: HashMap<String, String> = HashMap::new();
    let mut taken_names: HashSet<String> = HashSet::new();

    for material_index in 0..scene.materials.len() {
        for texture_type in TextureType::ALL {
            let slot_count = scene.materials[material_index]
                .texture_slots(texture_type)
                .len();
            for slot in 0..slot_count {
                let raw_path =
                    scene.materials[material_index].texture_slots(texture_type)[slot]
                        .path
                        .clone();

                // Embedded references were handled in pass A
                if scene.lookup_embedded(&raw_path).is_some() {
                    continue;
                }

                let key = canonical_key(&raw_path);
                if !outputs.contains_key(&key) {
                    stats.input_count += 1;

                    let source_file = opts.model_dir.join(&raw_path);
                    let decoded = pixel::load_texture(&source_file)?;
                    let processed = if opts.resize {
                        let (new_width, new_height) =
                            scaled_dimensions(decoded.width, decoded.height, ratio);
                        pixel::resize_texture(&decoded, new_width, new_height)?
                    } else {
                        decoded
                    };

                    let requested = if processed.format_hint.is_empty() {
                        "png"
                    } else {
                        processed.format_hint.as_str()
                    };
                    let encoded = pixel::encode_texture(&processed, requested)?;

                    let output_name = unique_output_name(&raw_path, &mut taken_names);
                    pixel::save_texture_bytes(&encoded, &opts.output_dir.join(&output_name))?;
                    log::debug!("external texture {raw_path} -> {output_name}");

                    outputs.insert(key.clone(), output_name);
                    stats.output_count += 1;
                }

                // Leaf name only: paths are relative to the model's
                // output directory
                scene.materials[material_index].texture_slots_mut(texture_type)[slot].path =
                    outputs[&key].clone();
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::solid;
    use lodkit_core::{EmbeddedTexture, Material, Mesh, TextureSlot};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lodkit_processor_{tag}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn scene_with_embedded(width: u32, height: u32) -> Scene {
        let mut scene = Scene::new();
        let encoded = pixel::encode_texture(&solid(width, height, [90, 60, 30, 255]), "png").unwrap();
        scene
            .embedded_textures
            .push(EmbeddedTexture::from_bytes(encoded, "png"));
        scene.materials.push(
            Material::new("quad").with_texture(TextureType::Diffuse, TextureSlot::new("*0")),
        );
        let mut mesh = Mesh::new("quad");
        mesh.material_index = 0;
        scene.meshes.push(mesh);
        scene
    }

    #[test]
    fn embedded_texture_is_halved_and_reference_survives() {
        let mut scene = scene_with_embedded(256, 256);
        let opts = TextureOptions {
            resize: true,
            ..TextureOptions::default()
        };
        let stats = process_textures(&mut scene, 0.5, &opts).unwrap();

        assert_eq!(stats, TextureStats { input_count: 1, output_count: 1 });
        assert_eq!(
            scene.materials[0].texture_slots(TextureType::Diffuse)[0].path,
            "*0"
        );

        let decoded = pixel::decode_embedded(&scene.embedded_textures[0]).unwrap();
        assert_eq!((decoded.width, decoded.height), (128, 128));
        assert_eq!(scene.embedded_textures[0].format_hint, "png");
        assert_eq!(
            scene.embedded_textures[0].filename.as_deref(),
            Some("texture_0.png")
        );
    }

    #[test]
    fn tiny_textures_never_collapse_below_one_pixel() {
        let mut scene = scene_with_embedded(2, 2);
        let stats =
            process_textures(&mut scene, 0.1, &TextureOptions::default()).unwrap();
        assert_eq!(stats.output_count, 1);
        let decoded = pixel::decode_embedded(&scene.embedded_textures[0]).unwrap();
        assert_eq!((decoded.width, decoded.height), (1, 1));
    }

    #[test]
    fn shared_external_texture_is_written_once() {
        let model_dir = unique_temp_dir("shared_model");
        let output_dir = unique_temp_dir("shared_out");
        let bytes = pixel::encode_texture(&solid(16, 16, [120, 10, 10, 255]), "png").unwrap();
        std::fs::write(model_dir.join("brick.png"), &bytes).unwrap();

        let mut scene = Scene::new();
        for name in ["a", "b"] {
            scene.materials.push(
                Material::new(name)
                    .with_texture(TextureType::Diffuse, TextureSlot::new("brick.png")),
            );
        }

        let opts = TextureOptions {
            resize: true,
            model_dir: model_dir.clone(),
            output_dir: output_dir.clone(),
        };
        let stats = process_textures(&mut scene, 0.25, &opts).unwrap();

        assert_eq!(stats, TextureStats { input_count: 1, output_count: 1 });
        for material in &scene.materials {
            assert_eq!(
                material.texture_slots(TextureType::Diffuse)[0].path,
                "brick.png"
            );
        }
        let written = pixel::load_texture(&output_dir.join("brick.png")).unwrap();
        assert_eq!((written.width, written.height), (4, 4));

        std::fs::remove_dir_all(model_dir).unwrap();
        std::fs::remove_dir_all(output_dir).unwrap();
    }

    #[test]
    fn basename_collisions_get_generated_names() {
        let model_dir = unique_temp_dir("collide_model");
        let output_dir = unique_temp_dir("collide_out");
        std::fs::create_dir_all(model_dir.join("a")).unwrap();
        std::fs::create_dir_all(model_dir.join("b")).unwrap();
        let bytes = pixel::encode_texture(&solid(8, 8, [1, 2, 3, 255]), "png").unwrap();
        std::fs::write(model_dir.join("a/brick.png"), &bytes).unwrap();
        std::fs::write(model_dir.join("b/brick.png"), &bytes).unwrap();

        let mut scene = Scene::new();
        scene.materials.push(
            Material::new("a")
                .with_texture(TextureType::Diffuse, TextureSlot::new("a/brick.png")),
        );
        scene.materials.push(
            Material::new("b")
                .with_texture(TextureType::Diffuse, TextureSlot::new("b/brick.png")),
        );

        let opts = TextureOptions {
            resize: false,
            model_dir: model_dir.clone(),
            output_dir: output_dir.clone(),
        };
        let stats = process_textures(&mut scene, 1.0, &opts).unwrap();

        assert_eq!(stats, TextureStats { input_count: 2, output_count: 2 });
        let path_a = &scene.materials[0].texture_slots(TextureType::Diffuse)[0].path;
        let path_b = &scene.materials[1].texture_slots(TextureType::Diffuse)[0].path;
        assert_eq!(path_a, "brick.png");
        assert_eq!(path_b, "brick_1.png");
        assert!(output_dir.join("brick.png").exists());
        assert!(output_dir.join("brick_1.png").exists());

        std::fs::remove_dir_all(model_dir).unwrap();
        std::fs::remove_dir_all(output_dir).unwrap();
    }

    #[test]
    fn empty_output_dir_skips_external_pass() {
        let mut scene = Scene::new();
        scene.materials.push(
            Material::new("mat")
                .with_texture(TextureType::Diffuse, TextureSlot::new("missing.png")),
        );
        // No output dir: the missing file must never be touched
        let stats =
            process_textures(&mut scene, 0.5, &TextureOptions::default()).unwrap();
        assert_eq!(stats, TextureStats::default());
        assert_eq!(
            scene.materials[0].texture_slots(TextureType::Diffuse)[0].path,
            "missing.png"
        );
    }

    #[test]
    fn missing_external_texture_aborts() {
        let output_dir = unique_temp_dir("missing_out");
        let mut scene = Scene::new();
        scene.materials.push(
            Material::new("mat")
                .with_texture(TextureType::Diffuse, TextureSlot::new("missing.png")),
        );
        let opts = TextureOptions {
            resize: true,
            model_dir: PathBuf::from("nowhere"),
            output_dir: output_dir.clone(),
        };
        assert!(process_textures(&mut scene, 0.5, &opts).is_err());
        std::fs::remove_dir_all(output_dir).unwrap();
    }

    #[test]
    fn canonical_key_folds_case_and_separators() {
        assert_eq!(canonical_key("A\\B\\Tex.PNG"), "a/b/tex.png");
        assert_eq!(canonical_key("a/b/tex.png"), "a/b/tex.png");
    }
}
