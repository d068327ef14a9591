//! LOD orchestration
//!
//! Each ratio gets its own deep clone of the source scene; the clone is
//! simplified, its textures optionally retargeted, and the result saved
//! under `output_dir/lod<i+1>/`. The first error aborts the current LOD
//! and is returned; earlier LOD outputs stay on disk.

use lodkit_core::{Result, Scene};
use lodkit_io::{load_scene, save_scene};
use lodkit_simplification::{simplify, SimplifyResult};
use lodkit_texture::{build_atlas, process_textures, AtlasInfo, AtlasOptions, TextureOptions, TextureStats};
use std::path::{Path, PathBuf};

/// Report for one generated LOD
#[derive(Debug, Clone, PartialEq)]
pub struct LodInfo {
    pub ratio: f32,
    pub output_path: PathBuf,
    /// Per-mesh simplification outcomes, in scene mesh order
    pub mesh_results: Vec<SimplifyResult>,
    /// Set when the texture processor ran
    pub texture_stats: Option<TextureStats>,
    /// Set when an atlas pass ran over this LOD
    pub atlas_infos: Vec<AtlasInfo>,
}

/// Generate a single LOD scene in memory (no disk I/O unless texture
/// options carry an output directory).
pub fn generate_lod(
    scene: &Scene,
    ratio: f32,
    texture_opts: Option<&TextureOptions>,
) -> Result<Scene> {
    let mut lod_scene = scene.clone();
    for mesh in &mut lod_scene.meshes {
        simplify(mesh, ratio);
    }
    if let Some(opts) = texture_opts {
        if opts.resize {
            process_textures(&mut lod_scene, ratio, opts)?;
        }
    }
    Ok(lod_scene)
}

/// Generate one LOD per ratio and save each to
/// `output_dir/lod<i+1>/<stem>_lod<i+1><ext>`.
///
/// Mesh simplification and optional texture resizing only; atlas packing
/// is a separate step over the saved model ([`build_lod_atlas`]).
pub fn generate_lods(
    scene: &Scene,
    input_path: &Path,
    output_dir: &Path,
    ratios: &[f32],
    texture_opts: Option<&TextureOptions>,
) -> Result<Vec<LodInfo>> {
    let mut results = Vec::with_capacity(ratios.len());

    for (index, &ratio) in ratios.iter().enumerate() {
        let lod_postfix = format!("lod{}", index + 1);
        let lod_dir = output_dir.join(&lod_postfix);
        std::fs::create_dir_all(&lod_dir).map_err(|e| {
            lodkit_core::Error::ExportFailed(format!(
                "Could not create directory {}: {e}",
                lod_dir.display()
            ))
        })?;

        let stem = input_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("model");
        let output_name = match input_path.extension().and_then(|ext| ext.to_str()) {
            Some(extension) => format!("{stem}_{lod_postfix}.{extension}"),
            None => format!("{stem}_{lod_postfix}"),
        };
        let output_path = lod_dir.join(output_name);

        let mut lod_scene = scene.clone();
        let mut mesh_results = Vec::with_capacity(lod_scene.meshes.len());
        for mesh in &mut lod_scene.meshes {
            mesh_results.push(simplify(mesh, ratio));
        }

        let mut texture_stats: Option<TextureStats> = None;
        if let Some(opts) = texture_opts {
            if opts.resize {
                // External texture copies belong in this LOD's directory
                let mut lod_opts = opts.clone();
                lod_opts.output_dir = lod_dir.clone();
                texture_stats = Some(process_textures(&mut lod_scene, ratio, &lod_opts)?);
            }
        }

        save_scene(&lod_scene, &output_path)?;
        log::info!(
            "lod{} (ratio {ratio}): {} -> {} triangles, saved {}",
            index + 1,
            mesh_results
                .iter()
                .map(|r| r.original_triangles)
                .sum::<u32>(),
            mesh_results
                .iter()
                .map(|r| r.simplified_triangles)
                .sum::<u32>(),
            output_path.display()
        );

        results.push(LodInfo {
            ratio,
            output_path,
            mesh_results,
            texture_stats,
            atlas_infos: Vec::new(),
        });
    }

    Ok(results)
}

/// Build per-type texture atlases for one saved LOD model.
///
/// Loads the model, packs every referenced texture into per-type atlases
/// (rewriting materials and UVs), and re-saves to the same path.
pub fn build_lod_atlas(model_path: &Path, opts: &AtlasOptions) -> Result<Vec<AtlasInfo>> {
    let mut scene = load_scene(model_path)?;
    let infos = build_atlas(&mut scene, opts)?;
    save_scene(&scene, model_path)?;
    Ok(infos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodkit_core::{
        EmbeddedTexture, Material, Mesh, Point3f, PrimitiveKind, TextureSlot, TextureType,
        UvChannel,
    };
    use lodkit_texture::{encode_texture, PixelBuffer};

    fn unique_temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lodkit_pipeline_{tag}_{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// A closed cube: 8 vertices, 12 triangles, no attributes
    fn cube_scene() -> Scene {
        let mut mesh = Mesh::new("cube");
        for z in [0.0f32, 1.0] {
            for y in [0.0f32, 1.0] {
                for x in [0.0f32, 1.0] {
                    mesh.positions.push(Point3f::new(x, y, z));
                }
            }
        }
        mesh.indices = vec![
            0, 2, 1, 1, 2, 3, // z = 0
            4, 5, 6, 5, 7, 6, // z = 1
            0, 1, 4, 1, 5, 4, // y = 0
            2, 6, 3, 3, 6, 7, // y = 1
            0, 4, 2, 2, 4, 6, // x = 0
            1, 3, 5, 3, 7, 5, // x = 1
        ];
        let mut scene = Scene::new();
        scene.meshes.push(mesh);
        scene
    }

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let buffer = PixelBuffer {
            width,
            height,
            pixels: vec![128; (width * height * 4) as usize],
            format_hint: "png".to_string(),
        };
        encode_texture(&buffer, "png").unwrap()
    }

    fn textured_quad_scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .embedded_textures
            .push(EmbeddedTexture::from_bytes(solid_png(256, 256), "png"));
        scene.materials.push(
            Material::new("quad").with_texture(TextureType::Diffuse, TextureSlot::new("*0")),
        );
        let mut mesh = Mesh::new("quad");
        mesh.positions = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        mesh.uv_channels = vec![UvChannel::from_uvs(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 1.0],
        ])];
        mesh.indices = vec![0, 1, 2, 0, 2, 3];
        mesh.material_index = 0;
        scene.meshes.push(mesh);
        scene
    }

    #[test]
    fn cube_lod_halves_triangles_and_persists() {
        let output_dir = unique_temp_dir("cube");
        let scene = cube_scene();
        let source = scene.clone();

        let infos = generate_lods(
            &scene,
            Path::new("cube.obj"),
            &output_dir,
            &[0.5],
            None,
        )
        .unwrap();

        assert_eq!(infos.len(), 1);
        let info = &infos[0];
        assert_eq!(info.output_path, output_dir.join("lod1/cube_lod1.obj"));
        assert!(info.output_path.exists());
        assert_eq!(info.mesh_results.len(), 1);
        assert_eq!(info.mesh_results[0].original_triangles, 12);
        // A sharp-cornered cube offers no collapse within the error
        // target; the count must never grow, and usually shrinks for
        // denser inputs (covered by the simplification crate's grids)
        assert!(info.mesh_results[0].simplified_triangles <= 12);
        assert!(info.texture_stats.is_none());

        // The source scene is bitwise untouched
        assert_eq!(scene, source);

        // The saved LOD loads back as a valid triangle mesh
        let reloaded = load_scene(&info.output_path).unwrap();
        assert_eq!(reloaded.meshes.len(), 1);
        assert!(reloaded.meshes[0].is_well_formed());
        assert_eq!(
            reloaded.meshes[0].triangle_count() as u32,
            info.mesh_results[0].simplified_triangles
        );

        std::fs::remove_dir_all(output_dir).unwrap();
    }

    #[test]
    fn textured_quad_resizes_embedded_texture() {
        let output_dir = unique_temp_dir("quad");
        let scene = textured_quad_scene();
        let source = scene.clone();

        let texture_opts = TextureOptions {
            resize: true,
            model_dir: PathBuf::new(),
            output_dir: PathBuf::new(),
        };
        let infos = generate_lods(
            &scene,
            Path::new("quad.obj"),
            &output_dir,
            &[0.5],
            Some(&texture_opts),
        )
        .unwrap();

        let stats = infos[0].texture_stats.unwrap();
        assert_eq!(stats.input_count, 1);
        assert_eq!(stats.output_count, 1);
        assert_eq!(scene, source);

        std::fs::remove_dir_all(output_dir).unwrap();
    }

    #[test]
    fn generate_lod_in_memory_keeps_star_reference() {
        let scene = textured_quad_scene();
        let opts = TextureOptions {
            resize: true,
            ..TextureOptions::default()
        };
        let lod = generate_lod(&scene, 0.5, Some(&opts)).unwrap();

        assert_eq!(
            lod.materials[0].texture_slots(TextureType::Diffuse)[0].path,
            "*0"
        );
        let decoded = lodkit_texture::decode_embedded(&lod.embedded_textures[0]).unwrap();
        assert_eq!((decoded.width, decoded.height), (128, 128));
    }

    #[test]
    fn point_mesh_passes_through_next_to_triangles() {
        let output_dir = unique_temp_dir("mixed");
        let mut scene = cube_scene();
        let mut points = Mesh::new("dots");
        points.primitive_kind = PrimitiveKind::Points;
        points.positions = vec![Point3f::new(9.0, 9.0, 9.0), Point3f::new(8.0, 8.0, 8.0)];
        points.indices = vec![0, 1];
        scene.meshes.push(points);

        let infos =
            generate_lods(&scene, Path::new("mixed.obj"), &output_dir, &[0.5], None).unwrap();

        let reloaded = load_scene(&infos[0].output_path).unwrap();
        assert_eq!(reloaded.meshes.len(), 2);
        let point_mesh = reloaded
            .meshes
            .iter()
            .find(|m| m.primitive_kind == PrimitiveKind::Points)
            .unwrap();
        assert_eq!(point_mesh.vertex_count(), 2);
        assert_eq!(point_mesh.indices, vec![0, 1]);

        std::fs::remove_dir_all(output_dir).unwrap();
    }

    #[test]
    fn multiple_ratios_produce_separate_directories() {
        let output_dir = unique_temp_dir("ratios");
        let scene = cube_scene();

        let infos = generate_lods(
            &scene,
            Path::new("cube.obj"),
            &output_dir,
            &[0.5, 0.25],
            None,
        )
        .unwrap();

        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].output_path, output_dir.join("lod1/cube_lod1.obj"));
        assert_eq!(infos[1].output_path, output_dir.join("lod2/cube_lod2.obj"));
        assert!(infos[0].output_path.exists());
        assert!(infos[1].output_path.exists());

        std::fs::remove_dir_all(output_dir).unwrap();
    }

    #[test]
    fn atlas_pass_rewrites_saved_model() {
        let model_dir = unique_temp_dir("atlas_model");
        let output_dir = unique_temp_dir("atlas_out");

        // External texture next to the source model
        std::fs::write(model_dir.join("skin.png"), solid_png(16, 16)).unwrap();

        let mut scene = Scene::new();
        scene.materials.push(
            Material::new("skinned")
                .with_texture(TextureType::Diffuse, TextureSlot::new("skin.png")),
        );
        let mut mesh = Mesh::new("tri");
        mesh.positions = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        mesh.uv_channels = vec![UvChannel::from_uvs(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 1.0],
        ])];
        mesh.indices = vec![0, 1, 2];
        mesh.material_index = 0;
        scene.meshes.push(mesh);

        let infos = generate_lods(
            &scene,
            &model_dir.join("skinned.obj"),
            &output_dir,
            &[0.9],
            Some(&TextureOptions {
                resize: true,
                model_dir: model_dir.clone(),
                output_dir: PathBuf::new(),
            }),
        )
        .unwrap();

        let lod_path = &infos[0].output_path;
        let lod_dir = lod_path.parent().unwrap().to_path_buf();
        let atlas_opts = AtlasOptions {
            model_dir: model_dir.clone(),
            output_dir: lod_dir.clone(),
        };
        let atlases = build_lod_atlas(lod_path, &atlas_opts).unwrap();

        assert_eq!(atlases.len(), 1);
        assert_eq!(atlases[0].filename, "atlas_diffuse.png");
        assert!(lod_dir.join("atlas_diffuse.png").exists());
        // The resized per-LOD copy was consumed by the atlas
        assert!(!lod_dir.join("skin.png").exists());

        let reloaded = load_scene(lod_path).unwrap();
        assert_eq!(
            reloaded.materials[0].texture_slots(TextureType::Diffuse)[0].path,
            "atlas_diffuse.png"
        );

        std::fs::remove_dir_all(model_dir).unwrap();
        std::fs::remove_dir_all(output_dir).unwrap();
    }
}
