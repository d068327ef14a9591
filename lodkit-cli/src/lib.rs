//! # lodkit CLI
//!
//! Command-line front end for the LOD pipeline: loads a model, generates
//! one simplified copy per ratio, optionally resizes textures and packs
//! per-type atlases, and reports what was produced.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use lodkit_io::load_scene;
use lodkit_pipeline::{build_lod_atlas, generate_lods, LodConfig};
use lodkit_texture::{AtlasOptions, TextureOptions};

/// LOD generator — mesh simplification + optional texture processing
#[derive(Parser)]
#[command(name = "lodkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input model file
    pub input: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Comma-separated LOD ratios, e.g. 0.5,0.25
    #[arg(short, long, default_value = "0.5,0.25")]
    pub ratios: String,

    /// Resize textures proportionally to each LOD ratio
    #[arg(short = 't', long)]
    pub textures: bool,

    /// Build per-type texture atlases after LOD generation
    #[arg(short, long)]
    pub atlas: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse a comma-separated ratio list
pub fn parse_ratios(input: &str) -> Result<Vec<f32>> {
    let mut ratios = Vec::new();
    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let ratio: f32 = token
            .parse()
            .with_context(|| format!("invalid ratio {token:?}"))?;
        ratios.push(ratio);
    }
    if ratios.is_empty() {
        bail!("no valid ratios specified");
    }
    Ok(ratios)
}

/// Execute the CLI
pub fn execute(cli: Cli) -> Result<()> {
    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = LodConfig {
        ratios: parse_ratios(&cli.ratios)?,
        resize_textures: cli.textures,
        build_atlas: cli.atlas,
        output_dir: cli.output.clone(),
    };
    config.validate()?;

    let model_dir = cli
        .input
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let scene = load_scene(&cli.input)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;

    let texture_opts = TextureOptions {
        resize: true,
        model_dir: model_dir.clone(),
        // generate_lods points this at each LOD's own directory
        output_dir: PathBuf::new(),
    };
    let lods = generate_lods(
        &scene,
        &cli.input,
        &config.output_dir,
        &config.ratios,
        config.resize_textures.then_some(&texture_opts),
    )
    .context("LOD generation failed")?;

    for info in &lods {
        println!("lod (ratio={}): {}", info.ratio, info.output_path.display());
        for (index, mesh_result) in info.mesh_results.iter().enumerate() {
            println!(
                "  mesh[{index}] {} tris",
                mesh_result.simplified_triangles
            );
        }
        if let Some(stats) = &info.texture_stats {
            println!(
                "  textures: {}/{} processed",
                stats.output_count, stats.input_count
            );
        }
    }

    if config.build_atlas {
        for info in &lods {
            let atlas_opts = AtlasOptions {
                model_dir: model_dir.clone(),
                output_dir: info
                    .output_path
                    .parent()
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(".")),
            };
            let atlases = build_lod_atlas(&info.output_path, &atlas_opts).with_context(|| {
                format!("atlas failed for {}", info.output_path.display())
            })?;
            for atlas in &atlases {
                println!(
                    "  atlas: {} ({} textures, {}x{})",
                    atlas.filename, atlas.input_count, atlas.width, atlas.height
                );
            }
        }
    }

    Ok(())
}
