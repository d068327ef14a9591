//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one LOD ratio is required")]
    NoRatios,

    #[error("LOD ratio {0} is outside (0, 1)")]
    RatioOutOfRange(f32),
}

/// One LOD generation run: which ratios to build and what to do with
/// textures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LodConfig {
    /// Target triangle ratios, one LOD per entry, each in (0, 1)
    pub ratios: Vec<f32>,
    /// Downscale textures proportionally to each LOD ratio
    #[serde(default)]
    pub resize_textures: bool,
    /// Pack per-type texture atlases after LOD generation
    #[serde(default)]
    pub build_atlas: bool,
    /// Root output directory; LOD `i` lands in `output_dir/lod<i+1>`
    pub output_dir: PathBuf,
}

impl LodConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ratios.is_empty() {
            return Err(ConfigError::NoRatios);
        }
        for &ratio in &self.ratios {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(ConfigError::RatioOutOfRange(ratio));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ratios: Vec<f32>) -> LodConfig {
        LodConfig {
            ratios,
            resize_textures: false,
            build_atlas: false,
            output_dir: PathBuf::from("out"),
        }
    }

    #[test]
    fn accepts_ratios_in_the_open_interval() {
        assert!(config(vec![0.5, 0.25]).validate().is_ok());
    }

    #[test]
    fn rejects_empty_ratio_list() {
        assert!(matches!(
            config(vec![]).validate(),
            Err(ConfigError::NoRatios)
        ));
    }

    #[test]
    fn rejects_out_of_range_ratios() {
        for bad in [0.0, 1.0, -0.5, 1.5, f32::NAN] {
            assert!(
                matches!(
                    config(vec![bad]).validate(),
                    Err(ConfigError::RatioOutOfRange(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: LodConfig =
            serde_json::from_str(r#"{"ratios": [0.5], "output_dir": "out"}"#).unwrap();
        assert!(!config.resize_textures);
        assert!(!config.build_atlas);
        assert_eq!(config.ratios, vec![0.5]);
    }
}
