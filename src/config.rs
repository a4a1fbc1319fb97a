use serde::Deserialize;
use std::path::Path;
use config::{Config, Environment, File};

use crate::error::ExtractError;

/// Knobs for the dominant-color probe.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    /// Longest side, in pixels, the image is shrunk to before sampling.
    pub max_dimension: u32,
    /// Number of entries in the quantized palette.
    pub palette_size: usize,
    /// How many dominant colors end up in the summary.
    pub top_n: usize,
    /// NeuQuant sampling factor, 1 (every pixel) to 30 (fastest).
    pub sample_factor: i32,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            max_dimension: 100,
            palette_size: 16,
            top_n: 5,
            sample_factor: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub hash_block_size: usize,
    pub analyze_colors: bool,
    pub color: ColorConfig,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hash_block_size: 64 * 1024,
            analyze_colors: true,
            color: ColorConfig::default(),
            log_level: "info".into(),
        }
    }
}

impl AppConfig {
    /// Layer built-in defaults, an optional config file and `IMAGE_META__*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ExtractError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let s = builder
            .add_source(Environment::with_prefix("IMAGE_META").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.hash_block_size == 0 {
            return Err(ExtractError::InvalidConfig("hash_block_size must be positive".into()));
        }
        if self.color.max_dimension == 0 {
            return Err(ExtractError::InvalidConfig("color.max_dimension must be positive".into()));
        }
        if !(2..=256).contains(&self.color.palette_size) {
            return Err(ExtractError::InvalidConfig(format!(
                "color.palette_size must be between 2 and 256, got {}",
                self.color.palette_size
            )));
        }
        if !(1..=30).contains(&self.color.sample_factor) {
            return Err(ExtractError::InvalidConfig(format!(
                "color.sample_factor must be between 1 and 30, got {}",
                self.color.sample_factor
            )));
        }
        Ok(())
    }
}
