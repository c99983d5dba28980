use crate::error::GenerateError;
use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use types::TileAddress;

/// Contents of a `relief.toml` file. Every field is optional; command line flags take precedence.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub empties: EmptiesConfig,
    pub tiles: PyramidConfig,
}
impl Config {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let file = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&file)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }
}

/// Parameters for building the list of empty tiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmptiesConfig {
    pub min_level: u8,
    pub max_level: u8,
    /// Landmass polygons are clipped once per tile this many levels above `max_level`.
    pub partition_depth: u8,
    /// Tiles entirely poleward of this latitude are empty, since SRTM has no coverage there.
    pub polar_latitude: f64,
}
impl Default for EmptiesConfig {
    fn default() -> Self {
        Self { min_level: 0, max_level: 12, partition_depth: 7, polar_latitude: 60.0 }
    }
}
impl EmptiesConfig {
    pub fn partition_level(&self) -> u8 {
        self.min_level.max(self.max_level.saturating_sub(self.partition_depth))
    }

    pub fn validate(&self) -> Result<(), GenerateError> {
        validate_levels(self.min_level, self.max_level)?;
        if !(0.0..=90.0).contains(&self.polar_latitude) {
            return Err(GenerateError::Configuration(format!(
                "polar_latitude must be within [0, 90], got {}",
                self.polar_latitude
            )));
        }
        Ok(())
    }
}

/// Parameters for rendering the tile pyramid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PyramidConfig {
    pub min_level: u8,
    pub max_level: u8,
    /// Level of the independent blocks that leaf rendering is split into. Derived from the level
    /// range when unset.
    pub block_level: Option<u8>,
    /// Per-cell resolution to downsample elevation cells to while joining them. Full resolution
    /// when unset.
    pub cell_resolution: Option<usize>,
    pub leaf_workers: usize,
    pub merge_workers: usize,
    /// Shallower pyramids make each block's joined raster too large to hold in memory.
    pub minimum_max_level: u8,
}
impl Default for PyramidConfig {
    fn default() -> Self {
        Self {
            min_level: 0,
            max_level: 12,
            block_level: None,
            cell_resolution: None,
            leaf_workers: 2,
            merge_workers: 6,
            minimum_max_level: 7,
        }
    }
}
impl PyramidConfig {
    /// Blocks of 32x32 leaf tiles, but never coarser than level 7 or outside the level range.
    pub fn block_level(&self) -> u8 {
        self.block_level.unwrap_or_else(|| {
            self.min_level.max(7).max(self.max_level.saturating_sub(5)).min(self.max_level)
        })
    }

    pub fn validate(&self) -> Result<(), GenerateError> {
        validate_levels(self.min_level, self.max_level)?;
        if self.max_level < self.minimum_max_level {
            return Err(GenerateError::Configuration(format!(
                "maximum tile level must be at least {}, otherwise the intermediate tile chunks \
                 get too large",
                self.minimum_max_level
            )));
        }
        let block_level = self.block_level();
        if block_level < self.min_level || block_level > self.max_level {
            return Err(GenerateError::Configuration(format!(
                "block level {} is outside of the level range {}..={}",
                block_level, self.min_level, self.max_level
            )));
        }
        if self.leaf_workers == 0 || self.merge_workers == 0 {
            return Err(GenerateError::Configuration("worker counts must be positive".into()));
        }
        if self.cell_resolution == Some(0) {
            return Err(GenerateError::Configuration("cell_resolution must be positive".into()));
        }
        Ok(())
    }
}

fn validate_levels(min_level: u8, max_level: u8) -> Result<(), GenerateError> {
    if min_level > max_level {
        return Err(GenerateError::Configuration(format!(
            "minimum level {} is larger than maximum level {}",
            min_level, max_level
        )));
    }
    if max_level > TileAddress::MAX_LEVEL {
        return Err(GenerateError::Configuration(format!(
            "maximum level {} exceeds the supported maximum of {}",
            max_level,
            TileAddress::MAX_LEVEL
        )));
    }
    Ok(())
}
