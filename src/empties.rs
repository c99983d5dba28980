//! The set of tiles that contain no land, so that rendering can skip them.

use crate::config::EmptiesConfig;
use crate::landmass::{geographic_rect, Landmass};
use anyhow::{Context, Error};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use fnv::FnvHashSet;
use rayon::prelude::*;
use std::fs;
use std::io::Write;
use std::path::Path;
use types::TileAddress;

/// Tiles known to contain no renderable data.
///
/// Closed upwards: whenever all four children of a tile are members, so is the tile.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmptinessSet {
    tiles: FnvHashSet<TileAddress>,
}

impl EmptinessSet {
    pub fn is_empty(&self, address: TileAddress) -> bool {
        self.tiles.contains(&address)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileAddress> {
        self.tiles.iter()
    }

    /// Members ordered by `(level, i, j)`.
    pub fn sorted(&self) -> Vec<TileAddress> {
        let mut tiles: Vec<_> = self.tiles.iter().copied().collect();
        tiles.sort();
        tiles
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let lines: Vec<String> = self.sorted().iter().map(|t| format!("{}.png", t)).collect();
        let compressed = tilefmt::compress_tile_list(&lines)?;
        AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
            .write(|f| f.write_all(&compressed))
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let bytes =
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let tiles = tilefmt::uncompress_tile_list(&bytes)?
            .iter()
            .map(|line| line.parse())
            .collect::<Result<FnvHashSet<TileAddress>, Error>>()
            .with_context(|| format!("malformed tile list {}", path.display()))?;
        log::info!("Loaded {} empty tiles from {}", tiles.len(), path.display());
        Ok(Self { tiles })
    }
}

impl FromIterator<TileAddress> for EmptinessSet {
    fn from_iter<I: IntoIterator<Item = TileAddress>>(iter: I) -> Self {
        Self { tiles: iter.into_iter().collect() }
    }
}

/// Whether a `max_level` tile lies outside the landmass or the elevation data's coverage.
fn leaf_is_empty(config: &EmptiesConfig, landmass: &Landmass, tile: TileAddress) -> bool {
    let bounds = tile.bounds();
    bounds.beyond_latitude(config.polar_latitude)
        || !landmass.intersects(&geographic_rect(&bounds))
}

/// Classify every tile between `config.min_level` and `config.max_level`.
///
/// Leaf tiles are tested against the landmass clipped once per partition tile, and partitions are
/// processed in parallel. Coarser levels are then derived bottom-up from their children.
pub fn build_empties(config: &EmptiesConfig, landmass: &Landmass) -> Result<EmptinessSet, Error> {
    config.validate()?;

    let max_level = config.max_level;
    let partition_level = config.partition_level();
    let partitions: Vec<TileAddress> = TileAddress::root().descendants(partition_level).collect();
    let num_partitions = partitions.len();

    let leaf_empties: Vec<Vec<TileAddress>> = partitions
        .into_par_iter()
        .enumerate()
        .map(|(index, partition)| {
            let leaves = partition.descendants(max_level);
            let polar = partition.bounds().beyond_latitude(config.polar_latitude);
            let empties: Vec<TileAddress> = if polar {
                leaves.collect()
            } else {
                let clipped = landmass.clip(&geographic_rect(&partition.bounds()));
                leaves.filter(|&leaf| leaf_is_empty(config, &clipped, leaf)).collect()
            };
            log::debug!(
                "Found {} (of {}) empty tiles of level {} in partition {} ({}/{})",
                empties.len(),
                1u64 << (2 * (max_level - partition_level)),
                max_level,
                partition,
                index + 1,
                num_partitions
            );
            empties
        })
        .collect();

    let mut tiles: FnvHashSet<TileAddress> = leaf_empties.into_iter().flatten().collect();
    log::info!("Found {} empty tiles of level {}", tiles.len(), max_level);

    for level in (config.min_level..max_level).rev() {
        let candidates: FnvHashSet<TileAddress> = tiles
            .iter()
            .filter(|t| t.level() == level + 1)
            .filter_map(|t| t.parent())
            .map(|(parent, _)| parent)
            .collect();
        let mut found = 0;
        for parent in candidates {
            if parent.children().iter().all(|c| tiles.contains(c)) {
                tiles.insert(parent);
                found += 1;
            }
        }
        log::info!("Found {} (of {}) empty tiles of level {}", found, 1u64 << (2 * level), level);
    }

    Ok(EmptinessSet { tiles })
}
