//! Drives the two phases of tile generation: rendering the finest level block by block, then
//! merging every coarser level from the one below it.

use crate::config::PyramidConfig;
use crate::dem::HeightSource;
use crate::empties::EmptinessSet;
use crate::error::GenerateError;
use crate::leaf::render_block;
use crate::merge::merge_tile;
use crate::quadtree::{Node, Quadtree};
use crate::tiles::TileStore;
use anyhow::{Context, Error};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use types::TileAddress;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Tiles of the maximum level rendered from elevation data.
    pub leaf_tiles: usize,
    /// Tiles of coarser levels merged from the level below.
    pub merged_tiles: usize,
    /// Blocks that had nothing to render.
    pub skipped_blocks: usize,
}

/// The tiles to render, grouped into blocks that share one reprojected raster.
struct Plan {
    blocks: Vec<(TileAddress, Vec<TileAddress>)>,
    skipped_blocks: usize,
    /// Tiles to merge, finest level first.
    levels: Vec<(u8, Vec<TileAddress>)>,
}

fn plan(config: &PyramidConfig, empties: &EmptinessSet) -> Plan {
    let block_level = config.block_level();
    let is_empty = |node: &Node| empties.is_empty(node.address);

    let mut tree = Quadtree::new(block_level);
    let pruned = tree.prune_children(&mut |node: &Node| is_empty(node));
    log::info!("Pruned {} empty subtrees above level {}", pruned, block_level);

    let block_ids = tree.nodes_at_level(block_level);
    for &block in &block_ids {
        tree.subdivide(block, &mut |node: &Node| !is_empty(node), config.max_level);
    }

    let mut blocks = Vec::new();
    for &block in &block_ids {
        let leaves: Vec<TileAddress> = tree
            .flatten_from(block)
            .into_iter()
            .map(|id| tree.node(id).address)
            .filter(|t| t.level() == config.max_level)
            .collect();
        if !leaves.is_empty() {
            blocks.push((tree.node(block).address, leaves));
        }
    }
    let skipped_blocks = (1usize << (2 * block_level)) - blocks.len();

    let levels = (config.min_level..config.max_level)
        .rev()
        .map(|level| {
            let tiles = tree.nodes_at_level(level).into_iter().map(|id| tree.node(id).address);
            (level, tiles.collect())
        })
        .collect();

    Plan { blocks, skipped_blocks, levels }
}

/// Render the pyramid between `config.min_level` and `config.max_level` into
/// `output_directory`, which must not exist yet. Tiles in `empties` are skipped.
///
/// `progress_callback` receives a description of the current phase along with the number of
/// finished and total tiles.
pub fn generate_tiles<F>(
    config: &PyramidConfig,
    source: &dyn HeightSource,
    empties: &EmptinessSet,
    output_directory: &Path,
    progress_callback: F,
) -> Result<GenerationSummary, Error>
where
    F: FnMut(String, usize, usize) + Send,
{
    config.validate()?;
    if output_directory.exists() {
        return Err(GenerateError::OutputCollision(output_directory.to_path_buf()).into());
    }
    fs::create_dir_all(output_directory)
        .with_context(|| format!("failed to create {}", output_directory.display()))?;
    let store = TileStore::new(output_directory);

    let plan = plan(config, empties);
    let leaf_count: usize = plan.blocks.iter().map(|(_, leaves)| leaves.len()).sum();
    let merge_count: usize = plan.levels.iter().map(|(_, tiles)| tiles.len()).sum();
    let total = leaf_count + merge_count;
    log::info!(
        "Generating {} tiles of level {} in {} blocks of level {}, then {} merged tiles",
        leaf_count,
        config.max_level,
        plan.blocks.len(),
        config.block_level(),
        merge_count
    );

    let progress_callback = Mutex::new(progress_callback);
    let tiles_processed = AtomicUsize::new(0);

    let leaf_pool = rayon::ThreadPoolBuilder::new().num_threads(config.leaf_workers).build()?;
    let leaf_tiles = leaf_pool.install(|| {
        plan.blocks
            .par_iter()
            .map(|(block, leaves)| -> Result<usize, Error> {
                progress_callback.lock().unwrap()(
                    format!("Generating tiles of level {}...", config.max_level),
                    tiles_processed.load(Ordering::SeqCst),
                    total,
                );
                let written =
                    render_block(&store, source, *block, leaves, config.cell_resolution)?;
                tiles_processed.fetch_add(written, Ordering::SeqCst);
                Ok(written)
            })
            .collect::<Result<Vec<usize>, Error>>()
    })?;
    let leaf_tiles: usize = leaf_tiles.into_iter().sum();

    let merge_pool = rayon::ThreadPoolBuilder::new().num_threads(config.merge_workers).build()?;
    for (level, tiles) in &plan.levels {
        log::info!(
            "Generating {} tiles of level {} from the height data of level {}",
            tiles.len(),
            level,
            level + 1
        );
        merge_pool.install(|| {
            tiles.par_iter().try_for_each(|&tile| -> Result<(), Error> {
                merge_tile(&store, tile)?;
                let processed = tiles_processed.fetch_add(1, Ordering::SeqCst) + 1;
                progress_callback.lock().unwrap()(
                    format!("Merging tiles of level {}...", level),
                    processed,
                    total,
                );
                Ok(())
            })
        })?;
    }
    progress_callback.lock().unwrap()("Done".to_string(), total, total);

    Ok(GenerationSummary {
        leaf_tiles,
        merged_tiles: merge_count,
        skipped_blocks: plan.skipped_blocks,
    })
}
