//! Synthesis of coarser levels from the height thumbnails of the level below.
//!
//! A merged tile is hillshaded from a padded buffer made of its four children's thumbnails plus
//! an 8 pixel halo taken from the twelve thumbnails around them. Since neighboring merged tiles
//! see the same heights across their shared edge, their shading matches without seams.

use crate::heightmap::HeightGrid;
use crate::leaf::{write_padded_tile, PADDED_SIZE};
use crate::tiles::TileStore;
use anyhow::Error;
use itertools::Itertools;
use types::{TileAddress, THUMBNAIL_SIZE, TILE_MARGIN, TILE_SIZE};

/// Where the thumbnail `d` positions away from the first child contributes along one axis, as
/// `(source offset, length, destination offset)`.
fn strip(d: i64) -> (usize, usize, usize) {
    let (t, m) = (THUMBNAIL_SIZE as usize, TILE_MARGIN as usize);
    match d {
        -1 => (t - m, m, 0),
        0 => (0, t, m),
        1 => (0, t, m + t),
        _ => (0, m, m + 2 * t),
    }
}

/// Build the padded height buffer of `tile` from the thumbnails one level below it. Thumbnails
/// wrap around in longitude. Those beyond the poles or never rendered count as zero.
pub fn assemble(store: &TileStore, tile: TileAddress) -> Result<HeightGrid, Error> {
    let first_child = tile.children()[0];
    let mut padded = HeightGrid::no_data(PADDED_SIZE, PADDED_SIZE);

    for (dj, di) in (-1..=2).cartesian_product(-1..=2) {
        let thumbnail = store.read_thumbnail(first_child.neighbor(di, dj))?;
        let (sx, width, dx) = strip(di);
        let (sy, height, dy) = strip(dj);
        padded.blit(&thumbnail.crop(sx, sy, width, height), dx, dy);
    }
    Ok(padded)
}

/// Render `tile` and its thumbnail from the level below. All thumbnails of that level must have
/// been written already.
pub fn merge_tile(store: &TileStore, tile: TileAddress) -> Result<(), Error> {
    let padded = assemble(store, tile)?;
    let (m, size) = (TILE_MARGIN as usize, TILE_SIZE as usize);
    let thumbnail = padded
        .crop(m, m, size, size)
        .resize(THUMBNAIL_SIZE as usize, THUMBNAIL_SIZE as usize);
    write_padded_tile(store, tile, &padded, &thumbnail)
}
