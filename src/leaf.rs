//! Rendering of the finest level directly from elevation data.

use crate::dem::HeightSource;
use crate::heightmap::HeightGrid;
use crate::hillshade::hillshade;
use crate::reproject::{join_cells, reproject, MercatorRaster, SourceExtent, SOURCE_MARGIN};
use crate::tiles::TileStore;
use anyhow::Error;
use image::imageops;
use types::{TileAddress, THUMBNAIL_SIZE, TILE_MARGIN, TILE_SIZE};

/// Side length of the buffer a tile is hillshaded in, including the margin on both sides.
pub const PADDED_SIZE: usize = (TILE_SIZE + 2 * TILE_MARGIN) as usize;

/// Hillshade a padded height buffer and write the central tile along with `thumbnail`.
pub(crate) fn write_padded_tile(
    store: &TileStore,
    tile: TileAddress,
    padded: &HeightGrid,
    thumbnail: &HeightGrid,
) -> Result<(), Error> {
    debug_assert_eq!((padded.width, padded.height), (PADDED_SIZE, PADDED_SIZE));

    let shaded = hillshade(padded);
    let image =
        imageops::crop_imm(&shaded, TILE_MARGIN, TILE_MARGIN, TILE_SIZE, TILE_SIZE).to_image();
    store.write(tile, &image, thumbnail)
}

/// Thumbnail of the tile area of a leaf's padded buffer. The sampled box is `[8, 263)`, one pixel
/// short of the tile on the east and south edges, which is what existing leaf thumbnails hold.
/// The filter support of the westernmost and northernmost samples extends into the margin.
fn leaf_thumbnail(padded: &HeightGrid) -> HeightGrid {
    let mut heights = padded.clone();
    heights.round();
    let (m, inner) = (TILE_MARGIN as f64, (TILE_MARGIN + TILE_SIZE - 1) as f64);
    heights.resample([m, m, inner, inner], THUMBNAIL_SIZE as usize, THUMBNAIL_SIZE as usize)
}

/// Render a single tile out of a reprojected raster that covers it with some margin.
pub fn render_leaf(
    store: &TileStore,
    raster: &MercatorRaster,
    tile: TileAddress,
) -> Result<(), Error> {
    let bounds = tile.bounds();
    let px_x0 = raster.x_to_px.map(bounds.x0);
    let px_x1 = raster.x_to_px.map(bounds.x1);
    let px_y0 = raster.y_to_px.map(bounds.y0);
    let px_y1 = raster.y_to_px.map(bounds.y1);

    // 8 pixels on each side of a 256 pixel tile.
    let margin = (px_x1 - px_x0) / 32.0;
    let clamp = |v: f64, max: usize| (v.round().max(0.0) as usize).min(max);
    let heights = &raster.heights;
    let ix0 = clamp(px_x0 - margin, heights.width - 1);
    let ix1 = clamp(px_x1 + margin + 1.0, heights.width).max(ix0 + 1);
    let iy0 = clamp(px_y0 - margin, heights.height - 1);
    let iy1 = clamp(px_y1 + margin + 1.0, heights.height).max(iy0 + 1);

    let padded = heights.crop(ix0, iy0, ix1 - ix0, iy1 - iy0).resize(PADDED_SIZE, PADDED_SIZE);
    write_padded_tile(store, tile, &padded, &leaf_thumbnail(&padded))
}

/// Render all `leaves` of a block from one shared reprojected raster. Returns the number of tiles
/// written. No elevation data is loaded when there is nothing to render.
pub fn render_block(
    store: &TileStore,
    source: &dyn HeightSource,
    block: TileAddress,
    leaves: &[TileAddress],
    cell_size: Option<usize>,
) -> Result<usize, Error> {
    if leaves.is_empty() {
        log::info!("Block {} is fully empty and can be skipped", block);
        return Ok(0);
    }

    let extent = SourceExtent::for_node(&block.bounds(), SOURCE_MARGIN);
    let joined = join_cells(source, &extent, cell_size)?;
    let raster = reproject(&joined, &extent);
    log::info!(
        "Generating {} tiles for block {} from {} x {} elevation cells",
        leaves.len(),
        block,
        extent.delta_lng(),
        extent.delta_lat()
    );

    for &leaf in leaves {
        render_leaf(store, &raster, leaf)?;
    }
    Ok(leaves.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reproject::LinearInterpolator;
    use approx::assert_relative_eq;

    struct Unreachable;
    impl HeightSource for Unreachable {
        fn resolution(&self) -> usize {
            3601
        }
        fn load_cell(&self, lat: i32, lng: i32) -> Result<HeightGrid, Error> {
            panic!("loaded cell {} {}", lat, lng)
        }
    }

    #[test]
    fn empty_block_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = TileStore::new(dir.path().join("tiles"));
        let written =
            render_block(&store, &Unreachable, TileAddress::new(7, 20, 30), &[], None).unwrap();
        assert_eq!(written, 0);
        assert!(!store.root().exists());
    }

    #[test]
    fn leaf_from_raster() {
        let dir = tempfile::tempdir().unwrap();
        let store = TileStore::new(dir.path());

        // A raster of 600 x 600 pixels spanning the level 1 tile 1/1/1 with a margin.
        let tile = TileAddress::new(1, 1, 1);
        let b = tile.bounds();
        let margin = b.width() / 10.0;
        let raster = MercatorRaster {
            heights: HeightGrid::filled(600, 600, 1500.0),
            x_to_px: LinearInterpolator::new(b.x0 - margin, b.x1 + margin, 0.0, 600.0),
            y_to_px: LinearInterpolator::new(b.y0 + margin, b.y1 - margin, 0.0, 600.0),
        };
        render_leaf(&store, &raster, tile).unwrap();

        let image = image::open(store.image_path(tile)).unwrap().into_luma8();
        assert_eq!(image.dimensions(), (256, 256));
        assert!(image.pixels().all(|p| p.0[0] == 234));

        let thumbnail = store.read_thumbnail(Some(tile)).unwrap();
        assert!(thumbnail.heights.iter().all(|&h| h == 1500.0));
    }

    #[test]
    fn thumbnail_samples_the_tile_interior() {
        let dir = tempfile::tempdir().unwrap();
        let store = TileStore::new(dir.path());
        let padded = HeightGrid::from_fn(PADDED_SIZE, PADDED_SIZE, |x, y| {
            if x < 8 || y < 8 || x >= 264 || y >= 264 {
                9000.0
            } else {
                100.0
            }
        });
        write_padded_tile(&store, TileAddress::root(), &padded, &leaf_thumbnail(&padded)).unwrap();
        let thumbnail = store.read_thumbnail(Some(TileAddress::root())).unwrap();
        // Only the first row and column have filter support reaching into the margin.
        for y in 1..128 {
            for x in 1..128 {
                assert_eq!(thumbnail.at(x, y), 100.0);
            }
        }
        assert!(thumbnail.at(0, 64) > 100.0);
        assert!(thumbnail.at(64, 0) > 100.0);
    }

    #[test]
    fn thumbnail_box_on_a_ramp() {
        let padded = HeightGrid::from_fn(PADDED_SIZE, PADDED_SIZE, |x, _| 10.0 * x as f32);
        let thumbnail = leaf_thumbnail(&padded);

        // Sample `i` is centered at `8 + (i + 0.5) * 255 / 128` in pixel edge coordinates.
        for x in 0..128 {
            let center = 8.0 + (x as f32 + 0.5) * 255.0 / 128.0;
            assert_relative_eq!(thumbnail.at(x, 40), 10.0 * (center - 0.5), epsilon = 0.1);
        }
        assert_relative_eq!(thumbnail.at(0, 0), 84.96, epsilon = 0.01);
        assert_relative_eq!(thumbnail.at(64, 0), 1359.98, epsilon = 0.01);
        assert_relative_eq!(thumbnail.at(127, 0), 2615.04, epsilon = 0.01);
    }
}
