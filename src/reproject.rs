//! Joining of equirectangular elevation cells and their conversion into Mercator space.

use crate::dem::HeightSource;
use crate::heightmap::HeightGrid;
use crate::quadtree::covering_cells;
use anyhow::Error;
use std::collections::BTreeSet;
use types::{mercator, MercatorBox};

/// Extra margin around a block when choosing source cells, as a fraction of the block's width.
/// Covers the 8 pixel hillshade margin of a 256 pixel tile with some slack.
pub const SOURCE_MARGIN: f64 = 1.1 * 8.0 / 256.0;

/// Affine map from `[x0, x1]` onto `[y0, y1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearInterpolator {
    x0: f64,
    x1: f64,
    y0: f64,
    y1: f64,
}
impl LinearInterpolator {
    pub fn new(x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        Self { x0, x1, y0, y1 }
    }

    #[inline]
    pub fn map(&self, x: f64) -> f64 {
        self.y0 + (x - self.x0) * (self.y1 - self.y0) / (self.x1 - self.x0)
    }
}

/// Range of integer degree cells needed to cover some Mercator box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceExtent {
    /// `(lng, lat)` of the south west corner of each covering cell.
    pub cells: BTreeSet<(i32, i32)>,
    pub lng_min: i32,
    pub lng_max: i32,
    pub lat_min: i32,
    pub lat_max: i32,
}

impl SourceExtent {
    pub fn for_node(bounds: &MercatorBox, margin_fraction: f64) -> Self {
        Self::from_cells(covering_cells(bounds, margin_fraction))
    }

    pub fn from_cells(cells: BTreeSet<(i32, i32)>) -> Self {
        assert!(!cells.is_empty());
        let lng_min = cells.iter().map(|c| c.0).min().unwrap_or_default();
        let lng_max = cells.iter().map(|c| c.0).max().unwrap_or_default();
        let lat_min = cells.iter().map(|c| c.1).min().unwrap_or_default();
        let lat_max = cells.iter().map(|c| c.1).max().unwrap_or_default();
        Self { cells, lng_min, lng_max, lat_min, lat_max }
    }

    pub fn delta_lng(&self) -> usize {
        (self.lng_max + 1 - self.lng_min) as usize
    }

    pub fn delta_lat(&self) -> usize {
        (self.lat_max + 1 - self.lat_min) as usize
    }

    /// Mercator box spanned by the cells, from the south west corner of the south west cell to
    /// the north east corner of the north east cell.
    pub fn mercator_bounds(&self) -> MercatorBox {
        let (x0, y1) = mercator::project(self.lat_min as f64, self.lng_min as f64);
        let (x1, y0) = mercator::project(self.lat_max as f64 + 1.0, self.lng_max as f64 + 1.0);
        MercatorBox::new(x0, x1, y0, y1)
    }
}

/// Equirectangular elevation raster whose row 0 lies at latitude `lat_max + 1`.
pub struct EquirectRaster {
    pub heights: HeightGrid,
    pub samples_per_degree: f64,
}

/// Elevation in Mercator space together with the maps from Mercator coordinates to pixels.
pub struct MercatorRaster {
    pub heights: HeightGrid,
    pub x_to_px: LinearInterpolator,
    pub y_to_px: LinearInterpolator,
}

/// Assemble all cells of `extent` into a single raster.
///
/// At full resolution adjacent cells share one row or column of samples. With a `cell_size` the
/// shared boundary is dropped and each cell is resampled to `cell_size` squared, so cells tile
/// without overlap.
pub fn join_cells(
    source: &dyn HeightSource,
    extent: &SourceExtent,
    cell_size: Option<usize>,
) -> Result<EquirectRaster, Error> {
    let resolution = source.resolution();
    let (size, overlap) = match cell_size {
        Some(size) if size != resolution => (size, 0),
        _ => (resolution, 1),
    };
    log::debug!(
        "Joining {} x {} elevation cells at {} x {} samples each",
        extent.delta_lng(),
        extent.delta_lat(),
        size,
        size
    );

    let width = (size - overlap) * extent.delta_lng() + overlap;
    let height = (size - overlap) * extent.delta_lat() + overlap;
    let mut heights = HeightGrid::no_data(width, height);

    for &(lng, lat) in &extent.cells {
        let mut cell = source.load_cell(lat, lng)?;
        if overlap == 0 {
            cell = cell.crop(0, 0, resolution - 1, resolution - 1).resize(size, size);
        }
        let row = (size - overlap) * (extent.lat_max - lat) as usize;
        let col = (size - overlap) * (lng - extent.lng_min) as usize;
        heights.blit(&cell, col, row);
    }

    Ok(EquirectRaster { heights, samples_per_degree: (size - overlap) as f64 })
}

/// Convert an equirectangular raster covering `extent` to Mercator space.
///
/// The output keeps the input width. Every output row is the mean of all input rows within the
/// latitude band the row spans.
pub fn reproject(raster: &EquirectRaster, extent: &SourceExtent) -> MercatorRaster {
    let bounds = extent.mercator_bounds();
    let (dx, dy) = (bounds.width(), bounds.height());
    let input = &raster.heights;
    let width = input.width;
    let height = (dy * width as f64 / dx).floor() as usize;
    let top_latitude = extent.lat_max as f64 + 1.0;
    let last_row = input.height - 1;

    let mut heights = HeightGrid::no_data(width, height);
    for row in 0..height {
        let y0 = bounds.y0 - row as f64 / height as f64 * dy;
        let y1 = bounds.y0 - (row + 1) as f64 / height as f64 * dy;
        let (lat0, _) = mercator::invert(0.0, y0);
        let (lat1, _) = mercator::invert(0.0, y1);

        let index0 = ((top_latitude - lat0) * raster.samples_per_degree).floor().max(0.0) as usize;
        let index1 = ((top_latitude - lat1) * raster.samples_per_degree).ceil().max(0.0) as usize;
        let (index0, index1) = (index0.min(last_row), index1.min(last_row));

        let output = &mut heights.heights[row * width..][..width];
        for source_row in index0..=index1 {
            for (o, &h) in output.iter_mut().zip(input.row(source_row)) {
                *o += h;
            }
        }
        let count = (index1 - index0 + 1) as f32;
        output.iter_mut().for_each(|o| *o /= count);
    }

    MercatorRaster {
        heights,
        x_to_px: LinearInterpolator::new(bounds.x0, bounds.x1, 0.0, width as f64),
        y_to_px: LinearInterpolator::new(bounds.y0, bounds.y1, 0.0, height as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Cells of constant height `lat * 1000 + lng`.
    struct Constant(usize);
    impl HeightSource for Constant {
        fn resolution(&self) -> usize {
            self.0
        }
        fn load_cell(&self, lat: i32, lng: i32) -> Result<HeightGrid, Error> {
            Ok(HeightGrid::filled(self.0, self.0, (lat * 1000 + lng) as f32))
        }
    }

    fn extent(lng_min: i32, lng_max: i32, lat_min: i32, lat_max: i32) -> SourceExtent {
        let mut cells = BTreeSet::new();
        for lng in lng_min..=lng_max {
            for lat in lat_min..=lat_max {
                cells.insert((lng, lat));
            }
        }
        SourceExtent::from_cells(cells)
    }

    #[test]
    fn interpolator() {
        let f = LinearInterpolator::new(10.0, 20.0, 0.0, 100.0);
        assert_eq!(f.map(10.0), 0.0);
        assert_eq!(f.map(15.0), 50.0);
        assert_eq!(f.map(25.0), 150.0);
        let g = LinearInterpolator::new(5.0, -5.0, 0.0, 10.0);
        assert_eq!(g.map(5.0), 0.0);
        assert_eq!(g.map(-5.0), 10.0);
    }

    #[test]
    fn extent_of_cells() {
        let e = extent(3, 5, -2, 0);
        assert_eq!((e.delta_lng(), e.delta_lat()), (3, 3));
        let b = e.mercator_bounds();
        let (north, west, south, east) = b.lat_lng_bounds();
        assert_relative_eq!(north, 1.0, epsilon = 1e-9);
        assert_relative_eq!(west, 3.0, epsilon = 1e-9);
        assert_relative_eq!(south, -2.0, epsilon = 1e-9);
        assert_relative_eq!(east, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn join_full_resolution() {
        let e = extent(10, 11, 20, 21);
        let joined = join_cells(&Constant(5), &e, None).unwrap();
        assert_eq!((joined.heights.width, joined.heights.height), (9, 9));
        assert_eq!(joined.samples_per_degree, 4.0);
        // North west cell is (lng 10, lat 21); later cells overwrite the shared boundary.
        assert_eq!(joined.heights.at(0, 0), 21010.0);
        assert_eq!(joined.heights.at(8, 0), 21011.0);
        assert_eq!(joined.heights.at(0, 8), 20010.0);
        assert_eq!(joined.heights.at(8, 8), 20011.0);
    }

    #[test]
    fn join_downsampled() {
        let e = extent(10, 12, 20, 20);
        let joined = join_cells(&Constant(9), &e, Some(4)).unwrap();
        assert_eq!((joined.heights.width, joined.heights.height), (12, 4));
        assert_eq!(joined.samples_per_degree, 4.0);
        assert_relative_eq!(joined.heights.at(3, 3), 20010.0, epsilon = 1e-2);
        assert_relative_eq!(joined.heights.at(4, 0), 20011.0, epsilon = 1e-2);
        assert_relative_eq!(joined.heights.at(11, 2), 20012.0, epsilon = 1e-2);
    }

    #[test]
    fn reprojection_geometry() {
        let e = extent(0, 1, 0, 1);
        let joined = join_cells(&Constant(11), &e, None).unwrap();
        let merc = reproject(&joined, &e);
        let b = e.mercator_bounds();

        assert_eq!(merc.heights.width, 21);
        assert_eq!(merc.heights.height, (b.height() * 21.0 / b.width()).floor() as usize);
        assert_relative_eq!(merc.x_to_px.map(b.x0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(merc.x_to_px.map(b.x1), 21.0, epsilon = 1e-9);
        assert_relative_eq!(merc.y_to_px.map(b.y0), 0.0, epsilon = 1e-9);
        assert_relative_eq!(merc.y_to_px.map(b.y1), merc.heights.height as f64, epsilon = 1e-9);

        // Rows average source rows, so the top rows carry the northern cells' values.
        assert_relative_eq!(merc.heights.at(0, 0), 1000.0, epsilon = 1e-3);
        let last = merc.heights.height - 1;
        assert_relative_eq!(merc.heights.at(20, last), 1.0, epsilon = 1e-3);
    }

    /// Cells between 60° and 70° north whose samples hold their row index in the joined raster.
    struct LatitudeRamp;
    impl HeightSource for LatitudeRamp {
        fn resolution(&self) -> usize {
            101
        }
        fn load_cell(&self, lat: i32, _: i32) -> Result<HeightGrid, Error> {
            let first_row = 100 * (69 - lat) as usize;
            Ok(HeightGrid::from_fn(101, 101, |_, y| (first_row + y) as f32))
        }
    }

    #[test]
    fn rows_average_their_latitude_band() {
        let e = extent(0, 0, 60, 69);
        let joined = join_cells(&LatitudeRamp, &e, None).unwrap();
        assert_eq!(joined.heights.height, 1001);
        let merc = reproject(&joined, &e);
        let b = e.mercator_bounds();

        // Rows near 70° span fewer source rows than rows near 60°.
        let height = merc.heights.height;
        assert!(height > 2000);
        for row in 0..height {
            let y = b.y0 - (row as f64 + 0.5) / height as f64 * b.height();
            let (lat, _) = mercator::invert(0.0, y);
            let expected = (70.0 - lat) * joined.samples_per_degree;
            for &h in merc.heights.row(row) {
                assert!((h as f64 - expected).abs() < 0.5, "row {}: {} vs {}", row, h, expected);
            }
        }
    }

    #[test]
    fn reprojection_preserves_constants() {
        struct Flat;
        impl HeightSource for Flat {
            fn resolution(&self) -> usize {
                31
            }
            fn load_cell(&self, _: i32, _: i32) -> Result<HeightGrid, Error> {
                Ok(HeightGrid::filled(31, 31, 250.0))
            }
        }
        let e = extent(-2, 1, 55, 58);
        let merc = reproject(&join_cells(&Flat, &e, None).unwrap(), &e);
        assert!(merc.heights.height > merc.heights.width);
        for &h in &merc.heights.heights {
            assert_relative_eq!(h, 250.0, epsilon = 1e-3);
        }
    }
}
