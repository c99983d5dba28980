use crate::heightmap::{HeightGrid, NO_DATA};
use anyhow::{ensure, Context, Error};
use byteorder::{BigEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// Provider of one degree by one degree elevation cells.
pub trait HeightSource: Sync {
    /// Samples along each side of a cell. Neighboring cells share their boundary row and column.
    fn resolution(&self) -> usize;

    /// Elevation cell whose south west corner is at (`lat`, `lng`). Row 0 is the northern edge.
    /// Cells without data are returned as a grid filled with `NO_DATA`.
    fn load_cell(&self, lat: i32, lng: i32) -> Result<HeightGrid, Error>;
}

/// Directory of zipped SRTM 1 arc-second `.hgt` files, as distributed by NASA.
pub struct SrtmDirectory {
    directory: PathBuf,
}

impl SrtmDirectory {
    pub const RESOLUTION: usize = 3601;

    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into() }
    }

    pub fn cell_filename(lat: i32, lng: i32) -> String {
        format!(
            "{}{:02}{}{:03}.SRTMGL1.hgt.zip",
            if lat >= 0 { "N" } else { "S" },
            lat.abs(),
            if lng >= 0 { "E" } else { "W" },
            lng.abs()
        )
    }

    pub fn cell_path(&self, lat: i32, lng: i32) -> PathBuf {
        self.directory.join(Self::cell_filename(lat, lng))
    }
}

impl HeightSource for SrtmDirectory {
    fn resolution(&self) -> usize {
        Self::RESOLUTION
    }

    fn load_cell(&self, lat: i32, lng: i32) -> Result<HeightGrid, Error> {
        let path = self.cell_path(lat, lng);
        if !path.exists() {
            log::debug!("No elevation data for latitude {}, longitude {}", lat, lng);
            return Ok(HeightGrid::no_data(Self::RESOLUTION, Self::RESOLUTION));
        }
        read_hgt_zip(&path, Self::RESOLUTION)
            .with_context(|| format!("failed to load elevation cell {}", path.display()))
    }
}

/// Decode the first entry of a zip file as a square big-endian `.hgt` raster.
fn read_hgt_zip(path: &Path, resolution: usize) -> Result<HeightGrid, Error> {
    let mut zip = ZipArchive::new(File::open(path)?)?;
    ensure!(zip.len() > 0, "empty zip archive");

    let mut hgt = Vec::new();
    zip.by_index(0)?.read_to_end(&mut hgt)?;
    parse_hgt(&hgt, resolution)
}

pub(crate) fn parse_hgt(hgt: &[u8], resolution: usize) -> Result<HeightGrid, Error> {
    ensure!(
        hgt.len() == resolution * resolution * 2,
        "expected {} bytes of elevation data, found {}",
        resolution * resolution * 2,
        hgt.len()
    );

    let mut samples = vec![0i16; resolution * resolution];
    Cursor::new(hgt).read_i16_into::<BigEndian>(&mut samples)?;
    let heights = samples
        .into_iter()
        .map(|h| if h == i16::MIN { NO_DATA } else { h as f32 })
        .collect();
    Ok(HeightGrid::new(heights, resolution, resolution))
}
