use crate::heightmap::HeightGrid;
use anyhow::{ensure, Context, Error};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use image::{GrayImage, ImageFormat};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use types::{TileAddress, THUMBNAIL_SIZE};

/// Directory tree of rendered tiles, laid out as `{level}/{i}/{j}.png` with the height thumbnail
/// of each tile next to it as `{level}/{i}/{j}.hgt.pgm`.
#[derive(Clone, Debug)]
pub struct TileStore {
    root: PathBuf,
}

impl TileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn directory(&self, tile: TileAddress) -> PathBuf {
        self.root.join(tile.level().to_string()).join(tile.i().to_string())
    }

    pub fn image_path(&self, tile: TileAddress) -> PathBuf {
        self.directory(tile).join(format!("{}.png", tile.j()))
    }

    pub fn thumbnail_path(&self, tile: TileAddress) -> PathBuf {
        self.directory(tile).join(format!("{}.hgt.pgm", tile.j()))
    }

    /// Write both artifacts of a tile. Each file only becomes visible once fully written.
    pub fn write(
        &self,
        tile: TileAddress,
        image: &GrayImage,
        thumbnail: &HeightGrid,
    ) -> Result<(), Error> {
        let size = THUMBNAIL_SIZE as usize;
        ensure!(
            thumbnail.width == size && thumbnail.height == size,
            "height thumbnail for {} has size {}x{}",
            tile,
            thumbnail.width,
            thumbnail.height
        );
        fs::create_dir_all(self.directory(tile))?;

        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;
        write_atomic(&self.image_path(tile), png.get_ref())?;

        let pgm = tilefmt::encode_height_thumbnail(size, size, &thumbnail.to_thumbnail());
        write_atomic(&self.thumbnail_path(tile), &pgm)
    }

    /// Height thumbnail of a tile, or all zeros if it was never rendered. Passing `None` (a tile
    /// beyond the edge of the pyramid) also yields zeros.
    pub fn read_thumbnail(&self, tile: Option<TileAddress>) -> Result<HeightGrid, Error> {
        let size = THUMBNAIL_SIZE as usize;
        let tile = match tile {
            Some(tile) => tile,
            None => return Ok(HeightGrid::no_data(size, size)),
        };

        let path = self.thumbnail_path(tile);
        if !path.exists() {
            log::debug!("Height data for tile {} does not exist", tile);
            return Ok(HeightGrid::no_data(size, size));
        }
        let bytes = fs::read(&path)?;
        let (width, height, heights) = tilefmt::decode_height_thumbnail(&bytes)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        ensure!(
            width == size && height == size,
            "{} has size {}x{}",
            path.display(),
            width,
            height
        );
        Ok(HeightGrid::from_thumbnail(width, height, &heights))
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), Error> {
    AtomicFile::new(path, OverwriteBehavior::AllowOverwrite)
        .write(|f| f.write_all(contents))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
