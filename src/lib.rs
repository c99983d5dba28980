//! Generation of shaded relief slippy map tiles from SRTM elevation data.
//!
//! Building a tile pyramid happens in two steps. First [`build_empties`] classifies which tiles
//! contain no land so that they can be skipped, and the result is persisted with
//! [`EmptinessSet::save`]. Then [`generate_tiles`] renders the finest level from elevation cells
//! and derives every coarser level from the height thumbnails of the level below.

pub mod config;
pub mod dem;
pub mod empties;
pub mod error;
pub mod heightmap;
pub mod hillshade;
pub mod landmass;
pub mod leaf;
pub mod merge;
pub mod pyramid;
pub mod quadtree;
pub mod reproject;
pub mod tiles;

pub use config::{Config, EmptiesConfig, PyramidConfig};
pub use dem::{HeightSource, SrtmDirectory};
pub use empties::{build_empties, EmptinessSet};
pub use error::GenerateError;
pub use heightmap::{HeightGrid, NO_DATA};
pub use landmass::Landmass;
pub use pyramid::{generate_tiles, GenerationSummary};
pub use types::TileAddress;
