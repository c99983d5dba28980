use std::f64::consts::PI;

mod math;
pub mod mercator;
mod node;

pub use math::MercatorBox;
pub use node::{TileAddress, NODE_OFFSETS};

/// Radius of the sphere used by the spherical Mercator projection, in meters.
pub const EARTH_RADIUS: f64 = 6371000.0;

/// Half the side length of the square Mercator extent covered by level 0.
pub const MERCATOR_EXTENT: f64 = PI * EARTH_RADIUS;

/// Side length of a rendered tile, in pixels.
pub const TILE_SIZE: u32 = 256;
/// Side length of the height thumbnail stored next to every rendered tile.
pub const THUMBNAIL_SIZE: u32 = 128;
/// Context kept on each side of a tile while hillshading.
pub const TILE_MARGIN: u32 = 8;

/// Which child of a node a quadrant index refers to. Matches the ordering of `NODE_OFFSETS`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NorthWest = 0,
    NorthEast = 1,
    SouthWest = 2,
    SouthEast = 3,
}
impl Quadrant {
    pub const ALL: [Quadrant; 4] =
        [Quadrant::NorthWest, Quadrant::NorthEast, Quadrant::SouthWest, Quadrant::SouthEast];

    pub fn index(self) -> usize {
        self as usize
    }
}
impl std::fmt::Display for Quadrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Quadrant::NorthWest => "NW",
                Quadrant::NorthEast => "NE",
                Quadrant::SouthWest => "SW",
                Quadrant::SouthEast => "SE",
            }
        )
    }
}
