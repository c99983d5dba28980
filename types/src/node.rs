use crate::{MercatorBox, MERCATOR_EXTENT};
use std::str::FromStr;

/// Offsets `(di, dj)` of the four children of a tile, in NW, NE, SW, SE order.
pub const NODE_OFFSETS: [(u32, u32); 4] = [(0, 0), (1, 0), (0, 1), (1, 1)];

/// Slippy map tile address: zoom `level`, column `i` counted eastwards from 180°W and row `j`
/// counted southwards from the northern edge of the Mercator square.
///
/// Packed into a single integer so that addresses are cheap to hash and compare. The derived
/// ordering sorts by `(level, i, j)`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileAddress(u64);

impl TileAddress {
    pub const MAX_LEVEL: u8 = 26;

    pub fn new(level: u8, i: u32, j: u32) -> Self {
        debug_assert!(level <= Self::MAX_LEVEL);
        debug_assert!(i < (1 << level) && j < (1 << level));
        Self((level as u64) << 56 | (i as u64) << 26 | (j as u64))
    }

    /// Like `new` but rejects addresses outside the pyramid.
    pub fn checked_new(level: u8, i: u32, j: u32) -> Option<Self> {
        if level > Self::MAX_LEVEL || i >= (1 << level) || j >= (1 << level) {
            return None;
        }
        Some(Self::new(level, i, j))
    }

    pub fn root() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn level(&self) -> u8 {
        (self.0 >> 56) as u8
    }
    pub fn i(&self) -> u32 {
        (self.0 >> 26) as u32 & 0x3ffffff
    }
    pub fn j(&self) -> u32 {
        self.0 as u32 & 0x3ffffff
    }

    /// Number of tiles along each axis at this tile's level.
    pub fn tiles_across(&self) -> u32 {
        1 << self.level()
    }

    pub fn parent(&self) -> Option<(TileAddress, u8)> {
        if self.level() == 0 {
            return None;
        }
        let child_index = ((self.i() % 2) + (self.j() % 2) * 2) as u8;
        Some((TileAddress::new(self.level() - 1, self.i() / 2, self.j() / 2), child_index))
    }

    pub fn children(&self) -> [TileAddress; 4] {
        assert!(self.level() < Self::MAX_LEVEL);
        let (level, i, j) = (self.level() + 1, self.i() * 2, self.j() * 2);
        NODE_OFFSETS.map(|(di, dj)| TileAddress::new(level, i + di, j + dj))
    }

    /// All tiles at `level` covered by this tile, in row-major order.
    pub fn descendants(&self, level: u8) -> impl Iterator<Item = TileAddress> {
        assert!(level >= self.level() && level <= Self::MAX_LEVEL);
        let shift = level - self.level();
        let n = 1u32 << shift;
        let (i0, j0) = (self.i() << shift, self.j() << shift);
        (0..n).flat_map(move |dj| (0..n).map(move |di| TileAddress::new(level, i0 + di, j0 + dj)))
    }

    /// The tile `di` columns and `dj` rows away. Columns wrap around the antimeridian, rows do
    /// not, so `None` is returned past the northern or southern edge.
    pub fn neighbor(&self, di: i64, dj: i64) -> Option<TileAddress> {
        let n = self.tiles_across() as i64;
        let j = self.j() as i64 + dj;
        if j < 0 || j >= n {
            return None;
        }
        let i = (self.i() as i64 + di).rem_euclid(n);
        Some(TileAddress::new(self.level(), i as u32, j as u32))
    }

    /// Mercator bounds computed from the address alone.
    pub fn bounds(&self) -> MercatorBox {
        let side = 2.0 * MERCATOR_EXTENT / self.tiles_across() as f64;
        let x0 = -MERCATOR_EXTENT + side * self.i() as f64;
        let y0 = MERCATOR_EXTENT - side * self.j() as f64;
        MercatorBox { x0, x1: x0 + side, y0, y1: y0 - side }
    }

    /// `(north, west, south, east)` in degrees.
    pub fn lat_lng_bounds(&self) -> (f64, f64, f64, f64) {
        self.bounds().lat_lng_bounds()
    }
}

impl std::fmt::Display for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}/{}/{}", self.level(), self.i(), self.j())
    }
}

impl std::fmt::Debug for TileAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "TileAddress[level={}, i={}, j={}]", self.level(), self.i(), self.j())
    }
}

impl FromStr for TileAddress {
    type Err = anyhow::Error;

    /// Accepts `level/i/j`, optionally followed by `.png`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_suffix(".png").unwrap_or(s);
        let mut parts = s.split('/');

        let level = parts
            .next()
            .map(str::parse::<u8>)
            .transpose()?
            .filter(|&l| l <= Self::MAX_LEVEL)
            .ok_or(anyhow::anyhow!("Invalid level in {:?}", s))?;
        let i = parts
            .next()
            .map(str::parse::<u32>)
            .transpose()?
            .ok_or(anyhow::anyhow!("Missing column in {:?}", s))?;
        let j = parts
            .next()
            .map(str::parse::<u32>)
            .transpose()?
            .ok_or(anyhow::anyhow!("Missing row in {:?}", s))?;

        if parts.next().is_some() {
            anyhow::bail!("Extra data in {:?}", s);
        }
        Self::checked_new(level, i, j)
            .ok_or(anyhow::anyhow!("Tile {}/{}/{} is outside the pyramid", level, i, j))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mercator;
    use approx::assert_relative_eq;

    #[test]
    fn packing() {
        let t = TileAddress::new(12, 4095, 17);
        assert_eq!((t.level(), t.i(), t.j()), (12, 4095, 17));
        let t = TileAddress::new(26, (1 << 26) - 1, (1 << 26) - 2);
        assert_eq!((t.level(), t.i(), t.j()), (26, (1 << 26) - 1, (1 << 26) - 2));
        assert!(TileAddress::checked_new(2, 4, 0).is_none());
        assert!(TileAddress::checked_new(27, 0, 0).is_none());
    }

    #[test]
    fn ordering_is_level_then_i_then_j() {
        let mut v = vec![
            TileAddress::new(2, 1, 0),
            TileAddress::new(1, 1, 1),
            TileAddress::new(2, 0, 3),
            TileAddress::new(2, 0, 1),
        ];
        v.sort();
        assert_eq!(
            v,
            vec![
                TileAddress::new(1, 1, 1),
                TileAddress::new(2, 0, 1),
                TileAddress::new(2, 0, 3),
                TileAddress::new(2, 1, 0),
            ]
        );
    }

    #[test]
    fn parent_and_children() {
        let t = TileAddress::new(3, 5, 2);
        for (index, child) in t.children().iter().enumerate() {
            assert_eq!(child.parent(), Some((t, index as u8)));
        }
        assert_eq!(t.children()[1], TileAddress::new(4, 11, 4));
        assert_eq!(t.children()[2], TileAddress::new(4, 10, 5));
        assert!(TileAddress::root().parent().is_none());
        assert_eq!(TileAddress::new(1, 0, 0).descendants(3).count(), 16);
        assert!(TileAddress::new(1, 1, 0)
            .descendants(3)
            .all(|d| d.i() >= 4 && d.i() < 8 && d.j() < 4));
    }

    #[test]
    fn neighbors_wrap_columns_only() {
        let t = TileAddress::new(2, 0, 0);
        assert_eq!(t.neighbor(-1, 0), Some(TileAddress::new(2, 3, 0)));
        assert_eq!(t.neighbor(4, 1), Some(TileAddress::new(2, 0, 1)));
        assert_eq!(t.neighbor(0, -1), None);
        assert_eq!(TileAddress::new(2, 3, 3).neighbor(1, 1), None);
    }

    #[test]
    fn bounds() {
        let root = TileAddress::root().bounds();
        assert_eq!(root.x0, -MERCATOR_EXTENT);
        assert_eq!(root.y1, -MERCATOR_EXTENT);

        let (north, west, south, east) = TileAddress::new(1, 1, 0).bounds().lat_lng_bounds();
        assert_relative_eq!(north, mercator::max_latitude(), epsilon = 1e-9);
        assert_relative_eq!(west, 0.0, epsilon = 1e-9);
        assert_relative_eq!(south, 0.0, epsilon = 1e-9);
        assert_relative_eq!(east, 180.0, epsilon = 1e-9);
    }

    #[test]
    fn parse() {
        let t: TileAddress = "12/2047/1024.png".parse().unwrap();
        assert_eq!(t, TileAddress::new(12, 2047, 1024));
        assert_eq!("3/1/2".parse::<TileAddress>().unwrap().to_string(), "3/1/2");
        assert!("3/8/2".parse::<TileAddress>().is_err());
        assert!("3/1".parse::<TileAddress>().is_err());
        assert!("3/1/2/4".parse::<TileAddress>().is_err());
        assert!("x/1/2".parse::<TileAddress>().is_err());
    }
}
