use crate::mercator;

/// Axis aligned box in Mercator space. Follows the top-down convention of tile rows, so
/// `y0` is the northern edge and `y1 < y0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MercatorBox {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl MercatorBox {
    pub fn new(x0: f64, x1: f64, y0: f64, y1: f64) -> Self {
        debug_assert!(x0 < x1 && y1 < y0);
        Self { x0, x1, y0, y1 }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }
    pub fn height(&self) -> f64 {
        self.y0 - self.y1
    }

    /// Split at the midpoints. Indexed like `NODE_OFFSETS`.
    pub fn quadrants(&self) -> [MercatorBox; 4] {
        let xmid = (self.x0 + self.x1) / 2.0;
        let ymid = (self.y0 + self.y1) / 2.0;
        [
            MercatorBox { x0: self.x0, x1: xmid, y0: self.y0, y1: ymid },
            MercatorBox { x0: xmid, x1: self.x1, y0: self.y0, y1: ymid },
            MercatorBox { x0: self.x0, x1: xmid, y0: ymid, y1: self.y1 },
            MercatorBox { x0: xmid, x1: self.x1, y0: ymid, y1: self.y1 },
        ]
    }

    /// Grow every side by `margin` meters.
    pub fn inflate(&self, margin: f64) -> Self {
        Self {
            x0: self.x0 - margin,
            x1: self.x1 + margin,
            y0: self.y0 + margin,
            y1: self.y1 - margin,
        }
    }

    /// Geographic bounds as `(north, west, south, east)` in degrees.
    pub fn lat_lng_bounds(&self) -> (f64, f64, f64, f64) {
        let (north, west) = mercator::invert(self.x0, self.y0);
        let (south, east) = mercator::invert(self.x1, self.y1);
        (north, west, south, east)
    }

    /// Whether the whole box lies north of `+latitude` or south of `-latitude`.
    pub fn beyond_latitude(&self, latitude: f64) -> bool {
        let (north, _, south, _) = self.lat_lng_bounds();
        south > latitude || north < -latitude
    }
}
