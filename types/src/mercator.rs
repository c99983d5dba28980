//! Forward and inverse spherical Mercator projection.
//!
//! Angles are in degrees. Projected coordinates are in meters on a sphere of radius
//! [`EARTH_RADIUS`], with `x` growing eastwards and `y` growing northwards.

use crate::{EARTH_RADIUS, MERCATOR_EXTENT};
use std::f64::consts::PI;

/// Project a geographic coordinate. `lat` must lie strictly within (-90, 90).
#[inline]
pub fn project(lat: f64, lng: f64) -> (f64, f64) {
    debug_assert!(lat.abs() < 90.0);
    let x = EARTH_RADIUS * lng * PI / 180.0;
    let y = EARTH_RADIUS * f64::ln(f64::tan(PI / 4.0 + lat * PI / 360.0));
    (x, y)
}

/// Exact inverse of [`project`]. Returns `(lat, lng)`.
#[inline]
pub fn invert(x: f64, y: f64) -> (f64, f64) {
    let lng = (x * 180.0 / PI) / EARTH_RADIUS;
    let lat = 360.0 * (f64::atan(f64::exp(y / EARTH_RADIUS)) - PI / 4.0) / PI;
    (lat, lng)
}

/// Latitude of the northern edge of the square level 0 tile (about 85.0511°).
pub fn max_latitude() -> f64 {
    invert(0.0, MERCATOR_EXTENT).0
}
