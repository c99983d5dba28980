use crate::heightmap::HeightGrid;
use image::GrayImage;

/// Compass direction the light comes from, in degrees.
const AZIMUTH: f64 = 60.0;
/// Elevation of the light above the horizon, in degrees.
const ALTITUDE: f64 = 30.0;

/// Central difference derivative along one axis, one sided at the edges.
#[inline]
fn derivative(before: Option<f32>, center: f32, after: Option<f32>) -> f64 {
    match (before, after) {
        (Some(b), Some(a)) => (a as f64 - b as f64) / 2.0,
        (None, Some(a)) => a as f64 - center as f64,
        (Some(b), None) => center as f64 - b as f64,
        (None, None) => 0.0,
    }
}

/// Shade `heights` under a fixed light direction, one pixel per sample.
///
/// Shadows are compressed into the upper two thirds of the gray range so that steep slopes
/// facing away from the light never go fully black.
pub fn hillshade(heights: &HeightGrid) -> GrayImage {
    let (width, height) = (heights.width, heights.height);
    let azimuth = (360.0 - AZIMUTH).to_radians();
    let altitude = ALTITUDE.to_radians();
    let (sin_alt, cos_alt) = altitude.sin_cos();

    GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let center = heights.at(x, y);
        let d_row = derivative(
            y.checked_sub(1).map(|y| heights.at(x, y)),
            center,
            (y + 1 < height).then(|| heights.at(x, y + 1)),
        );
        let d_col = derivative(
            x.checked_sub(1).map(|x| heights.at(x, y)),
            center,
            (x + 1 < width).then(|| heights.at(x + 1, y)),
        );

        let slope = std::f64::consts::FRAC_PI_2 - d_row.hypot(d_col).atan();
        let aspect = f64::atan2(-d_row, d_col);
        let shaded = sin_alt * slope.sin()
            + cos_alt * slope.cos() * ((azimuth - std::f64::consts::FRAC_PI_2) - aspect).cos();

        let value = (255.0 * (shaded + 1.0) / 2.0).clamp(0.0, 255.0) as u8;
        image::Luma([255 - (255 - value) / 3])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_terrain() {
        let image = hillshade(&HeightGrid::filled(12, 7, 120.0));
        assert_eq!(image.dimensions(), (12, 7));
        // sin(30°) = 0.5, so 255 * 0.75 = 191, lightened to 255 - 64/3 = 234.
        assert!(image.pixels().all(|p| p.0[0] == 234));
    }

    #[test]
    fn slopes_facing_the_light_are_brighter() {
        // Terrain rising towards the east faces west, away from the light.
        let rising_east = HeightGrid::from_fn(16, 16, |x, _| x as f32 * 0.5);
        let rising_west = HeightGrid::from_fn(16, 16, |x, _| (16 - x) as f32 * 0.5);
        let east = hillshade(&rising_east).get_pixel(8, 8).0[0];
        let west = hillshade(&rising_west).get_pixel(8, 8).0[0];
        assert!(west > east, "{} <= {}", west, east);
    }

    #[test]
    fn never_darker_than_a_third_of_the_range() {
        let cliffs = HeightGrid::from_fn(9, 9, |x, y| if (x + y) % 2 == 0 { 0.0 } else { 5000.0 });
        assert!(hillshade(&cliffs).pixels().all(|p| p.0[0] >= 170));
    }

    #[test]
    fn one_sided_edges() {
        let ramp = HeightGrid::from_fn(5, 5, |x, y| (x + 2 * y) as f32);
        let image = hillshade(&ramp);
        // A linear ramp has the same gradient everywhere, including the border.
        let first = image.get_pixel(0, 0).0[0];
        assert!(image.pixels().all(|p| p.0[0] == first));
    }
}
