/// Sample value used for missing elevation data.
pub const NO_DATA: f32 = 0.0;

/// Row-major grid of elevation samples in meters. Row 0 is the northern edge.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    pub heights: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl HeightGrid {
    pub fn new(heights: Vec<f32>, width: usize, height: usize) -> Self {
        assert_eq!(heights.len(), width * height);
        HeightGrid { heights, width, height }
    }

    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        HeightGrid { heights: vec![value; width * height], width, height }
    }

    pub fn no_data(width: usize, height: usize) -> Self {
        Self::filled(width, height, NO_DATA)
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut heights = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                heights.push(f(x, y));
            }
        }
        HeightGrid { heights, width, height }
    }

    pub fn from_thumbnail(width: usize, height: usize, heights: &[u16]) -> Self {
        Self::new(heights.iter().map(|&h| h as f32).collect(), width, height)
    }

    /// Rounds to whole meters, clamping to the range representable by a height thumbnail.
    /// Rounding, not truncation, so a sample of 12.7 is stored as 13 rather than 12.
    pub fn to_thumbnail(&self) -> Vec<u16> {
        self.heights.iter().map(|&h| h.round().clamp(0.0, 65535.0) as u16).collect()
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.heights[x + y * self.width]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.heights[x + y * self.width] = value;
    }

    pub fn row(&self, y: usize) -> &[f32] {
        &self.heights[y * self.width..][..self.width]
    }

    pub fn is_no_data(&self) -> bool {
        self.heights.iter().all(|&h| h == NO_DATA)
    }

    /// Copy of the `width` x `height` window starting at (`x`, `y`). The window must lie inside
    /// the grid.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> HeightGrid {
        assert!(x + width <= self.width && y + height <= self.height);
        let mut heights = Vec::with_capacity(width * height);
        for row in y..(y + height) {
            heights.extend_from_slice(&self.heights[row * self.width + x..][..width]);
        }
        HeightGrid { heights, width, height }
    }

    /// Copy `other` into this grid with its top left corner at (`x`, `y`).
    pub fn blit(&mut self, other: &HeightGrid, x: usize, y: usize) {
        assert!(x + other.width <= self.width && y + other.height <= self.height);
        for row in 0..other.height {
            self.heights[(y + row) * self.width + x..][..other.width]
                .copy_from_slice(other.row(row));
        }
    }

    /// Round every sample to the nearest whole meter.
    pub fn round(&mut self) {
        for h in self.heights.iter_mut() {
            *h = h.round();
        }
    }

    /// Resample the whole grid to `width` x `height` with a bilinear filter.
    pub fn resize(&self, width: usize, height: usize) -> HeightGrid {
        self.resample([0.0, 0.0, self.width as f64, self.height as f64], width, height)
    }

    /// Resample the region `[x0, y0, x1, y1]` (in pixel edge coordinates) to `width` x `height`
    /// with a bilinear (triangle) filter. When shrinking, the filter support is widened by the
    /// scale factor so that every source sample contributes.
    pub fn resample(&self, region: [f64; 4], width: usize, height: usize) -> HeightGrid {
        let [x0, y0, x1, y1] = region;
        let horizontal = filter_weights(x0, x1, self.width, width);
        let vertical = filter_weights(y0, y1, self.height, height);

        let mut rows = vec![0.0f32; width * self.height];
        for y in 0..self.height {
            let src = self.row(y);
            let dst = &mut rows[y * width..][..width];
            for (d, (start, weights)) in dst.iter_mut().zip(&horizontal) {
                *d = weights
                    .iter()
                    .zip(&src[*start..])
                    .map(|(w, &h)| w * h as f64)
                    .sum::<f64>() as f32;
            }
        }

        let mut heights = vec![0.0f32; width * height];
        for (y, (start, weights)) in vertical.iter().enumerate() {
            let dst = &mut heights[y * width..][..width];
            for (k, w) in weights.iter().enumerate() {
                let src = &rows[(start + k) * width..][..width];
                for (d, &s) in dst.iter_mut().zip(src) {
                    *d += (w * s as f64) as f32;
                }
            }
        }
        HeightGrid { heights, width, height }
    }
}

/// For every output sample, the index of the first contributing input sample and the normalized
/// triangle filter weights.
fn filter_weights(in0: f64, in1: f64, in_size: usize, out_size: usize) -> Vec<(usize, Vec<f64>)> {
    let scale = (in1 - in0) / out_size as f64;
    let filter_scale = scale.max(1.0);
    let support = filter_scale;

    (0..out_size)
        .map(|i| {
            let center = in0 + (i as f64 + 0.5) * scale;
            let min = ((center - support + 0.5).trunc().max(0.0) as usize).min(in_size - 1);
            let max = ((center + support + 0.5).trunc().max(0.0) as usize).clamp(min + 1, in_size);

            let mut weights: Vec<f64> = (min..max)
                .map(|x| {
                    let t = ((x as f64 - center + 0.5) / filter_scale).abs();
                    if t < 1.0 {
                        1.0 - t
                    } else {
                        0.0
                    }
                })
                .collect();
            let total: f64 = weights.iter().sum();
            if total > 0.0 {
                weights.iter_mut().for_each(|w| *w /= total);
            } else {
                // The region lies entirely outside the grid; hold the nearest edge sample.
                weights.iter_mut().for_each(|w| *w = 0.0);
                weights[0] = 1.0;
            }
            (min, weights)
        })
        .collect()
}
