// THEORY:
// Neighborhood filters (convolutions and the median) compute a pixel from the pixels
// around it, so they cannot write into the buffer they read: a sibling task could
// already have overwritten a neighbor. They run as copy filters instead. The unit
// transform reads `input`, which no one mutates during the pass, and writes the
// same coordinates of a separate `output` buffer. The engine swaps `output` over
// `input` once every region is done.
//
// Edge policy for convolutions (clamp to the nearest interior sample):
// - neighbor out of bounds on x only: sample `(x, ny)`
// - neighbor out of bounds on y only: sample `(nx, y)`
// - out of bounds on both axes:       sample the center pixel
//
// The median does not clamp. Out-of-bounds positions are dropped from the sample set.

use crate::core_modules::pixel::pixel::{Channel, Pixel};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region::Region;

pub type Weight = f64;

/// Intensity at which the blur kernels stop growing (an 11x11 kernel).
const MAX_BLUR_INTENSITY: i32 = 100;

const LAPLACIAN: [[Weight; 3]; 3] = [[-1.0, -1.0, -1.0], [-1.0, 8.0, -1.0], [-1.0, -1.0, -1.0]];

/// A square correlation matrix. `weights[dx][dy]` applies to the neighbor at
/// `(x + dx - size / 2, y + dy - size / 2)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Kernel {
    size: usize,
    weights: Vec<Vec<Weight>>,
}

impl Kernel {
    pub fn new(weights: Vec<Vec<Weight>>) -> Self {
        let size = weights.len();
        assert!(size > 0, "kernel must not be empty");
        assert!(weights.iter().all(|row| row.len() == size), "kernel must be square");
        Self { size, weights }
    }

    /// Side length used by the blur kernels: `intensity / 10 + 1`, between 1 and 11.
    pub fn blur_size(intensity: i32) -> usize {
        (intensity.clamp(0, MAX_BLUR_INTENSITY) / 10 + 1) as usize
    }

    /// Uniform `1 / n^2` weights.
    pub fn box_blur(size: usize) -> Self {
        let w = 1.0 / (size * size) as Weight;
        Self::new(vec![vec![w; size]; size])
    }

    /// Outer product of the binomial row of length `size`, normalized by
    /// `2^(2 * size - 2)` so the weights sum to one.
    pub fn gaussian(size: usize) -> Self {
        let mut row = vec![1u64; size];
        for i in 1..size {
            row[i] = row[i - 1] * (size - i) as u64 / i as u64;
        }
        let norm = 2f64.powi(2 * size as i32 - 2);
        let weights = row
            .iter()
            .map(|&a| row.iter().map(|&b| (a * b) as Weight / norm).collect())
            .collect();
        Self::new(weights)
    }

    /// 3x3 sharpen: center `4m + 1`, orthogonal neighbors `-m`, `m = intensity / 50 + 0.25`.
    pub fn sharpen(intensity: i32) -> Self {
        let m = intensity as Weight / 50.0 + 0.25;
        Self::new(vec![
            vec![0.0, -m, 0.0],
            vec![-m, 4.0 * m + 1.0, -m],
            vec![0.0, -m, 0.0],
        ])
    }

    pub fn outline() -> Self {
        Self::new(LAPLACIAN.iter().map(|row| row.to_vec()).collect())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Offsets covered by the kernel along one axis. Even sizes reach one step
    /// further back than forward.
    fn offsets(&self) -> (i64, i64) {
        let low = -((self.size / 2) as i64);
        let high = ((self.size - 1) / 2) as i64;
        (low, high)
    }

    /// Correlates the kernel with the neighborhood of `(x, y)` in `input`.
    pub fn apply_at(&self, input: &PixelBuffer, x: u32, y: u32) -> Pixel {
        let (w, h) = (input.width() as i64, input.height() as i64);
        let (low, high) = self.offsets();
        let mut sums = [0.0 as Weight; 3];

        for dx in low..=high {
            for dy in low..=high {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                let x_out = nx < 0 || nx >= w;
                let y_out = ny < 0 || ny >= h;
                let sample = match (x_out, y_out) {
                    (true, true) => input.pixel(x, y),
                    (true, false) => input.pixel(x, ny as u32),
                    (false, true) => input.pixel(nx as u32, y),
                    (false, false) => input.pixel(nx as u32, ny as u32),
                };
                let weight = self.weights[(dx - low) as usize][(dy - low) as usize];
                for (sum, c) in sums.iter_mut().zip(sample.channels()) {
                    *sum += weight * c as Weight;
                }
            }
        }

        let channels = sums.map(|s| s.clamp(0.0, 255.0).round() as Channel);
        Pixel::from_channels(channels, input.pixel(x, y).alpha)
    }

    /// The unit transform of a convolution copy filter.
    pub fn convolve_region(&self, input: &PixelBuffer, output: &PixelBuffer, region: Region) {
        region.for_each(|x, y| output.set_pixel(x, y, self.apply_at(input, x, y)));
    }
}

/// Per-channel median of the in-bounds 3x3 neighborhood of `(x, y)`.
pub fn median_at(input: &PixelBuffer, x: u32, y: u32) -> Pixel {
    let (w, h) = (input.width() as i64, input.height() as i64);
    let mut samples: [Vec<Channel>; 3] = Default::default();

    for dx in -1..=1i64 {
        for dy in -1..=1i64 {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || nx >= w || ny < 0 || ny >= h {
                continue;
            }
            let p = input.pixel(nx as u32, ny as u32);
            for (list, c) in samples.iter_mut().zip(p.channels()) {
                list.push(c);
            }
        }
    }

    let channels = samples.map(|mut list| {
        list.sort_unstable();
        let mid = list.len() / 2;
        if list.len() % 2 == 0 {
            ((list[mid - 1] as u16 + list[mid] as u16) / 2) as Channel
        } else {
            list[mid]
        }
    });
    Pixel::from_channels(channels, input.pixel(x, y).alpha)
}

/// The unit transform of the median ("noise") copy filter.
pub fn median_region(input: &PixelBuffer, output: &PixelBuffer, region: Region) {
    region.for_each(|x, y| output.set_pixel(x, y, median_at(input, x, y)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(kernel: &Kernel) -> Weight {
        kernel.weights.iter().flatten().sum()
    }

    #[test]
    fn blur_kernels_are_normalized() {
        for size in 1..=11 {
            assert!((sum(&Kernel::box_blur(size)) - 1.0).abs() < 1e-9);
            assert!((sum(&Kernel::gaussian(size)) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn gaussian_uses_pascal_weights() {
        let k = Kernel::gaussian(3);
        assert_eq!(k.weights[1][1], 4.0 / 16.0);
        assert_eq!(k.weights[0][2], 1.0 / 16.0);
    }

    #[test]
    fn blur_size_never_drops_below_one() {
        assert_eq!(Kernel::blur_size(0), 1);
        assert_eq!(Kernel::blur_size(25), 3);
        assert_eq!(Kernel::blur_size(-100), 1);
    }

    #[test]
    fn blur_size_is_capped_for_huge_intensities() {
        assert_eq!(Kernel::blur_size(100), 11);
        assert_eq!(Kernel::blur_size(400), 11);
        assert_eq!(Kernel::blur_size(i32::MAX), 11);
        assert!((sum(&Kernel::gaussian(Kernel::blur_size(400))) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sharpen_weights_sum_to_one() {
        let k = Kernel::sharpen(50);
        assert!((sum(&k) - 1.0).abs() < 1e-9);
        assert_eq!(k.weights[1][1], 6.0);
        for (dx, dy) in [(0, 1), (2, 1), (1, 0), (1, 2)] {
            assert_eq!(k.weights[dx][dy], -1.25);
        }
        for (dx, dy) in [(0, 0), (0, 2), (2, 0), (2, 2)] {
            assert_eq!(k.weights[dx][dy], 0.0);
        }
    }

    #[test]
    fn outline_flattens_constant_regions_to_black() {
        let input = PixelBuffer::new(3, 3, 0xFF40_8020);
        let out = Kernel::outline().apply_at(&input, 1, 1);
        assert_eq!(out, Pixel::new(0, 0, 0, 255));
    }

    #[test]
    fn corner_samples_clamp_to_the_center() {
        // 2x2 image, bright top-left corner. The neighborhood of (0,0) under a 3x3
        // box clamps every out-of-range sample back into the image.
        let pixels = vec![0xFF90_9090, 0xFF00_0000, 0xFF00_0000, 0xFF00_0000];
        let input = PixelBuffer::from_argb(2, 2, pixels);
        let out = Kernel::box_blur(3).apply_at(&input, 0, 0);
        // Three clamped samples land on (0,0) plus the center itself; the rest are black.
        assert_eq!(out.red, (0x90 as f64 * 4.0 / 9.0).round() as u8);
    }

    #[test]
    fn median_rejects_an_impulse() {
        let input = PixelBuffer::new(3, 3, 0xFF10_1010);
        input.set(1, 1, 0xFFFF_FFFF);
        assert_eq!(median_at(&input, 1, 1), Pixel::new(0x10, 0x10, 0x10, 255));
    }

    #[test]
    fn median_averages_the_middle_pair_on_even_counts() {
        // Corner of a 2x2 image sees four samples.
        let pixels = vec![0xFF00_0000, 0xFF0A_0A0A, 0xFF14_1414, 0xFF1E_1E1E];
        let input = PixelBuffer::from_argb(2, 2, pixels);
        assert_eq!(median_at(&input, 0, 0).red, 15);
    }
}
