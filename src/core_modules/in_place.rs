// THEORY:
// In-place filters read and write the same buffer. That is only race-free because
// every one of them is a pure per-pixel map: the new value of a pixel depends on
// nothing but that pixel's own original value. Each op is therefore expressed as a
// `map(Pixel) -> Pixel` and the region loop is shared.
//
// Every op keeps alpha untouched.

use crate::core_modules::pixel::pixel::{Argb, Channel, Pixel, RGB_MASK};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region::Region;

/// Pivot the saturation filter scales around.
const MID_GRAY: i32 = 128;

/// A pure per-pixel map with its configuration baked in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InPlaceOp {
    /// `255 - channel` on R, G and B.
    Invert,
    /// Uniform average of R, G and B.
    Gray,
    /// White when the channel average reaches `threshold`, black otherwise.
    BlackWhite { threshold: i32 },
    /// Multiplies each channel by its factor, truncating and capping at 255.
    ColorMod { factors: [f64; 3] },
    /// Scales each channel's distance from mid-gray by `factor`.
    Saturate { factor: f64 },
}

impl InPlaceOp {
    /// `bw`: intensity lowers the cutoff, so +100 turns nearly everything white.
    pub fn black_white(intensity: i32) -> Self {
        InPlaceOp::BlackWhite {
            threshold: (128.0 - intensity as f64 * 1.27) as i32,
        }
    }

    /// Scales the channels enabled in `palette` by `2^(intensity / 50)`. A palette of
    /// `0xFFFFFF` is plain brightness.
    pub fn color_mod(intensity: i32, palette: Argb) -> Self {
        let mult = 2f64.powf(intensity as f64 / 50.0);
        let enabled = Pixel::from_argb(palette & RGB_MASK).channels();
        InPlaceOp::ColorMod {
            factors: enabled.map(|c| if c == 0 { 1.0 } else { mult }),
        }
    }

    /// `sat`: `2^(intensity / 100)` times the distance from 128.
    pub fn saturate(intensity: i32) -> Self {
        InPlaceOp::Saturate {
            factor: 2f64.powf(intensity as f64 / 100.0),
        }
    }

    #[inline]
    pub fn map(&self, pixel: Pixel) -> Pixel {
        match *self {
            InPlaceOp::Invert => Pixel::from_argb(pixel.to_argb() ^ RGB_MASK),
            InPlaceOp::Gray => pixel.gray(pixel.average() as Channel),
            InPlaceOp::BlackWhite { threshold } => {
                let level = if pixel.average() as i32 >= threshold { 255 } else { 0 };
                pixel.gray(level)
            }
            InPlaceOp::ColorMod { factors } => {
                let mut channels = pixel.channels();
                for (c, factor) in channels.iter_mut().zip(factors) {
                    *c = ((*c as f64 * factor) as i64).min(255) as Channel;
                }
                Pixel::from_channels(channels, pixel.alpha)
            }
            InPlaceOp::Saturate { factor } => {
                let channels = pixel.channels().map(|c| {
                    let spread = ((c as i32 - MID_GRAY) as f64 * factor) as i64;
                    (MID_GRAY as i64 + spread).clamp(0, 255) as Channel
                });
                Pixel::from_channels(channels, pixel.alpha)
            }
        }
    }

    /// The unit transform: rewrites every pixel of `region` in place.
    pub fn filter_region(&self, buffer: &PixelBuffer, region: Region) {
        region.for_each(|x, y| {
            let pixel = buffer.pixel(x, y);
            buffer.set_pixel(x, y, self.map(pixel));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_keeps_alpha() {
        let out = InPlaceOp::Invert.map(Pixel::new(0, 100, 255, 7));
        assert_eq!(out, Pixel::new(255, 155, 0, 7));
    }

    #[test]
    fn gray_replicates_the_truncated_average() {
        let out = InPlaceOp::Gray.map(Pixel::new(10, 20, 31, 200));
        assert_eq!(out, Pixel::new(20, 20, 20, 200));
    }

    #[test]
    fn black_white_threshold_moves_with_intensity() {
        let mid = Pixel::new(100, 100, 100, 255);
        assert_eq!(InPlaceOp::black_white(0).map(mid).red, 0);
        assert_eq!(InPlaceOp::black_white(50).map(mid).red, 255);
        assert_eq!(InPlaceOp::black_white(-100).map(Pixel::new(250, 250, 250, 255)).red, 0);
    }

    #[test]
    fn color_mod_only_touches_enabled_channels() {
        let op = InPlaceOp::color_mod(50, 0xFF0000);
        let out = op.map(Pixel::new(100, 100, 200, 255));
        assert_eq!(out, Pixel::new(200, 100, 200, 255));

        let bright = InPlaceOp::color_mod(50, 0xFFFFFF);
        assert_eq!(bright.map(Pixel::new(100, 130, 0, 9)), Pixel::new(200, 255, 0, 9));
    }

    #[test]
    fn zero_intensity_mods_are_identity() {
        let p = Pixel::new(3, 128, 254, 77);
        assert_eq!(InPlaceOp::color_mod(0, 0xFFFFFF).map(p), p);
        assert_eq!(InPlaceOp::saturate(0).map(p), p);
    }

    #[test]
    fn saturate_scales_distance_from_mid_gray() {
        let op = InPlaceOp::saturate(100);
        assert_eq!(op.map(Pixel::new(138, 118, 128, 255)), Pixel::new(148, 108, 128, 255));
        assert_eq!(op.map(Pixel::new(250, 0, 128, 255)), Pixel::new(255, 0, 128, 255));
    }
}
