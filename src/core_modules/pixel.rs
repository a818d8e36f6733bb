// THEORY:
// The `Pixel` module is the most fundamental unit of the filter engine. A pixel is
// stored inside a `PixelBuffer` as a single packed ARGB word (alpha in the high
// byte, then red, green, blue), and this module is the only place that knows how
// to pack and unpack that word.
//
// Key principles:
// 1) Single-pixel scope: everything here is computed from one pixel alone. Anything
//    that needs neighbors (kernels, medians, block matching) lives elsewhere.
// 2) Integer-first: the filters are specified in 8-bit integer arithmetic, so the
//    helpers keep integer semantics (truncating averages) where the filters do.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Argb = u32;
    pub type Luminance = u32;

    pub const ALPHA_MASK: Argb = 0xFF00_0000;
    pub const RGB_MASK: Argb = 0x00FF_FFFF;
    pub const OPAQUE_WHITE: Argb = 0xFFFF_FFFF;

    /// A "dumb" data container representing a single unpacked ARGB pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        #[inline]
        pub fn from_argb(argb: Argb) -> Self {
            Pixel {
                alpha: (argb >> 24) as Channel,
                red: (argb >> 16) as Channel,
                green: (argb >> 8) as Channel,
                blue: argb as Channel,
            }
        }

        #[inline]
        pub fn to_argb(self) -> Argb {
            ((self.alpha as Argb) << 24)
                | ((self.red as Argb) << 16)
                | ((self.green as Argb) << 8)
                | self.blue as Argb
        }

        /// Uniform (unweighted) mean of R, G and B, truncated.
        #[inline]
        pub fn average(&self) -> Luminance {
            (self.red as Luminance + self.green as Luminance + self.blue as Luminance) / 3
        }

        /// Replaces R, G and B with `gray`, keeping alpha.
        #[inline]
        pub fn gray(self, gray: Channel) -> Self {
            Pixel::new(gray, gray, gray, self.alpha)
        }

        /// True when the mean luminance reaches the mid-point (128).
        #[inline]
        pub fn is_light(&self) -> bool {
            self.average() >= 128
        }

        /// L1 distance over the color channels; alpha is ignored.
        #[inline]
        pub fn l1_distance(&self, other: &Pixel) -> u32 {
            (self.red as i32 - other.red as i32).unsigned_abs()
                + (self.green as i32 - other.green as i32).unsigned_abs()
                + (self.blue as i32 - other.blue as i32).unsigned_abs()
        }

        #[inline]
        pub fn channels(&self) -> [Channel; 3] {
            [self.red, self.green, self.blue]
        }

        #[inline]
        pub fn from_channels(channels: [Channel; 3], alpha: Channel) -> Self {
            Pixel::new(channels[0], channels[1], channels[2], alpha)
        }
    }

    impl From<Argb> for Pixel {
        fn from(argb: Argb) -> Self {
            Pixel::from_argb(argb)
        }
    }

    impl From<Pixel> for Argb {
        fn from(pixel: Pixel) -> Self {
            pixel.to_argb()
        }
    }

    impl From<&[Byte]> for Pixel {
        /// Builds a pixel from an RGBA byte quad, the layout `image::RgbaImage` uses.
        fn from(bytes: &[Byte]) -> Self {
            if bytes.len() != 4 {
                panic!("Cannot convert {} bytes into pixel.", bytes.len());
            }
            Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;

    #[test]
    fn packs_alpha_into_the_high_byte() {
        let pixel = Pixel::new(0x12, 0x34, 0x56, 0x78);
        assert_eq!(pixel.to_argb(), 0x7812_3456);
        assert_eq!(Pixel::from_argb(0x7812_3456), pixel);
    }

    #[test]
    fn average_truncates() {
        assert_eq!(Pixel::new(255, 0, 0, 255).average(), 85);
        assert_eq!(Pixel::new(1, 1, 0, 255).average(), 0);
    }

    #[test]
    fn l1_distance_ignores_alpha() {
        let a = Pixel::new(10, 20, 30, 0);
        let b = Pixel::new(20, 10, 30, 255);
        assert_eq!(a.l1_distance(&b), 20);
    }

    #[test]
    #[should_panic]
    fn rejects_short_byte_slices() {
        let bytes = [1u8, 2, 3];
        let _ = Pixel::from(&bytes[..]);
    }
}
