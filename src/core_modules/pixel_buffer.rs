// THEORY:
// The `PixelBuffer` is the shared resource every filter reads and writes: a
// width x height, row-major grid of packed ARGB words.
//
// Key architectural principles:
// 1.  **Shared, Disjoint Writes**: The scheduler hands disjoint regions of one buffer
//     to concurrently running tasks. Each word is an `AtomicU32` accessed with
//     relaxed ordering, so `get`/`set` work through a shared reference and need no
//     `unsafe`. Tasks never touch the same word, and the fork/join boundary of a
//     pass is what publishes their writes to the caller.
// 2.  **Bounds-Checked Access**: Every access goes through `get`/`set` on `(x, y)`
//     coordinates. Region invariants keep coordinates in range, so a violation is a
//     programming error and panics on the index.
// 3.  **Codec Bridge**: Decoding and encoding belong to the collaborator layer, which
//     hands over an `image::RgbaImage` and receives one back.

use crate::core_modules::pixel::pixel::{Argb, Pixel};
use crate::core_modules::region::Region;
use image::RgbaImage;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// A row-major grid of packed ARGB pixels.
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<AtomicU32>,
}

impl PixelBuffer {
    /// Creates a buffer filled with `fill`.
    pub fn new(width: u32, height: u32, fill: Argb) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            data: (0..len).map(|_| AtomicU32::new(fill)).collect(),
        }
    }

    /// Wraps an existing row-major ARGB vector.
    ///
    /// Panics if `pixels.len() != width * height`.
    pub fn from_argb(width: u32, height: u32, pixels: Vec<Argb>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize,
            "pixel count does not match {}x{}",
            width,
            height
        );
        Self {
            width,
            height,
            data: pixels.into_iter().map(AtomicU32::new).collect(),
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: &[Pixel]) -> Self {
        Self::from_argb(width, height, pixels.iter().map(|p| p.to_argb()).collect())
    }

    /// Same-sized scratch buffer for copy filters.
    pub fn blank_like(&self) -> Self {
        Self::new(self.width, self.height, 0)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The full extent of the buffer in pixel coordinates.
    pub fn bounds(&self) -> Region {
        Region::new(0, self.width, 0, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "({}, {}) is outside {}x{}",
            x,
            y,
            self.width,
            self.height
        );
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Argb {
        self.data[self.index(x, y)].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set(&self, x: u32, y: u32, argb: Argb) {
        self.data[self.index(x, y)].store(argb, Ordering::Relaxed);
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        Pixel::from_argb(self.get(x, y))
    }

    #[inline]
    pub fn set_pixel(&self, x: u32, y: u32, pixel: Pixel) {
        self.set(x, y, pixel.to_argb());
    }

    /// Snapshot of every pixel, row-major.
    pub fn to_argb_vec(&self) -> Vec<Argb> {
        self.data.iter().map(|w| w.load(Ordering::Relaxed)).collect()
    }

    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        let pixels = image
            .as_raw()
            .chunks_exact(4)
            .map(|bytes| Pixel::from(bytes).to_argb())
            .collect();
        Self::from_argb(image.width(), image.height(), pixels)
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width, self.height);
        for (x, y, out) in image.enumerate_pixels_mut() {
            let p = self.pixel(x, y);
            *out = image::Rgba([p.red, p.green, p.blue, p.alpha]);
        }
        image
    }
}

impl Clone for PixelBuffer {
    fn clone(&self) -> Self {
        Self::from_argb(self.width, self.height, self.to_argb_vec())
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.to_argb_vec() == other.to_argb_vec()
    }
}

impl Eq for PixelBuffer {}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set_are_row_major() {
        let buffer = PixelBuffer::new(3, 2, 0);
        buffer.set(2, 1, 0xFF00_00FF);
        assert_eq!(buffer.to_argb_vec()[5], 0xFF00_00FF);
        assert_eq!(buffer.get(2, 1), 0xFF00_00FF);
    }

    #[test]
    #[should_panic]
    fn out_of_range_access_panics() {
        let buffer = PixelBuffer::new(2, 2, 0);
        buffer.get(2, 0);
    }

    #[test]
    fn rgba_image_round_trip_keeps_channel_order() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([1, 2, 3, 4]));
        image.put_pixel(1, 0, image::Rgba([250, 0, 9, 255]));

        let buffer = PixelBuffer::from_rgba_image(&image);
        assert_eq!(buffer.get(0, 0), 0x0401_0203);
        assert_eq!(buffer.to_rgba_image(), image);
    }
}
