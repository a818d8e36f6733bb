// THEORY:
// A `Region` is a half-open rectangle `[xlow, xhi) x [ylow, yhi)` and is the unit of
// work the scheduler hands out. It is deliberately unit-agnostic: most filters read
// it in pixel coordinates, while the mosaic filters read it in block coordinates and
// expand each block to the pixels it covers with `block_pixels`.
//
// Splitting always cuts the longer axis at the integer midpoint, so the two halves
// never overlap and together cover the parent exactly.

use std::fmt;

/// A half-open rectangle in pixel or block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub xlow: u32,
    pub xhi: u32,
    pub ylow: u32,
    pub yhi: u32,
}

impl Region {
    pub fn new(xlow: u32, xhi: u32, ylow: u32, yhi: u32) -> Self {
        debug_assert!(xlow <= xhi && ylow <= yhi, "inverted region");
        Self {
            xlow,
            xhi,
            ylow,
            yhi,
        }
    }

    pub fn width(&self) -> u32 {
        self.xhi - self.xlow
    }

    pub fn height(&self) -> u32 {
        self.yhi - self.ylow
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }

    /// Splits along the longer axis at `(lo + hi) / 2`. Ties split the y axis.
    pub fn split(&self) -> (Region, Region) {
        if self.width() > self.height() {
            let mid = (self.xlow + self.xhi) / 2;
            (
                Region::new(self.xlow, mid, self.ylow, self.yhi),
                Region::new(mid, self.xhi, self.ylow, self.yhi),
            )
        } else {
            let mid = (self.ylow + self.yhi) / 2;
            (
                Region::new(self.xlow, self.xhi, self.ylow, mid),
                Region::new(self.xlow, self.xhi, mid, self.yhi),
            )
        }
    }

    /// Visits every `(x, y)` in the region, column by column.
    pub fn for_each(&self, mut f: impl FnMut(u32, u32)) {
        for x in self.xlow..self.xhi {
            for y in self.ylow..self.yhi {
                f(x, y);
            }
        }
    }

    /// The pixel rectangle covered by block `(bx, by)` of a `block_width x
    /// block_height` grid, clamped to a `width x height` image.
    pub fn block_pixels(
        bx: u32,
        by: u32,
        block_width: u32,
        block_height: u32,
        width: u32,
        height: u32,
    ) -> Region {
        let xlow = (bx * block_width).min(width);
        let ylow = (by * block_height).min(height);
        Region::new(
            xlow,
            (xlow + block_width).min(width),
            ylow,
            (ylow + block_height).min(height),
        )
    }

    /// Number of blocks needed to cover `extent` pixels.
    pub fn blocks_for(extent: u32, block: u32) -> u32 {
        extent.div_ceil(block)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}) x [{}..{})", self.xlow, self.xhi, self.ylow, self.yhi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_the_longer_axis() {
        let (left, right) = Region::new(0, 10, 0, 4).split();
        assert_eq!(left, Region::new(0, 5, 0, 4));
        assert_eq!(right, Region::new(5, 10, 0, 4));

        let (top, bottom) = Region::new(2, 5, 1, 8).split();
        assert_eq!(top, Region::new(2, 5, 1, 4));
        assert_eq!(bottom, Region::new(2, 5, 4, 8));
    }

    #[test]
    fn halves_cover_the_parent_exactly() {
        let parent = Region::new(3, 17, 5, 12);
        let (a, b) = parent.split();
        assert_eq!(a.area() + b.area(), parent.area());

        let mut seen = std::collections::HashSet::new();
        a.for_each(|x, y| assert!(seen.insert((x, y))));
        b.for_each(|x, y| assert!(seen.insert((x, y))));
        assert_eq!(seen.len() as u64, parent.area());
    }

    #[test]
    fn block_pixels_clamp_to_the_image() {
        assert_eq!(Region::blocks_for(18, 16), 2);
        let edge = Region::block_pixels(1, 1, 16, 16, 18, 18);
        assert_eq!(edge, Region::new(16, 18, 16, 18));
    }
}
