// THEORY:
// Mosaic filters replace the image block by block with the closest reference tile.
// The image is partitioned into tiles of the catalog's own size (16x16 emoji and
// 8x8 glyphs for the stock assets), the scheduler works in block coordinates, and a
// unit transform scores every candidate for each block in its region and writes the
// winner over the block.
//
// A block's replacement depends only on that block's own pixels, so the filters run
// in place: blocks are disjoint and never read each other.
//
// Scoring:
// - Emoji: L1 color distance summed over the candidate's opaque pixels, divided by
//   its opaque-pixel count.
// - Glyph: both block and candidate are thresholded to black/white at a mean
//   luminance of 128 and the mismatches are counted.
// Lowest score wins. Ties keep the earliest catalog entry, which makes the output
// deterministic for a given image and catalog.
//
// Blocks along the right and bottom edges may be partial; they are clamped to the
// image and matched against the corresponding top-left part of each tile.

use crate::core_modules::catalog::{CatalogEntry, ReferenceCatalog};
use crate::core_modules::pixel::pixel::{OPAQUE_WHITE, Pixel};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region::Region;
use std::sync::Arc;

/// What to emit where the winning emoji is transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransparencyPolicy {
    /// Flood with opaque white.
    #[default]
    White,
    /// Keep the source pixel.
    KeepSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MosaicStyle {
    Emoji(TransparencyPolicy),
    /// Black/white glyphs emitted as-is.
    Ascii,
    /// Glyph ink recolored with the block's average color.
    Ansi,
}

#[derive(Debug, Clone)]
pub struct Mosaic {
    pub catalog: Arc<ReferenceCatalog>,
    pub style: MosaicStyle,
}

impl Mosaic {
    pub fn new(catalog: Arc<ReferenceCatalog>, style: MosaicStyle) -> Self {
        Self { catalog, style }
    }

    /// The whole image in block coordinates.
    pub fn block_grid(&self, buffer: &PixelBuffer) -> Region {
        let (tw, th) = self.catalog.tile_size();
        Region::new(
            0,
            Region::blocks_for(buffer.width(), tw),
            0,
            Region::blocks_for(buffer.height(), th),
        )
    }

    /// The unit transform: `blocks` is in block coordinates.
    pub fn filter_region(&self, buffer: &PixelBuffer, blocks: Region) {
        let (tw, th) = self.catalog.tile_size();
        blocks.for_each(|bx, by| {
            let block = Region::block_pixels(bx, by, tw, th, buffer.width(), buffer.height());
            if block.is_empty() {
                return;
            }
            match self.style {
                MosaicStyle::Emoji(policy) => self.emojify_block(buffer, block, policy),
                MosaicStyle::Ascii => self.asciify_block(buffer, block, false),
                MosaicStyle::Ansi => self.asciify_block(buffer, block, true),
            }
        });
    }

    fn emojify_block(&self, buffer: &PixelBuffer, block: Region, policy: TransparencyPolicy) {
        let winner = best_match(self.catalog.entries(), |entry| {
            emoji_distance(entry, buffer, block)
        });

        block.for_each(|x, y| {
            let candidate = winner.tile.get(x - block.xlow, y - block.ylow);
            if candidate.alpha != 0 {
                buffer.set_pixel(x, y, candidate);
            } else if policy == TransparencyPolicy::White {
                buffer.set(x, y, OPAQUE_WHITE);
            }
        });
    }

    fn asciify_block(&self, buffer: &PixelBuffer, block: Region, colorize: bool) {
        let winner = best_match(self.catalog.entries(), |entry| {
            glyph_distance(entry, buffer, block) as f64
        });
        let ink = if colorize {
            Some(average_color(buffer, block))
        } else {
            None
        };

        block.for_each(|x, y| {
            let (gx, gy) = (x - block.xlow, y - block.ylow);
            let glyph = winner.tile.get(gx, gy);
            let out = match ink {
                Some(color) if !winner.is_light(gx, gy) => color,
                _ => glyph,
            };
            buffer.set_pixel(x, y, out);
        });
    }
}

/// First entry with the strictly lowest score.
fn best_match<'a>(
    entries: &'a [CatalogEntry],
    score: impl Fn(&CatalogEntry) -> f64,
) -> &'a CatalogEntry {
    let mut iter = entries.iter();
    let first = iter
        .next()
        .unwrap_or_else(|| panic!("reference catalog has no candidates"));
    let mut best = (first, score(first));
    for entry in iter {
        let s = score(entry);
        if s < best.1 {
            best = (entry, s);
        }
    }
    best.0
}

/// Mean L1 distance over the candidate's opaque pixels.
pub fn emoji_distance(entry: &CatalogEntry, buffer: &PixelBuffer, block: Region) -> f64 {
    let mut total = 0u64;
    block.for_each(|x, y| {
        let candidate = entry.tile.get(x - block.xlow, y - block.ylow);
        if candidate.alpha != 0 {
            total += candidate.l1_distance(&buffer.pixel(x, y)) as u64;
        }
    });
    total as f64 / entry.opaque_count as f64
}

/// Count of black/white mismatches between the thresholded block and the glyph.
pub fn glyph_distance(entry: &CatalogEntry, buffer: &PixelBuffer, block: Region) -> u32 {
    let mut mismatches = 0;
    block.for_each(|x, y| {
        if buffer.pixel(x, y).is_light() != entry.is_light(x - block.xlow, y - block.ylow) {
            mismatches += 1;
        }
    });
    mismatches
}

/// Opaque average RGB of the block's source pixels.
fn average_color(buffer: &PixelBuffer, block: Region) -> Pixel {
    let mut sums = [0u64; 3];
    block.for_each(|x, y| {
        for (sum, c) in sums.iter_mut().zip(buffer.pixel(x, y).channels()) {
            *sum += c as u64;
        }
    });
    let count = block.area().max(1);
    Pixel::from_channels(sums.map(|s| (s / count) as u8), 255)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::catalog::Tile;

    const BLACK: Pixel = Pixel {
        red: 0,
        green: 0,
        blue: 0,
        alpha: 255,
    };
    const WHITE: Pixel = Pixel {
        red: 255,
        green: 255,
        blue: 255,
        alpha: 255,
    };

    fn run(mosaic: &Mosaic, buffer: &PixelBuffer) {
        mosaic.filter_region(buffer, mosaic.block_grid(buffer));
    }

    /// 2x2 glyph: dark left column, light right column.
    fn bar_glyph() -> Tile {
        Tile::from_pixels(2, 2, vec![BLACK, WHITE, BLACK, WHITE])
    }

    #[test]
    fn emoji_picks_the_closest_color() {
        let catalog = ReferenceCatalog::emoji(vec![
            Tile::solid(2, 2, Pixel::new(250, 0, 0, 255)),
            Tile::solid(2, 2, Pixel::new(0, 0, 250, 255)),
        ])
        .unwrap();
        let mosaic = Mosaic::new(Arc::new(catalog), MosaicStyle::Emoji(TransparencyPolicy::White));
        let buffer = PixelBuffer::new(2, 2, Pixel::new(10, 0, 200, 255).to_argb());

        run(&mosaic, &buffer);
        assert_eq!(buffer.pixel(1, 1), Pixel::new(0, 0, 250, 255));
    }

    #[test]
    fn ties_keep_the_first_entry() {
        let catalog = ReferenceCatalog::emoji(vec![
            Tile::solid(1, 1, Pixel::new(100, 0, 0, 255)),
            Tile::solid(1, 1, Pixel::new(0, 100, 0, 255)),
        ])
        .unwrap();
        let mosaic = Mosaic::new(Arc::new(catalog), MosaicStyle::Emoji(TransparencyPolicy::White));
        let buffer = PixelBuffer::new(1, 1, Pixel::new(50, 50, 0, 255).to_argb());

        run(&mosaic, &buffer);
        assert_eq!(buffer.pixel(0, 0), Pixel::new(100, 0, 0, 255));
    }

    #[test]
    fn emoji_scores_are_normalized_by_opaque_count() {
        let clear = Pixel::default();
        let cyan = Pixel::new(60, 100, 100, 255);
        // Two opaque pixels 40 away: total 80, mean 40.
        let sparse = Tile::from_pixels(2, 2, vec![cyan, clear, cyan, clear]);
        // Four opaque pixels 25 away: total 100, mean 25.
        let dense = Tile::solid(2, 2, Pixel::new(75, 100, 100, 255));
        let catalog = ReferenceCatalog::emoji(vec![sparse, dense]).unwrap();
        let buffer = PixelBuffer::new(2, 2, Pixel::new(100, 100, 100, 255).to_argb());

        let block = Region::new(0, 2, 0, 2);
        assert_eq!(emoji_distance(&catalog.entries()[0], &buffer, block), 40.0);
        assert_eq!(emoji_distance(&catalog.entries()[1], &buffer, block), 25.0);

        let mosaic = Mosaic::new(Arc::new(catalog), MosaicStyle::Emoji(TransparencyPolicy::White));
        run(&mosaic, &buffer);
        assert!(buffer.to_argb_vec().iter().all(|&p| p == 0xFF4B_6464));
    }

    #[test]
    fn transparent_candidate_pixels_do_not_score() {
        let source = Pixel::new(100, 100, 100, 255);
        // The clear pixel is black underneath; it must not count against the tile.
        let exact = Tile::from_pixels(2, 1, vec![source, Pixel::new(0, 0, 0, 0)]);
        let close = Tile::solid(2, 1, Pixel::new(110, 100, 100, 255));
        let catalog = ReferenceCatalog::emoji(vec![close, exact]).unwrap();
        let buffer = PixelBuffer::new(2, 1, source.to_argb());

        let block = Region::new(0, 2, 0, 1);
        assert_eq!(emoji_distance(&catalog.entries()[1], &buffer, block), 0.0);

        let policy = TransparencyPolicy::KeepSource;
        run(&Mosaic::new(Arc::new(catalog), MosaicStyle::Emoji(policy)), &buffer);
        assert_eq!(buffer.pixel(0, 0), source);
        assert_eq!(buffer.pixel(1, 0), source);
    }

    #[test]
    fn transparency_policy_decides_the_background() {
        let source = Pixel::new(1, 2, 3, 255);
        let tile = Tile::from_pixels(2, 1, vec![Pixel::new(9, 9, 9, 255), Pixel::new(0, 0, 0, 0)]);
        let catalog = Arc::new(ReferenceCatalog::emoji(vec![tile]).unwrap());

        let white = PixelBuffer::new(2, 1, source.to_argb());
        run(&Mosaic::new(catalog.clone(), MosaicStyle::Emoji(TransparencyPolicy::White)), &white);
        assert_eq!(white.get(1, 0), OPAQUE_WHITE);

        let keep = PixelBuffer::new(2, 1, source.to_argb());
        run(&Mosaic::new(catalog, MosaicStyle::Emoji(TransparencyPolicy::KeepSource)), &keep);
        assert_eq!(keep.pixel(1, 0), source);
        assert_eq!(keep.pixel(0, 0), Pixel::new(9, 9, 9, 255));
    }

    #[test]
    fn ascii_matches_the_thresholded_pattern() {
        let tiles = vec![Tile::solid(2, 2, WHITE), bar_glyph()];
        let catalog = ReferenceCatalog::glyphs(tiles).unwrap();
        let mosaic = Mosaic::new(Arc::new(catalog), MosaicStyle::Ascii);
        let buffer = PixelBuffer::from_pixels(
            2,
            2,
            &[
                Pixel::new(20, 20, 20, 255),
                Pixel::new(200, 200, 200, 255),
                Pixel::new(30, 30, 30, 255),
                Pixel::new(180, 180, 180, 255),
            ],
        );

        run(&mosaic, &buffer);
        assert_eq!(buffer.pixel(0, 0), BLACK);
        assert_eq!(buffer.pixel(1, 1), WHITE);
    }

    #[test]
    fn ansi_paints_ink_with_the_block_average() {
        let catalog = ReferenceCatalog::glyphs(vec![bar_glyph()]).unwrap();
        let mosaic = Mosaic::new(Arc::new(catalog), MosaicStyle::Ansi);
        let buffer = PixelBuffer::from_pixels(
            2,
            2,
            &[
                Pixel::new(100, 0, 0, 255),
                Pixel::new(200, 0, 40, 255),
                Pixel::new(100, 0, 0, 255),
                Pixel::new(200, 0, 40, 255),
            ],
        );

        run(&mosaic, &buffer);
        assert_eq!(buffer.pixel(0, 1), Pixel::new(150, 0, 20, 255));
        assert_eq!(buffer.pixel(1, 0), WHITE);
    }

    #[test]
    fn partial_edge_blocks_are_clamped() {
        let catalog = ReferenceCatalog::glyphs(vec![Tile::solid(4, 4, WHITE)]).unwrap();
        let mosaic = Mosaic::new(Arc::new(catalog), MosaicStyle::Ascii);
        let buffer = PixelBuffer::new(5, 3, BLACK.to_argb());

        assert_eq!(mosaic.block_grid(&buffer), Region::new(0, 2, 0, 1));
        run(&mosaic, &buffer);
        assert!(buffer.to_argb_vec().iter().all(|&p| p == WHITE.to_argb()));
    }
}
