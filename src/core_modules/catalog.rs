// THEORY:
// A `ReferenceCatalog` is the immutable set of candidate tiles the mosaic filters
// match image blocks against. It is built once, up front, from images the
// collaborator layer has already decoded, and it precomputes everything the
// matchers need per tile:
//   - the opaque-pixel count, which normalizes emoji distances;
//   - the thresholded black/white pattern, which glyph matching compares against.
//
// After construction nothing mutates a catalog, so the engine shares it across all
// concurrent tasks behind an `Arc` without locking. Construction rejects every
// catalog that would leave scoring undefined (no tiles, zero-sized or mismatched
// tiles, emoji with nothing opaque), which is what lets the matchers assume a winner
// always exists.
//
// Entry order is the order tiles were supplied in, and it is the tie-break order.

use crate::core_modules::pixel::pixel::{ALPHA_MASK, Pixel};
use crate::error::CatalogError;
use image::RgbaImage;
use std::sync::Arc;

/// A small decoded reference image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    width: u32,
    height: u32,
    pixels: Vec<Pixel>,
}

impl Tile {
    /// Panics if `pixels.len() != width * height`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Pixel>) -> Self {
        assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn solid(width: u32, height: u32, pixel: Pixel) -> Self {
        Self::from_pixels(width, height, vec![pixel; width as usize * height as usize])
    }

    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        let pixels = image.as_raw().chunks_exact(4).map(Pixel::from).collect();
        Self::from_pixels(image.width(), image.height(), pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Pixel {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

/// A tile plus its precomputed matching metadata.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub tile: Tile,
    /// Pixels with non-zero alpha.
    pub opaque_count: u32,
    /// Row-major black/white pattern, `true` where the tile is light.
    pub pattern: Vec<bool>,
}

impl CatalogEntry {
    fn new(tile: Tile) -> Self {
        let opaque_count = tile.pixels.iter().filter(|p| p.alpha != 0).count() as u32;
        let pattern = tile.pixels.iter().map(Pixel::is_light).collect();
        Self {
            tile,
            opaque_count,
            pattern,
        }
    }

    #[inline]
    pub fn is_light(&self, x: u32, y: u32) -> bool {
        self.pattern[y as usize * self.tile.width as usize + x as usize]
    }
}

/// What a catalog is going to be matched with; decides which tiles are acceptable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Emoji,
    Glyph,
}

impl CatalogKind {
    pub fn name(self) -> &'static str {
        match self {
            CatalogKind::Emoji => "emoji",
            CatalogKind::Glyph => "glyph",
        }
    }
}

/// Immutable, non-empty set of same-sized reference tiles.
#[derive(Debug, Clone)]
pub struct ReferenceCatalog {
    kind: CatalogKind,
    tile_width: u32,
    tile_height: u32,
    entries: Vec<CatalogEntry>,
}

impl ReferenceCatalog {
    pub fn new(kind: CatalogKind, tiles: Vec<Tile>) -> Result<Self, CatalogError> {
        let first = tiles.first().ok_or(CatalogError::Empty)?;
        let expected = (first.width, first.height);

        let mut entries = Vec::with_capacity(tiles.len());
        for (index, tile) in tiles.into_iter().enumerate() {
            let found = (tile.width, tile.height);
            if found.0 == 0 || found.1 == 0 {
                return Err(CatalogError::EmptyTile { index });
            }
            if found != expected {
                return Err(CatalogError::MismatchedTile {
                    index,
                    expected,
                    found,
                });
            }
            let entry = CatalogEntry::new(tile);
            if kind == CatalogKind::Emoji && entry.opaque_count == 0 {
                return Err(CatalogError::FullyTransparent { index });
            }
            entries.push(entry);
        }

        Ok(Self {
            kind,
            tile_width: expected.0,
            tile_height: expected.1,
            entries,
        })
    }

    pub fn emoji(tiles: Vec<Tile>) -> Result<Self, CatalogError> {
        Self::new(CatalogKind::Emoji, tiles)
    }

    pub fn glyphs(tiles: Vec<Tile>) -> Result<Self, CatalogError> {
        Self::new(CatalogKind::Glyph, tiles)
    }

    pub fn from_images(kind: CatalogKind, images: &[RgbaImage]) -> Result<Self, CatalogError> {
        Self::new(kind, images.iter().map(Tile::from_rgba_image).collect())
    }

    pub fn kind(&self) -> CatalogKind {
        self.kind
    }

    /// Block size the mosaic filters partition the image into.
    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Side length of the built-in emoji tiles.
pub const EMOJI_TILE: u32 = 16;
/// Side length of the built-in glyph tiles.
pub const GLYPH_TILE: u32 = 8;

/// Average colors of the stock emoji set.
const EMOJI_PALETTE: [u32; 16] = [
    0x6f6a6d, 0x93752a, 0x323332, 0x3d635d, 0x3d533f, 0x383c48, 0xd1ac5b, 0xb0738d, 0x3b5773,
    0xa02638, 0x5f6f12, 0x632c6f, 0x3c2a1f, 0x3584d8, 0x212c47, 0x393a37,
];

/// The catalogs an engine is built with.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub emoji: Arc<ReferenceCatalog>,
    pub glyphs: Arc<ReferenceCatalog>,
}

impl Catalogs {
    pub fn new(emoji: ReferenceCatalog, glyphs: ReferenceCatalog) -> Self {
        Self {
            emoji: Arc::new(emoji),
            glyphs: Arc::new(glyphs),
        }
    }

    /// Synthesized stand-ins for the stock assets: opaque discs on a transparent
    /// background, and black strokes on white.
    pub fn builtin() -> Self {
        let emoji = EMOJI_PALETTE
            .iter()
            .map(|&rgb| disc(EMOJI_TILE, Pixel::from_argb(ALPHA_MASK | rgb)))
            .collect();

        let last = GLYPH_TILE - 1;
        let mid = GLYPH_TILE / 2;
        let strokes: [&dyn Fn(u32, u32) -> bool; 10] = [
            &|_, _| false,
            &|_, _| true,
            &|_, y| y == mid,
            &|x, _| x == mid,
            &|x, y| x == mid || y == mid,
            &|x, y| x + y == last,
            &|x, y| x == y,
            &|x, y| (x + y) % 2 == 0,
            &|x, y| y == last && (x == mid || x == mid - 1),
            &|x, y| {
                let ring = x == 1 || x == last - 1 || y == 1 || y == last - 1;
                ring && x > 0 && y > 0 && x < last && y < last
            },
        ];
        let glyphs = strokes.iter().map(|ink| glyph(GLYPH_TILE, ink)).collect();

        // Both sets are non-empty, uniformly sized, and every disc has opaque pixels.
        Self::new(
            ReferenceCatalog {
                kind: CatalogKind::Emoji,
                tile_width: EMOJI_TILE,
                tile_height: EMOJI_TILE,
                entries: into_entries(emoji),
            },
            ReferenceCatalog {
                kind: CatalogKind::Glyph,
                tile_width: GLYPH_TILE,
                tile_height: GLYPH_TILE,
                entries: into_entries(glyphs),
            },
        )
    }
}

fn into_entries(tiles: Vec<Tile>) -> Vec<CatalogEntry> {
    tiles.into_iter().map(CatalogEntry::new).collect()
}

fn disc(size: u32, color: Pixel) -> Tile {
    let center = (size as f64 - 1.0) / 2.0;
    let radius = size as f64 / 2.0;
    let mut pixels = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            let (dx, dy) = (x as f64 - center, y as f64 - center);
            let inside = dx * dx + dy * dy <= radius * radius;
            pixels.push(if inside { color } else { Pixel::default() });
        }
    }
    Tile::from_pixels(size, size, pixels)
}

fn glyph(size: u32, ink: &dyn Fn(u32, u32) -> bool) -> Tile {
    let black = Pixel::new(0, 0, 0, 255);
    let white = Pixel::new(255, 255, 255, 255);
    let mut pixels = Vec::with_capacity((size * size) as usize);
    for y in 0..size {
        for x in 0..size {
            pixels.push(if ink(x, y) { black } else { white });
        }
    }
    Tile::from_pixels(size, size, pixels)
}
