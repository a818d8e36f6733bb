// THEORY:
// A `Filter` is one of a closed set of execution shapes, each carrying configuration
// that is derived once from (name, intensity, palette color) and never mutated
// during a run:
//
// - `InPlace`:      pure per-pixel maps, read and write the same buffer.
// - `Convolution`:  kernel correlation, copy filter.
// - `Median`:       3x3 per-channel median, copy filter.
// - `Mosaic`:       block replacement against a reference catalog, in place per block.
// - `DominantHue`:  reduce pass, barrier, then an in-place map.
//
// `apply` is the single entry point. It picks the unit of work (pixels or blocks),
// the cutoff, and whether the pass needs a separate output buffer, then hands the
// unit transform to the scheduler.

use crate::core_modules::catalog::Catalogs;
use crate::core_modules::dominant_hue::DominantHue;
use crate::core_modules::in_place::InPlaceOp;
use crate::core_modules::kernel::{Kernel, median_region};
use crate::core_modules::mosaic::{Mosaic, MosaicStyle, TransparencyPolicy};
use crate::core_modules::pixel::pixel::Argb;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::scheduler::schedule;
use crate::pipeline::EngineConfig;
use log::debug;

/// Every name `create_filter` recognizes.
pub const FILTER_NAMES: [&str; 21] = [
    "invert", "gray", "bw", "bright", "sat", "color", "red", "green", "blue", "cyan", "magenta",
    "yellow", "box", "gauss", "sharp", "outline", "noise", "emoji", "ascii", "ansi", "dom",
];

#[derive(Debug, Clone)]
pub enum Filter {
    InPlace(InPlaceOp),
    Convolution(Kernel),
    Median,
    Mosaic(Mosaic),
    DominantHue(DominantHue),
}

impl Filter {
    pub fn is_copy(&self) -> bool {
        matches!(self, Filter::Convolution(_) | Filter::Median)
    }

    /// Runs the filter over the whole buffer. Copy filters leave their output in
    /// `buffer` once every region has finished.
    pub fn apply(&self, buffer: &mut PixelBuffer, config: &EngineConfig) {
        match self {
            Filter::InPlace(op) => {
                let target = &*buffer;
                schedule(target.bounds(), config.pixel_cutoff, &|region| {
                    op.filter_region(target, region)
                });
            }
            Filter::Convolution(kernel) => {
                let output = buffer.blank_like();
                let input = &*buffer;
                schedule(input.bounds(), config.pixel_cutoff, &|region| {
                    kernel.convolve_region(input, &output, region)
                });
                *buffer = output;
            }
            Filter::Median => {
                let output = buffer.blank_like();
                let input = &*buffer;
                schedule(input.bounds(), config.pixel_cutoff, &|region| {
                    median_region(input, &output, region)
                });
                *buffer = output;
            }
            Filter::Mosaic(mosaic) => {
                let target = &*buffer;
                let cutoff = match mosaic.style {
                    MosaicStyle::Emoji(_) => config.emoji_block_cutoff,
                    MosaicStyle::Ascii | MosaicStyle::Ansi => config.glyph_block_cutoff,
                };
                let grid = mosaic.block_grid(target);
                debug!(
                    "{} mosaic over {} blocks of {:?}",
                    mosaic.catalog.kind().name(),
                    grid,
                    mosaic.catalog.tile_size()
                );
                schedule(grid, cutoff, &|blocks| {
                    mosaic.filter_region(target, blocks)
                });
            }
            Filter::DominantHue(dom) => dom.apply(buffer, config.hue_cutoff),
        }
    }
}

/// Maps filter names to configured `Filter`s.
#[derive(Debug, Clone)]
pub struct FilterFactory {
    catalogs: Catalogs,
    transparency: TransparencyPolicy,
}

impl FilterFactory {
    pub fn new(catalogs: Catalogs, transparency: TransparencyPolicy) -> Self {
        Self {
            catalogs,
            transparency,
        }
    }

    /// Builds the named filter, or `None` when the name is not recognized.
    /// `color` is the caller's palette color, used by the `color` filter.
    pub fn create_filter(&self, name: &str, intensity: i32, color: Argb) -> Option<Filter> {
        let color_mod = |palette| Some(Filter::InPlace(InPlaceOp::color_mod(intensity, palette)));
        let mosaic = |catalog, style| Some(Filter::Mosaic(Mosaic::new(catalog, style)));

        match name {
            "invert" => Some(Filter::InPlace(InPlaceOp::Invert)),
            "gray" => Some(Filter::InPlace(InPlaceOp::Gray)),
            "bw" => Some(Filter::InPlace(InPlaceOp::black_white(intensity))),
            "sat" => Some(Filter::InPlace(InPlaceOp::saturate(intensity))),

            "bright" => color_mod(0xFFFFFF),
            "color" => color_mod(color),
            "red" => color_mod(0xFF0000),
            "green" => color_mod(0x00FF00),
            "blue" => color_mod(0x0000FF),
            "cyan" => color_mod(0x00FFFF),
            "magenta" => color_mod(0xFF00FF),
            "yellow" => color_mod(0xFFFF00),

            "box" => Some(Filter::Convolution(Kernel::box_blur(Kernel::blur_size(intensity)))),
            "gauss" => Some(Filter::Convolution(Kernel::gaussian(Kernel::blur_size(intensity)))),
            "sharp" => Some(Filter::Convolution(Kernel::sharpen(intensity))),
            "outline" => Some(Filter::Convolution(Kernel::outline())),
            "noise" => Some(Filter::Median),

            "emoji" => mosaic(self.catalogs.emoji.clone(), MosaicStyle::Emoji(self.transparency)),
            "ascii" => mosaic(self.catalogs.glyphs.clone(), MosaicStyle::Ascii),
            "ansi" => mosaic(self.catalogs.glyphs.clone(), MosaicStyle::Ansi),

            "dom" => Some(Filter::DominantHue(DominantHue::new(intensity))),

            _ => None,
        }
    }
}
