// This file is an example of how to use the `pixel_forge` library: decode one
// image, run one filter over it, and write the result back out.

use env_logger::Env;
use log::{error, info};
use pixel_forge::core_modules::catalog::{CatalogKind, Catalogs, ReferenceCatalog};
use pixel_forge::{EngineConfig, FilterEngine, FilterRequest, PixelBuffer, FILTER_NAMES};
use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

const USAGE: &str = "Usage: pixel_forge <input> <output> <filter> [intensity] [rrggbb] \
                     [--emoji DIR] [--glyphs DIR]";

struct Args {
    input: PathBuf,
    output: PathBuf,
    filter: String,
    intensity: i32,
    color: Option<u32>,
    emoji_dir: Option<PathBuf>,
    glyph_dir: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut emoji_dir = None;
    let mut glyph_dir = None;

    let mut raw = env::args().skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--emoji" => emoji_dir = Some(raw.next().ok_or("--emoji needs a directory")?.into()),
            "--glyphs" => glyph_dir = Some(raw.next().ok_or("--glyphs needs a directory")?.into()),
            _ => positional.push(arg),
        }
    }

    if positional.len() < 3 {
        return Err(USAGE.to_string());
    }

    let intensity = match positional.get(3) {
        Some(s) => s.parse().map_err(|_| format!("intensity must be an integer, got {s}"))?,
        None => 0,
    };
    let color = match positional.get(4) {
        Some(s) => {
            let hex = s.trim_start_matches('#').trim_start_matches("0x");
            Some(u32::from_str_radix(hex, 16).map_err(|_| format!("color must be hex, got {s}"))?)
        }
        None => None,
    };

    Ok(Args {
        input: positional[0].clone().into(),
        output: positional[1].clone().into(),
        filter: positional[2].clone(),
        intensity,
        color,
        emoji_dir,
        glyph_dir,
    })
}

/// Loads every decodable image in `dir`, in file-name order.
fn load_catalog(kind: CatalogKind, dir: &Path) -> Result<ReferenceCatalog, Box<dyn Error>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        match image::open(path) {
            Ok(img) => images.push(img.to_rgba8()),
            Err(e) => info!("skipping {}: {e}", path.display()),
        }
    }
    info!("loaded {} {} tiles from {}", images.len(), kind.name(), dir.display());
    Ok(ReferenceCatalog::from_images(kind, &images)?)
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let builtin = Catalogs::builtin();
    let emoji = match &args.emoji_dir {
        Some(dir) => load_catalog(CatalogKind::Emoji, dir)?,
        None => (*builtin.emoji).clone(),
    };
    let glyphs = match &args.glyph_dir {
        Some(dir) => load_catalog(CatalogKind::Glyph, dir)?,
        None => (*builtin.glyphs).clone(),
    };

    let engine = FilterEngine::new(EngineConfig::default(), Catalogs::new(emoji, glyphs))?;

    let image = image::open(&args.input)?.to_rgba8();
    let buffer = PixelBuffer::from_rgba_image(&image);

    let mut request = FilterRequest::new(&args.filter, args.intensity);
    if let Some(color) = args.color {
        request = request.with_color(color);
    }

    let started = Instant::now();
    let output = engine.apply(&request, buffer)?;
    info!(
        "applied {} ({}) to {} in {:?}",
        request.name,
        request.intensity,
        args.input.display(),
        started.elapsed()
    );

    output.to_rgba_image().save(&args.output)?;
    println!("wrote {}", args.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("filters: {}", FILTER_NAMES.join(", "));
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
