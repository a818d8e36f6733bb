// THEORY:
// The `pipeline` module is the top-level, synchronous API of the filter engine. A
// `FilterEngine` owns three things for the life of the process:
//   - the work-stealing pool every invocation runs on,
//   - the reference catalogs, loaded once and passed in by the caller,
//   - the `EngineConfig` (pool size, per-shape cutoffs, mosaic policy).
//
// A call takes a decoded buffer by value, looks the filter up by name, runs it to
// completion on the pool, and hands the buffer back. The caller blocks until then.
// An unknown name is the only ordinary failure. If any unit transform panics the
// whole invocation fails and the buffer is dropped, so a partially filtered image
// never escapes.

use crate::core_modules::catalog::Catalogs;
use crate::core_modules::filter::{Filter, FilterFactory};
use crate::core_modules::mosaic::TransparencyPolicy;
use crate::core_modules::pixel::pixel::{Argb, RGB_MASK};
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::EngineError;
use log::{debug, error, info};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Palette color used when the caller does not supply one.
pub const DEFAULT_COLOR: Argb = 0xFF0000;

/// Configuration for the FilterEngine, allowing for tunable behavior.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Number of worker threads in the engine's pool.
    pub worker_threads: usize,
    /// Largest region, in pixels, processed sequentially by pixel-unit filters.
    pub pixel_cutoff: u64,
    /// Sequential cutoff, in pixels, for both dominant-hue passes.
    pub hue_cutoff: u64,
    /// Sequential cutoff, in blocks, for emoji matching.
    pub emoji_block_cutoff: u64,
    /// Sequential cutoff, in blocks, for ascii/ansi matching.
    pub glyph_block_cutoff: u64,
    /// What emoji matching emits under a transparent winner pixel.
    pub transparency: TransparencyPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            pixel_cutoff: 1000,
            hue_cutoff: 1024,
            emoji_block_cutoff: 4,
            glyph_block_cutoff: 16,
            transparency: TransparencyPolicy::White,
        }
    }
}

/// One filter invocation's parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRequest {
    /// Lower-cased filter name.
    pub name: String,
    /// Roughly -100..=100; meaning depends on the filter.
    pub intensity: i32,
    /// 24-bit palette color.
    pub color: Argb,
}

impl FilterRequest {
    pub fn new(name: &str, intensity: i32) -> Self {
        Self {
            name: name.trim().to_lowercase(),
            intensity,
            color: DEFAULT_COLOR,
        }
    }

    pub fn with_color(mut self, color: Argb) -> Self {
        self.color = color & RGB_MASK;
        self
    }
}

/// The main, top-level struct for the filter engine.
pub struct FilterEngine {
    pool: rayon::ThreadPool,
    factory: FilterFactory,
    config: EngineConfig,
}

impl FilterEngine {
    pub fn new(config: EngineConfig, catalogs: Catalogs) -> Result<Self, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("pixel-forge-{i}"))
            .build()?;
        info!(
            "filter engine ready: {} workers, {} emoji tiles {:?}, {} glyph tiles {:?}",
            pool.current_num_threads(),
            catalogs.emoji.len(),
            catalogs.emoji.tile_size(),
            catalogs.glyphs.len(),
            catalogs.glyphs.tile_size()
        );
        Ok(Self {
            pool,
            factory: FilterFactory::new(catalogs, config.transparency),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Looks up a configured filter without running it.
    pub fn create_filter(&self, request: &FilterRequest) -> Option<Filter> {
        self.factory
            .create_filter(&request.name, request.intensity, request.color)
    }

    /// Applies `request` to `buffer` and returns the filtered buffer. Building the
    /// filter happens on the pool too, so nothing the request triggers can unwind
    /// past the caller.
    pub fn apply(
        &self,
        request: &FilterRequest,
        buffer: PixelBuffer,
    ) -> Result<PixelBuffer, EngineError> {
        let started = Instant::now();
        let filtered = self.install(&request.name, move || {
            let filter = self.create_filter(request)?;
            let mut buffer = buffer;
            filter.apply(&mut buffer, &self.config);
            Some(buffer)
        })?;
        let buffer = filtered.ok_or_else(|| EngineError::UnknownFilter(request.name.clone()))?;
        debug!(
            "{} ({}) on {}x{} took {:?}",
            request.name,
            request.intensity,
            buffer.width(),
            buffer.height(),
            started.elapsed()
        );
        Ok(buffer)
    }

    /// Runs `job` on the pool and turns a panic anywhere in it into an error.
    pub fn install<R, F>(&self, label: &str, job: F) -> Result<R, EngineError>
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        panic::catch_unwind(AssertUnwindSafe(|| self.pool.install(job))).map_err(|payload| {
            let reason = panic_message(payload.as_ref());
            error!("{} aborted: {}", label, reason);
            EngineError::WorkerPanicked(reason)
        })
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
