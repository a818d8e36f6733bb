// THEORY:
// This file is the entry point for the `pixel_forge` library crate. It exposes the
// `FilterEngine` (synchronous, blocking) and the `FilterService` (its async front on
// a tokio runtime) as the public surface, along with the data types a collaborator
// needs to feed them: `PixelBuffer`, `FilterRequest`, `EngineConfig`, and the
// reference `Catalogs` the mosaic filters match against.
//
// Everything under `core_modules` is the machinery: the pixel and region types, the
// divide-and-conquer scheduler, and one module per filter family. Image decoding,
// request parsing and transport belong to the caller.

pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use core_modules::catalog::{CatalogKind, Catalogs, ReferenceCatalog, Tile};
pub use core_modules::filter::{FILTER_NAMES, Filter, FilterFactory};
pub use core_modules::pixel_buffer::PixelBuffer;
pub use error::{CatalogError, EngineError};
pub use parallel_pipeline::FilterService;
pub use pipeline::{EngineConfig, FilterEngine, FilterRequest};
