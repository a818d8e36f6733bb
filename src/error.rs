use thiserror::Error;

/// Failures surfaced by the filter engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The only ordinary failure: the requested filter name is not recognized.
    #[error("filter does not exist: {0}")]
    UnknownFilter(String),
    #[error("filter invocation aborted: {0}")]
    WorkerPanicked(String),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("filter service is shut down")]
    ServiceClosed,
}

/// Reasons a reference catalog cannot be built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog has no entries")]
    Empty,
    #[error("catalog tile {index} has zero width or height")]
    EmptyTile { index: usize },
    #[error("catalog tile {index} is {found:?}, expected {expected:?}")]
    MismatchedTile {
        index: usize,
        expected: (u32, u32),
        found: (u32, u32),
    },
    #[error("emoji tile {index} has no opaque pixels")]
    FullyTransparent { index: usize },
}
