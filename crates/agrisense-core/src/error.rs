use thiserror::Error;

/// Errors raised by the accuracy-measurement engine.
///
/// Raster-level failures (size mismatch, unreadable region, missing
/// reference) abort the whole run; per-class undefined metrics are NOT
/// errors and are reported as NaN instead.
#[derive(Debug, Error)]
pub enum MeasureError {
    /// No valid pixel pairs were accumulated: every pixel carried the
    /// no-data label, or no input was streamed at all.
    #[error("confusion matrix has zero mass: no valid pixel pairs were accumulated")]
    EmptyMatrix,

    /// Classification and reference rasters do not share a pixel grid.
    #[error("raster size mismatch: classification is {produced_width}x{produced_height}, reference is {reference_width}x{reference_height}")]
    SizeMismatch {
        produced_width: usize,
        produced_height: usize,
        reference_width: usize,
        reference_height: usize,
    },

    /// A requested read region falls outside the raster extent.
    #[error("region at ({x},{y}) sized {width}x{height} exceeds the {raster_width}x{raster_height} raster")]
    RegionOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        raster_width: usize,
        raster_height: usize,
    },

    /// An input image has no usable reference raster.
    #[error("no reference raster available for input '{0}'")]
    MissingReference(String),

    /// Per-class statistics were requested but no pixel was accepted.
    #[error("class statistics are empty: no valid pixels were accepted")]
    EmptyStatistics,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
