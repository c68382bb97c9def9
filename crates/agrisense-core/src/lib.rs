//! Accuracy assessment engine for agricultural classification rasters.
//!
//! The centrepiece is the streaming confusion-matrix pipeline: a RAM-driven
//! tile planner walks a classification/reference raster pair in bounded
//! strips, a sparse accumulator discovers the label spaces incrementally,
//! and the frozen tally is materialized into dense matrices for accuracy
//! measures (precision/recall/F-score, kappa, overall accuracy) and for the
//! CSV/diagnostic reports. A per-class streaming statistics module shares
//! the same planner.
//!
//! Image decoding, georeferencing and ground-truth rasterization live in
//! the tools and external collaborators; the engine only sees label and
//! value grids.
pub mod classstats;
pub mod confusion;
pub mod error;
pub mod labelfield;
pub mod streaming;
pub mod valuefield;

pub use confusion::{ConfusionAccumulator, ConfusionMatrix, ConfusionTally, Measurements};
pub use error::MeasureError;
pub use labelfield::LabelField;
pub use streaming::{LabelSource, PixelRegion, StreamingConfig};
pub use valuefield::ValueField;
