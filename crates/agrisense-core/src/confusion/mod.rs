//! Streaming confusion-matrix engine: label discovery → sparse
//! accumulation → dense materialization → accuracy measures → report.
pub mod accumulator;
pub mod matrix;
pub mod measures;
pub mod registry;
pub mod report;

pub use accumulator::ConfusionAccumulator;
pub use matrix::{ConfusionMatrix, ConfusionTally};
pub use measures::{measure, ClassMetrics, Measurements};
pub use registry::{LabelIndex, LabelRegistry};
pub use report::{format_metric, render_matrix, write_csv};
