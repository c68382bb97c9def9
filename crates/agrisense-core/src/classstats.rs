//! Per-class streaming image statistics.
//!
//! Cross-tabulates a value raster against a co-registered class-label
//! raster and accumulates first/second-order statistics per class, region
//! by region under the same RAM planner as the confusion engine. Pixels
//! whose label is the no-data sentinel, or whose value is NaN, are
//! excluded.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::MeasureError;
use crate::labelfield::LabelField;
use crate::streaming::{plan_regions, LabelSource, StreamingConfig};
use crate::valuefield::ValueField;

/// Final per-class statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ClassStatistics {
    pub count: u64,
    pub mean: f64,
    /// Unbiased standard deviation; NaN when the class has a single pixel.
    pub std_dev: f64,
}

/// Welford running moments for one class.
#[derive(Debug, Clone, Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn accept(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn finish(&self) -> ClassStatistics {
        let std_dev = if self.count > 1 {
            (self.m2 / (self.count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };
        ClassStatistics {
            count: self.count,
            mean: self.mean,
            std_dev,
        }
    }
}

/// Accumulates per-class value statistics one region at a time.
#[derive(Debug, Clone)]
pub struct ClassStatsAccumulator {
    nodata: i32,
    per_class: BTreeMap<i32, RunningStats>,
}

impl ClassStatsAccumulator {
    pub fn new(nodata: i32) -> Self {
        Self {
            nodata,
            per_class: BTreeMap::new(),
        }
    }

    /// Accept one region's worth of co-located labels and values.
    pub fn accept_region(&mut self, labels: &[i32], values: &[f32]) -> Result<(), MeasureError> {
        if labels.len() != values.len() {
            return Err(MeasureError::SizeMismatch {
                produced_width: values.len(),
                produced_height: 1,
                reference_width: labels.len(),
                reference_height: 1,
            });
        }
        for (&label, &value) in labels.iter().zip(values) {
            if label == self.nodata || value.is_nan() {
                continue;
            }
            self.per_class.entry(label).or_default().accept(f64::from(value));
        }
        Ok(())
    }

    /// Synthesize the final statistics. Fails when no pixel was accepted.
    pub fn finish(self) -> Result<BTreeMap<i32, ClassStatistics>, MeasureError> {
        if self.per_class.is_empty() {
            return Err(MeasureError::EmptyStatistics);
        }
        Ok(self
            .per_class
            .iter()
            .map(|(&label, stats)| (label, stats.finish()))
            .collect())
    }
}

/// Stream a value/label raster pair and return the per-class statistics.
pub fn stream_class_stats(
    values: &ValueField,
    labels: &LabelField,
    config: &StreamingConfig,
    nodata: i32,
) -> Result<BTreeMap<i32, ClassStatistics>, MeasureError> {
    let (label_width, label_height) = labels.dimensions();
    if (values.width, values.height) != (label_width, label_height) {
        return Err(MeasureError::SizeMismatch {
            produced_width: values.width,
            produced_height: values.height,
            reference_width: label_width,
            reference_height: label_height,
        });
    }

    // One f32 band plus one i32 label plane resident per region.
    let bytes_per_pixel = std::mem::size_of::<f32>() + std::mem::size_of::<i32>();
    let regions = plan_regions(label_width, label_height, bytes_per_pixel, config);

    let mut accumulator = ClassStatsAccumulator::new(nodata);
    let mut label_buf = Vec::new();
    let mut value_buf = Vec::new();
    for region in &regions {
        labels.read_region(region, &mut label_buf)?;
        values.read_region(region, &mut value_buf)?;
        accumulator.accept_region(&label_buf, &value_buf)?;
    }
    accumulator.finish()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn per_class_mean_and_std_match_closed_form() {
        let mut acc = ClassStatsAccumulator::new(0);
        acc.accept_region(&[1, 1, 1, 2], &[2.0, 4.0, 6.0, 10.0]).unwrap();
        acc.accept_region(&[2, 0], &[20.0, 999.0]).unwrap();
        let stats = acc.finish().unwrap();

        let class1 = &stats[&1];
        assert_eq!(class1.count, 3);
        assert_relative_eq!(class1.mean, 4.0, epsilon = 1e-12);
        assert_relative_eq!(class1.std_dev, 2.0, epsilon = 1e-12);

        let class2 = &stats[&2];
        assert_eq!(class2.count, 2);
        assert_relative_eq!(class2.mean, 15.0, epsilon = 1e-12);
    }

    #[test]
    fn nodata_and_nan_pixels_are_excluded() {
        let mut acc = ClassStatsAccumulator::new(-1);
        acc.accept_region(&[-1, 5, 5], &[1.0, f32::NAN, 3.0]).unwrap();
        let stats = acc.finish().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&5].count, 1);
        assert!(stats[&5].std_dev.is_nan());
    }

    #[test]
    fn all_excluded_pixels_is_an_error() {
        let mut acc = ClassStatsAccumulator::new(0);
        acc.accept_region(&[0, 0], &[1.0, 2.0]).unwrap();
        assert!(matches!(acc.finish(), Err(MeasureError::EmptyStatistics)));
    }

    #[test]
    fn streamed_stats_match_single_pass() {
        let mut values = ValueField::filled(16, 16, 0.0);
        let mut labels = LabelField::filled(16, 16, 1);
        for row in 0..16 {
            for col in 0..16 {
                values.set(row, col, (row * 16 + col) as f32);
                if row >= 8 {
                    labels.set(row, col, 2);
                }
            }
        }

        // A zero budget degrades to one-row strips, forcing 16 regions.
        let tight = StreamingConfig {
            ram_budget_mb: 0,
            ram_bias: 2.0,
        };
        let streamed = stream_class_stats(&values, &labels, &tight, 0).unwrap();

        let mut single = ClassStatsAccumulator::new(0);
        single.accept_region(&labels.data, &values.data).unwrap();
        let reference = single.finish().unwrap();

        for (label, stats) in &streamed {
            assert_eq!(stats.count, reference[label].count);
            assert_relative_eq!(stats.mean, reference[label].mean, epsilon = 1e-9);
            assert_relative_eq!(stats.std_dev, reference[label].std_dev, epsilon = 1e-9);
        }
    }
}
