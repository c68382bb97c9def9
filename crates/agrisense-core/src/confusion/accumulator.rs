//! Sparse streaming accumulation of (reference, produced) pixel pairs.
//!
//! Memory scales with the number of distinct observed label pairs, never
//! with raster size, so arbitrarily large scenes can be streamed through a
//! fixed-size tally. Counts are u64: a billion-pixel mosaic must not wrap.

use std::collections::BTreeMap;

use super::matrix::ConfusionTally;
use super::registry::LabelRegistry;

/// Accumulates confusion counts one pixel pair at a time.
///
/// One accumulator is one measurement run. `freeze` consumes the value, so
/// feeding further tiles after the tally is taken is rejected at compile
/// time, and a subsequent run starts from a fresh accumulator with no
/// carried-over counts.
#[derive(Debug, Clone)]
pub struct ConfusionAccumulator {
    nodata: i32,
    counts: BTreeMap<i32, BTreeMap<i32, u64>>,
    reference_labels: LabelRegistry,
    produced_labels: LabelRegistry,
    pairs: u64,
}

impl ConfusionAccumulator {
    /// `nodata` is the sentinel label excluded from all accounting.
    pub fn new(nodata: i32) -> Self {
        Self {
            nodata,
            counts: BTreeMap::new(),
            reference_labels: LabelRegistry::new(),
            produced_labels: LabelRegistry::new(),
            pairs: 0,
        }
    }

    pub fn nodata(&self) -> i32 {
        self.nodata
    }

    /// Record one pixel pair. Pairs where either side carries the no-data
    /// label are discarded without touching any state.
    pub fn add(&mut self, reference: i32, produced: i32) {
        if reference == self.nodata || produced == self.nodata {
            return;
        }
        self.reference_labels.register(reference);
        self.produced_labels.register(produced);
        *self
            .counts
            .entry(reference)
            .or_default()
            .entry(produced)
            .or_insert(0) += 1;
        self.pairs += 1;
    }

    /// Number of non-excluded pairs accumulated so far. Always equals the
    /// total mass of the materialized raw matrix.
    pub fn pairs_accumulated(&self) -> u64 {
        self.pairs
    }

    /// Fold another accumulator into this one. Used to combine per-region
    /// partial tallies produced on worker threads.
    pub fn merge(&mut self, other: ConfusionAccumulator) {
        debug_assert_eq!(self.nodata, other.nodata);
        self.reference_labels.merge(&other.reference_labels);
        self.produced_labels.merge(&other.produced_labels);
        for (reference, row) in other.counts {
            let dst = self.counts.entry(reference).or_default();
            for (produced, count) in row {
                *dst.entry(produced).or_insert(0) += count;
            }
        }
        self.pairs += other.pairs;
    }

    /// Finish accumulation: freeze both label indices and hand the sparse
    /// counts over to the tally for materialization and reporting.
    pub fn freeze(self) -> ConfusionTally {
        let reference_index = self.reference_labels.freeze();
        let produced_index = self.produced_labels.freeze();
        ConfusionTally::new(self.counts, reference_index, produced_index, self.pairs)
    }
}
