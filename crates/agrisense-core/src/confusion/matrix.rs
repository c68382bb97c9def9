//! Dense materialization of the frozen sparse tally.
//!
//! Two derived views exist over the one sparse source:
//! * the square diagnostic matrix (reference labels on both axes), which
//!   feeds the measurement engine and the aligned log table;
//! * the rectangular raw matrix (all produced labels as columns), which
//!   feeds the CSV export.
//! Keeping both as derivations of the same tally rules out the two views
//! drifting apart.

use std::collections::BTreeMap;

use super::registry::LabelIndex;

/// Frozen result of one accumulation run: the sparse counts plus the final
/// label indices for both label spaces.
#[derive(Debug, Clone)]
pub struct ConfusionTally {
    counts: BTreeMap<i32, BTreeMap<i32, u64>>,
    reference_index: LabelIndex,
    produced_index: LabelIndex,
    pairs: u64,
}

impl ConfusionTally {
    pub(crate) fn new(
        counts: BTreeMap<i32, BTreeMap<i32, u64>>,
        reference_index: LabelIndex,
        produced_index: LabelIndex,
        pairs: u64,
    ) -> Self {
        Self {
            counts,
            reference_index,
            produced_index,
            pairs,
        }
    }

    pub fn reference_index(&self) -> &LabelIndex {
        &self.reference_index
    }

    pub fn produced_index(&self) -> &LabelIndex {
        &self.produced_index
    }

    /// Total non-excluded pixel-pair mass.
    pub fn pairs_accumulated(&self) -> u64 {
        self.pairs
    }

    /// Sparse count for one (reference, produced) label pair.
    pub fn count(&self, reference: i32, produced: i32) -> u64 {
        self.counts
            .get(&reference)
            .and_then(|row| row.get(&produced))
            .copied()
            .unwrap_or(0)
    }

    /// All non-zero (reference, produced, count) triples in ascending
    /// (reference, produced) order.
    pub fn triples(&self) -> impl Iterator<Item = (i32, i32, u64)> + '_ {
        self.counts.iter().flat_map(|(&reference, row)| {
            row.iter().map(move |(&produced, &count)| (reference, produced, count))
        })
    }

    /// Square diagnostic matrix: rows and columns are both the sorted
    /// reference labels.
    ///
    /// Compatibility limitation carried over from the original application:
    /// produced labels absent from the reference set are dropped here (they
    /// still appear in [`ConfusionTally::raw_matrix`] and the CSV export),
    /// so spurious predicted classes do not enter precision/recall/kappa.
    pub fn square_matrix(&self) -> ConfusionMatrix {
        let labels = self.reference_index.labels().to_vec();
        let n = labels.len();
        let mut data = vec![0u64; n * n];
        for (reference, produced, count) in self.triples() {
            let row = self
                .reference_index
                .position(reference)
                .expect("tally row label missing from frozen reference index");
            if let Some(col) = self.reference_index.position(produced) {
                data[row * n + col] = count;
            }
        }
        ConfusionMatrix {
            data,
            row_labels: labels.clone(),
            col_labels: labels,
        }
    }

    /// Rectangular raw matrix: rows are the sorted reference labels,
    /// columns are the sorted produced labels; every sparse entry is kept.
    pub fn raw_matrix(&self) -> ConfusionMatrix {
        let row_labels = self.reference_index.labels().to_vec();
        let col_labels = self.produced_index.labels().to_vec();
        let cols = col_labels.len();
        let mut data = vec![0u64; row_labels.len() * cols];
        for (reference, produced, count) in self.triples() {
            let row = self
                .reference_index
                .position(reference)
                .expect("tally row label missing from frozen reference index");
            let col = self
                .produced_index
                .position(produced)
                .expect("tally column label missing from frozen produced index");
            data[row * cols + col] = count;
        }
        ConfusionMatrix {
            data,
            row_labels,
            col_labels,
        }
    }
}

/// Dense confusion matrix with its row/column label ordering.
///
/// `get(i, j)` counts pixels whose reference label is `row_labels[i]` and
/// whose produced label is `col_labels[j]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    data: Vec<u64>,
    row_labels: Vec<i32>,
    col_labels: Vec<i32>,
}

impl ConfusionMatrix {
    pub fn rows(&self) -> usize {
        self.row_labels.len()
    }

    pub fn cols(&self) -> usize {
        self.col_labels.len()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u64 {
        self.data[row * self.col_labels.len() + col]
    }

    pub fn row_labels(&self) -> &[i32] {
        &self.row_labels
    }

    pub fn col_labels(&self) -> &[i32] {
        &self.col_labels
    }

    /// Row-major cell data.
    pub fn data(&self) -> &[u64] {
        &self.data
    }

    /// Sum of every cell.
    pub fn total(&self) -> u64 {
        self.data.iter().sum()
    }
}
