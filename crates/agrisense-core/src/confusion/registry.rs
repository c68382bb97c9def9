//! Label discovery and index assignment.
//!
//! Class labels are sparse signed integers discovered while the rasters
//! stream past; reports and dense matrices need contiguous 0-based
//! positions in ascending label order. The registry collects labels into
//! an ordered set and assigns all indices once, at freeze time, instead of
//! re-sorting incrementally.

use std::collections::{BTreeMap, BTreeSet};

/// A growing set of distinct class labels.
///
/// Reference and produced label spaces each get their own registry;
/// registration is idempotent and O(log k).
#[derive(Debug, Clone, Default)]
pub struct LabelRegistry {
    labels: BTreeSet<i32>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `label` if absent. Returns true on first registration.
    pub fn register(&mut self, label: i32) -> bool {
        self.labels.insert(label)
    }

    pub fn contains(&self, label: i32) -> bool {
        self.labels.contains(&label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Merge another registry's labels into this one.
    pub fn merge(&mut self, other: &LabelRegistry) {
        self.labels.extend(other.labels.iter().copied());
    }

    /// Assign final indices: position k goes to the k-th smallest label.
    pub fn freeze(&self) -> LabelIndex {
        let labels: Vec<i32> = self.labels.iter().copied().collect();
        let positions = labels
            .iter()
            .enumerate()
            .map(|(pos, &label)| (label, pos))
            .collect();
        LabelIndex { labels, positions }
    }
}

/// Frozen bijection between labels and dense 0-based positions.
///
/// Invariant: `labels` is ascending and `positions[labels[k]] == k` for
/// every `k` in `0..len()`.
#[derive(Debug, Clone)]
pub struct LabelIndex {
    labels: Vec<i32>,
    positions: BTreeMap<i32, usize>,
}

impl LabelIndex {
    /// Labels in ascending order; the slice index is the dense position.
    pub fn labels(&self) -> &[i32] {
        &self.labels
    }

    /// Dense position of `label`, or None if it was never registered.
    pub fn position(&self, label: i32) -> Option<usize> {
        self.positions.get(&label).copied()
    }

    pub fn contains(&self, label: i32) -> bool {
        self.positions.contains_key(&label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_orders_by_ascending_label_not_discovery() {
        let mut reg = LabelRegistry::new();
        for label in [42, -3, 7, 42, 0, -3] {
            reg.register(label);
        }
        let index = reg.freeze();
        assert_eq!(index.labels(), &[-3, 0, 7, 42]);
        assert_eq!(index.position(-3), Some(0));
        assert_eq!(index.position(42), Some(3));
        assert_eq!(index.position(99), None);
    }

    #[test]
    fn register_is_idempotent() {
        let mut reg = LabelRegistry::new();
        assert!(reg.register(5));
        assert!(!reg.register(5));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn positions_are_contiguous() {
        let mut reg = LabelRegistry::new();
        for label in [100, 1, 50] {
            reg.register(label);
        }
        let index = reg.freeze();
        let mut positions: Vec<usize> = index
            .labels()
            .iter()
            .map(|&l| index.position(l).unwrap())
            .collect();
        positions.sort_unstable();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn merge_unions_label_sets() {
        let mut a = LabelRegistry::new();
        a.register(1);
        a.register(3);
        let mut b = LabelRegistry::new();
        b.register(2);
        b.register(3);
        a.merge(&b);
        assert_eq!(a.freeze().labels(), &[1, 2, 3]);
    }
}
