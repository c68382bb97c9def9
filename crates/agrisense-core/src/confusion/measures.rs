//! Per-class and global accuracy measures over the square matrix.
//!
//! Precision, recall and F-score are one-vs-rest per reference class;
//! kappa and overall accuracy are global. A zero denominator makes the
//! affected metric NaN (the class was never predicted, or never present),
//! which is reported but never aborts the run. A matrix with zero total
//! mass aborts instead: every metric would be meaningless.

use serde::Serialize;

use crate::error::MeasureError;

use super::matrix::ConfusionMatrix;

/// One-vs-rest metrics for a single reference class.
///
/// Each value lies in [0, 1] or is NaN when its denominator is zero.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMetrics {
    pub label: i32,
    pub precision: f64,
    pub recall: f64,
    pub f_score: f64,
}

/// Full measurement output for one confusion matrix.
#[derive(Debug, Clone, Serialize)]
pub struct Measurements {
    pub per_class: Vec<ClassMetrics>,
    /// Trace over total mass, in [0, 1].
    pub overall_accuracy: f64,
    /// Chance-corrected agreement, in [-1, 1].
    pub kappa_index: f64,
}

/// Compute all measures from the square diagnostic matrix.
///
/// Returns [`MeasureError::EmptyMatrix`] when the matrix has zero mass;
/// callers must surface that as a run failure rather than print NaNs.
pub fn measure(matrix: &ConfusionMatrix) -> Result<Measurements, MeasureError> {
    debug_assert_eq!(
        matrix.row_labels(),
        matrix.col_labels(),
        "measurement requires the square diagnostic matrix"
    );

    let n = matrix.rows();
    let total = matrix.total();
    if total == 0 {
        return Err(MeasureError::EmptyMatrix);
    }

    let mut row_sums = vec![0u64; n];
    let mut col_sums = vec![0u64; n];
    for i in 0..n {
        for j in 0..n {
            let c = matrix.get(i, j);
            row_sums[i] += c;
            col_sums[j] += c;
        }
    }

    let mut per_class = Vec::with_capacity(n);
    let mut trace = 0u64;
    for i in 0..n {
        let tp = matrix.get(i, i);
        trace += tp;
        // col_sums[i] = TP + FP, row_sums[i] = TP + FN.
        let precision = ratio(tp, col_sums[i]);
        let recall = ratio(tp, row_sums[i]);
        let f_score = if precision.is_nan() || recall.is_nan() || precision + recall == 0.0 {
            f64::NAN
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        per_class.push(ClassMetrics {
            label: matrix.row_labels()[i],
            precision,
            recall,
            f_score,
        });
    }

    let total_f = total as f64;
    let overall_accuracy = trace as f64 / total_f;

    let chance_agreement: f64 = row_sums
        .iter()
        .zip(&col_sums)
        .map(|(&r, &c)| (r as f64 / total_f) * (c as f64 / total_f))
        .sum();
    let kappa_index = if chance_agreement >= 1.0 {
        // Degenerate single-cell mass: agreement is entirely by chance.
        if overall_accuracy >= 1.0 {
            1.0
        } else {
            0.0
        }
    } else {
        (overall_accuracy - chance_agreement) / (1.0 - chance_agreement)
    };

    Ok(Measurements {
        per_class,
        overall_accuracy,
        kappa_index,
    })
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::super::accumulator::ConfusionAccumulator;
    use super::*;

    fn square_from(cells: &[(i32, i32, u64)]) -> ConfusionMatrix {
        let mut acc = ConfusionAccumulator::new(i32::MIN);
        for &(r, p, count) in cells {
            for _ in 0..count {
                acc.add(r, p);
            }
        }
        acc.freeze().square_matrix()
    }

    #[test]
    fn two_class_matrix_matches_hand_computed_metrics() {
        // [[50, 10], [5, 35]] over classes {0, 1}.
        let m = square_from(&[(0, 0, 50), (0, 1, 10), (1, 0, 5), (1, 1, 35)]);
        let out = measure(&m).unwrap();

        assert_relative_eq!(out.per_class[0].precision, 50.0 / 55.0, epsilon = 1e-12);
        assert_relative_eq!(out.per_class[0].recall, 50.0 / 60.0, epsilon = 1e-12);
        assert_relative_eq!(out.overall_accuracy, 0.85, epsilon = 1e-12);
        // pe = (60*55 + 40*45) / 100^2 = 0.51
        assert_relative_eq!(out.kappa_index, (0.85 - 0.51) / (1.0 - 0.51), epsilon = 1e-12);
    }

    #[test]
    fn perfect_diagonal_yields_unit_metrics() {
        let m = square_from(&[(1, 1, 10), (2, 2, 20), (3, 3, 30)]);
        let out = measure(&m).unwrap();
        for class in &out.per_class {
            assert_relative_eq!(class.precision, 1.0);
            assert_relative_eq!(class.recall, 1.0);
            assert_relative_eq!(class.f_score, 1.0);
        }
        assert_relative_eq!(out.overall_accuracy, 1.0);
        assert_relative_eq!(out.kappa_index, 1.0);
    }

    #[test]
    fn never_predicted_class_has_nan_precision_and_fscore() {
        // Class 2 exists in the reference but is never produced.
        let m = square_from(&[(1, 1, 4), (2, 1, 3)]);
        let out = measure(&m).unwrap();
        let class2 = &out.per_class[1];
        assert_eq!(class2.label, 2);
        assert!(class2.precision.is_nan());
        assert_eq!(class2.recall, 0.0);
        assert!(class2.f_score.is_nan());
    }

    #[test]
    fn empty_matrix_is_an_error_not_a_nan() {
        let acc = ConfusionAccumulator::new(0);
        let m = acc.freeze().square_matrix();
        assert!(matches!(measure(&m), Err(MeasureError::EmptyMatrix)));
    }

    #[test]
    fn metrics_stay_within_bounds_on_a_skewed_matrix() {
        let m = square_from(&[(1, 1, 1), (1, 2, 999), (2, 2, 1), (2, 1, 999)]);
        let out = measure(&m).unwrap();
        for class in &out.per_class {
            assert!(class.precision >= 0.0 && class.precision <= 1.0);
            assert!(class.recall >= 0.0 && class.recall <= 1.0);
        }
        assert!(out.kappa_index >= -1.0 && out.kappa_index <= 1.0);
        assert!(out.overall_accuracy >= 0.0 && out.overall_accuracy <= 1.0);
    }

    #[test]
    fn single_class_perfect_matrix_has_defined_kappa() {
        // All mass in one diagonal cell: pe == 1, handled explicitly.
        let m = square_from(&[(4, 4, 100)]);
        let out = measure(&m).unwrap();
        assert_relative_eq!(out.overall_accuracy, 1.0);
        assert_relative_eq!(out.kappa_index, 1.0);
    }
}
