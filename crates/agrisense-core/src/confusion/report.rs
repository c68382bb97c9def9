//! Report rendering: the aligned diagnostic table and the CSV artifact.
//!
//! The CSV starts with two comment lines declaring the exact row/column
//! label order, then one row of raw counts per reference label across
//! every produced label. Downstream scripts parse these headers to
//! recover the label order.

use std::io::Write;

use crate::error::MeasureError;

use super::matrix::{ConfusionMatrix, ConfusionTally};

const REFERENCE_HEADER: &str = "#Reference labels (rows):";
const PRODUCED_HEADER: &str = "#Produced labels (columns):";
const SEPARATOR: char = ',';

/// Render a matrix as a fixed-width aligned table with bracketed labels.
///
/// The column width is the widest of all cell digit-widths and all
/// `[label]` widths, so every row lines up in the log.
pub fn render_matrix(matrix: &ConfusionMatrix) -> String {
    let mut width = 0usize;
    for row in 0..matrix.rows() {
        for col in 0..matrix.cols() {
            width = width.max(matrix.get(row, col).to_string().len());
        }
    }
    for &label in matrix.row_labels().iter().chain(matrix.col_labels()) {
        width = width.max(format!("[{label}]").len());
    }

    let mut out = String::new();

    // Header line: blank corner, then one bracketed label per column.
    out.push_str(&" ".repeat(width + 1));
    for &label in matrix.col_labels() {
        out.push_str(&format!("[{:>w$}] ", label, w = width.saturating_sub(2)));
    }
    out.push('\n');

    for row in 0..matrix.rows() {
        out.push_str(&format!(
            "[{:>w$}] ",
            matrix.row_labels()[row],
            w = width.saturating_sub(2)
        ));
        for col in 0..matrix.cols() {
            out.push_str(&format!("{:>w$} ", matrix.get(row, col), w = width));
        }
        out.push('\n');
    }
    out
}

/// Write the CSV artifact: two comment headers declaring label order,
/// then the raw rectangular counts.
pub fn write_csv<W: Write>(writer: &mut W, tally: &ConfusionTally) -> Result<(), MeasureError> {
    let raw = tally.raw_matrix();

    writeln!(writer, "{}{}", REFERENCE_HEADER, join_labels(raw.row_labels()))?;
    writeln!(writer, "{}{}", PRODUCED_HEADER, join_labels(raw.col_labels()))?;

    for row in 0..raw.rows() {
        for col in 0..raw.cols() {
            if col > 0 {
                write!(writer, "{SEPARATOR}")?;
            }
            write!(writer, "{}", raw.get(row, col))?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

/// Fixed-precision rendering for metric values: 10 decimal digits.
pub fn format_metric(value: f64) -> String {
    format!("{value:.10}")
}

fn join_labels(labels: &[i32]) -> String {
    labels
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::super::accumulator::ConfusionAccumulator;
    use super::*;

    fn tally_from(pairs: &[(i32, i32)]) -> ConfusionTally {
        let mut acc = ConfusionAccumulator::new(0);
        for &(r, p) in pairs {
            acc.add(r, p);
        }
        acc.freeze()
    }

    #[test]
    fn csv_headers_declare_sorted_label_order() {
        let tally = tally_from(&[(3, 1), (1, 1), (3, 7)]);
        let mut buf = Vec::new();
        write_csv(&mut buf, &tally).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("#Reference labels (rows):1,3"));
        assert_eq!(lines.next(), Some("#Produced labels (columns):1,7"));
    }

    #[test]
    fn csv_rows_carry_raw_counts_per_produced_label() {
        let tally = tally_from(&[(1, 1), (1, 1), (1, 7), (3, 1)]);
        let mut buf = Vec::new();
        write_csv(&mut buf, &tally).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let rows: Vec<&str> = text.lines().skip(2).collect();
        assert_eq!(rows, vec!["2,1", "1,0"]);
    }

    #[test]
    fn csv_ends_with_trailing_newline() {
        let tally = tally_from(&[(1, 1)]);
        let mut buf = Vec::new();
        write_csv(&mut buf, &tally).unwrap();
        assert_eq!(buf.last(), Some(&b'\n'));
    }

    #[test]
    fn rendered_matrix_rows_share_one_width() {
        let tally = tally_from(&[(10, 10), (10, 200), (200, 200)]);
        let rendered = render_matrix(&tally.square_matrix());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 label rows
        assert!(lines[1].starts_with("[ 10]"));
        assert_eq!(lines[1].len(), lines[2].len());
    }

    #[test]
    fn metric_formatting_uses_ten_decimals() {
        assert_eq!(format_metric(0.85), "0.8500000000");
        assert_eq!(format_metric(1.0), "1.0000000000");
    }
}
