//! RAM-driven tiled streaming over paired label rasters.
//!
//! The raster pair is partitioned into horizontal strips sized from an
//! available-memory budget and an empirical inflation bias, then each
//! strip's pixels are walked in lockstep and fed to the accumulator. The
//! strips disjointly cover the full pixel domain; region order never
//! changes the accumulated result.

use crate::confusion::accumulator::ConfusionAccumulator;
use crate::error::MeasureError;
use crate::labelfield::LabelField;

/// A rectangular pixel region: `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRegion {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelRegion {
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Memory budget for one streamed region.
#[derive(Debug, Clone, Copy)]
pub struct StreamingConfig {
    /// Available memory for both rasters' region buffers, in MB.
    pub ram_budget_mb: usize,
    /// Empirical inflation factor applied on top of the raw buffer size.
    pub ram_bias: f64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            ram_budget_mb: 256,
            ram_bias: 2.0,
        }
    }
}

/// Anything that can hand out rectangular windows of an i32 label raster.
///
/// `read_region` must clear `out` and fill it with exactly
/// `region.pixel_count()` labels in row-major order.
pub trait LabelSource {
    /// (width, height) in pixels.
    fn dimensions(&self) -> (usize, usize);

    fn read_region(&self, region: &PixelRegion, out: &mut Vec<i32>) -> Result<(), MeasureError>;
}

impl LabelSource for LabelField {
    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn read_region(&self, region: &PixelRegion, out: &mut Vec<i32>) -> Result<(), MeasureError> {
        check_region(region, self.width, self.height)?;
        out.clear();
        out.reserve(region.pixel_count());
        for row in region.y..region.y + region.height {
            let start = row * self.width + region.x;
            out.extend_from_slice(&self.data[start..start + region.width]);
        }
        Ok(())
    }
}

pub(crate) fn check_region(
    region: &PixelRegion,
    raster_width: usize,
    raster_height: usize,
) -> Result<(), MeasureError> {
    if region.x + region.width > raster_width || region.y + region.height > raster_height {
        return Err(MeasureError::RegionOutOfBounds {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            raster_width,
            raster_height,
        });
    }
    Ok(())
}

/// Partition a `width`×`height` raster into horizontal strips whose pixel
/// buffers fit the budget.
///
/// `bytes_per_pixel` is the combined per-pixel footprint across every
/// raster resident for one region (two i32 rasters → 8). The strips are
/// non-overlapping and cover the raster exactly; a budget too small for a
/// single row still yields one-row strips rather than losing coverage.
pub fn plan_regions(
    width: usize,
    height: usize,
    bytes_per_pixel: usize,
    config: &StreamingConfig,
) -> Vec<PixelRegion> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let budget_bytes = config.ram_budget_mb as f64 * 1024.0 * 1024.0;
    let bytes_per_row = (width * bytes_per_pixel) as f64 * config.ram_bias.max(1.0);
    let rows_per_strip = ((budget_bytes / bytes_per_row) as usize).clamp(1, height);

    let mut regions = Vec::with_capacity(height.div_ceil(rows_per_strip));
    let mut y = 0;
    while y < height {
        let strip_height = rows_per_strip.min(height - y);
        regions.push(PixelRegion {
            x: 0,
            y,
            width,
            height: strip_height,
        });
        y += strip_height;
    }
    regions
}

/// Stream a classification/reference raster pair into the accumulator,
/// region by region. Returns the number of non-excluded pairs added by
/// this call.
///
/// Fails fatally on a raster-grid mismatch or an unreadable region; no
/// partial per-image result is worth reporting in that case.
pub fn stream_pairs<P, R>(
    produced: &P,
    reference: &R,
    config: &StreamingConfig,
    accumulator: &mut ConfusionAccumulator,
) -> Result<u64, MeasureError>
where
    P: LabelSource + ?Sized,
    R: LabelSource + ?Sized,
{
    let (width, height) = matched_dimensions(produced, reference)?;
    let regions = plan_regions(width, height, 2 * std::mem::size_of::<i32>(), config);

    let before = accumulator.pairs_accumulated();
    let mut produced_buf = Vec::new();
    let mut reference_buf = Vec::new();
    for region in &regions {
        produced.read_region(region, &mut produced_buf)?;
        reference.read_region(region, &mut reference_buf)?;
        for (&ref_label, &prod_label) in reference_buf.iter().zip(&produced_buf) {
            accumulator.add(ref_label, prod_label);
        }
    }
    Ok(accumulator.pairs_accumulated() - before)
}

/// Parallel variant: regions are processed on the rayon pool into
/// per-region partial accumulators, merged in region order afterwards so
/// the result is bit-identical to [`stream_pairs`].
#[cfg(feature = "threading")]
pub fn stream_pairs_parallel<P, R>(
    produced: &P,
    reference: &R,
    config: &StreamingConfig,
    accumulator: &mut ConfusionAccumulator,
) -> Result<u64, MeasureError>
where
    P: LabelSource + Sync + ?Sized,
    R: LabelSource + Sync + ?Sized,
{
    use rayon::prelude::*;

    let (width, height) = matched_dimensions(produced, reference)?;
    let regions = plan_regions(width, height, 2 * std::mem::size_of::<i32>(), config);
    let nodata = accumulator.nodata();

    let partials: Result<Vec<ConfusionAccumulator>, MeasureError> = regions
        .par_iter()
        .map(|region| {
            let mut partial = ConfusionAccumulator::new(nodata);
            let mut produced_buf = Vec::new();
            let mut reference_buf = Vec::new();
            produced.read_region(region, &mut produced_buf)?;
            reference.read_region(region, &mut reference_buf)?;
            for (&ref_label, &prod_label) in reference_buf.iter().zip(&produced_buf) {
                partial.add(ref_label, prod_label);
            }
            Ok(partial)
        })
        .collect();

    let before = accumulator.pairs_accumulated();
    for partial in partials? {
        accumulator.merge(partial);
    }
    Ok(accumulator.pairs_accumulated() - before)
}

fn matched_dimensions<P, R>(produced: &P, reference: &R) -> Result<(usize, usize), MeasureError>
where
    P: LabelSource + ?Sized,
    R: LabelSource + ?Sized,
{
    let (produced_width, produced_height) = produced.dimensions();
    let (reference_width, reference_height) = reference.dimensions();
    if (produced_width, produced_height) != (reference_width, reference_height) {
        return Err(MeasureError::SizeMismatch {
            produced_width,
            produced_height,
            reference_width,
            reference_height,
        });
    }
    Ok((produced_width, produced_height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_cover_raster_exactly_without_overlap() {
        let config = StreamingConfig {
            ram_budget_mb: 1,
            ram_bias: 2.0,
        };
        // 64 KiB rows force many strips out of a 1 MB budget.
        let regions = plan_regions(8192, 1000, 8, &config);
        assert!(regions.len() > 1);

        let mut next_y = 0;
        for region in &regions {
            assert_eq!(region.x, 0);
            assert_eq!(region.width, 8192);
            assert_eq!(region.y, next_y, "strips must abut without gaps");
            next_y += region.height;
        }
        assert_eq!(next_y, 1000);
    }

    #[test]
    fn tiny_budget_degrades_to_single_row_strips() {
        let config = StreamingConfig {
            ram_budget_mb: 1,
            ram_bias: 2.0,
        };
        // One row alone already exceeds the budget.
        let regions = plan_regions(1_000_000, 3, 8, &config);
        assert_eq!(regions.len(), 3);
        assert!(regions.iter().all(|r| r.height == 1));
    }

    #[test]
    fn generous_budget_yields_one_region() {
        let regions = plan_regions(512, 512, 8, &StreamingConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].pixel_count(), 512 * 512);
    }

    #[test]
    fn read_region_extracts_row_major_window() {
        let mut lf = LabelField::filled(4, 3, 0);
        for row in 0..3 {
            for col in 0..4 {
                lf.set(row, col, (row * 4 + col) as i32);
            }
        }
        let region = PixelRegion {
            x: 1,
            y: 1,
            width: 2,
            height: 2,
        };
        let mut out = Vec::new();
        lf.read_region(&region, &mut out).unwrap();
        assert_eq!(out, vec![5, 6, 9, 10]);
    }

    #[test]
    fn out_of_bounds_region_is_rejected() {
        let lf = LabelField::filled(4, 4, 0);
        let region = PixelRegion {
            x: 2,
            y: 0,
            width: 3,
            height: 1,
        };
        let mut out = Vec::new();
        assert!(matches!(
            lf.read_region(&region, &mut out),
            Err(MeasureError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn mismatched_rasters_fail_before_any_accumulation() {
        let produced = LabelField::filled(4, 4, 1);
        let reference = LabelField::filled(4, 5, 1);
        let mut acc = ConfusionAccumulator::new(0);
        let err = stream_pairs(&produced, &reference, &StreamingConfig::default(), &mut acc);
        assert!(matches!(err, Err(MeasureError::SizeMismatch { .. })));
        assert_eq!(acc.pairs_accumulated(), 0);
    }

    #[test]
    fn stream_pairs_counts_only_non_excluded_pixels() {
        let mut produced = LabelField::filled(3, 3, 1);
        let mut reference = LabelField::filled(3, 3, 1);
        reference.set(0, 0, 0); // nodata on the reference side
        produced.set(2, 2, 0); // nodata on the produced side

        let mut acc = ConfusionAccumulator::new(0);
        let added = stream_pairs(&produced, &reference, &StreamingConfig::default(), &mut acc)
            .unwrap();
        assert_eq!(added, 7);
        assert_eq!(acc.pairs_accumulated(), 7);
    }

    #[cfg(feature = "threading")]
    #[test]
    fn parallel_streaming_matches_sequential() {
        let mut produced = LabelField::filled(32, 32, 1);
        let mut reference = LabelField::filled(32, 32, 1);
        for i in 0..32 {
            produced.set(i, i, 2);
            reference.set(i, (i + 1) % 32, 3);
        }
        let config = StreamingConfig {
            ram_budget_mb: 1,
            ram_bias: 2.0,
        };

        let mut sequential = ConfusionAccumulator::new(0);
        stream_pairs(&produced, &reference, &config, &mut sequential).unwrap();
        let mut parallel = ConfusionAccumulator::new(0);
        stream_pairs_parallel(&produced, &reference, &config, &mut parallel).unwrap();

        assert_eq!(
            sequential.freeze().raw_matrix().data(),
            parallel.freeze().raw_matrix().data()
        );
    }
}
