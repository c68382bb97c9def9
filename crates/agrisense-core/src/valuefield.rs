use serde::{Deserialize, Serialize};

use crate::error::MeasureError;
use crate::streaming::{check_region, PixelRegion};

/// A 2D raster band storing f32 values, row-major.
///
/// Used as the measurement input for per-class statistics. NaN marks
/// missing values and is excluded from all accumulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueField {
    /// Row-major band values.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl ValueField {
    /// Create a new ValueField filled with the given value.
    pub fn filled(width: usize, height: usize, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }

    /// Wrap an existing row-major buffer. Panics if the buffer length does
    /// not match `width * height`.
    pub fn from_data(width: usize, height: usize, data: Vec<f32>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "value buffer length must equal width * height"
        );
        Self { data, width, height }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    /// Copy a rectangular window into `out`, row-major.
    pub fn read_region(
        &self,
        region: &PixelRegion,
        out: &mut Vec<f32>,
    ) -> Result<(), MeasureError> {
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
