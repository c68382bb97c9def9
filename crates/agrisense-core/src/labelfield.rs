use serde::{Deserialize, Serialize};

/// A 2D class-label raster storing i32 labels, row-major.
///
/// This is the in-memory form of both classification maps and rasterized
/// ground truth. Georeferencing is the caller's concern; the engine only
/// requires that paired rasters share the same pixel grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelField {
    /// Row-major class labels.
    pub data: Vec<i32>,
    pub width: usize,
    pub height: usize,
}

impl LabelField {
    /// Create a new LabelField filled with the given label.
    pub fn filled(width: usize, height: usize, fill: i32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }

    /// Wrap an existing row-major buffer. Panics if the buffer length does
    /// not match `width * height`.
    pub fn from_data(width: usize, height: usize, data: Vec<i32>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "label buffer length must equal width * height"
        );
        Self { data, width, height }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> i32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, label: i32) {
        self.data[row * self.width + col] = label;
    }
}
