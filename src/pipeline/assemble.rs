//! Channel stacking
//!
//! A [`StackedArray`] is one contiguous `[y][x][k]` buffer. The spatial view
//! `[height, width, n_targets]` and the list view `[height*width, n_targets]`
//! are two shapes over the same bytes, so list row `r` is spatial
//! `[r / width, r % width, :]` by construction.

use super::ConversionError;
use crate::source::GridShape;

/// One channel: `height x width` values, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct IntensityGrid {
    shape: GridShape,
    values: Vec<f32>,
}

impl IntensityGrid {
    /// A zero-filled channel
    pub fn zeros(shape: GridShape) -> Self {
        Self {
            shape,
            values: vec![0.0; shape.pixel_count()],
        }
    }

    /// Raster dimensions
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Row-major values
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Mutable row-major values
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    /// Value at 0-based `(x, y)`
    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x >= self.shape.width || y >= self.shape.height {
            return None;
        }
        self.values.get(y * self.shape.width + x).copied()
    }
}

/// All channels of a run in one pixel-major buffer
#[derive(Debug, Clone, PartialEq)]
pub struct StackedArray {
    shape: GridShape,
    n_targets: usize,
    data: Vec<f32>,
}

impl StackedArray {
    /// A zero-filled stack of `n_targets` channels
    pub fn zeros(shape: GridShape, n_targets: usize) -> Self {
        Self {
            shape,
            n_targets,
            data: vec![0.0; shape.pixel_count() * n_targets],
        }
    }

    /// Stack per-target grids; all grids must share one shape
    pub fn from_grids(grids: &[IntensityGrid]) -> Result<Self, ConversionError> {
        let Some(first) = grids.first() else {
            return Err(ConversionError::NoTargets("no grids to stack".to_string()));
        };
        let shape = first.shape();
        if let Some(other) = grids.iter().find(|g| g.shape() != shape) {
            return Err(ConversionError::InvalidArgument(format!(
                "grid shapes differ: {}x{} vs {}x{}",
                shape.width,
                shape.height,
                other.shape().width,
                other.shape().height
            )));
        }

        let mut stack = Self::zeros(shape, grids.len());
        for (k, grid) in grids.iter().enumerate() {
            for (pixel, &value) in grid.values().iter().enumerate() {
                stack.data[pixel * stack.n_targets + k] = value;
            }
        }
        Ok(stack)
    }

    /// Raster dimensions shared by every channel
    pub fn grid_shape(&self) -> GridShape {
        self.shape
    }

    /// Number of channels
    pub fn n_targets(&self) -> usize {
        self.n_targets
    }

    /// `[height, width, n_targets]`
    pub fn spatial_shape(&self) -> [usize; 3] {
        [self.shape.height, self.shape.width, self.n_targets]
    }

    /// `[height * width, n_targets]`
    pub fn list_shape(&self) -> [usize; 2] {
        [self.shape.pixel_count(), self.n_targets]
    }

    /// The shared buffer behind both views
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Row `r` of the list view
    pub fn list_row(&self, row: usize) -> &[f32] {
        let start = row * self.n_targets;
        &self.data[start..start + self.n_targets]
    }

    /// `[y, x, :]` of the spatial view
    pub fn spatial_at(&self, y: usize, x: usize) -> &[f32] {
        self.list_row(y * self.shape.width + x)
    }

    pub(crate) fn pixel_mut(&mut self, pixel: usize) -> &mut [f32] {
        let start = pixel * self.n_targets;
        &mut self.data[start..start + self.n_targets]
    }

    /// Copy channel `k` out as a grid
    pub fn channel(&self, k: usize) -> IntensityGrid {
        let values = if self.n_targets == 0 {
            Vec::new()
        } else {
            self.data
                .iter()
                .skip(k)
                .step_by(self.n_targets)
                .copied()
                .collect()
        };
        IntensityGrid {
            shape: self.shape,
            values,
        }
    }
}
