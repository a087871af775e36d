//! Windowed raster reduction
//!
//! Temporal slicing of a monthly raster cube to a resolved calendar window,
//! NaN-aware reduction over the time axis, and product-specific unscaling.

use chrono::NaiveDate;
use ndarray::{Array2, Axis};

use crate::types::{
    CalendarWindow, PrepostError, PrepostResult, ProductType, RasterCube, RasterImage,
};

/// A raster time series: monthly composites with their timestamps
///
/// `data` is time x rows x cols; `timestamps` holds one strictly increasing
/// month-start date per time slice.
#[derive(Debug, Clone)]
pub struct RasterSeries {
    timestamps: Vec<NaiveDate>,
    data: RasterCube,
}

impl RasterSeries {
    pub fn new(timestamps: Vec<NaiveDate>, data: RasterCube) -> PrepostResult<Self> {
        if timestamps.len() != data.dim().0 {
            return Err(PrepostError::Processing(format!(
                "timestamp count {} does not match time dimension {}",
                timestamps.len(),
                data.dim().0
            )));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PrepostError::Processing(
                "timestamps must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { timestamps, data })
    }

    pub fn timestamps(&self) -> &[NaiveDate] {
        &self.timestamps
    }

    pub fn data(&self) -> &RasterCube {
        &self.data
    }

    /// Spatial dimensions (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.timestamps.last().copied()
    }

    /// Slice the series to the timestamps inside `window`, both endpoints
    /// inclusive. The slice may be empty when no composite falls inside.
    pub fn slice_window(&self, window: &CalendarWindow) -> PrepostResult<RasterSeries> {
        let start = window
            .start
            .first_day()
            .ok_or(PrepostError::InvalidDate(window.start))?;
        let end = window
            .end
            .first_day()
            .ok_or(PrepostError::InvalidDate(window.end))?;

        let keep: Vec<usize> = self
            .timestamps
            .iter()
            .enumerate()
            .filter(|(_, t)| **t >= start && **t <= end)
            .map(|(i, _)| i)
            .collect();

        let timestamps = keep.iter().map(|&i| self.timestamps[i]).collect();
        let data = self.data.select(Axis(0), &keep);
        Ok(RasterSeries { timestamps, data })
    }

    /// Reduce over the time axis, ignoring NaN cells.
    ///
    /// Cells with no valid observation come out as NaN.
    pub fn reduce(&self, how: Reduction) -> RasterImage {
        let (_, rows, cols) = self.data.dim();
        let mut acc = Array2::<f32>::zeros((rows, cols));
        let mut count = Array2::<u32>::zeros((rows, cols));

        for plane in self.data.axis_iter(Axis(0)) {
            for ((r, c), &v) in plane.indexed_iter() {
                if v.is_nan() {
                    continue;
                }
                match how {
                    Reduction::Mean | Reduction::Sum => acc[[r, c]] += v,
                    Reduction::Max => {
                        if count[[r, c]] == 0 || v > acc[[r, c]] {
                            acc[[r, c]] = v;
                        }
                    }
                }
                count[[r, c]] += 1;
            }
        }

        let mut out = Array2::from_elem((rows, cols), f32::NAN);
        for ((r, c), n) in count.indexed_iter() {
            if *n == 0 {
                continue;
            }
            out[[r, c]] = match how {
                Reduction::Mean => acc[[r, c]] / *n as f32,
                Reduction::Max | Reduction::Sum => acc[[r, c]],
            };
        }
        out
    }

    /// Reduce and unscale according to the product's digital-number rules.
    pub fn apply_product(&self, product: ProductType) -> RasterImage {
        match product {
            ProductType::Ndvi => self.reduce(Reduction::Mean).mapv(|v| v / 10000.0),
            ProductType::MaxNdvi => self.reduce(Reduction::Max).mapv(|v| v / 10000.0),
            ProductType::Lst => self
                .reduce(Reduction::Max)
                .mapv(|v| v * 0.02 - 273.15),
            // Dekadal means to monthly totals, summed over the window
            ProductType::Rainfall => self.reduce(Reduction::Sum).mapv(|v| v * 3.0),
        }
    }
}

/// Reduction applied over the time axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Mean,
    Max,
    Sum,
}

/// Post-minus-pre difference of two aggregated rasters
pub fn difference(post: &RasterImage, pre: &RasterImage) -> PrepostResult<RasterImage> {
    if post.dim() != pre.dim() {
        return Err(PrepostError::Processing(format!(
            "raster shape mismatch: post {:?} vs pre {:?}",
            post.dim(),
            pre.dim()
        )));
    }
    Ok(post - pre)
}
