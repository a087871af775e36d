//! Long-term average (LTA) baselines
//!
//! Climatologies are computed by averaging a variable over the same calendar
//! month across all available years. Anomalies compare each observation to
//! its month's LTA, absolutely or in percent (used for rainfall).

use chrono::Datelike;
use ndarray::{Array3, Axis};

use crate::core::aggregate::RasterSeries;
use crate::types::{PrepostError, PrepostResult, RasterCube, RasterReal};

/// Per-pixel monthly climatology: 12 x rows x cols, NaN where a calendar
/// month has no valid observation.
pub fn monthly_climatology(series: &RasterSeries) -> RasterCube {
    let (rows, cols) = series.shape();
    let mut acc = Array3::<f32>::zeros((12, rows, cols));
    let mut count = Array3::<u32>::zeros((12, rows, cols));

    for (t, plane) in series.data().axis_iter(Axis(0)).enumerate() {
        let m = series.timestamps()[t].month() as usize - 1;
        for ((r, c), &v) in plane.indexed_iter() {
            if v.is_nan() {
                continue;
            }
            acc[[m, r, c]] += v;
            count[[m, r, c]] += 1;
        }
    }

    let mut out = Array3::from_elem((12, rows, cols), f32::NAN);
    for ((m, r, c), &n) in count.indexed_iter() {
        if n > 0 {
            out[[m, r, c]] = acc[[m, r, c]] / n as f32;
        }
    }
    out
}

/// Per-timestamp mean over the spatial dimensions, ignoring NaN cells
pub fn spatial_mean_series(series: &RasterSeries) -> Vec<RasterReal> {
    series
        .data()
        .axis_iter(Axis(0))
        .map(|plane| {
            let mut sum = 0.0f32;
            let mut n = 0u32;
            for &v in plane.iter() {
                if !v.is_nan() {
                    sum += v;
                    n += 1;
                }
            }
            if n == 0 {
                f32::NAN
            } else {
                sum / n as f32
            }
        })
        .collect()
}

/// How an anomaly is expressed relative to the LTA
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyMode {
    /// value - lta (NDVI, LST)
    Absolute,
    /// 100 * (value - lta) / lta (rainfall)
    Percent,
}

/// Monthly LTA of a 1-D series keyed by its timestamps
pub fn monthly_mean(series: &RasterSeries, values: &[RasterReal]) -> PrepostResult<[f32; 12]> {
    if values.len() != series.timestamps().len() {
        return Err(PrepostError::Processing(format!(
            "value count {} does not match timestamp count {}",
            values.len(),
            series.timestamps().len()
        )));
    }
    let mut sum = [0.0f32; 12];
    let mut count = [0u32; 12];
    for (t, &v) in series.timestamps().iter().zip(values) {
        if v.is_nan() {
            continue;
        }
        let m = t.month() as usize - 1;
        sum[m] += v;
        count[m] += 1;
    }
    let mut out = [f32::NAN; 12];
    for m in 0..12 {
        if count[m] > 0 {
            out[m] = sum[m] / count[m] as f32;
        }
    }
    Ok(out)
}

/// Anomaly of each observation against its calendar month's LTA
pub fn anomalies(
    series: &RasterSeries,
    values: &[RasterReal],
    mode: AnomalyMode,
) -> PrepostResult<Vec<RasterReal>> {
    let lta = monthly_mean(series, values)?;
    Ok(series
        .timestamps()
        .iter()
        .zip(values)
        .map(|(t, &v)| {
            let base = lta[t.month() as usize - 1];
            match mode {
                AnomalyMode::Absolute => v - base,
                AnomalyMode::Percent => 100.0 * (v - base) / base,
            }
        })
        .collect())
}
