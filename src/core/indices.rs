//! Drought indices: VCI, TCI and VHI
//!
//! Groups a raster series into one mean composite per season occurrence
//! across all observed years, then scales each composite against the
//! 0.1/0.9 quantiles of its pixel's history. The vegetation health index
//! blends the NDVI-based and LST-based indices as
//! `alpha * VCI + (1 - alpha) * TCI`.

use std::collections::{BTreeSet, HashSet};

use chrono::{Datelike, NaiveDate};
use ndarray::{Array2, Array3, Axis};

use crate::core::aggregate::{RasterSeries, Reduction};
use crate::types::{CalendarWindow, MonthYear, PrepostError, PrepostResult, Season};

/// Collapse a monthly series into one mean composite per complete season
/// occurrence, timestamped by the occurrence's start month.
///
/// A wrapping season's occurrence starting in year `y` ends in `y + 1`;
/// occurrences not fully inside the observed range are dropped.
pub fn group_by_season(series: &RasterSeries, season: Season) -> PrepostResult<RasterSeries> {
    let first = series.timestamps().first().copied().ok_or_else(|| {
        PrepostError::Processing("cannot group an empty series by season".to_string())
    })?;
    let last = series
        .timestamps()
        .last()
        .copied()
        .unwrap_or(first);

    let years: BTreeSet<i32> = series.timestamps().iter().map(|t| t.year()).collect();
    let max_year = years.iter().max().copied().unwrap_or(first.year());

    let mut timestamps = Vec::new();
    let mut planes: Vec<Array2<f32>> = Vec::new();

    for &year in &years {
        // The last year cannot host a complete wrapping occurrence
        if season.wraps() && year == max_year {
            continue;
        }
        let end_year = if season.wraps() { year + 1 } else { year };
        let window = CalendarWindow {
            start: MonthYear::new(season.start_month(), year),
            end: MonthYear::new(season.end_month(), end_year),
        };
        let start_day = window
            .start
            .first_day()
            .ok_or(PrepostError::InvalidDate(window.start))?;
        let end_day = window
            .end
            .first_day()
            .ok_or(PrepostError::InvalidDate(window.end))?;
        if start_day < first || end_day > last {
            continue;
        }

        let occurrence = series.slice_window(&window)?;
        planes.push(occurrence.reduce(Reduction::Mean));
        timestamps.push(start_day);
    }

    if planes.is_empty() {
        return Err(PrepostError::Processing(format!(
            "no complete occurrence of season {} in the observed range",
            season
        )));
    }

    let views: Vec<_> = planes.iter().map(|p| p.view()).collect();
    let data = ndarray::stack(Axis(0), &views)?;
    RasterSeries::new(timestamps, data)
}

/// Scale each composite against its pixel's 0.1/0.9 quantile range:
/// `(q90 - v) / (q90 - q10)`, clamped to [0, 1]. NaN cells stay NaN.
pub fn quantile_scaled(grouped: &RasterSeries) -> PrepostResult<RasterSeries> {
    let (nt, rows, cols) = grouped.data().dim();
    let mut out = Array3::<f32>::from_elem((nt, rows, cols), f32::NAN);

    for r in 0..rows {
        for c in 0..cols {
            let mut valid: Vec<f32> = (0..nt)
                .map(|t| grouped.data()[[t, r, c]])
                .filter(|v| !v.is_nan())
                .collect();
            valid.sort_unstable_by(f32::total_cmp);
            let q10 = quantile(&valid, 0.1);
            let q90 = quantile(&valid, 0.9);

            for t in 0..nt {
                let v = grouped.data()[[t, r, c]];
                if v.is_nan() {
                    continue;
                }
                out[[t, r, c]] = ((q90 - v) / (q90 - q10)).clamp(0.0, 1.0);
            }
        }
    }

    RasterSeries::new(grouped.timestamps().to_vec(), out)
}

/// Linear-interpolated quantile of an already sorted, NaN-free slice
fn quantile(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return f32::NAN;
    }
    let h = p * (sorted.len() - 1) as f32;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (h - lo as f32)
}

/// Seasonal drought indices for one season definition
#[derive(Debug, Clone)]
pub struct DroughtIndices {
    pub vci: RasterSeries,
    pub tci: RasterSeries,
    pub vhi: RasterSeries,
}

/// Compute VCI (from NDVI), TCI (from LST) and their VHI blend for one
/// season. The two series are first cropped to their common timestamps.
pub fn compute_drought_indices(
    lst: &RasterSeries,
    ndvi: &RasterSeries,
    season: Season,
    alpha: f32,
) -> PrepostResult<DroughtIndices> {
    if lst.shape() != ndvi.shape() {
        return Err(PrepostError::Processing(format!(
            "LST and NDVI grids differ: {:?} vs {:?}",
            lst.shape(),
            ndvi.shape()
        )));
    }

    let lst = crop_to(lst, ndvi)?;
    let ndvi = crop_to(ndvi, &lst)?;

    let vci = quantile_scaled(&group_by_season(&ndvi, season)?)?;
    let tci = quantile_scaled(&group_by_season(&lst, season)?)?;

    let vhi_data = vci.data() * alpha + tci.data() * (1.0 - alpha);
    let vhi = RasterSeries::new(vci.timestamps().to_vec(), vhi_data)?;

    Ok(DroughtIndices { vci, tci, vhi })
}

/// Keep only the timestamps of `series` that `other` also has
fn crop_to(series: &RasterSeries, other: &RasterSeries) -> PrepostResult<RasterSeries> {
    let common: HashSet<NaiveDate> = other.timestamps().iter().copied().collect();
    let keep: Vec<usize> = series
        .timestamps()
        .iter()
        .enumerate()
        .filter(|(_, t)| common.contains(t))
        .map(|(i, _)| i)
        .collect();
    let timestamps = keep.iter().map(|&i| series.timestamps()[i]).collect();
    let data = series.data().select(Axis(0), &keep);
    RasterSeries::new(timestamps, data)
}
