//! Per-asset pre/post comparison engine
//!
//! Drives the full comparison for a batch of assets: clip the regional cube
//! to each asset, resolve the seasonal windows around its intervention,
//! aggregate the pre and post slices and difference them. Skips are recorded
//! in the unprocessed ledger; one asset's missing data never aborts the run.

use rayon::prelude::*;

use crate::core::aggregate::{difference, RasterSeries};
use crate::core::windows::{classify_post, resolve_pre_post, WindowStatus};
use crate::types::{
    Asset, CalendarWindow, PrepostResult, ProductType, RasterImage, SeasonConfig, SeasonKind,
    SkipReason, UnprocessedRecord,
};

/// Buffer (degrees) applied around an asset geometry before clipping
pub const ASSET_BUFFER_DEG: f64 = 0.2;

/// Collaborator that clips the regional raster cube to one asset's buffered
/// geometry. A clip error means the asset is too small to be processed.
pub trait AssetClipper: Sync {
    fn clip(&self, asset_id: &str, buffer_deg: f64) -> PrepostResult<RasterSeries>;
}

/// One aggregated pre/post comparison for an asset and season occurrence
#[derive(Debug, Clone)]
pub struct ComparisonOutput {
    pub asset_id: String,
    pub kind: SeasonKind,
    /// Position within the wet or dry season list (0-based)
    pub season_index: usize,
    pub pre_window: CalendarWindow,
    pub post_window: CalendarWindow,
    pub pre: RasterImage,
    pub post: RasterImage,
    pub diff: RasterImage,
}

/// Everything a run produced: comparisons plus the unprocessed ledger
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    pub comparisons: Vec<ComparisonOutput>,
    pub unprocessed: Vec<UnprocessedRecord>,
}

/// Pre/post comparison engine for one product and season configuration
#[derive(Debug, Clone)]
pub struct PrePostEngine {
    product: ProductType,
    seasons: SeasonConfig,
    buffer_deg: f64,
}

impl PrePostEngine {
    pub fn new(product: ProductType, seasons: SeasonConfig) -> Self {
        Self {
            product,
            seasons,
            buffer_deg: ASSET_BUFFER_DEG,
        }
    }

    pub fn with_buffer(mut self, buffer_deg: f64) -> Self {
        self.buffer_deg = buffer_deg;
        self
    }

    /// Run the comparison for every asset, in parallel.
    ///
    /// Outputs are returned in asset order; ledger records likewise.
    pub fn run<C: AssetClipper>(&self, assets: &[Asset], clipper: &C) -> PrepostResult<RunOutput> {
        log::info!(
            "Running {} pre/post comparison for {} assets",
            self.product,
            assets.len()
        );

        let per_asset: Vec<RunOutput> = assets
            .par_iter()
            .enumerate()
            .map(|(i, asset)| {
                log::info!(
                    "Processing asset {} ({}/{})",
                    asset.id,
                    i + 1,
                    assets.len()
                );
                self.process_asset(asset, clipper)
            })
            .collect::<PrepostResult<Vec<_>>>()?;

        let mut out = RunOutput::default();
        for mut part in per_asset {
            out.comparisons.append(&mut part.comparisons);
            out.unprocessed.append(&mut part.unprocessed);
        }
        log::info!(
            "Run complete: {} comparisons, {} unprocessed",
            out.comparisons.len(),
            out.unprocessed.len()
        );
        Ok(out)
    }

    fn process_asset<C: AssetClipper>(
        &self,
        asset: &Asset,
        clipper: &C,
    ) -> PrepostResult<RunOutput> {
        let mut out = RunOutput::default();

        let clipped = match clipper.clip(&asset.id, self.buffer_deg) {
            Ok(series) => series,
            Err(e) => {
                log::warn!("Asset {} is too small to be processed: {}", asset.id, e);
                out.unprocessed.push(UnprocessedRecord {
                    asset_id: asset.id.clone(),
                    reason: SkipReason::AssetTooSmall,
                    window: None,
                });
                return Ok(out);
            }
        };

        let last = match clipped.last_timestamp() {
            Some(last) => last,
            None => {
                log::warn!("Asset {}: clipped series has no observations", asset.id);
                out.unprocessed.push(UnprocessedRecord {
                    asset_id: asset.id.clone(),
                    reason: SkipReason::AssetTooSmall,
                    window: None,
                });
                return Ok(out);
            }
        };

        let windows = resolve_pre_post(asset.intervention, &self.seasons);

        let wet = windows
            .wet_pairs()
            .enumerate()
            .map(|(i, (pre, post))| (SeasonKind::Wet, i, *pre, *post));
        let dry = windows
            .dry_pairs()
            .enumerate()
            .map(|(i, (pre, post))| (SeasonKind::Dry, i, *pre, *post));

        for (kind, index, pre_w, post_w) in wet.chain(dry) {
            match classify_post(post_w, last) {
                WindowStatus::Unusable { window, reason } => {
                    log::warn!(
                        "Asset {}: no {} season {} post intervention ({})",
                        asset.id,
                        kind,
                        index + 1,
                        window
                    );
                    out.unprocessed.push(UnprocessedRecord {
                        asset_id: asset.id.clone(),
                        reason,
                        window: Some(window),
                    });
                }
                WindowStatus::Usable(post_w) => {
                    let comparison =
                        self.compare_pair(asset, &clipped, kind, index, pre_w, post_w)?;
                    out.comparisons.push(comparison);
                }
            }
        }

        Ok(out)
    }

    fn compare_pair(
        &self,
        asset: &Asset,
        clipped: &RasterSeries,
        kind: SeasonKind,
        season_index: usize,
        pre_window: CalendarWindow,
        post_window: CalendarWindow,
    ) -> PrepostResult<ComparisonOutput> {
        let pre = clipped.slice_window(&pre_window)?.apply_product(self.product);
        let post = clipped
            .slice_window(&post_window)?
            .apply_product(self.product);
        let diff = difference(&post, &pre)?;

        log::debug!(
            "Asset {}: {} season {} compared {} vs {}",
            asset.id,
            kind,
            season_index + 1,
            pre_window,
            post_window
        );

        Ok(ComparisonOutput {
            asset_id: asset.id.clone(),
            kind,
            season_index,
            pre_window,
            post_window,
            pre,
            post,
            diff,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InterventionPeriod, MonthYear, PrepostError, Season};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use ndarray::Array3;

    /// In-memory clipper over a shared cube; listed IDs fail the size check
    struct FakeClipper {
        series: RasterSeries,
        too_small: Vec<String>,
    }

    impl AssetClipper for FakeClipper {
        fn clip(&self, asset_id: &str, _buffer_deg: f64) -> PrepostResult<RasterSeries> {
            if self.too_small.iter().any(|id| id == asset_id) {
                return Err(PrepostError::Processing(format!(
                    "cannot clip {}: geometry smaller than one pixel",
                    asset_id
                )));
            }
            Ok(self.series.clone())
        }
    }

    fn monthly_series(from_year: i32, months: usize, fill: impl Fn(usize) -> f32) -> RasterSeries {
        let mut ts = Vec::with_capacity(months);
        let (mut y, mut m) = (from_year, 1u32);
        for _ in 0..months {
            ts.push(NaiveDate::from_ymd_opt(y, m, 1).unwrap());
            m += 1;
            if m > 12 {
                m = 1;
                y += 1;
            }
        }
        let values: Vec<f32> = (0..months).map(fill).collect();
        let data = Array3::from_shape_vec((months, 1, 1), values).unwrap();
        RasterSeries::new(ts, data).unwrap()
    }

    fn asset(id: &str, start: (u32, i32), end: (u32, i32)) -> Asset {
        Asset {
            id: id.to_string(),
            intervention: InterventionPeriod {
                start: MonthYear::new(start.0, start.1),
                end: MonthYear::new(end.0, end.1),
            },
        }
    }

    fn seasons() -> SeasonConfig {
        SeasonConfig::new(
            vec![Season::new(6, 9).unwrap()],
            vec![Season::new(11, 2).unwrap()],
        )
        .unwrap()
    }

    #[test]
    fn produces_one_comparison_per_usable_season() {
        // 2018-01 .. 2022-12, constant 4000 DN pre, 6000 DN from 2021 on
        let series = monthly_series(2018, 60, |i| if i < 36 { 4000.0 } else { 6000.0 });
        let clipper = FakeClipper {
            series,
            too_small: vec![],
        };
        let engine = PrePostEngine::new(ProductType::Ndvi, seasons());
        let out = engine
            .run(&[asset("A1", (3, 2020), (3, 2020))], &clipper)
            .unwrap();

        // wet (6,9): pre 2019, post 2020; dry (11,2): pre 2019-2020, post 2020-2021
        assert_eq!(out.comparisons.len(), 2);
        assert!(out.unprocessed.is_empty());

        let wet = &out.comparisons[0];
        assert_eq!(wet.kind, SeasonKind::Wet);
        assert_eq!(wet.pre_window.start, MonthYear::new(6, 2019));
        assert_eq!(wet.post_window.end, MonthYear::new(9, 2020));
        assert_relative_eq!(wet.pre[[0, 0]], 0.4);
        assert_relative_eq!(wet.post[[0, 0]], 0.4);
        assert_relative_eq!(wet.diff[[0, 0]], 0.0);

        let dry = &out.comparisons[1];
        assert_eq!(dry.kind, SeasonKind::Dry);
        // post dry window reaches Feb 2021, where values are 6000
        assert!(dry.diff[[0, 0]] > 0.0);
    }

    #[test]
    fn unobserved_post_window_goes_to_ledger_and_run_continues() {
        // Series ends 2020-06: the wet post window (ending 2020-09) and the
        // dry post window (ending 2021-02) are both unobserved.
        let series = monthly_series(2018, 30, |_| 5000.0);
        let clipper = FakeClipper {
            series,
            too_small: vec![],
        };
        let engine = PrePostEngine::new(ProductType::Ndvi, seasons());
        let out = engine
            .run(
                &[asset("A1", (3, 2020), (3, 2020)), asset("A2", (1, 2019), (1, 2019))],
                &clipper,
            )
            .unwrap();

        let a1: Vec<_> = out
            .unprocessed
            .iter()
            .filter(|r| r.asset_id == "A1")
            .collect();
        assert_eq!(a1.len(), 2);
        assert!(a1.iter().all(|r| r.reason == SkipReason::NoPostData));
        assert_eq!(
            a1[0].window.unwrap().end,
            MonthYear::new(9, 2020)
        );

        // A2's windows all end by mid-2019 and are still processed
        assert_eq!(
            out.comparisons
                .iter()
                .filter(|c| c.asset_id == "A2")
                .count(),
            2
        );
    }

    #[test]
    fn empty_clipped_series_goes_to_ledger_not_abort() {
        // A clipper may succeed yet hand back a series with no composites
        // (geometry touches no populated pixels). The batch must keep going.
        struct EmptyClipper {
            real: RasterSeries,
        }

        impl AssetClipper for EmptyClipper {
            fn clip(&self, asset_id: &str, _buffer_deg: f64) -> PrepostResult<RasterSeries> {
                if asset_id == "hollow" {
                    let data = ndarray::Array3::<f32>::zeros((0, 1, 1));
                    RasterSeries::new(vec![], data)
                } else {
                    Ok(self.real.clone())
                }
            }
        }

        let clipper = EmptyClipper {
            real: monthly_series(2018, 60, |_| 5000.0),
        };
        let engine = PrePostEngine::new(ProductType::Ndvi, seasons());
        let out = engine
            .run(
                &[asset("hollow", (3, 2020), (3, 2020)), asset("full", (3, 2020), (3, 2020))],
                &clipper,
            )
            .unwrap();

        let hollow: Vec<_> = out
            .unprocessed
            .iter()
            .filter(|r| r.asset_id == "hollow")
            .collect();
        assert_eq!(hollow.len(), 1);
        assert_eq!(hollow[0].reason, SkipReason::AssetTooSmall);
        assert!(hollow[0].window.is_none());

        assert_eq!(
            out.comparisons
                .iter()
                .filter(|c| c.asset_id == "full")
                .count(),
            2
        );
    }

    #[test]
    fn too_small_asset_recorded_without_window() {
        let series = monthly_series(2018, 60, |_| 5000.0);
        let clipper = FakeClipper {
            series,
            too_small: vec!["tiny".to_string()],
        };
        let engine = PrePostEngine::new(ProductType::MaxNdvi, seasons());
        let out = engine
            .run(
                &[asset("tiny", (3, 2020), (3, 2020)), asset("big", (3, 2020), (3, 2020))],
                &clipper,
            )
            .unwrap();

        let tiny: Vec<_> = out
            .unprocessed
            .iter()
            .filter(|r| r.asset_id == "tiny")
            .collect();
        assert_eq!(tiny.len(), 1);
        assert_eq!(tiny[0].reason, SkipReason::AssetTooSmall);
        assert!(tiny[0].window.is_none());

        assert!(out.comparisons.iter().all(|c| c.asset_id == "big"));
        assert_eq!(out.comparisons.len(), 2);
    }
}
