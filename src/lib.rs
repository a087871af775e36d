//! prepost: seasonal pre/post intervention comparison for satellite rasters
//!
//! Compares conditions at project intervention sites before vs. after an
//! intervention using time-series raster products (NDVI, land-surface
//! temperature, rainfall). The season-window resolver maps an intervention
//! period onto the nearest complete wet/dry season occurrences; the engine
//! clips, slices, aggregates and differences the raster cube per asset and
//! records every skipped asset/season pair in an unprocessed ledger.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    Asset, CalendarWindow, InterventionPeriod, MonthYear, PrepostError, PrepostResult,
    ProductType, RasterCube, RasterImage, Season, SeasonConfig, SeasonKind, SkipReason,
    UnprocessedRecord,
};

pub use crate::core::{
    classify_post, compute_drought_indices, group_by_season, post_window, pre_window,
    resolve_pre_post, AssetClipper, ComparisonOutput, DroughtIndices, PrePostEngine, RasterSeries,
    RunOutput, SeasonWindows, WindowStatus,
};
