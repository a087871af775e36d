//! Core pre/post analysis modules

pub mod aggregate;
pub mod indices;
pub mod lta;
pub mod prepost;
pub mod windows;

// Re-export main types
pub use aggregate::{difference, RasterSeries, Reduction};
pub use indices::{compute_drought_indices, group_by_season, quantile_scaled, DroughtIndices};
pub use lta::{anomalies, monthly_climatology, spatial_mean_series, AnomalyMode};
pub use prepost::{
    AssetClipper, ComparisonOutput, PrePostEngine, RunOutput, ASSET_BUFFER_DEG,
};
pub use windows::{
    classify_post, post_window, pre_window, resolve_pre_post, SeasonWindows, WindowStatus,
};
