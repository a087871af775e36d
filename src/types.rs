use chrono::NaiveDate;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Real-valued raster sample (scaled product value)
pub type RasterReal = f32;

/// 2D raster (rows x cols)
pub type RasterImage = Array2<RasterReal>;

/// 3D raster time series (time x rows x cols)
pub type RasterCube = Array3<RasterReal>;

/// A calendar month, e.g. (3, 2020) for March 2020
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthYear {
    pub month: u32, // 1..=12
    pub year: i32,
}

impl MonthYear {
    pub fn new(month: u32, year: i32) -> Self {
        Self { month, year }
    }

    /// First day of the month, the anchor timestamp for monthly composites
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl PartialOrd for MonthYear {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MonthYear {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.year, self.month).cmp(&(other.year, other.month))
    }
}

impl std::fmt::Display for MonthYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Recurring annual month range, e.g. a Nov-Feb dry season
///
/// `start_month > end_month` denotes a window wrapping the calendar-year
/// boundary; `start_month == end_month` is treated as wrapping (a full year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    start_month: u32,
    end_month: u32,
}

impl Season {
    pub fn new(start_month: u32, end_month: u32) -> PrepostResult<Self> {
        if !(1..=12).contains(&start_month) || !(1..=12).contains(&end_month) {
            return Err(PrepostError::InvalidSeason {
                start_month,
                end_month,
            });
        }
        Ok(Self {
            start_month,
            end_month,
        })
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn end_month(&self) -> u32 {
        self.end_month
    }

    /// Whether the season crosses a calendar-year boundary
    pub fn wraps(&self) -> bool {
        self.start_month >= self.end_month
    }
}

impl std::fmt::Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}-{:02}", self.start_month, self.end_month)
    }
}

/// Classification of a season definition, used to label outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeasonKind {
    Wet,
    Dry,
}

impl std::fmt::Display for SeasonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeasonKind::Wet => write!(f, "wet"),
            SeasonKind::Dry => write!(f, "dry"),
        }
    }
}

/// Wet/dry season definitions for a region
///
/// A location has 0, 1 or 2 wet seasons and exactly 1 dry season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub wet: Vec<Season>,
    pub dry: Vec<Season>,
}

impl SeasonConfig {
    pub fn new(wet: Vec<Season>, dry: Vec<Season>) -> PrepostResult<Self> {
        if wet.len() > 2 || dry.len() != 1 {
            return Err(PrepostError::InvalidFormat(format!(
                "expected at most 2 wet seasons and exactly 1 dry season, got {} wet / {} dry",
                wet.len(),
                dry.len()
            )));
        }
        Ok(Self { wet, dry })
    }
}

/// When a project intervention started and ended at an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterventionPeriod {
    pub start: MonthYear,
    pub end: MonthYear,
}

/// One concrete occurrence of a Season, anchored to an intervention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarWindow {
    pub start: MonthYear,
    pub end: MonthYear,
}

impl std::fmt::Display for CalendarWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A project intervention site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub intervention: InterventionPeriod,
}

/// Satellite raster product, with its reduction and unscaling rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    /// Mean NDVI over the window, stored scaled by 10000
    Ndvi,
    /// Maximum NDVI over the window, stored scaled by 10000
    MaxNdvi,
    /// Land-surface temperature, scaled Kelvin digital numbers to Celsius
    Lst,
    /// CHIRPS dekadal rainfall, summed to monthly totals
    Rainfall,
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductType::Ndvi => write!(f, "NDVI"),
            ProductType::MaxNdvi => write!(f, "maxNDVI"),
            ProductType::Lst => write!(f, "LST"),
            ProductType::Rainfall => write!(f, "Rainfall"),
        }
    }
}

/// Why an asset/season pair was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The asset geometry is too small to clip the raster
    AssetTooSmall,
    /// The post window ends after the last available observation
    NoPostData,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AssetTooSmall => write!(f, "Asset too small"),
            SkipReason::NoPostData => write!(f, "No data post intervention"),
        }
    }
}

/// One row of the per-run unprocessed-items ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprocessedRecord {
    pub asset_id: String,
    pub reason: SkipReason,
    /// Offending window; None when the skip is not tied to one season
    pub window: Option<CalendarWindow>,
}

/// Error types for pre/post processing
#[derive(Debug, thiserror::Error)]
pub enum PrepostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid season months: ({start_month}, {end_month})")]
    InvalidSeason { start_month: u32, end_month: u32 },

    #[error("Invalid calendar date: {0}")]
    InvalidDate(MonthYear),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Result type for pre/post operations
pub type PrepostResult<T> = Result<T, PrepostError>;
