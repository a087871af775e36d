//! Asset table ingestion and the unprocessed-items ledger
//!
//! Assets arrive as a CSV of `Asset_id, StartDate, EndDate` with dates in
//! `YYYY-Mon` form (e.g. `2020-Mar`). Season definitions arrive as month
//! pairs per region, with the second wet season optional. Each run writes
//! one ledger CSV of the asset/season pairs it had to skip.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::Month;
use regex::Regex;
use serde::Deserialize;

use crate::types::{
    Asset, InterventionPeriod, MonthYear, PrepostError, PrepostResult, Season, SeasonConfig,
    UnprocessedRecord,
};

static YEAR_RE: OnceLock<Regex> = OnceLock::new();
static MONTH_RE: OnceLock<Regex> = OnceLock::new();

/// Parse a `YYYY-Mon` token (any separator, e.g. `2020-Mar` or `Mar 2020`)
pub fn parse_month_year(text: &str) -> PrepostResult<MonthYear> {
    let year_re = YEAR_RE.get_or_init(|| Regex::new(r"\d{4}").expect("literal pattern"));
    let month_re = MONTH_RE.get_or_init(|| Regex::new(r"[a-zA-Z]{3}").expect("literal pattern"));

    let year = year_re
        .find(text)
        .ok_or_else(|| PrepostError::InvalidFormat(format!("no year in date '{}'", text)))?
        .as_str()
        .parse::<i32>()
        .map_err(|e| PrepostError::InvalidFormat(format!("bad year in '{}': {}", text, e)))?;

    let month_token = month_re
        .find(text)
        .ok_or_else(|| PrepostError::InvalidFormat(format!("no month in date '{}'", text)))?
        .as_str();
    let month = Month::from_str(month_token)
        .map_err(|_| PrepostError::InvalidFormat(format!("bad month in '{}'", text)))?
        .number_from_month();

    Ok(MonthYear::new(month, year))
}

#[derive(Debug, Deserialize)]
struct AssetRow {
    #[serde(rename = "Asset_id")]
    asset_id: String,
    #[serde(rename = "StartDate")]
    start_date: Option<String>,
    #[serde(rename = "EndDate")]
    end_date: Option<String>,
}

/// Read the asset/intervention table from CSV.
///
/// Rows without both dates are dropped; duplicate asset IDs keep the first
/// occurrence.
pub fn read_asset_table<R: Read>(reader: R) -> PrepostResult<Vec<Asset>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut assets = Vec::new();
    let mut seen = HashSet::new();

    for row in csv_reader.deserialize() {
        let row: AssetRow = row?;
        let (start, end) = match (&row.start_date, &row.end_date) {
            (Some(s), Some(e)) if !s.trim().is_empty() && !e.trim().is_empty() => (s, e),
            _ => {
                log::warn!("Asset {} has incomplete dates, dropping", row.asset_id);
                continue;
            }
        };
        if !seen.insert(row.asset_id.clone()) {
            continue;
        }
        assets.push(Asset {
            id: row.asset_id,
            intervention: InterventionPeriod {
                start: parse_month_year(start)?,
                end: parse_month_year(end)?,
            },
        });
    }

    log::info!("Read {} assets from intervention table", assets.len());
    Ok(assets)
}

/// Read the asset table from a file path
pub fn read_asset_csv<P: AsRef<Path>>(path: P) -> PrepostResult<Vec<Asset>> {
    read_asset_table(File::open(path)?)
}

/// Build the wet/dry season configuration for a region.
///
/// A region has one or two wet seasons (the second optional) and exactly
/// one dry season.
pub fn season_config(
    ws1: Option<(u32, u32)>,
    ws2: Option<(u32, u32)>,
    ds: (u32, u32),
) -> PrepostResult<SeasonConfig> {
    let mut wet = Vec::new();
    for (start, end) in [ws1, ws2].into_iter().flatten() {
        wet.push(Season::new(start, end)?);
    }
    SeasonConfig::new(wet, vec![Season::new(ds.0, ds.1)?])
}

/// Write the per-run ledger of skipped asset/season pairs
pub fn write_unprocessed_ledger<W: Write>(
    writer: W,
    records: &[UnprocessedRecord],
) -> PrepostResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["asset", "issue", "season"])?;
    for record in records {
        let window = record
            .window
            .map(|w| w.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let reason = record.reason.to_string();
        csv_writer.write_record([record.asset_id.as_str(), reason.as_str(), window.as_str()])?;
    }
    csv_writer.flush()?;
    Ok(())
}
