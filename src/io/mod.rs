//! Tabular input/output for asset and ledger data

pub mod assets;

pub use assets::{
    parse_month_year, read_asset_csv, read_asset_table, season_config, write_unprocessed_ledger,
};
