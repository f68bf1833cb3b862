//! Launch Monitor reports
//!
//! Exports rule results as CSV files named
//! `{category}_{label}_{rule}_{sheet_id}_{date}.csv`, stamps ingested reports
//! with the metadata from their names, and persists the settings grid.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod export;
mod grid;
mod name;

pub use error::ReportError;
pub use export::{
    normalize_column, results_to_csv, stamp_report, write_results, RESULT_COLUMNS, STAMP_COLUMNS,
};
pub use grid::{read_grid, read_grid_csv, write_grid, write_grid_csv};
pub use name::ReportName;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
