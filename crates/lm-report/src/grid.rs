//! Settings grid persistence as CSV
//!
//! Rows may differ in length on read; they are stored as-is and padded when
//! the grid is decomposed.

use crate::error::ReportError;
use lm_settings::Grid;
use std::io::{Read, Write};
use std::path::Path;

/// Read a grid from CSV
///
/// # Errors
/// Propagates CSV decoding failures.
pub fn read_grid<R: Read>(reader: R) -> Result<Grid, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut grid = Grid::new();
    for record in reader.records() {
        grid.push(record?.iter().map(ToString::to_string).collect());
    }
    Ok(grid)
}

/// Write a grid as CSV
///
/// # Errors
/// Propagates CSV encoding failures.
pub fn write_grid<W: Write>(writer: W, grid: &[Vec<String>]) -> Result<(), ReportError> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    for row in grid {
        writer.write_record(row)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Load a grid from a CSV file
///
/// # Errors
/// File system and CSV decoding failures.
pub fn read_grid_csv(path: &Path) -> Result<Grid, ReportError> {
    let file = std::fs::File::open(path).map_err(|e| ReportError::io(path, e))?;
    let grid = read_grid(file)?;
    tracing::debug!("Loaded {} grid rows from {}", grid.len(), path.display());
    Ok(grid)
}

/// Save a grid to a CSV file, replacing any existing content
///
/// # Errors
/// File system and CSV encoding failures.
pub fn write_grid_csv(path: &Path, grid: &[Vec<String>]) -> Result<(), ReportError> {
    let file = std::fs::File::create(path).map_err(|e| ReportError::io(path, e))?;
    write_grid(file, grid)?;
    tracing::debug!("Saved {} grid rows to {}", grid.len(), path.display());
    Ok(())
}
