//! Error types for report export

use std::path::PathBuf;

/// Main report error type
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// File name does not follow the report naming scheme
    #[error("invalid report name: {0}")]
    InvalidReportName(String),

    /// Report date is not a valid timestamp
    #[error("invalid report date '{value}': {source}")]
    InvalidDate {
        /// Offending text
        value: String,
        /// Parse failure
        #[source]
        source: chrono::ParseError,
    },

    /// CSV encoding or decoding failed
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// File could not be read or written
    #[error("io error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },
}

impl ReportError {
    /// Create io error for a path
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_the_path() {
        let err = ReportError::io(
            "/tmp/grid.csv",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "io error on /tmp/grid.csv: missing");
    }
}
