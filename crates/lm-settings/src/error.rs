//! Error types for the settings grid

/// Errors raised while working with rule settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Granularity string does not name a known entity collection
    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    /// Section is not present in the range
    #[error("unknown section: {0}")]
    UnknownSection(String),

    /// Entity ID cannot be used as a row key
    #[error("invalid row id: {0:?}")]
    InvalidRowId(String),
}

impl SettingsError {
    /// Check if the error was caused by user-editable sheet content
    #[inline]
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::UnsupportedGranularity(_) | Self::InvalidRowId(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_granularity_names_the_input() {
        let err = SettingsError::UnsupportedGranularity("Advertiser".to_string());
        assert_eq!(err.to_string(), "unsupported granularity: Advertiser");
        assert!(err.is_user_error());
    }

    #[test]
    fn unknown_section_is_not_user_error() {
        assert!(!SettingsError::UnknownSection("x".to_string()).is_user_error());
    }
}
