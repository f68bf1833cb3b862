//! Error types for rule evaluation
//!
//! Errors are never caught inside the harness: the first one aborts the
//! validation pass and surfaces to the caller.

use lm_settings::SettingsError;

/// Main rule error type
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Entity lacks a field the rule requires
    #[error("entity {entity} is missing required field '{field}'")]
    MissingField {
        /// Entity ID
        entity: String,
        /// Field name
        field: String,
    },

    /// Granularity string does not name a known entity collection
    #[error("unsupported granularity: {0}")]
    UnsupportedGranularity(String),

    /// External data source failed
    #[error("data source error: {0}")]
    DataSource(String),

    /// Stored parameter value cannot be interpreted
    #[error("rule '{rule}': invalid value {value:?} for parameter '{param}'")]
    InvalidParameter {
        /// Rule name
        rule: String,
        /// Parameter key
        param: String,
        /// Offending value
        value: String,
    },

    /// Two rules registered under the same name
    #[error("duplicate rule name: {0}")]
    DuplicateRule(String),

    /// Rule name collides with the identity section or a fixed row key
    #[error("reserved rule name: {0:?}")]
    ReservedRuleName(String),

    /// Rule-specific evaluation failure
    #[error("rule '{rule}' failed: {message}")]
    Evaluation {
        /// Rule name
        rule: String,
        /// Failure description
        message: String,
    },

    /// Settings grid error
    #[error("settings error: {0}")]
    Settings(SettingsError),
}

impl RuleError {
    /// Check if retrying the run could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataSource(_))
    }

    /// Create missing field error
    #[inline]
    pub fn missing_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Create invalid parameter error
    #[inline]
    pub fn invalid_parameter(
        rule: impl Into<String>,
        param: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            rule: rule.into(),
            param: param.into(),
            value: value.into(),
        }
    }
}

impl From<SettingsError> for RuleError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::UnsupportedGranularity(granularity) => {
                Self::UnsupportedGranularity(granularity)
            }
            other => Self::Settings(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display() {
        let err = RuleError::missing_field("li1", "display_name");
        assert_eq!(
            err.to_string(),
            "entity li1 is missing required field 'display_name'"
        );
    }

    #[test]
    fn only_data_source_errors_are_retryable() {
        assert!(RuleError::DataSource("timeout".to_string()).is_retryable());
        assert!(!RuleError::missing_field("a", "b").is_retryable());
        assert!(!RuleError::DuplicateRule("x".to_string()).is_retryable());
        assert!(!RuleError::ReservedRuleName("none".to_string()).is_retryable());
    }

    #[test]
    fn unsupported_granularity_keeps_input() {
        let err: RuleError = SettingsError::UnsupportedGranularity("Partner".to_string()).into();
        assert!(matches!(err, RuleError::UnsupportedGranularity(ref g) if g == "Partner"));
        assert!(err.to_string().contains("Partner"));
    }
}
