//! Report file names
//!
//! `{category}_{label}_{rule}_{sheet_id}_{YYYY-MM-DDTHH:MM:SS.mmmZ}.csv`.
//! The label may be blank and the sheet ID may contain underscores; the
//! category and rule may not.

use crate::error::ReportError;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static REPORT_NAME: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"^(?P<category>[^_]+)_(?P<label>[^_]*)_(?P<rule>[^_]+)_(?P<sheet_id>.+?)_(?P<date>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z)\.csv$",
    )
    .ok()
});

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Metadata carried in a report file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReportName {
    /// Kind of export, e.g. `DV360`
    pub category: String,
    /// Identifying label of the sheet, possibly blank
    pub label: String,
    /// Rule that produced the report
    pub rule: String,
    /// Copy of the tool that produced the report
    pub sheet_id: String,
    /// Report time, millisecond precision
    pub date: DateTime<Utc>,
}

impl ReportName {
    /// Create report name
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        label: impl Into<String>,
        rule: impl Into<String>,
        sheet_id: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            category: category.into(),
            label: label.into(),
            rule: rule.into(),
            sheet_id: sheet_id.into(),
            date,
        }
    }

    /// Parse a file name
    ///
    /// # Errors
    /// `ReportError::InvalidReportName` when the name does not match the
    /// naming scheme.
    pub fn parse(filename: &str) -> Result<Self, ReportError> {
        let invalid = || ReportError::InvalidReportName(filename.to_string());
        let pattern = REPORT_NAME.as_ref().ok_or_else(invalid)?;
        let caps = pattern.captures(filename).ok_or_else(invalid)?;

        let date_text = &caps["date"];
        let date = NaiveDateTime::parse_from_str(date_text, DATE_FORMAT)
            .map_err(|source| ReportError::InvalidDate {
                value: date_text.to_string(),
                source,
            })?
            .and_utc();

        Ok(Self {
            category: caps["category"].to_string(),
            label: caps["label"].to_string(),
            rule: caps["rule"].to_string(),
            sheet_id: caps["sheet_id"].to_string(),
            date,
        })
    }

    /// File name for this report
    ///
    /// Returns `InvalidReportName` if a component would make the name
    /// unparseable (underscore in category, label or rule; blank category,
    /// rule or sheet ID).
    pub fn format(&self) -> Result<String, ReportError> {
        let name = self.to_string();
        let bad_part = |part: &str| part.contains('_');
        if self.category.is_empty()
            || self.rule.is_empty()
            || self.sheet_id.is_empty()
            || bad_part(&self.category)
            || bad_part(&self.label)
            || bad_part(&self.rule)
        {
            return Err(ReportError::InvalidReportName(name));
        }
        Ok(name)
    }
}

impl fmt::Display for ReportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}_{}.csv",
            self.category,
            self.label,
            self.rule,
            self.sheet_id,
            self.date.to_rfc3339_opts(SecondsFormat::Millis, true)
        )
    }
}

impl FromStr for ReportName {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 6, 9, 30, 15).unwrap() + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn parses_blank_label_and_underscored_sheet_id() {
        let name = ReportName::parse("DV360__Budget Pacing_1a_b_c_2024-03-06T09:30:15.042Z.csv")
            .unwrap();
        assert_eq!(name.category, "DV360");
        assert_eq!(name.label, "");
        assert_eq!(name.rule, "Budget Pacing");
        assert_eq!(name.sheet_id, "1a_b_c");
        assert_eq!(name.date, date());
    }

    #[test]
    fn format_matches_parse() {
        let name = ReportName::new("DV360", "Acme", "Geo Targeting", "sheet_42", date());
        let file = name.format().unwrap();
        assert_eq!(file, "DV360_Acme_Geo Targeting_sheet_42_2024-03-06T09:30:15.042Z.csv");
        assert_eq!(file.parse::<ReportName>().unwrap(), name);
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in [
            "report.csv",
            "DV360_Acme_Rule_sheet_2024-03-06.csv",
            "DV360_Acme_Rule_sheet_2024-03-06T09:30:15.042Z.txt",
            "_Acme_Rule_sheet_2024-03-06T09:30:15.042Z.csv",
        ] {
            assert!(
                matches!(ReportName::parse(bad), Err(ReportError::InvalidReportName(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn out_of_range_date_is_reported() {
        let err = ReportName::parse("DV360_Acme_Rule_sheet_2024-13-06T09:30:15.042Z.csv")
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidDate { .. }));
    }

    #[test]
    fn format_rejects_underscored_rule() {
        let name = ReportName::new("DV360", "", "Geo_Targeting", "s", date());
        assert!(name.format().is_err());
    }
}
