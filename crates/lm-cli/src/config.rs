//! Run configuration loaded from TOML

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, Utc};
use lm_rules::{RuleToggles, RunContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Launch monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Report label, may be blank
    pub label: String,
    /// Identifies this copy of the tool in report names
    pub sheet_id: String,
    /// Report category
    pub category: String,
    /// Advertiser scope; blank for every advertiser
    pub scope_id: String,
    /// Rules switched off for this run
    pub disabled_rules: Vec<String>,
    /// Settings grid CSV
    pub grid_path: PathBuf,
    /// Entity and report snapshot JSON
    pub snapshot_path: PathBuf,
    /// Directory receiving report CSVs
    pub output_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: Option<String>,
    /// Evaluation date; the current time when unset
    pub today: Option<NaiveDate>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            label: String::new(),
            sheet_id: "local".to_string(),
            category: "DV360".to_string(),
            scope_id: String::new(),
            disabled_rules: Vec::new(),
            grid_path: PathBuf::from("settings.csv"),
            snapshot_path: PathBuf::from("snapshot.json"),
            output_dir: PathBuf::from("reports"),
            log_level: None,
            today: None,
        }
    }
}

impl MonitorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Invalid TOML or mistyped fields.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    /// Load configuration from a TOML file
    ///
    /// Relative paths in the file are resolved against the file's directory.
    ///
    /// # Errors
    /// Unreadable file or invalid TOML.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    /// Resolve relative file locations against `base`
    #[must_use]
    pub fn relative_to(mut self, base: &Path) -> Self {
        for path in [
            &mut self.grid_path,
            &mut self.snapshot_path,
            &mut self.output_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }

    /// With report label
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// With sheet ID
    #[inline]
    #[must_use]
    pub fn with_sheet_id(mut self, sheet_id: impl Into<String>) -> Self {
        self.sheet_id = sheet_id.into();
        self
    }

    /// With a rule disabled
    #[inline]
    #[must_use]
    pub fn with_disabled_rule(mut self, rule: impl Into<String>) -> Self {
        self.disabled_rules.push(rule.into());
        self
    }

    /// With file locations
    #[must_use]
    pub fn with_paths(
        mut self,
        grid_path: impl Into<PathBuf>,
        snapshot_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        self.grid_path = grid_path.into();
        self.snapshot_path = snapshot_path.into();
        self.output_dir = output_dir.into();
        self
    }

    /// With pinned evaluation date
    #[inline]
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Enabled/disabled view of the rules for this run
    #[must_use]
    pub fn toggles(&self) -> RuleToggles {
        RuleToggles::disabled(self.disabled_rules.iter().cloned())
    }

    /// Run context: pinned date at midnight UTC, otherwise now
    #[must_use]
    pub fn run_context(&self) -> RunContext {
        let now = self
            .today
            .map_or_else(Utc::now, |day| day.and_time(NaiveTime::MIN).and_utc());
        RunContext::new(now).with_scope(self.scope_id.clone())
    }
}
