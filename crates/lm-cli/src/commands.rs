//! Subcommand implementations

use crate::config::MonitorConfig;
use anyhow::{bail, Context};
use lm_report::{read_grid_csv, write_grid_csv, write_results, ReportName};
use lm_rules::{builtin, CachedClient, RuleHarness, SnapshotDataSource, ValidationOutput};
use lm_settings::{Granularity, ReconcileSummary, RuleRange, SettingsRecord};
use std::path::PathBuf;
use std::sync::Arc;

/// Configured harness over the snapshot data source
pub struct App {
    config: MonitorConfig,
    harness: RuleHarness,
}

impl App {
    /// Build the app with the built-in rules
    ///
    /// # Errors
    /// Unreadable or invalid snapshot.
    pub fn new(config: MonitorConfig) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(&config.snapshot_path).with_context(|| {
            format!("failed to read snapshot {}", config.snapshot_path.display())
        })?;
        let source = SnapshotDataSource::from_json(&json).with_context(|| {
            format!("failed to load snapshot {}", config.snapshot_path.display())
        })?;
        let harness = RuleHarness::new(
            Arc::new(CachedClient::new(source)),
            builtin::default_rules(),
        )?;
        Ok(Self { config, harness })
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Registered rules
    #[inline]
    #[must_use]
    pub fn harness(&self) -> &RuleHarness {
        &self.harness
    }

    fn load_range(&self) -> anyhow::Result<RuleRange> {
        let path = &self.config.grid_path;
        if !path.exists() {
            tracing::info!("No settings grid at {}, starting empty", path.display());
            return Ok(RuleRange::new());
        }
        let grid = read_grid_csv(path)?;
        Ok(RuleRange::from_grid(&grid))
    }

    /// Reconcile every rule against live entities and save the grid
    ///
    /// The full grid always goes back to `grid_path`. With a granularity the
    /// filtered view is also written to `output_dir` and its path returned.
    ///
    /// # Errors
    /// Data source, grid and file system failures.
    pub async fn sync(
        &self,
        granularity: Option<Granularity>,
    ) -> anyhow::Result<(Vec<ReconcileSummary>, Option<PathBuf>)> {
        let mut range = self.load_range()?;
        let ctx = self.config.run_context();
        let summaries = self.harness.fill_rule_values(&mut range, &ctx).await?;

        let full = range.recompose(None);
        write_grid_csv(&self.config.grid_path, &full)?;

        let view = match granularity {
            Some(granularity) => {
                std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
                    format!("failed to create {}", self.config.output_dir.display())
                })?;
                let file = format!(
                    "settings_{}.csv",
                    lm_report::normalize_column(granularity.as_str())
                );
                let path = self.config.output_dir.join(file);
                write_grid_csv(&path, &range.recompose(Some(granularity)))?;
                Some(path)
            }
            None => None,
        };
        Ok((summaries, view))
    }

    /// Run every enabled rule and write one report per enabled rule
    ///
    /// # Errors
    /// The first rule error aborts the run before any report is written.
    pub async fn validate(&self) -> anyhow::Result<(ValidationOutput, Vec<PathBuf>)> {
        let range = self.load_range()?;
        let ctx = self.config.run_context();
        let toggles = self.config.toggles();
        for name in &self.config.disabled_rules {
            if self.harness.rule(name).is_none() {
                tracing::warn!("Disabled rule '{}' is not registered", name);
            }
        }

        let output = self.harness.validate(&range, &toggles, &ctx).await?;

        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!("failed to create {}", self.config.output_dir.display())
        })?;
        let mut written = Vec::new();
        for (rule, result) in &output.results {
            if !toggles.is_enabled(rule) {
                continue;
            }
            let name = ReportName::new(
                self.config.category.clone(),
                self.config.label.clone(),
                rule.clone(),
                self.config.sheet_id.clone(),
                ctx.now,
            );
            written.push(write_results(&self.config.output_dir, &name, result)?);
        }
        Ok((output, written))
    }

    /// Settings for one entity after falling back to the `default` row,
    /// keyed by parameter label
    ///
    /// # Errors
    /// Unknown rule or unreadable grid.
    pub fn inspect(&self, rule: &str, entity_id: &str) -> anyhow::Result<SettingsRecord> {
        let Some(definition) = self.harness.rule(rule) else {
            bail!("unknown rule '{rule}'");
        };
        let range = self.load_range()?;
        let resolved = range
            .rule_settings(rule, definition.params())
            .get_or_default(entity_id);
        Ok(definition
            .params()
            .iter()
            .map(|param| {
                let value = resolved.get(&param.key).cloned().unwrap_or_default();
                (param.label.clone(), value)
            })
            .collect())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("harness", &self.harness)
            .finish()
    }
}
