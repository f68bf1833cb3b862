//! JSON snapshot data source
//!
//! A snapshot holds entity lists keyed by granularity name plus raw spend and
//! impression rows. Reports are computed from those rows on demand.

use crate::client::{BudgetReport, DataSource, ImpressionReport};
use crate::entity::{DateRange, Entity};
use crate::error::RuleError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use lm_settings::Granularity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Daily spend of one insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRow {
    /// Insertion order ID
    pub insertion_order_id: String,
    /// Day of spend
    pub date: NaiveDate,
    /// Amount spent
    pub amount: f64,
}

/// Daily impressions of one insertion order in one geography
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpressionRow {
    /// Insertion order ID
    pub insertion_order_id: String,
    /// Day of delivery
    pub date: NaiveDate,
    /// Geography the impressions were served in
    pub geo: String,
    /// Impression count
    pub impressions: u64,
}

/// Serialized form of a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Entity lists keyed by granularity display name
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<Entity>>,
    /// Spend rows
    #[serde(default)]
    pub spend: Vec<SpendRow>,
    /// Impression rows
    #[serde(default)]
    pub impressions: Vec<ImpressionRow>,
}

/// In-memory data source backed by a [`Snapshot`]
#[derive(Debug, Clone, Default)]
pub struct SnapshotDataSource {
    entities: HashMap<Granularity, Arc<Vec<Entity>>>,
    spend: Arc<Vec<SpendRow>>,
    impressions: Arc<Vec<ImpressionRow>>,
}

impl SnapshotDataSource {
    /// Create empty data source
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a deserialized snapshot
    ///
    /// # Errors
    /// `RuleError::UnsupportedGranularity` for an entity list keyed by an
    /// unknown granularity name.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, RuleError> {
        let mut source = Self::new();
        for (name, entities) in snapshot.entities {
            let granularity: Granularity = name.parse()?;
            source = source.with_entities(granularity, entities);
        }
        source.spend = Arc::new(snapshot.spend);
        source.impressions = Arc::new(snapshot.impressions);
        Ok(source)
    }

    /// Parse a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let snapshot: Snapshot = serde_json::from_str(json)
            .map_err(|e| RuleError::DataSource(format!("invalid snapshot: {e}")))?;
        Self::from_snapshot(snapshot)
    }

    /// With entities for a granularity, replacing any earlier list
    #[must_use]
    pub fn with_entities(mut self, granularity: Granularity, entities: Vec<Entity>) -> Self {
        self.entities.insert(granularity, Arc::new(entities));
        self
    }

    /// With spend rows
    #[must_use]
    pub fn with_spend(mut self, rows: Vec<SpendRow>) -> Self {
        self.spend = Arc::new(rows);
        self
    }

    /// With impression rows
    #[must_use]
    pub fn with_impressions(mut self, rows: Vec<ImpressionRow>) -> Self {
        self.impressions = Arc::new(rows);
        self
    }
}

#[async_trait]
impl DataSource for SnapshotDataSource {
    async fn list_entities(
        &self,
        granularity: Granularity,
        scope_id: &str,
    ) -> Result<Arc<Vec<Entity>>, RuleError> {
        let all = self.entities.get(&granularity).cloned().unwrap_or_default();
        if scope_id.is_empty() {
            return Ok(all);
        }
        Ok(Arc::new(
            all.iter()
                .filter(|e| e.advertiser_id.as_deref() == Some(scope_id))
                .cloned()
                .collect(),
        ))
    }

    async fn budget_report(&self, range: DateRange) -> Result<Arc<dyn BudgetReport>, RuleError> {
        let rows = self
            .spend
            .iter()
            .filter(|row| within(range, row.date))
            .cloned()
            .collect();
        Ok(Arc::new(SpendReport { rows }))
    }

    async fn impression_report(
        &self,
        range: DateRange,
    ) -> Result<Arc<dyn ImpressionReport>, RuleError> {
        let rows = self
            .impressions
            .iter()
            .filter(|row| within(range, row.date))
            .cloned()
            .collect();
        Ok(Arc::new(GeoImpressionReport { rows }))
    }
}

fn within(range: DateRange, date: NaiveDate) -> bool {
    range.start.date_naive() <= date && date <= range.end.date_naive()
}

/// Spend rows restricted to a report window
#[derive(Debug, Clone)]
pub struct SpendReport {
    rows: Vec<SpendRow>,
}

impl BudgetReport for SpendReport {
    fn spend_for_insertion_order(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<f64> {
        let window = DateRange::new(start, end);
        let mut rows = self
            .rows
            .iter()
            .filter(|row| row.insertion_order_id == id)
            .peekable();
        rows.peek()?;
        Some(
            rows.filter(|row| within(window, row.date))
                .map(|row| row.amount)
                .sum(),
        )
    }
}

/// Impression rows restricted to a report window
#[derive(Debug, Clone)]
pub struct GeoImpressionReport {
    rows: Vec<ImpressionRow>,
}

impl ImpressionReport for GeoImpressionReport {
    fn percent_outside_geos(&self, id: &str, allowed_geos: &[String]) -> Option<f64> {
        let (total, outside) = self
            .rows
            .iter()
            .filter(|row| row.insertion_order_id == id)
            .fold((0u64, 0u64), |(total, outside), row| {
                let allowed = allowed_geos
                    .iter()
                    .any(|geo| geo.trim().eq_ignore_ascii_case(row.geo.trim()));
                let outside = if allowed { outside } else { outside + row.impressions };
                (total + row.impressions, outside)
            });
        if total == 0 {
            return None;
        }
        Some(outside as f64 / total as f64)
    }
}
