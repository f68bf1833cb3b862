//! Testing utilities for the Launch Monitor workspace
//!
//! Shared fakes, fixtures, and grid builders.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use lm_rules::{
    BudgetReport, DataSource, DateRange, Entity, ExecutorResult, ImpressionReport, RuleError,
    RuleEvaluator, RunContext, Value,
};
use lm_settings::{Granularity, Grid, SettingMap};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Build a grid from string literals
pub fn grid(rows: &[&[&str]]) -> Grid {
    rows.iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect()
}

/// Midnight UTC on the given day
pub fn day(year: i32, month: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, d, 0, 0, 0).unwrap()
}

#[derive(Debug, Default)]
pub struct CallCounts {
    pub list_entities: AtomicUsize,
    pub budget_reports: AtomicUsize,
    pub impression_reports: AtomicUsize,
}

impl CallCounts {
    pub fn total(&self) -> usize {
        self.list_entities.load(Ordering::SeqCst)
            + self.budget_reports.load(Ordering::SeqCst)
            + self.impression_reports.load(Ordering::SeqCst)
    }
}

/// In-memory data source with fixed report values and call counters
#[derive(Debug, Default)]
pub struct FakeDataSource {
    entities: HashMap<Granularity, Arc<Vec<Entity>>>,
    spend: Arc<HashMap<String, f64>>,
    outside: Arc<HashMap<String, f64>>,
    fail_with: Option<String>,
    pub calls: CallCounts,
}

impl FakeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entities(mut self, granularity: Granularity, entities: Vec<Entity>) -> Self {
        self.entities.insert(granularity, Arc::new(entities));
        self
    }

    /// Spend returned for an insertion order regardless of the window
    pub fn with_spend(mut self, id: &str, amount: f64) -> Self {
        Arc::make_mut(&mut self.spend).insert(id.to_string(), amount);
        self
    }

    /// Share of impressions outside geos returned for an insertion order
    pub fn with_outside_share(mut self, id: &str, share: f64) -> Self {
        Arc::make_mut(&mut self.outside).insert(id.to_string(), share);
        self
    }

    /// Every call fails with a data source error
    pub fn failing(mut self, message: &str) -> Self {
        self.fail_with = Some(message.to_string());
        self
    }

    fn check(&self) -> Result<(), RuleError> {
        match &self.fail_with {
            Some(message) => Err(RuleError::DataSource(message.clone())),
            None => Ok(()),
        }
    }
}

struct FixedSpend(Arc<HashMap<String, f64>>);

impl BudgetReport for FixedSpend {
    fn spend_for_insertion_order(
        &self,
        id: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Option<f64> {
        self.0.get(id).copied()
    }
}

struct FixedOutside(Arc<HashMap<String, f64>>);

impl ImpressionReport for FixedOutside {
    fn percent_outside_geos(&self, id: &str, _allowed_geos: &[String]) -> Option<f64> {
        self.0.get(id).copied()
    }
}

#[async_trait]
impl DataSource for FakeDataSource {
    async fn list_entities(
        &self,
        granularity: Granularity,
        _scope_id: &str,
    ) -> Result<Arc<Vec<Entity>>, RuleError> {
        self.calls.list_entities.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.entities.get(&granularity).cloned().unwrap_or_default())
    }

    async fn budget_report(&self, _range: DateRange) -> Result<Arc<dyn BudgetReport>, RuleError> {
        self.calls.budget_reports.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(Arc::new(FixedSpend(Arc::clone(&self.spend))))
    }

    async fn impression_report(
        &self,
        _range: DateRange,
    ) -> Result<Arc<dyn ImpressionReport>, RuleError> {
        self.calls.impression_reports.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(Arc::new(FixedOutside(Arc::clone(&self.outside))))
    }
}

/// Evaluator that counts its invocations and touches the data source
#[derive(Debug, Clone, Default)]
pub struct CountingRule {
    pub calls: Arc<AtomicUsize>,
}

impl CountingRule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleEvaluator for CountingRule {
    async fn evaluate(
        &self,
        client: &dyn DataSource,
        ctx: &RunContext,
        _settings: &SettingMap,
    ) -> Result<ExecutorResult, RuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entities = client.list_entities(Granularity::Campaign, &ctx.scope_id).await?;
        let mut result = ExecutorResult::new();
        for entity in entities.iter() {
            result.insert(entity.id.clone(), Value::new("seen", false));
        }
        Ok(result)
    }
}

/// Evaluator that always fails
#[derive(Debug, Clone)]
pub struct FailingRule(pub String);

#[async_trait]
impl RuleEvaluator for FailingRule {
    async fn evaluate(
        &self,
        _client: &dyn DataSource,
        _ctx: &RunContext,
        _settings: &SettingMap,
    ) -> Result<ExecutorResult, RuleError> {
        Err(RuleError::Evaluation {
            rule: self.0.clone(),
            message: "boom".to_string(),
        })
    }
}
