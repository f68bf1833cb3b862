//! Validation output keyed by rule name

use crate::rule::{ExecutorResult, RuleDefinition};
use indexmap::IndexMap;
use std::sync::Arc;

/// Verdict of one rule for one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityStatus {
    /// Entity evaluated and within bounds
    Pass,
    /// Entity evaluated and anomalous
    Fail,
    /// Rule skipped the entity (outside flight, missing report data)
    NoResult,
}

/// Rules and their results from one validation pass
#[derive(Debug, Clone, Default)]
pub struct ValidationOutput {
    /// Rules by name, in evaluation order
    pub rules: IndexMap<String, Arc<RuleDefinition>>,
    /// Results by rule name, in evaluation order
    pub results: IndexMap<String, ExecutorResult>,
}

impl ValidationOutput {
    /// Create empty output
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rule's result unchanged
    pub fn record(&mut self, rule: Arc<RuleDefinition>, result: ExecutorResult) {
        let name = rule.name().to_string();
        self.rules.insert(name.clone(), rule);
        self.results.insert(name, result);
    }

    /// Result of a rule
    #[inline]
    #[must_use]
    pub fn result(&self, rule: &str) -> Option<&ExecutorResult> {
        self.results.get(rule)
    }

    /// Verdict of `rule` for `entity_id`
    #[must_use]
    pub fn status(&self, rule: &str, entity_id: &str) -> EntityStatus {
        match self.results.get(rule).and_then(|r| r.get(entity_id)) {
            Some(value) if value.anomalous => EntityStatus::Fail,
            Some(_) => EntityStatus::Pass,
            None => EntityStatus::NoResult,
        }
    }

    /// Anomaly count per rule, in evaluation order
    pub fn anomaly_counts(&self) -> impl Iterator<Item = (&str, usize)> {
        self.results
            .iter()
            .map(|(name, result)| (name.as_str(), result.anomalies().count()))
    }

    /// Total anomalies across all rules
    #[must_use]
    pub fn total_anomalies(&self) -> usize {
        self.anomaly_counts().map(|(_, count)| count).sum()
    }
}
