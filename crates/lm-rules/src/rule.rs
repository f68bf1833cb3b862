//! Rule definitions and evaluation results

use crate::client::DataSource;
use crate::error::RuleError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use lm_settings::{Granularity, ParamDef, RuleLayout, RuleParams, SettingMap, SettingsRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Outcome of a rule for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// Display value
    pub value: String,
    /// Whether the entity fails the rule
    pub anomalous: bool,
    /// Extra descriptive columns
    #[serde(default)]
    pub fields: IndexMap<String, String>,
}

impl Value {
    /// Create value without extra fields
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>, anomalous: bool) -> Self {
        Self {
            value: value.into(),
            anomalous,
            fields: IndexMap::new(),
        }
    }

    /// With an extra descriptive field
    #[inline]
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Per-entity results of one rule
///
/// Entities absent from `values` have no result (neither pass nor fail).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorResult {
    /// Results keyed by entity ID
    pub values: IndexMap<String, Value>,
}

impl ExecutorResult {
    /// Create empty result
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the value for an entity
    #[inline]
    pub fn insert(&mut self, entity_id: impl Into<String>, value: Value) {
        self.values.insert(entity_id.into(), value);
    }

    /// Value for an entity
    #[inline]
    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<&Value> {
        self.values.get(entity_id)
    }

    /// Entities failing the rule
    pub fn anomalies(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values
            .iter()
            .filter(|(_, v)| v.anomalous)
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entities with a result
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no entity has a result
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Run-wide inputs shared by every rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Evaluation instant ("today")
    pub now: DateTime<Utc>,
    /// Advertiser scope passed to entity listings; blank for all
    pub scope_id: String,
}

impl RunContext {
    /// Create context evaluated at `now`
    #[inline]
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            scope_id: String::new(),
        }
    }

    /// Create context evaluated at the current time
    #[inline]
    #[must_use]
    pub fn current() -> Self {
        Self::new(Utc::now())
    }

    /// With advertiser scope
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_id = scope_id.into();
        self
    }
}

/// Evaluation callback of a rule
///
/// Receives the data source, the run context and the rule's own settings
/// (keyed by parameter key) explicitly.
#[async_trait]
pub trait RuleEvaluator: Send + Sync {
    /// Evaluate the rule for every applicable entity
    async fn evaluate(
        &self,
        client: &dyn DataSource,
        ctx: &RunContext,
        settings: &SettingMap,
    ) -> Result<ExecutorResult, RuleError>;
}

/// Static description of a rule
///
/// Built at startup from code; never loaded from persisted state.
#[derive(Clone)]
pub struct RuleDefinition {
    name: String,
    granularity: Granularity,
    helper: String,
    params: RuleParams,
    evaluator: Arc<dyn RuleEvaluator>,
}

impl RuleDefinition {
    /// Create rule without parameters
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        granularity: Granularity,
        evaluator: impl RuleEvaluator + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            granularity,
            helper: String::new(),
            params: RuleParams::new(),
            evaluator: Arc::new(evaluator),
        }
    }

    /// With helper text shown above the rule's columns
    #[inline]
    #[must_use]
    pub fn with_helper(mut self, helper: impl Into<String>) -> Self {
        self.helper = helper.into();
        self
    }

    /// With a parameter appended to the schema
    #[inline]
    #[must_use]
    pub fn with_param(mut self, param: ParamDef) -> Self {
        self.params.push(param);
        self
    }

    /// Rule name, unique within a harness
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity collection the rule applies to
    #[inline]
    #[must_use]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Helper text
    #[inline]
    #[must_use]
    pub fn helper(&self) -> &str {
        &self.helper
    }

    /// Parameter schema
    #[inline]
    #[must_use]
    pub fn params(&self) -> &RuleParams {
        &self.params
    }

    /// Layout handed to the settings reconciler
    #[inline]
    #[must_use]
    pub fn layout(&self) -> RuleLayout<'_> {
        RuleLayout {
            name: &self.name,
            granularity: self.granularity,
            helper: &self.helper,
            params: &self.params,
        }
    }

    /// Run the evaluation callback
    pub async fn evaluate(
        &self,
        client: &dyn DataSource,
        ctx: &RunContext,
        settings: &SettingMap,
    ) -> Result<ExecutorResult, RuleError> {
        self.evaluator.evaluate(client, ctx, settings).await
    }
}

impl fmt::Debug for RuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDefinition")
            .field("name", &self.name)
            .field("granularity", &self.granularity)
            .field("params", &self.params.labels().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Parse an optional numeric bound from a resolved settings record
///
/// Blank means unbounded.
pub(crate) fn parse_bound(
    rule: &str,
    record: &SettingsRecord,
    key: &str,
) -> Result<Option<f64>, RuleError> {
    let raw = record.get(key).map(|v| v.trim()).unwrap_or_default();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| RuleError::invalid_parameter(rule, key, raw))
}

/// Split a comma separated cell into trimmed, non-empty entries
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
