//! Rule execution harness
//!
//! Holds the ordered list of rules built at startup. Each `validate` call
//! re-reads the enabled/disabled toggles and runs the enabled rules one after
//! another. The first rule error aborts the pass.

use crate::aggregate::ValidationOutput;
use crate::client::DataSource;
use crate::error::RuleError;
use crate::reconcile::fill_rule_values;
use crate::rule::{ExecutorResult, RuleDefinition, RunContext};
use indexmap::IndexMap;
use lm_settings::{is_reserved_name, ReconcileSummary, RuleRange};
use std::collections::HashSet;
use std::sync::Arc;

/// Run-time enabled/disabled view of the registered rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleToggles {
    disabled: HashSet<String>,
}

impl RuleToggles {
    /// Every rule enabled
    #[inline]
    #[must_use]
    pub fn all_enabled() -> Self {
        Self::default()
    }

    /// Toggles with the named rules disabled
    #[must_use]
    pub fn disabled<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disabled: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Disable a rule
    #[inline]
    pub fn disable(&mut self, name: impl Into<String>) {
        self.disabled.insert(name.into());
    }

    /// Enable a rule
    #[inline]
    pub fn enable(&mut self, name: &str) {
        self.disabled.remove(name);
    }

    /// Check if a rule runs
    #[inline]
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        !self.disabled.contains(name)
    }
}

/// Ordered rule registry bound to a data source
pub struct RuleHarness {
    client: Arc<dyn DataSource>,
    rules: IndexMap<String, Arc<RuleDefinition>>,
}

impl RuleHarness {
    /// Create harness over `rules`, in evaluation order
    ///
    /// # Errors
    /// - `RuleError::ReservedRuleName` for a blank name or one of `none`,
    ///   `ID` and `default`.
    /// - `RuleError::DuplicateRule` when two rules share a name.
    pub fn new(client: Arc<dyn DataSource>, rules: Vec<RuleDefinition>) -> Result<Self, RuleError> {
        let mut registry = IndexMap::with_capacity(rules.len());
        for rule in rules {
            let name = rule.name().to_string();
            if is_reserved_name(&name) {
                return Err(RuleError::ReservedRuleName(name));
            }
            if registry.contains_key(&name) {
                return Err(RuleError::DuplicateRule(name));
            }
            registry.insert(name, Arc::new(rule));
        }
        Ok(Self {
            client,
            rules: registry,
        })
    }

    /// Registered rules in evaluation order
    pub fn rules(&self) -> impl Iterator<Item = &RuleDefinition> {
        self.rules.values().map(AsRef::as_ref)
    }

    /// Rule by name
    #[inline]
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&RuleDefinition> {
        self.rules.get(name).map(AsRef::as_ref)
    }

    /// Number of registered rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rules are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Data source shared by every rule
    #[inline]
    #[must_use]
    pub fn client(&self) -> &dyn DataSource {
        self.client.as_ref()
    }

    /// Reconcile every registered rule's section against live entities
    ///
    /// # Errors
    /// Stops at the first data source failure.
    pub async fn fill_rule_values(
        &self,
        range: &mut RuleRange,
        ctx: &RunContext,
    ) -> Result<Vec<ReconcileSummary>, RuleError> {
        let mut summaries = Vec::with_capacity(self.rules.len());
        for rule in self.rules.values() {
            summaries.push(fill_rule_values(range, rule, self.client.as_ref(), ctx).await?);
        }
        Ok(summaries)
    }

    /// Run every enabled rule against the settings in `range`
    ///
    /// Disabled rules are recorded with an empty result and never touch the
    /// data source.
    ///
    /// # Errors
    /// The first rule error is returned as is; no later rule runs.
    pub async fn validate(
        &self,
        range: &RuleRange,
        toggles: &RuleToggles,
        ctx: &RunContext,
    ) -> Result<ValidationOutput, RuleError> {
        let mut output = ValidationOutput::new();
        for (name, rule) in &self.rules {
            if !toggles.is_enabled(name) {
                tracing::info!("Skipping disabled rule '{}'", name);
                output.record(Arc::clone(rule), ExecutorResult::default());
                continue;
            }

            let settings = range.rule_settings(name, rule.params());
            let result = rule.evaluate(self.client.as_ref(), ctx, &settings).await?;
            tracing::info!(
                "Rule '{}' evaluated {} entities, {} anomalous",
                name,
                result.len(),
                result.anomalies().count()
            );
            output.record(Arc::clone(rule), result);
        }
        Ok(output)
    }
}

impl std::fmt::Debug for RuleHarness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleHarness")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
