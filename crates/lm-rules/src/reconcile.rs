//! Live-entity reconciliation of a rule's settings section

use crate::client::DataSource;
use crate::error::RuleError;
use crate::rule::{RuleDefinition, RunContext};
use lm_settings::{LiveEntity, ReconcileSummary, RuleRange};

/// Reconcile one rule's section against the entities currently live for its
/// granularity
///
/// # Errors
/// Propagates data source failures; the range is left untouched in that case.
pub async fn fill_rule_values(
    range: &mut RuleRange,
    rule: &RuleDefinition,
    client: &dyn DataSource,
    ctx: &RunContext,
) -> Result<ReconcileSummary, RuleError> {
    let entities = client
        .list_entities(rule.granularity(), &ctx.scope_id)
        .await?;
    let live: Vec<LiveEntity> = entities
        .iter()
        .map(|entity| LiveEntity {
            id: entity.id.clone(),
            identity: entity.identity_row(),
        })
        .collect();

    let summary = range.apply_rule_values(&rule.layout(), &live);
    tracing::info!(
        "Reconciled '{}': {} live, {} added, {} stale",
        rule.name(),
        live.len(),
        summary.added_entities.len(),
        summary.stale_entities.len()
    );
    Ok(summary)
}
