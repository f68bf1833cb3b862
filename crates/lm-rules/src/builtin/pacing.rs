//! Budget pacing of active insertion orders

use crate::client::DataSource;
use crate::entity::DateRange;
use crate::error::RuleError;
use crate::rule::{parse_bound, ExecutorResult, RuleDefinition, RuleEvaluator, RunContext, Value};
use async_trait::async_trait;
use lm_settings::{is_number, Granularity, ParamDef, SettingMap};

/// Rule name
pub const BUDGET_PACING: &str = "Budget Pacing";

const MIN: &str = "min_pacing";
const MAX: &str = "max_pacing";

/// Budget pacing rule definition
#[must_use]
pub fn budget_pacing() -> RuleDefinition {
    RuleDefinition::new(BUDGET_PACING, Granularity::InsertionOrder, BudgetPacing)
        .with_helper("Share ahead of (+) or behind (-) an even spend over the flight")
        .with_param(
            ParamDef::new(MIN, "Min. Percent Ahead/Behind")
                .with_default("0")
                .with_validator(is_number),
        )
        .with_param(
            ParamDef::new(MAX, "Max. Percent Ahead/Behind")
                .with_default("0.5")
                .with_validator(is_number),
        )
}

/// Flags insertion orders spending too far ahead of or behind their flight
///
/// `pacing = (spend / budget) / elapsed_share - 1`; anomalous when `|pacing|`
/// falls below the minimum or above the maximum.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetPacing;

#[async_trait]
impl RuleEvaluator for BudgetPacing {
    async fn evaluate(
        &self,
        client: &dyn DataSource,
        ctx: &RunContext,
        settings: &SettingMap,
    ) -> Result<ExecutorResult, RuleError> {
        let entities = client
            .list_entities(Granularity::InsertionOrder, &ctx.scope_id)
            .await?;
        let active: Vec<_> = entities
            .iter()
            .filter_map(|io| {
                let flight = io.flight?;
                let budget = io.budget?;
                flight.contains(ctx.now).then_some((io, flight, budget))
            })
            .collect();

        let mut result = ExecutorResult::new();
        let Some(earliest) = active.iter().map(|(_, flight, _)| flight.start).min() else {
            return Ok(result);
        };
        let report = client
            .budget_report(DateRange::new(earliest, ctx.now))
            .await?;

        for (io, flight, budget) in active {
            let record = settings.get_or_default(&io.id);
            let min = parse_bound(BUDGET_PACING, &record, MIN)?;
            let max = parse_bound(BUDGET_PACING, &record, MAX)?;

            let Some(spend) = report.spend_for_insertion_order(&io.id, flight.start, ctx.now)
            else {
                tracing::warn!("No spend reported for insertion order {}, skipping", io.id);
                continue;
            };
            let elapsed = flight.elapsed_fraction(ctx.now);
            if budget <= 0.0 || elapsed <= 0.0 {
                continue;
            }

            let pacing = (spend / budget) / elapsed - 1.0;
            let magnitude = pacing.abs();
            let anomalous =
                min.is_some_and(|m| magnitude < m) || max.is_some_and(|m| magnitude > m);
            result.insert(
                io.id.clone(),
                Value::new(format!("{:.0}%", pacing * 100.0), anomalous)
                    .with_field("spend", format!("{spend:.2}"))
                    .with_field("budget", format!("{budget:.2}"))
                    .with_field("flight_elapsed", format!("{:.0}%", elapsed * 100.0)),
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Flight};
    use crate::snapshot::{SnapshotDataSource, SpendRow};
    use chrono::{NaiveDate, TimeZone, Utc};
    use lm_settings::{SettingsRecord, DEFAULT_ID};

    fn io(id: &str, budget: f64) -> Entity {
        Entity::new(id).with_budget(budget).with_flight(Flight::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap(),
        ))
    }

    fn spend(id: &str, amount: f64) -> SpendRow {
        SpendRow {
            insertion_order_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            amount,
        }
    }

    fn settings() -> SettingMap {
        SettingMap::from_pairs([(
            DEFAULT_ID,
            [(MIN, "0"), (MAX, "0.5")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<SettingsRecord>(),
        )])
    }

    #[tokio::test]
    async fn pacing_within_bounds_passes() {
        let source = SnapshotDataSource::new()
            .with_entities(Granularity::InsertionOrder, vec![io("io1", 1000.0)])
            .with_spend(vec![spend("io1", 550.0)]);
        let ctx = RunContext::new(Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap());
        let result = BudgetPacing.evaluate(&source, &ctx, &settings()).await.unwrap();
        let value = result.get("io1").unwrap();
        assert_eq!(value.value, "10%");
        assert!(!value.anomalous);
    }

    #[tokio::test]
    async fn missing_spend_and_inactive_flights_are_skipped() {
        let source = SnapshotDataSource::new()
            .with_entities(Granularity::InsertionOrder, vec![io("io1", 1000.0)]);
        let during = RunContext::new(Utc.with_ymd_and_hms(2024, 3, 6, 0, 0, 0).unwrap());
        assert!(BudgetPacing.evaluate(&source, &during, &settings()).await.unwrap().is_empty());

        let after = RunContext::new(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());
        assert!(BudgetPacing.evaluate(&source, &after, &settings()).await.unwrap().is_empty());
    }
}
