//! Average daily budget of insertion orders

use crate::client::DataSource;
use crate::error::RuleError;
use crate::rule::{parse_bound, ExecutorResult, RuleDefinition, RuleEvaluator, RunContext, Value};
use async_trait::async_trait;
use lm_settings::{is_number, Granularity, ParamDef, SettingMap};

/// Rule name
pub const DAILY_BUDGET: &str = "Daily Budget";

const MIN: &str = "min_daily_budget";
const MAX: &str = "max_daily_budget";

/// Daily budget rule definition
#[must_use]
pub fn daily_budget() -> RuleDefinition {
    RuleDefinition::new(DAILY_BUDGET, Granularity::InsertionOrder, DailyBudget)
        .with_helper("Budget divided by flight days; blank bounds are not checked")
        .with_param(ParamDef::new(MIN, "Min. Daily Budget").with_validator(is_number))
        .with_param(ParamDef::new(MAX, "Max. Daily Budget").with_validator(is_number))
}

/// Flags insertion orders whose budget per flight day is out of bounds
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyBudget;

#[async_trait]
impl RuleEvaluator for DailyBudget {
    async fn evaluate(
        &self,
        client: &dyn DataSource,
        ctx: &RunContext,
        settings: &SettingMap,
    ) -> Result<ExecutorResult, RuleError> {
        let entities = client
            .list_entities(Granularity::InsertionOrder, &ctx.scope_id)
            .await?;

        let mut result = ExecutorResult::new();
        for io in entities.iter() {
            let (Some(flight), Some(budget)) = (io.flight, io.budget) else {
                continue;
            };
            let record = settings.get_or_default(&io.id);
            let min = parse_bound(DAILY_BUDGET, &record, MIN)?;
            let max = parse_bound(DAILY_BUDGET, &record, MAX)?;

            let days = flight.days();
            #[allow(clippy::cast_precision_loss)]
            let daily = budget / days as f64;
            let anomalous = min.is_some_and(|m| daily < m) || max.is_some_and(|m| daily > m);
            result.insert(
                io.id.clone(),
                Value::new(format!("{daily:.2}"), anomalous)
                    .with_field("budget", format!("{budget:.2}"))
                    .with_field("flight_days", days.to_string()),
            );
        }
        Ok(result)
    }
}
