//! Line item geo targeting against the configured list

use crate::client::DataSource;
use crate::error::RuleError;
use crate::rule::{split_list, ExecutorResult, RuleDefinition, RuleEvaluator, RunContext, Value};
use async_trait::async_trait;
use lm_settings::{is_geo_list, Granularity, ParamDef, SettingMap};
use std::collections::BTreeSet;

/// Rule name
pub const GEO_TARGETING: &str = "Geo Targeting";

const GEOS: &str = "geo_targets";

/// Geo targeting rule definition
#[must_use]
pub fn geo_targeting() -> RuleDefinition {
    RuleDefinition::new(GEO_TARGETING, Granularity::LineItem, GeoTargeting)
        .with_helper("Comma separated geographies each line item must target")
        .with_param(ParamDef::new(GEOS, "Geo Targets").with_validator(is_geo_list))
}

/// Flags line items whose targeted geographies differ from the configured set
///
/// Line items without a configured list are not checked. Every line item
/// must carry a display name.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTargeting;

fn normalized(geos: &[String]) -> BTreeSet<String> {
    geos.iter().map(|g| g.trim().to_lowercase()).collect()
}

#[async_trait]
impl RuleEvaluator for GeoTargeting {
    async fn evaluate(
        &self,
        client: &dyn DataSource,
        ctx: &RunContext,
        settings: &SettingMap,
    ) -> Result<ExecutorResult, RuleError> {
        let entities = client
            .list_entities(Granularity::LineItem, &ctx.scope_id)
            .await?;

        let mut result = ExecutorResult::new();
        for li in entities.iter() {
            let name = li.require_display_name()?;
            let record = settings.get_or_default(&li.id);
            let expected = split_list(record.get(GEOS).map_or("", String::as_str));
            if expected.is_empty() {
                continue;
            }

            let anomalous = normalized(&expected) != normalized(&li.geo_targets);
            result.insert(
                li.id.clone(),
                Value::new(li.geo_targets.join(", "), anomalous)
                    .with_field("name", name)
                    .with_field("expected", expected.join(", ")),
            );
        }
        Ok(result)
    }
}
