//! Impressions served outside an insertion order's allowed geographies

use crate::client::DataSource;
use crate::entity::DateRange;
use crate::error::RuleError;
use crate::rule::{
    parse_bound, split_list, ExecutorResult, RuleDefinition, RuleEvaluator, RunContext, Value,
};
use async_trait::async_trait;
use lm_settings::{is_geo_list, is_percent, Granularity, ParamDef, SettingMap};

/// Rule name
pub const IMPRESSION_GEO_LEAKAGE: &str = "Impression Geo Leakage";

const ALLOWED: &str = "allowed_geos";
const MAX: &str = "max_outside";
const LOOKBACK_DAYS: i64 = 7;

/// Impression geo leakage rule definition
#[must_use]
pub fn impression_geo_leakage() -> RuleDefinition {
    RuleDefinition::new(
        IMPRESSION_GEO_LEAKAGE,
        Granularity::InsertionOrder,
        ImpressionGeoLeakage,
    )
    .with_helper("Share of last week's impressions served outside the allowed geographies")
    .with_param(ParamDef::new(ALLOWED, "Allowed Geos").with_validator(is_geo_list))
    .with_param(
        ParamDef::new(MAX, "Max. Percent Outside Geos")
            .with_default("0.01")
            .with_validator(is_percent),
    )
}

/// Flags insertion orders leaking impressions outside their allowed geographies
///
/// A blank allowed list falls back to the insertion order's own geo targets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImpressionGeoLeakage;

#[async_trait]
impl RuleEvaluator for ImpressionGeoLeakage {
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
        if entities.is_empty() {
            return Ok(result);
        }
        let report = client
            .impression_report(DateRange::lookback(ctx.now, LOOKBACK_DAYS))
            .await?;

        for io in entities.iter() {
            let record = settings.get_or_default(&io.id);
            let max = parse_bound(IMPRESSION_GEO_LEAKAGE, &record, MAX)?;
            let mut allowed = split_list(record.get(ALLOWED).map_or("", String::as_str));
            if allowed.is_empty() {
                allowed.clone_from(&io.geo_targets);
            }
            if allowed.is_empty() {
                continue;
            }

            let Some(outside) = report.percent_outside_geos(&io.id, &allowed) else {
                tracing::warn!("No impressions reported for insertion order {}, skipping", io.id);
                continue;
            };
            let anomalous = max.is_some_and(|m| outside > m);
            result.insert(
                io.id.clone(),
                Value::new(format!("{:.1}%", outside * 100.0), anomalous)
                    .with_field("allowed_geos", allowed.join(", ")),
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::snapshot::{ImpressionRow, SnapshotDataSource};
    use chrono::{NaiveDate, TimeZone, Utc};
    use lm_settings::{SettingsRecord, DEFAULT_ID};

    fn row(id: &str, geo: &str, impressions: u64) -> ImpressionRow {
        ImpressionRow {
            insertion_order_id: id.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            geo: geo.to_string(),
            impressions,
        }
    }

    #[tokio::test]
    async fn leakage_over_max_is_anomalous() {
        let source = SnapshotDataSource::new()
            .with_entities(
                Granularity::InsertionOrder,
                vec![
                    Entity::new("io1").with_geo_targets(["United States"]),
                    Entity::new("io2"),
                    Entity::new("io3").with_geo_targets(["Canada"]),
                ],
            )
            .with_impressions(vec![
                row("io1", "United States", 95),
                row("io1", "Mexico", 5),
                row("io2", "Canada", 10),
            ]);
        let settings = SettingMap::from_pairs([(
            DEFAULT_ID,
            [(ALLOWED.to_string(), String::new()), (MAX.to_string(), "0.01".to_string())]
                .into_iter()
                .collect::<SettingsRecord>(),
        )]);
        let ctx = RunContext::new(Utc.with_ymd_and_hms(2024, 3, 8, 0, 0, 0).unwrap());
        let result = ImpressionGeoLeakage.evaluate(&source, &ctx, &settings).await.unwrap();

        let io1 = result.get("io1").unwrap();
        assert_eq!(io1.value, "5.0%");
        assert!(io1.anomalous);
        // no allowed list anywhere
        assert!(result.get("io2").is_none());
        // no impressions in the window
        assert!(result.get("io3").is_none());
    }
}
