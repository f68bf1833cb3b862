//! Rule parameter reconciliation
//!
//! Rewrites one rule's section against its current parameter schema and the
//! live entity list, carrying stored values forward by label.

use crate::granularity::Granularity;
use crate::params::{InvalidValue, RuleParams};
use crate::range::RuleRange;
use crate::section::{is_reserved_name, RowIndex, Section, IDENTITY_LABELS, ID_ROW, NONE_SECTION};
use crate::setting_map::{SettingMap, DEFAULT_ID};
use std::collections::HashSet;

/// What the reconciler needs to know about a rule
#[derive(Debug, Clone, Copy)]
pub struct RuleLayout<'a> {
    /// Rule name, also the section name
    pub name: &'a str,
    /// Entity collection the rule applies to
    pub granularity: Granularity,
    /// Helper text written above the rule's first column
    pub helper: &'a str,
    /// Current parameter schema
    pub params: &'a RuleParams,
}

/// An entity returned by the live fetch, with its identity block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveEntity {
    /// Entity ID
    pub id: String,
    /// Identity cells: ID, display name, advertiser metadata
    pub identity: Vec<String>,
}

/// Outcome of reconciling one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Rule name
    pub rule: String,
    /// Live entities that had no stored row
    pub added_entities: Vec<String>,
    /// Stored entities missing from the live fetch (kept, not refreshed)
    pub stale_entities: Vec<String>,
    /// Labels new to this rule's section
    pub added_labels: Vec<String>,
    /// Stored labels no longer in the schema
    pub dropped_labels: Vec<String>,
    /// Stored values failing their validator
    pub invalid_values: Vec<InvalidValue>,
}

impl RuleRange {
    /// Reconcile one rule's section
    ///
    /// - The `default` row keeps its stored non-blank values and takes the
    ///   schema default for anything else.
    /// - Live entities keep their stored values by label; new cells are blank
    ///   so they defer to the `default` row at evaluation time.
    /// - Entities missing from `live` keep their row and stored values but
    ///   their identity block is not refreshed.
    /// - Column order is established on the first call (persisted order
    ///   first, then schema order) and reused afterwards.
    /// - Live entities keyed `ID` or `default` are ignored.
    ///
    /// A layout with a reserved name (`none`, `ID`, `default` or blank) is
    /// left unapplied and yields an empty summary.
    pub fn apply_rule_values(
        &mut self,
        layout: &RuleLayout<'_>,
        live: &[LiveEntity],
    ) -> ReconcileSummary {
        if is_reserved_name(layout.name) {
            tracing::warn!("Refusing to reconcile rule with reserved name {:?}", layout.name);
            return ReconcileSummary {
                rule: layout.name.to_string(),
                ..ReconcileSummary::default()
            };
        }
        let stored = self.label_settings(layout.name);
        let persisted_labels: Vec<String> = self
            .section(layout.name)
            .and_then(Section::labels)
            .map(|labels| labels.iter().filter(|l| !l.is_empty()).cloned().collect())
            .unwrap_or_default();
        let labels = self.resolve_column_order(layout.name, layout.params, &persisted_labels);

        let mut summary = ReconcileSummary {
            rule: layout.name.to_string(),
            added_labels: labels
                .iter()
                .filter(|l| !persisted_labels.contains(l))
                .cloned()
                .collect(),
            dropped_labels: persisted_labels
                .iter()
                .filter(|l| !labels.contains(l))
                .cloned()
                .collect(),
            ..ReconcileSummary::default()
        };

        let mut section = Section::new(layout.name, labels.len());
        section.set_helper(vec![layout.helper.to_string()]);
        section.set_row(ID_ROW, labels.clone());
        section.set_row(DEFAULT_ID, default_row(&labels, layout.params, &stored));

        let mut live_ids = HashSet::new();
        for entity in live.iter().filter(|e| is_entity_id(&e.id)) {
            if !stored.contains(&entity.id) {
                summary.added_entities.push(entity.id.clone());
            }
            section.set_row(entity.id.as_str(), carried_row(&labels, &stored, &entity.id));
            self.row_index.ensure(&entity.id);
            live_ids.insert(entity.id.as_str());
        }

        for id in stored.ids().filter(|id| !RowIndex::is_fixed(id) && !live_ids.contains(id)) {
            section.set_row(id, carried_row(&labels, &stored, id));
            summary.stale_entities.push(id.to_string());
        }

        self.update_identity(live);
        self.sections.insert(layout.name.to_string(), section);
        self.register_granularity(layout.name, layout.granularity);

        summary.invalid_values = layout.params.invalid_values(&self.label_settings(layout.name));
        for invalid in &summary.invalid_values {
            tracing::warn!(
                "Rule '{}': value {:?} for '{}' on {} fails validation",
                layout.name,
                invalid.value,
                invalid.label,
                invalid.entity_id
            );
        }
        tracing::debug!(
            "Reconciled '{}': {} new, {} stale, {} columns",
            layout.name,
            summary.added_entities.len(),
            summary.stale_entities.len(),
            labels.len()
        );
        summary
    }

    fn resolve_column_order(
        &mut self,
        rule: &str,
        params: &RuleParams,
        persisted: &[String],
    ) -> Vec<String> {
        let seed = self
            .column_orders
            .get(rule)
            .cloned()
            .unwrap_or_else(|| persisted.to_vec());

        let mut order: Vec<String> = Vec::with_capacity(params.len());
        for label in seed {
            if params.by_label(&label).is_some() && !order.contains(&label) {
                order.push(label);
            }
        }
        for label in params.labels() {
            if !order.iter().any(|l| l == label) {
                order.push(label.to_string());
            }
        }

        self.column_orders.insert(rule.to_string(), order.clone());
        order
    }

    fn update_identity(&mut self, live: &[LiveEntity]) {
        if !self.sections.contains_key(NONE_SECTION) {
            self.sections
                .shift_insert(0, NONE_SECTION.to_string(), Section::identity());
        }
        let Some(identity) = self.sections.get_mut(NONE_SECTION) else {
            return;
        };

        let width = live
            .iter()
            .map(|e| e.identity.len())
            .max()
            .unwrap_or(0)
            .max(IDENTITY_LABELS.len());
        identity.widen(width);

        let labels: Vec<String> = (0..identity.width())
            .map(|col| {
                identity
                    .labels()
                    .and_then(|row| row.get(col))
                    .filter(|label| !label.is_empty())
                    .cloned()
                    .or_else(|| IDENTITY_LABELS.get(col).map(ToString::to_string))
                    .unwrap_or_default()
            })
            .collect();
        identity.set_row(ID_ROW, labels);
        if !identity.contains(DEFAULT_ID) {
            identity.set_row(DEFAULT_ID, vec![DEFAULT_ID.to_string()]);
        }

        for entity in live.iter().filter(|e| is_entity_id(&e.id)) {
            identity.set_row(entity.id.as_str(), entity.identity.clone());
        }
    }
}

fn is_entity_id(id: &str) -> bool {
    !id.trim().is_empty() && !RowIndex::is_fixed(id)
}

fn default_row(labels: &[String], params: &RuleParams, stored: &SettingMap) -> Vec<String> {
    let stored_default = stored.get(DEFAULT_ID);
    labels
        .iter()
        .map(|label| {
            stored_default
                .and_then(|record| record.get(label))
                .filter(|value| !value.is_empty())
                .cloned()
                .or_else(|| params.by_label(label).and_then(|p| p.default_value.clone()))
                .unwrap_or_default()
        })
        .collect()
}

fn carried_row(labels: &[String], stored: &SettingMap, id: &str) -> Vec<String> {
    let record = stored.get(id);
    labels
        .iter()
        .map(|label| {
            record
                .and_then(|r| r.get(label))
                .cloned()
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{is_percent, ParamDef};
    use crate::range::Grid;
    use pretty_assertions::assert_eq;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    fn live(ids: &[&str]) -> Vec<LiveEntity> {
        ids.iter()
            .map(|id| LiveEntity {
                id: (*id).to_string(),
                identity: vec![
                    (*id).to_string(),
                    format!("Name {id}"),
                    "adv1".to_string(),
                    "Advertiser".to_string(),
                ],
            })
            .collect()
    }

    fn geo_params(key: &str, label: &str) -> RuleParams {
        RuleParams::new().with(ParamDef::new(key, label).with_default("United States"))
    }

    fn layout<'a>(params: &'a RuleParams) -> RuleLayout<'a> {
        RuleLayout {
            name: "Geo",
            granularity: crate::Granularity::Campaign,
            helper: "Allowed geos",
            params,
        }
    }

    fn persisted() -> Grid {
        grid(&[
            &["", "", "", "", "Geo"],
            &["", "", "", "", "Allowed geos"],
            &["ID", "Name", "Advertiser ID", "Advertiser Name", "Geo Targets"],
            &["default", "", "", "", ""],
            &["c1", "Name c1", "adv1", "Advertiser", "United States"],
        ])
    }

    fn reconciled() -> Grid {
        grid(&[
            &["", "", "", "", "Geo"],
            &["", "", "", "", "Allowed geos"],
            &["ID", "Name", "Advertiser ID", "Advertiser Name", "Geo Targets"],
            &["default", "", "", "", "United States"],
            &["c1", "Name c1", "adv1", "Advertiser", "United States"],
        ])
    }

    #[test]
    fn fresh_range_gets_identity_and_defaults() {
        let params = geo_params("geo", "Geo Targets");
        let mut range = RuleRange::new();
        let summary = range.apply_rule_values(&layout(&params), &live(&["c1"]));
        assert_eq!(summary.added_entities, vec!["c1"]);

        let out = range.recompose(None);
        assert_eq!(
            out,
            grid(&[
                &["", "", "", "", "Geo"],
                &["", "", "", "", "Allowed geos"],
                &["ID", "Name", "Advertiser ID", "Advertiser Name", "Geo Targets"],
                &["default", "", "", "", "United States"],
                &["c1", "Name c1", "adv1", "Advertiser", ""],
            ])
        );
    }

    #[test]
    fn new_entity_appended_existing_unchanged() {
        let params = geo_params("geo", "Geo Targets");
        let mut range = RuleRange::from_grid(&persisted());
        let summary = range.apply_rule_values(&layout(&params), &live(&["c1", "c2"]));
        assert_eq!(summary.added_entities, vec!["c2"]);

        let out = range.recompose(None);
        assert_eq!(out[4], vec!["c1", "Name c1", "adv1", "Advertiser", "United States"]);
        assert_eq!(out[5], vec!["c2", "Name c2", "adv1", "Advertiser", ""]);
    }

    #[test]
    fn key_rename_keeps_values() {
        let mut range = RuleRange::from_grid(&persisted());
        let first = geo_params("geo", "Geo Targets");
        range.apply_rule_values(&layout(&first), &live(&["c1"]));
        let renamed = geo_params("allowed_geos", "Geo Targets");
        range.apply_rule_values(&layout(&renamed), &live(&["c1"]));

        assert_eq!(range.recompose(None), reconciled());
        let settings = range.rule_settings("Geo", &renamed);
        assert_eq!(settings.get_or_default("c1")["allowed_geos"], "United States");
    }

    #[test]
    fn label_rename_resets_column() {
        let mut range = RuleRange::from_grid(&persisted());
        let relabeled = geo_params("geo", "Allowed Geos");
        let summary = range.apply_rule_values(&layout(&relabeled), &live(&["c1"]));
        assert_eq!(summary.dropped_labels, vec!["Geo Targets"]);
        assert_eq!(summary.added_labels, vec!["Allowed Geos"]);

        assert_eq!(
            range.recompose(None),
            grid(&[
                &["", "", "", "", "Geo"],
                &["", "", "", "", "Allowed geos"],
                &["ID", "Name", "Advertiser ID", "Advertiser Name", "Allowed Geos"],
                &["default", "", "", "", "United States"],
                &["c1", "Name c1", "adv1", "Advertiser", ""],
            ])
        );
    }

    #[test]
    fn reserved_rule_names_leave_grid_untouched() {
        let params = geo_params("geo", "Geo Targets");
        for name in ["none", "ID", "default", ""] {
            let mut range = RuleRange::from_grid(&persisted());
            let reserved = RuleLayout {
                name,
                ..layout(&params)
            };
            let summary = range.apply_rule_values(&reserved, &live(&["c1", "c2"]));
            assert!(summary.added_entities.is_empty());
            assert_eq!(range.recompose(None), persisted());
        }
    }

    #[test]
    fn live_entities_with_fixed_ids_are_ignored() {
        let params = geo_params("geo", "Geo Targets");
        let mut range = RuleRange::from_grid(&persisted());
        let summary = range.apply_rule_values(&layout(&params), &live(&["ID", "default", "c1"]));
        assert!(summary.added_entities.is_empty());
        assert_eq!(range.recompose(None), reconciled());
    }

    #[test]
    fn stale_entities_keep_their_rows() {
        let params = geo_params("geo", "Geo Targets");
        let mut range = RuleRange::from_grid(&persisted());
        let summary = range.apply_rule_values(&layout(&params), &live(&["c2"]));
        assert_eq!(summary.stale_entities, vec!["c1"]);

        let out = range.recompose(None);
        assert_eq!(out[4], vec!["c1", "Name c1", "adv1", "Advertiser", "United States"]);
        assert_eq!(out[5][0], "c2");
    }

    #[test]
    fn column_order_is_stable_across_schema_reorders() {
        let mut range = RuleRange::new();
        let ab = RuleParams::new()
            .with(ParamDef::new("a", "A"))
            .with(ParamDef::new("b", "B"));
        range.apply_rule_values(&layout(&ab), &live(&["c1"]));
        let bac = RuleParams::new()
            .with(ParamDef::new("b", "B"))
            .with(ParamDef::new("c", "C"))
            .with(ParamDef::new("a", "A"));
        range.apply_rule_values(&layout(&bac), &live(&["c1"]));
        assert_eq!(range.column_order("Geo").unwrap(), ["A", "B", "C"]);
        assert_eq!(range.section("Geo").unwrap().labels().unwrap(), ["A", "B", "C"]);
    }

    #[test]
    fn persisted_column_order_seeds_cache() {
        let rows = grid(&[
            &["", "Pace", ""],
            &["", "", ""],
            &["ID", "Max", "Min"],
            &["default", "0.9", ""],
        ]);
        let mut range = RuleRange::from_grid(&rows);
        let params = RuleParams::new()
            .with(ParamDef::new("min", "Min").with_default("0"))
            .with(ParamDef::new("max", "Max").with_default("0.5"));
        let pace = RuleLayout {
            name: "Pace",
            granularity: crate::Granularity::InsertionOrder,
            helper: "",
            params: &params,
        };
        range.apply_rule_values(&pace, &[]);
        let section = range.section("Pace").unwrap();
        assert_eq!(section.labels().unwrap(), ["Max", "Min"]);
        assert_eq!(section.row("default").unwrap(), ["0.9", "0"]);
    }

    #[test]
    fn invalid_values_are_reported() {
        let rows = grid(&[
            &["", "Pace"],
            &["", ""],
            &["ID", "Max"],
            &["default", "7"],
        ]);
        let mut range = RuleRange::from_grid(&rows);
        let params =
            RuleParams::new().with(ParamDef::new("max", "Max").with_validator(is_percent));
        let pace = RuleLayout {
            name: "Pace",
            granularity: crate::Granularity::InsertionOrder,
            helper: "",
            params: &params,
        };
        let summary = range.apply_rule_values(&pace, &[]);
        assert_eq!(summary.invalid_values.len(), 1);
        assert_eq!(summary.invalid_values[0].value, "7");
    }

    #[test]
    fn narrow_identity_section_is_widened() {
        let rows = grid(&[&["", ""], &["", ""], &["ID", "Name"], &["default", ""]]);
        let mut range = RuleRange::from_grid(&rows);
        let params = geo_params("geo", "Geo Targets");
        range.apply_rule_values(&layout(&params), &live(&["c1"]));
        let identity = range.identity().unwrap();
        assert_eq!(identity.width(), 4);
        assert_eq!(
            identity.labels().unwrap(),
            ["ID", "Name", "Advertiser ID", "Advertiser Name"]
        );
    }
}
