//! Built-in launch monitor rules

mod daily_budget;
mod geo_leakage;
mod geo_targeting;
mod pacing;

pub use daily_budget::{daily_budget, DailyBudget, DAILY_BUDGET};
pub use geo_leakage::{impression_geo_leakage, ImpressionGeoLeakage, IMPRESSION_GEO_LEAKAGE};
pub use geo_targeting::{geo_targeting, GeoTargeting, GEO_TARGETING};
pub use pacing::{budget_pacing, BudgetPacing, BUDGET_PACING};

use crate::rule::RuleDefinition;

/// Every built-in rule, in evaluation order
#[must_use]
pub fn default_rules() -> Vec<RuleDefinition> {
    vec![
        budget_pacing(),
        daily_budget(),
        geo_targeting(),
        impression_geo_leakage(),
    ]
}
