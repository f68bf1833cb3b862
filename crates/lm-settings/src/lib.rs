//! Launch Monitor rule settings
//!
//! A spreadsheet stores every rule's thresholds in one flat grid. This crate
//! turns that grid into per-rule [`Section`]s aligned by a shared
//! [`RowIndex`], reconciles a section against a rule's current parameter
//! schema, and turns everything back into a grid.
//!
//! # Grid layout
//!
//! | row | contents |
//! |-----|----------|
//! | 0 | section header: rule name over its first column, blank elsewhere |
//! | 1 | helper text |
//! | 2 | column labels (`ID`, `Name`, ..., then each rule's parameter labels) |
//! | 3 | the `default` row |
//! | 4+ | one row per entity, column 0 = entity ID |
//!
//! # Example
//!
//! ```rust,ignore
//! use lm_settings::RuleRange;
//!
//! let mut range = RuleRange::from_grid(&persisted);
//! range.apply_rule_values(layout, &live_entities);
//! let grid = range.recompose(None);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod granularity;
mod params;
mod range;
mod reconcile;
mod section;
mod setting_map;

pub use error::SettingsError;
pub use granularity::Granularity;
pub use params::{is_geo_list, is_number, is_percent, InvalidValue, ParamDef, RuleParams, Validator};
pub use range::{Grid, RuleRange};
pub use reconcile::{LiveEntity, ReconcileSummary, RuleLayout};
pub use section::{
    is_reserved_name, RowIndex, Section, IDENTITY_LABELS, ID_ROW, NONE_SECTION, RESERVED_NAMES,
};
pub use setting_map::{SettingMap, SettingsRecord, DEFAULT_ID};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
