//! Launch Monitor rules
//!
//! Rules are plain [`RuleDefinition`] values built at startup and handed to a
//! [`RuleHarness`]. Each rule evaluates one entity collection through the
//! [`DataSource`] seam and returns an [`ExecutorResult`] keyed by entity ID.
//!
//! # Example
//!
//! ```rust,ignore
//! use lm_rules::prelude::*;
//!
//! let client = Arc::new(CachedClient::new(SnapshotDataSource::from_json(&json)?));
//! let harness = RuleHarness::new(client, builtin::default_rules())?;
//!
//! harness.fill_rule_values(&mut range, &ctx).await?;
//! let output = harness.validate(&range, &RuleToggles::all_enabled(), &ctx).await?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod aggregate;
pub mod builtin;
pub mod client;
pub mod entity;
pub mod error;
pub mod harness;
pub mod reconcile;
pub mod rule;
pub mod snapshot;

pub use aggregate::{EntityStatus, ValidationOutput};
pub use client::{BudgetReport, CacheStats, CachedClient, DataSource, ImpressionReport};
pub use entity::{DateRange, Entity, Flight};
pub use error::RuleError;
pub use harness::{RuleHarness, RuleToggles};
pub use reconcile::fill_rule_values;
pub use rule::{ExecutorResult, RuleDefinition, RuleEvaluator, RunContext, Value};
pub use snapshot::{ImpressionRow, Snapshot, SnapshotDataSource, SpendRow};

/// Common imports
pub mod prelude {
    pub use crate::builtin;
    pub use crate::{
        CachedClient, DataSource, Entity, ExecutorResult, RuleDefinition, RuleError,
        RuleEvaluator, RuleHarness, RuleToggles, RunContext, SnapshotDataSource,
        ValidationOutput, Value,
    };
    pub use lm_settings::{Granularity, ParamDef, RuleRange, SettingMap};
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
