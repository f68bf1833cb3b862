//! Entities fetched from the ad platform

use crate::error::RuleError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Campaign, insertion order or line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity ID, unique within its granularity
    pub id: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Parent entity (campaign for an insertion order, and so on)
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Owning advertiser ID
    #[serde(default)]
    pub advertiser_id: Option<String>,
    /// Owning advertiser name
    #[serde(default)]
    pub advertiser_name: Option<String>,
    /// Flight dates
    #[serde(default)]
    pub flight: Option<Flight>,
    /// Total budget over the flight
    #[serde(default)]
    pub budget: Option<f64>,
    /// Targeted geographies
    #[serde(default)]
    pub geo_targets: Vec<String>,
}

impl Entity {
    /// Create entity with only an ID
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            parent_id: None,
            advertiser_id: None,
            advertiser_name: None,
            flight: None,
            budget: None,
            geo_targets: Vec::new(),
        }
    }

    /// With display name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// With parent entity
    #[inline]
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// With advertiser
    #[inline]
    #[must_use]
    pub fn with_advertiser(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.advertiser_id = Some(id.into());
        self.advertiser_name = Some(name.into());
        self
    }

    /// With flight dates
    #[inline]
    #[must_use]
    pub fn with_flight(mut self, flight: Flight) -> Self {
        self.flight = Some(flight);
        self
    }

    /// With budget
    #[inline]
    #[must_use]
    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    /// With targeted geographies
    #[must_use]
    pub fn with_geo_targets<I, S>(mut self, geos: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.geo_targets = geos.into_iter().map(Into::into).collect();
        self
    }

    /// Display name, or an error for rules that cannot do without it
    pub fn require_display_name(&self) -> Result<&str, RuleError> {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RuleError::missing_field(&self.id, "display_name"))
    }

    /// Identity block written to the settings grid
    #[must_use]
    pub fn identity_row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.display_name.clone().unwrap_or_default(),
            self.advertiser_id.clone().unwrap_or_default(),
            self.advertiser_name.clone().unwrap_or_default(),
        ]
    }
}

/// Flight dates of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flight {
    /// Flight start
    pub start: DateTime<Utc>,
    /// Flight end
    pub end: DateTime<Utc>,
}

impl Flight {
    /// Create flight
    #[inline]
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Check if `now` falls within the flight, bounds included
    #[inline]
    #[must_use]
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }

    /// Share of the flight elapsed at `now`, clamped to `[0, 1]`
    #[must_use]
    pub fn elapsed_fraction(&self, now: DateTime<Utc>) -> f64 {
        let total = (self.end - self.start).num_milliseconds();
        if total <= 0 {
            return 1.0;
        }
        let elapsed = (now - self.start).num_milliseconds();
        (elapsed as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// Whole days in the flight, at least one
    #[must_use]
    pub fn days(&self) -> i64 {
        let millis = (self.end - self.start).num_milliseconds();
        let day = Duration::days(1).num_milliseconds();
        ((millis + day - 1) / day).max(1)
    }

    /// Date range spanning the flight
    #[inline]
    #[must_use]
    pub fn range(&self) -> DateRange {
        DateRange::new(self.start, self.end)
    }
}

/// Report window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    /// Window start
    pub start: DateTime<Utc>,
    /// Window end
    pub end: DateTime<Utc>,
}

impl DateRange {
    /// Create range
    #[inline]
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Range of `days` ending at `end`
    #[inline]
    #[must_use]
    pub fn lookback(end: DateTime<Utc>, days: i64) -> Self {
        Self::new(end - Duration::days(days), end)
    }

    /// Check if `at` falls within the range, bounds included
    #[inline]
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}
