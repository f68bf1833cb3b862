//! Data source seam and memoizing client
//!
//! Rules pull entities and reports through [`DataSource`]. Within one run the
//! same entity list or report is requested by several rules, so
//! [`CachedClient`] memoizes them; rules run sequentially, which keeps the
//! check-then-insert in the cache free of duplicate fetches.

use crate::entity::{DateRange, Entity};
use crate::error::RuleError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lm_settings::Granularity;
use moka::future::Cache;
use std::sync::Arc;

/// Spend lookups over a fetched budget report
pub trait BudgetReport: Send + Sync {
    /// Spend of an insertion order between `start` and `end`
    ///
    /// `None` when the report has no spend for that insertion order.
    fn spend_for_insertion_order(
        &self,
        id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<f64>;
}

/// Geo lookups over a fetched impression report
pub trait ImpressionReport: Send + Sync {
    /// Share of impressions (`0..=1`) served outside `allowed_geos`
    ///
    /// `None` when the report has no impressions for that entity.
    fn percent_outside_geos(&self, id: &str, allowed_geos: &[String]) -> Option<f64>;
}

/// External ad-platform data
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Entities of one granularity within a scope (advertiser ID; blank for all)
    async fn list_entities(
        &self,
        granularity: Granularity,
        scope_id: &str,
    ) -> Result<Arc<Vec<Entity>>, RuleError>;

    /// Spend report covering `range`
    async fn budget_report(&self, range: DateRange) -> Result<Arc<dyn BudgetReport>, RuleError>;

    /// Impression report covering `range`
    async fn impression_report(
        &self,
        range: DateRange,
    ) -> Result<Arc<dyn ImpressionReport>, RuleError>;
}

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Memoized entity lists
    pub entity_lists: u64,
    /// Memoized budget reports
    pub budget_reports: u64,
    /// Memoized impression reports
    pub impression_reports: u64,
}

/// Memoizing wrapper around any [`DataSource`]
pub struct CachedClient<D> {
    inner: D,
    entities: Cache<(Granularity, String), Arc<Vec<Entity>>>,
    budgets: Cache<DateRange, Arc<dyn BudgetReport>>,
    impressions: Cache<DateRange, Arc<dyn ImpressionReport>>,
}

impl<D: DataSource> CachedClient<D> {
    /// Default number of memoized entries per kind
    pub const DEFAULT_CAPACITY: u64 = 64;

    /// Wrap a data source
    #[must_use]
    pub fn new(inner: D) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY)
    }

    /// Wrap a data source with a custom cache capacity
    #[must_use]
    pub fn with_capacity(inner: D, capacity: u64) -> Self {
        Self {
            inner,
            entities: Cache::new(capacity),
            budgets: Cache::new(capacity),
            impressions: Cache::new(capacity),
        }
    }

    /// Wrapped data source
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &D {
        &self.inner
    }

    /// Current cache sizes
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entity_lists: self.entities.entry_count(),
            budget_reports: self.budgets.entry_count(),
            impression_reports: self.impressions.entry_count(),
        }
    }
}

#[async_trait]
impl<D: DataSource> DataSource for CachedClient<D> {
    async fn list_entities(
        &self,
        granularity: Granularity,
        scope_id: &str,
    ) -> Result<Arc<Vec<Entity>>, RuleError> {
        let key = (granularity, scope_id.to_string());
        if let Some(cached) = self.entities.get(&key).await {
            return Ok(cached);
        }
        let fetched = self.inner.list_entities(granularity, scope_id).await?;
        tracing::debug!("Fetched {} {} entities", fetched.len(), granularity);
        self.entities.insert(key, Arc::clone(&fetched)).await;
        Ok(fetched)
    }

    async fn budget_report(&self, range: DateRange) -> Result<Arc<dyn BudgetReport>, RuleError> {
        if let Some(cached) = self.budgets.get(&range).await {
            return Ok(cached);
        }
        let fetched = self.inner.budget_report(range).await?;
        self.budgets.insert(range, Arc::clone(&fetched)).await;
        Ok(fetched)
    }

    async fn impression_report(
        &self,
        range: DateRange,
    ) -> Result<Arc<dyn ImpressionReport>, RuleError> {
        if let Some(cached) = self.impressions.get(&range).await {
            return Ok(cached);
        }
        let fetched = self.inner.impression_report(range).await?;
        self.impressions.insert(range, Arc::clone(&fetched)).await;
        Ok(fetched)
    }
}

impl<D> std::fmt::Debug for CachedClient<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedClient")
            .field("entity_lists", &self.entities.entry_count())
            .field("budget_reports", &self.budgets.entry_count())
            .field("impression_reports", &self.impressions.entry_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        lists: AtomicUsize,
        budgets: AtomicUsize,
    }

    struct NoSpend;

    impl BudgetReport for NoSpend {
        fn spend_for_insertion_order(
            &self,
            _id: &str,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Option<f64> {
            None
        }
    }

    #[async_trait]
    impl DataSource for Counting {
        async fn list_entities(
            &self,
            _granularity: Granularity,
            _scope_id: &str,
        ) -> Result<Arc<Vec<Entity>>, RuleError> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(vec![Entity::new("c1")]))
        }

        async fn budget_report(
            &self,
            _range: DateRange,
        ) -> Result<Arc<dyn BudgetReport>, RuleError> {
            self.budgets.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NoSpend))
        }

        async fn impression_report(
            &self,
            _range: DateRange,
        ) -> Result<Arc<dyn ImpressionReport>, RuleError> {
            Err(RuleError::DataSource("unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn entity_lists_are_memoized_per_granularity_and_scope() {
        let client = CachedClient::new(Counting::default());
        client.list_entities(Granularity::Campaign, "a1").await.unwrap();
        client.list_entities(Granularity::Campaign, "a1").await.unwrap();
        client.list_entities(Granularity::LineItem, "a1").await.unwrap();
        client.list_entities(Granularity::Campaign, "a2").await.unwrap();
        assert_eq!(client.inner().lists.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reports_are_memoized_per_range() {
        let client = CachedClient::new(Counting::default());
        let now = Utc::now();
        let range = DateRange::lookback(now, 7);
        client.budget_report(range).await.unwrap();
        client.budget_report(range).await.unwrap();
        client.budget_report(DateRange::lookback(now, 1)).await.unwrap();
        assert_eq!(client.inner().budgets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let client = CachedClient::new(Counting::default());
        let range = DateRange::lookback(Utc::now(), 7);
        let err = client.impression_report(range).await.err().unwrap();
        assert!(err.is_retryable());
        assert_eq!(client.stats().impression_reports, 0);
    }
}
