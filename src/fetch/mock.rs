//! In-process mock page source
//!
//! Generates numbered entities after a configurable delay. Used by the
//! `demo` command and throughout the test suite.

use super::types::PageFetcher;
use crate::error::{Error, Result};
use crate::types::PagedResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Entity produced by [`MockFetcher`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockEntity {
    /// `"<prefix> <n>"`, with `n` counting from 1 across pages
    pub name: String,
}

impl MockEntity {
    /// Create an entity with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

type FailurePredicate = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// Mock data source with a fixed number of entities
///
/// Entities on page `p` are numbered `(p - 1) * per_page + 1` up to
/// `p * per_page`, capped at the total. Clones share their counters.
#[derive(Clone)]
pub struct MockFetcher {
    total_results: u64,
    prefix: String,
    delay: Duration,
    total_inflation: u64,
    fail_when: Option<FailurePredicate>,
    attempts: Arc<AtomicUsize>,
    deliveries: Arc<AtomicUsize>,
}

impl MockFetcher {
    /// Create a mock source of `total_results` entities named `"<prefix> <n>"`
    pub fn new(total_results: u64, prefix: impl Into<String>, delay: Duration) -> Self {
        Self {
            total_results,
            prefix: prefix.into(),
            delay,
            total_inflation: 0,
            fail_when: None,
            attempts: Arc::new(AtomicUsize::new(0)),
            deliveries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail an attempt when the predicate returns true.
    ///
    /// The predicate receives the 1-based attempt number across all pages.
    #[must_use]
    pub fn with_failure<F>(mut self, predicate: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Arc::new(predicate));
        self
    }

    /// Over-report the total by `extra`, like a backend with a stale count
    #[must_use]
    pub fn with_total_inflation(mut self, extra: u64) -> Self {
        self.total_inflation = extra;
        self
    }

    /// Number of fetches that started
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of pages actually handed back (cancelled fetches never count)
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::SeqCst)
    }

    /// Build page `page` without any delay
    pub fn generate(&self, page: u32, per_page: u32) -> PagedResult<MockEntity> {
        let first = u64::from(page.saturating_sub(1)) * u64::from(per_page) + 1;
        let last = (first + u64::from(per_page)).min(self.total_results + 1);

        let entities = (first..last)
            .map(|n| MockEntity::new(format!("{} {n}", self.prefix)))
            .collect();

        PagedResult::page(self.total_results + self.total_inflation, page, entities)
    }
}

#[async_trait]
impl PageFetcher<MockEntity> for MockFetcher {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<PagedResult<MockEntity>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_when.as_ref().is_some_and(|fail| fail(attempt)) {
            return Err(Error::fetch("Unable to connect"));
        }

        let result = self.generate(page, per_page);
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }
}

impl fmt::Debug for MockFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockFetcher")
            .field("total_results", &self.total_results)
            .field("prefix", &self.prefix)
            .field("delay", &self.delay)
            .field("total_inflation", &self.total_inflation)
            .field("attempts", &self.attempts())
            .field("deliveries", &self.deliveries())
            .finish_non_exhaustive()
    }
}
