//! Fetcher trait
//!
//! Defines the page-fetch capability the coordinator drives.

use crate::error::Result;
use crate::types::PagedResult;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Core trait for page sources
///
/// Implementations must return a page whose `page` field equals the requested
/// page number; the coordinator rejects anything else.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    /// Fetch page `page` (1-based) holding at most `per_page` entities
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<PagedResult<T>>;
}

/// Fetcher shared between the coordinator and its in-flight request
pub type SharedFetcher<T> = Arc<dyn PageFetcher<T>>;

#[async_trait]
impl<T, F, Fut> PageFetcher<T> for F
where
    T: Send + 'static,
    F: Fn(u32, u32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PagedResult<T>>> + Send + 'static,
{
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<PagedResult<T>> {
        (self)(page, per_page).await
    }
}
