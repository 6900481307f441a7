//! Common types used throughout inflight-pager
//!
//! The two data shapes the coordinator publishes: the accumulated
//! [`PagedResult`] and the [`PageState`] lifecycle snapshot.

use serde::{Deserialize, Serialize};

// ============================================================================
// Paged Result
// ============================================================================

/// A page of results, or the accumulation of several pages.
///
/// Fetchers return one of these per page; the coordinator merges them into a
/// single container whose `page` is the highest page merged so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    /// Total entity count declared by the source.
    ///
    /// Only authoritative once the coordinator has seen the last page, at
    /// which point it is rewritten to the number of entities actually held.
    #[serde(default)]
    pub total: Option<u64>,

    /// Page number (1-based) of the latest merged page
    #[serde(default)]
    pub page: Option<u32>,

    /// Entities in page order
    #[serde(default = "Vec::new")]
    pub entities: Vec<T>,
}

impl<T> PagedResult<T> {
    /// Create an empty container with nothing loaded
    pub fn new() -> Self {
        Self {
            total: None,
            page: None,
            entities: Vec::new(),
        }
    }

    /// Create a single page as returned by a fetcher
    pub fn page(total: u64, page: u32, entities: Vec<T>) -> Self {
        Self {
            total: Some(total),
            page: Some(page),
            entities,
        }
    }

    /// Number of entities held
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if no entities are held
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<T> Default for PagedResult<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Page State
// ============================================================================

/// Lifecycle flags of a coordinator.
///
/// The flags are independent: `errored` and `has_more_pages` may both be set,
/// since a failed page does not end pagination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageState {
    /// At least one page has been received for the current results.
    ///
    /// Set even when the page held zero entities, so empty data can be told
    /// apart from "nothing loaded yet".
    pub data_loaded: bool,

    /// A request has been issued and not yet resolved or cancelled
    pub in_flight: bool,

    /// The last request failed; reset when a new request is issued
    pub errored: bool,

    /// The data source is being switched and the first page has not arrived.
    ///
    /// Consumers can use this to mark the displayed data as stale.
    pub switch_in_progress: bool,

    /// The source may have more pages to give
    pub has_more_pages: bool,
}

impl PageState {
    /// Create the initial state (all flags cleared)
    pub fn new() -> Self {
        Self::default()
    }
}
