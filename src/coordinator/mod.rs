//! Request coordinator module
//!
//! Walks a paged source one request at a time and publishes what it has.
//!
//! # Overview
//!
//! The coordinator module provides:
//! - `RequestCoordinator` - owns the accumulated results and lifecycle flags
//! - `InflightSlot` - the single point where pending requests are cancelled
//!
//! A *lineage* is one `(per_page, fetcher)` pair set up by
//! [`RequestCoordinator::start`]. Every new request, in the same lineage or a
//! new one, cancels the pending one first; a cancelled request never touches
//! results, state or the error channel, even if its fetch already finished.

mod slot;

pub use slot::InflightSlot;

use crate::config::PagerConfig;
use crate::error::Error;
use crate::fetch::{PageFetcher, SharedFetcher};
use crate::types::{PageState, PagedResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

/// Default number of buffered error events per subscriber
pub const DEFAULT_ERROR_CAPACITY: usize = 16;

/// Coordinates page requests for one consumer.
///
/// Results and state are published on replay-latest channels
/// ([`subscribe_results`](Self::subscribe_results),
/// [`subscribe_state`](Self::subscribe_state)); failures are published as
/// events on [`subscribe_errors`](Self::subscribe_errors).
///
/// Requests run as tasks on the tokio runtime captured at construction.
/// Dropping the coordinator cancels the pending request.
pub struct RequestCoordinator<T> {
    shared: Arc<Shared<T>>,
    runtime: Handle,
}

/// State shared with in-flight request tasks
struct Shared<T> {
    inner: Mutex<Inner<T>>,
    state_tx: watch::Sender<PageState>,
    results_tx: watch::Sender<PagedResult<T>>,
    errors_tx: broadcast::Sender<Arc<Error>>,
}

struct Inner<T> {
    lineage: Option<Lineage<T>>,
    slot: InflightSlot,
}

struct Lineage<T> {
    current_page: u32,
    per_page: u32,
    fetcher: SharedFetcher<T>,
}

impl<T> RequestCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a coordinator on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new() -> Self {
        Self::with_error_capacity(DEFAULT_ERROR_CAPACITY)
    }

    /// Create a coordinator buffering `capacity` error events per subscriber
    pub fn with_error_capacity(capacity: usize) -> Self {
        Self::with_runtime(Handle::current(), capacity)
    }

    /// Create a coordinator from pager settings
    pub fn from_config(config: &PagerConfig) -> Self {
        Self::with_error_capacity(config.error_capacity)
    }

    /// Create a coordinator that spawns requests on `runtime`
    pub fn with_runtime(runtime: Handle, error_capacity: usize) -> Self {
        let (state_tx, _) = watch::channel(PageState::new());
        let (results_tx, _) = watch::channel(PagedResult::new());
        let (errors_tx, _) = broadcast::channel(error_capacity.max(1));

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    lineage: None,
                    slot: InflightSlot::new(),
                }),
                state_tx,
                results_tx,
                errors_tx,
            }),
            runtime,
        }
    }

    // ========================================================================
    // Lineage control
    // ========================================================================

    /// Switch to a new source and request its first page.
    ///
    /// With `clear_existing` the visible results are emptied right away;
    /// otherwise they stay until the first page of the new source replaces
    /// them. Nothing from the previous source is published after this returns.
    pub fn start<F>(&self, per_page: u32, clear_existing: bool, fetcher: F)
    where
        F: PageFetcher<T> + 'static,
    {
        self.start_shared(per_page, clear_existing, Arc::new(fetcher));
    }

    /// [`start`](Self::start) with an already shared fetcher
    pub fn start_shared(&self, per_page: u32, clear_existing: bool, fetcher: SharedFetcher<T>) {
        let per_page = if per_page == 0 {
            warn!("per_page must be positive, using 1");
            1
        } else {
            per_page
        };

        let mut inner = self.shared.lock();
        if inner.slot.cancel() {
            debug!("Cancelled pending request of previous lineage");
        }

        let mut state = self.shared.state();
        if clear_existing {
            self.shared.results_tx.send_replace(PagedResult::new());
            state.data_loaded = false;
        }

        inner.lineage = Some(Lineage {
            current_page: 0,
            per_page,
            fetcher,
        });
        state.has_more_pages = true;
        state.switch_in_progress = true;
        debug!(per_page, clear_existing, "Started new lineage");

        self.issue_next(&mut inner, &mut state);
        self.shared.state_tx.send_replace(state);
    }

    /// Request the page after the last one received.
    ///
    /// A pending request is cancelled and re-issued, so calling this in quick
    /// succession yields only the last request's outcome. After a failure this
    /// retries the page that failed.
    pub fn get_next_page(&self) {
        let mut inner = self.shared.lock();
        let mut state = self.shared.state();

        if inner.lineage.is_none() {
            warn!("get_next_page called before start, ignoring");
            return;
        }

        self.issue_next(&mut inner, &mut state);
        self.shared.state_tx.send_replace(state);
    }

    /// Empty the results and mark data as not loaded.
    ///
    /// A pending request is left running.
    pub fn clear_data(&self) {
        let _inner = self.shared.lock();
        self.shared.reset_results();
    }

    /// Cancel the pending request and stop paging, optionally clearing data.
    ///
    /// Call this when the consumer goes away.
    pub fn clear(&self, clear_data: bool) {
        let mut inner = self.shared.lock();
        if clear_data {
            self.shared.reset_results();
        }

        if inner.slot.cancel() {
            debug!("Cancelled pending request");
        }

        let mut state = self.shared.state();
        state.in_flight = false;
        state.has_more_pages = false;
        self.shared.state_tx.send_replace(state);
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Current lifecycle flags
    pub fn state(&self) -> PageState {
        self.shared.state()
    }

    /// Copy of the current results
    pub fn results(&self) -> PagedResult<T> {
        self.shared.results_tx.borrow().clone()
    }

    /// Read the current results without copying them.
    ///
    /// `f` must not call back into the coordinator.
    pub fn with_results<R>(&self, f: impl FnOnce(&PagedResult<T>) -> R) -> R {
        f(&self.shared.results_tx.borrow())
    }

    /// Replace the results wholesale and publish them.
    ///
    /// Lets the consumer push entity edits made elsewhere. Lifecycle flags are
    /// untouched, and later pages are appended to what was set here.
    pub fn set_results(&self, results: PagedResult<T>) {
        let _inner = self.shared.lock();
        self.shared.results_tx.send_replace(results);
    }

    /// Subscribe to lifecycle flags; the receiver starts at the current value
    pub fn subscribe_state(&self) -> watch::Receiver<PageState> {
        self.shared.state_tx.subscribe()
    }

    /// Subscribe to results; the receiver starts at the current value
    pub fn subscribe_results(&self) -> watch::Receiver<PagedResult<T>> {
        self.shared.results_tx.subscribe()
    }

    /// Subscribe to failures published from now on
    pub fn subscribe_errors(&self) -> broadcast::Receiver<Arc<Error>> {
        self.shared.errors_tx.subscribe()
    }

    /// Wait until no request is in flight and return the state at that point
    pub async fn settled(&self) -> PageState {
        let mut rx = self.subscribe_state();
        let state = match rx.wait_for(|state| !state.in_flight).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        state
    }

    // ========================================================================
    // Request issuing
    // ========================================================================

    /// Cancel whatever is pending and fetch `current_page + 1`.
    ///
    /// Caller holds the lock and publishes `state` afterwards.
    fn issue_next(&self, inner: &mut Inner<T>, state: &mut PageState) {
        let Inner { lineage, slot } = inner;
        let Some(lineage) = lineage.as_ref() else {
            return;
        };

        let page = lineage.current_page + 1;
        let per_page = lineage.per_page;
        let fetcher = Arc::clone(&lineage.fetcher);
        let shared = Arc::clone(&self.shared);

        if slot.is_pending() {
            debug!(page, "Re-issuing page, cancelling pending request");
        }
        slot.replace(|generation| {
            self.runtime
                .spawn(async move {
                    let outcome = fetcher.fetch_page(page, per_page).await;
                    shared.complete(generation, page, outcome);
                })
                .abort_handle()
        });

        state.errored = false;
        state.in_flight = true;
        debug!(page, per_page, "Requested page");
    }
}

impl<T> Default for RequestCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RequestCoordinator<T> {
    fn drop(&mut self) {
        self.shared.lock().slot.cancel();
    }
}

impl<T> std::fmt::Debug for RequestCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator")
            .field("state", &self.shared.state())
            .finish_non_exhaustive()
    }
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self) -> PageState {
        *self.state_tx.borrow()
    }

    fn reset_results(&self) {
        self.results_tx.send_replace(PagedResult::new());
        let mut state = self.state();
        state.data_loaded = false;
        self.state_tx.send_replace(state);
    }

    fn emit_error(&self, error: Error) {
        if self.errors_tx.send(Arc::new(error)).is_err() {
            debug!("No error subscribers");
        }
    }

    /// Apply the outcome of request `generation` for `page`, unless it was
    /// superseded while it ran.
    fn complete(&self, generation: u64, page: u32, outcome: crate::Result<PagedResult<T>>) {
        let mut inner = self.lock();
        if !inner.slot.settle(generation) {
            debug!(page, "Discarding outcome of cancelled request");
            return;
        }

        let mut state = self.state();
        state.in_flight = false;

        let data = match outcome {
            Ok(data) => data,
            Err(error) => {
                warn!(page, %error, "Page request failed");
                state.errored = true;
                self.state_tx.send_replace(state);
                self.emit_error(error);
                return;
            }
        };

        if data.page != Some(page) {
            warn!(requested = page, received = ?data.page, "Source returned the wrong page, discarding");
            state.errored = true;
            self.state_tx.send_replace(state);
            self.emit_error(Error::page_mismatch(page, data.page));
            return;
        }

        let Some(lineage) = inner.lineage.as_mut() else {
            return;
        };

        let received = data.entities.len();
        let short_page = received < lineage.per_page as usize;
        let mut exhausted = false;

        self.results_tx.send_modify(|results| {
            if page == 1 {
                *results = data;
            } else {
                results.total = data.total;
                results.page = data.page;
                results.entities.extend(data.entities);
            }

            let held = results.entities.len() as u64;
            if short_page || results.total.is_some_and(|total| held >= total) {
                results.total = Some(held);
                exhausted = true;
            }
        });

        if page == 1 {
            state.switch_in_progress = false;
        }
        if exhausted {
            state.has_more_pages = false;
        }
        lineage.current_page = page;
        state.data_loaded = true;
        self.state_tx.send_replace(state);

        debug!(page, received, exhausted, "Merged page");
    }
}
