//! Single-request slot
//!
//! Holds at most one pending request. Replacing or cancelling the request
//! aborts its task and retires its generation, so a continuation that was
//! already past its last await point still finds out it lost the race.

use tokio::task::AbortHandle;

/// At most one live request per lineage
#[derive(Debug, Default)]
pub struct InflightSlot {
    generation: u64,
    active: Option<AbortHandle>,
}

impl InflightSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the pending request (if any) and install a new one.
    ///
    /// `spawn` receives the generation the new request must present to
    /// [`settle`](Self::settle) and returns the handle used to abort it.
    pub fn replace<F>(&mut self, spawn: F) -> u64
    where
        F: FnOnce(u64) -> AbortHandle,
    {
        self.cancel();
        let generation = self.generation;
        self.active = Some(spawn(generation));
        generation
    }

    /// Cancel the pending request. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.active.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claim the slot for a finished request.
    ///
    /// Returns `false` when the request was superseded or cancelled, in which
    /// case its outcome must be dropped.
    pub fn settle(&mut self, generation: u64) -> bool {
        if self.active.is_some() && self.generation == generation {
            self.active = None;
            true
        } else {
            false
        }
    }

    /// Check if a request is pending
    pub fn is_pending(&self) -> bool {
        self.active.is_some()
    }
}
