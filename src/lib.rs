// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]

//! # inflight-pager
//!
//! Incrementally load a paginated async source while keeping a consistent,
//! race-free view of the current results and request state.
//!
//! ## Features
//!
//! - **Cancel-and-restart**: requesting a page, or switching source, cancels
//!   the pending request; its outcome is never observed
//! - **Page accumulation**: pages are appended in order, with correction of
//!   over-reported totals
//! - **Replay-latest channels**: late subscribers see current state at once
//! - **Pluggable sources**: closures, an in-process mock, or a JSON HTTP endpoint
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use inflight_pager::{MockFetcher, RequestCoordinator};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let coordinator = RequestCoordinator::new();
//!     coordinator.start(5, true, MockFetcher::new(23, "Entity", Duration::from_millis(50)));
//!
//!     while coordinator.settled().await.has_more_pages {
//!         coordinator.get_next_page();
//!     }
//!
//!     assert_eq!(coordinator.results().len(), 23);
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     RequestCoordinator                       │
//! │  start()  get_next_page()  clear()  clear_data()  set_results│
//! └──────────────────────────────────────────────────────────────┘
//!        │ InflightSlot (one request)         │ publishes
//! ┌──────┴──────────────┐         ┌───────────┴──────────────────┐
//! │     PageFetcher     │         │ results (watch)              │
//! │ closure / Mock/ Http│         │ state   (watch)              │
//! └─────────────────────┘         │ errors  (broadcast)          │
//!                                 └──────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Page and state data shapes
pub mod types;

/// Pager configuration
pub mod config;

/// Page sources
pub mod fetch;

/// Request lifecycle coordination
pub mod coordinator;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{HttpConfig, PagerConfig};
pub use coordinator::RequestCoordinator;
pub use fetch::{HttpFetcher, MockEntity, MockFetcher, PageFetcher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
