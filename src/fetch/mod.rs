//! Page fetch module
//!
//! Supports: closures, in-process mock data, HTTP endpoints
//!
//! # Overview
//!
//! A fetcher turns `(page, per_page)` into a future resolving to one
//! [`PagedResult`](crate::types::PagedResult). The coordinator drops that
//! future to cancel it, so a fetcher releases its resources (timers, sockets)
//! simply by being dropped.

mod http;
mod mock;
mod types;

pub use http::{decode_page, HttpFetcher};
pub use mock::{MockEntity, MockFetcher};
pub use types::{PageFetcher, SharedFetcher};
