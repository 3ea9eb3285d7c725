//! HTTP API layer for reportline.
//!
//! Serves a report collection over the realtime-database REST shape:
//!
//! - **Endpoints**: `POST`/`GET /{path}.json`
//! - **Streaming**: `GET /{path}/stream` as Server-Sent Events
//! - **Extractors**: record body validation
//!
//! Built on Axum 0.8 with Tower middleware stack.

#![allow(missing_docs)]

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod sse;

pub use endpoints::router;
pub use middleware::AppState;
pub use sse::PutEvent;
