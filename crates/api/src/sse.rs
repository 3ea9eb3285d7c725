//! Server-Sent Events for live collection snapshots.
//!
//! Every event is a `put` carrying the whole stored collection at `/`. The
//! first one is sent on connect. A failed read ends the stream with a
//! `cancel` event.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::future;
use futures::stream::{Stream, StreamExt};
use reportline_common::AppResult;
use reportline_core::ReportStore;
use serde::Serialize;
use serde_json::Value;

use crate::middleware::AppState;

/// Payload of a `put` event.
#[derive(Debug, Clone, Serialize)]
pub struct PutEvent {
    pub path: String,
    pub data: Value,
}

fn to_event(item: AppResult<Value>) -> Event {
    match item {
        Ok(data) => {
            let put = PutEvent {
                path: "/".to_string(),
                data,
            };
            Event::default()
                .event("put")
                .json_data(&put)
                .unwrap_or_else(|_| Event::default().event("put").data("null"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Closing collection stream");
            Event::default().event("cancel").data(e.to_string())
        }
    }
}

/// Live collection stream.
async fn collection_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.reports.subscribe();
    tracing::debug!(
        collection = %state.collection_path(),
        listeners = state.reports.active_listeners(),
        "Collection stream opened"
    );

    let reports = state.reports.clone();
    let stream = subscription
        .then(move |item| {
            let reports = reports.clone();
            async move {
                match item {
                    Ok(_) => reports.fetch_document().await,
                    Err(e) => Err(e),
                }
            }
        })
        .scan(false, |cancelled, item| {
            if *cancelled {
                return future::ready(None);
            }
            *cancelled = item.is_err();
            future::ready(Some(Ok(to_event(item))))
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Create the SSE router.
pub fn router(path: &str) -> Router<AppState> {
    Router::new().route(&format!("/{path}/stream"), get(collection_stream))
}
