//! Collection endpoints in the realtime-database REST shape.

use axum::{extract::State, routing::get, Json, Router};
use reportline_common::AppResult;
use serde::Serialize;
use serde_json::Value;

use crate::extractors::RecordBody;
use crate::middleware::AppState;

/// Response to an append.
#[derive(Debug, Serialize)]
pub struct PushResponse {
    /// Assigned key.
    pub name: String,
}

/// Append a record and return its key.
async fn push(
    State(state): State<AppState>,
    RecordBody(record): RecordBody,
) -> AppResult<Json<PushResponse>> {
    let name = state.reports.append_record(&record).await?;
    Ok(Json(PushResponse { name }))
}

/// The whole collection as stored, or `null` when empty.
async fn list(State(state): State<AppState>) -> AppResult<Json<Value>> {
    Ok(Json(state.reports.fetch_document().await?))
}

pub fn router(path: &str) -> Router<AppState> {
    Router::new().route(&format!("/{path}.json"), get(list).post(push))
}
