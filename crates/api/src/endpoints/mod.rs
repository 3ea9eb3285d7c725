//! API endpoints.

mod reports;

use axum::{http::Uri, Router};
use reportline_common::AppError;

use crate::middleware::AppState;
use crate::sse;

/// Create the API router for a collection mounted at `/{path}`.
pub fn router(path: &str) -> Router<AppState> {
    let path = path.trim_matches('/');
    Router::new()
        .merge(reports::router(path))
        .merge(sse::router(path))
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
