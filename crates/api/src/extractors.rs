//! Request extractors.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use reportline_common::AppError;
use serde_json::Value;

/// A JSON object body carrying one report record.
///
/// Field contents are not checked; incomplete records are defaulted on read.
#[derive(Debug, Clone)]
pub struct RecordBody(pub Value);

impl<S> FromRequest<S> for RecordBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;

        if !value.is_object() {
            return Err(AppError::BadRequest("report record must be a JSON object".into()));
        }
        Ok(Self(value))
    }
}
