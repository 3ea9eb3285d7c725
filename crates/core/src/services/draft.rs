//! Draft persistence for the in-progress report form.
//!
//! Every field change is written through immediately so an interrupted
//! session resumes where it stopped.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use reportline_common::AppResult;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::preferences::{PreferenceMap, PreferenceStore};
use crate::models::ReportDraft;

/// Preference namespace holding the draft.
pub const DRAFT_NAMESPACE: &str = "draft";

/// A draft form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Type,
    Description,
    Location,
    ImageUrl,
}

impl DraftField {
    pub const ALL: [Self; 4] = [Self::Type, Self::Description, Self::Location, Self::ImageUrl];

    /// Storage key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Description => "description",
            Self::Location => "location",
            Self::ImageUrl => "imageUrl",
        }
    }
}

/// Persists and restores the report draft.
#[derive(Clone)]
pub struct DraftCoordinator {
    store: Arc<PreferenceStore>,
}

impl DraftCoordinator {
    #[must_use]
    pub const fn new(store: Arc<PreferenceStore>) -> Self {
        Self { store }
    }

    fn from_map(map: &PreferenceMap) -> ReportDraft {
        let field = |field: DraftField| {
            map.get(field.key())
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        ReportDraft {
            report_type: field(DraftField::Type),
            description: field(DraftField::Description),
            location: field(DraftField::Location),
            image_url: field(DraftField::ImageUrl),
        }
    }

    /// Point-in-time draft.
    #[must_use]
    pub fn current(&self) -> ReportDraft {
        Self::from_map(&self.store.snapshot())
    }

    /// Draft stream, starting with the current value.
    pub fn watch(&self) -> impl Stream<Item = ReportDraft> + Send + use<> {
        self.store.read().map(|map| Self::from_map(&map))
    }

    /// Write one field.
    pub async fn update(&self, field: DraftField, value: &str) -> AppResult<()> {
        self.store
            .write(field.key(), Value::String(value.to_string()))
            .await
    }

    /// Write one field without waiting. Failures are logged and the handle reports them.
    pub fn update_detached(&self, field: DraftField, value: String) -> JoinHandle<AppResult<()>> {
        let this = self.clone();
        tokio::spawn(async move {
            let result = this.update(field, &value).await;
            if let Err(e) = &result {
                tracing::warn!(field = field.key(), error = %e, "Failed to persist draft field");
            }
            result
        })
    }

    pub async fn update_type(&self, value: &str) -> AppResult<()> {
        self.update(DraftField::Type, value).await
    }

    pub async fn update_description(&self, value: &str) -> AppResult<()> {
        self.update(DraftField::Description, value).await
    }

    pub async fn update_location(&self, value: &str) -> AppResult<()> {
        self.update(DraftField::Location, value).await
    }

    pub async fn update_image_url(&self, value: &str) -> AppResult<()> {
        self.update(DraftField::ImageUrl, value).await
    }

    /// Reset every field to empty in a single write.
    pub async fn clear(&self) -> AppResult<()> {
        let entries = DraftField::ALL
            .iter()
            .map(|field| (field.key().to_string(), Value::String(String::new())))
            .collect();
        self.store.write_many(entries).await?;
        tracing::debug!("Draft cleared");
        Ok(())
    }
}
