//! Preference repository.
//!
//! Failures surface as [`AppError::Storage`]: there is no fallback for a
//! local preference store that cannot be read or written.

use std::sync::Arc;

use crate::entities::{preference, Preference};
use reportline_common::{AppError, AppResult};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde_json::Value;

/// Preference repository for database operations.
#[derive(Clone)]
pub struct PreferenceRepository {
    db: Arc<DatabaseConnection>,
}

impl PreferenceRepository {
    /// Create a new preference repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Read every key of a namespace.
    pub async fn get_namespace(&self, namespace: &str) -> AppResult<Vec<preference::Model>> {
        Preference::find()
            .filter(preference::Column::Namespace.eq(namespace))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Upsert several keys in one transaction (all-or-nothing).
    pub async fn put_many(&self, namespace: &str, entries: &[(String, Value)]) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        for (key, value) in entries {
            let model = preference::ActiveModel {
                namespace: Set(namespace.to_string()),
                key: Set(key.clone()),
                value: Set(value.clone()),
            };

            Preference::insert(model)
                .on_conflict(
                    OnConflict::columns([preference::Column::Namespace, preference::Column::Key])
                        .update_column(preference::Column::Value)
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}
