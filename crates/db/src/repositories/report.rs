//! Report repository.
//!
//! The collection is append-only: there is deliberately no update or delete.

use std::sync::Arc;

use crate::entities::{report, Report};
use reportline_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Report repository for database operations.
#[derive(Clone)]
pub struct ReportRepository {
    db: Arc<DatabaseConnection>,
}

impl ReportRepository {
    /// Create a new report repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append a report row. The key must already be assigned.
    pub async fn create(&self, model: report::ActiveModel) -> AppResult<()> {
        Report::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Read every row of a collection in key order.
    pub async fn list(&self, collection: &str) -> AppResult<Vec<report::Model>> {
        Report::find()
            .filter(report::Column::Collection.eq(collection))
            .order_by_asc(report::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
