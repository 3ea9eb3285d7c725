//! Report entity.
//!
//! Every payload column is nullable: the collection is written by clients
//! that may omit fields, and readers default them instead of rejecting rows.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Report model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    /// Server-assigned key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Collection path the report was appended under.
    pub collection: String,
    /// Kind of abuse being reported.
    #[sea_orm(column_name = "type", nullable)]
    pub report_type: Option<String>,
    #[sea_orm(nullable)]
    pub description: Option<String>,
    #[sea_orm(nullable)]
    pub location: Option<String>,
    /// Evidence image reference, stored as given.
    #[sea_orm(nullable)]
    pub image_url: Option<String>,
    /// Effective display name stamped at submission time.
    #[sea_orm(nullable)]
    pub nickname: Option<String>,
    /// Client-side creation time, epoch milliseconds.
    #[sea_orm(nullable)]
    pub timestamp: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
