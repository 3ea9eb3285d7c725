//! Preference entity (namespaced key-value pairs).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "preference")]
pub struct Model {
    /// Independent key space, e.g. `identity` or `draft`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub namespace: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    /// JSON-encoded value (strings and booleans in practice).
    pub value: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
