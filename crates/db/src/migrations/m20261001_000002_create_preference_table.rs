//! Create preference table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Preference::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Preference::Namespace).string_len(64).not_null())
                    .col(ColumnDef::new(Preference::Key).string_len(64).not_null())
                    .col(ColumnDef::new(Preference::Value).json().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_preference")
                            .col(Preference::Namespace)
                            .col(Preference::Key),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Preference::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Preference {
    Table,
    Namespace,
    Key,
    Value,
}
