//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Report::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Report::Collection).string_len(128).not_null())
                    .col(ColumnDef::new(Report::Type).string())
                    .col(ColumnDef::new(Report::Description).text())
                    .col(ColumnDef::new(Report::Location).text())
                    .col(ColumnDef::new(Report::ImageUrl).text())
                    .col(ColumnDef::new(Report::Nickname).string())
                    .col(ColumnDef::new(Report::Timestamp).big_integer())
                    .to_owned(),
            )
            .await?;

        // Index: (collection, timestamp) - full snapshot reads per collection
        manager
            .create_index(
                Index::create()
                    .name("idx_report_collection_timestamp")
                    .table(Report::Table)
                    .col(Report::Collection)
                    .col(Report::Timestamp)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    Collection,
    Type,
    Description,
    Location,
    ImageUrl,
    Nickname,
    Timestamp,
}
