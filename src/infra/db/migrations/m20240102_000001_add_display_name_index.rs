//! Migration: Index display names for name search.

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_users_table::Users;

const INDEX_NAME: &str = "idx_users_display_name";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name(INDEX_NAME)
                    .table(Users::Table)
                    .col(Users::DisplayName)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(INDEX_NAME)
                    .table(Users::Table)
                    .to_owned(),
            )
            .await
    }
}
