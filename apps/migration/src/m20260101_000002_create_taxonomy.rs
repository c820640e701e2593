//! Categories and tags. Both carry a unique name and the id of the user who
//! created them.

use sea_orm_migration::prelude::*;

use super::m20260101_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

fn label_table<T>(table: T, id: T, name: T, author_id: T, fk_name: &str) -> TableCreateStatement
where
    T: IntoIden + Copy + 'static,
{
    Table::create()
        .table(table)
        .if_not_exists()
        .col(
            ColumnDef::new(id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(ColumnDef::new(name).string_len(100).not_null().unique_key())
        .col(ColumnDef::new(author_id).integer().not_null())
        .foreign_key(
            ForeignKey::create()
                .name(fk_name)
                .from(table, author_id)
                .to(Users::Table, Users::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_owned()
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(label_table(
                Categories::Table,
                Categories::Id,
                Categories::Name,
                Categories::AuthorId,
                "fk_categories_author",
            ))
            .await?;

        manager
            .create_table(label_table(
                Tags::Table,
                Tags::Id,
                Tags::Name,
                Tags::AuthorId,
                "fk_tags_author",
            ))
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tags::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
pub(crate) enum Categories {
    Table,
    Id,
    Name,
    AuthorId,
}

#[derive(DeriveIden, Clone, Copy)]
pub(crate) enum Tags {
    Table,
    Id,
    Name,
    AuthorId,
}
