use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Distributors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Distributors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Distributors::Name)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Distributors::District)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Distributors::Province)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Distributors::OwnerName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Distributors::ContactNo)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Distributors::Address).text())
                    .col(
                        ColumnDef::new(Distributors::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Distributors::PasswordHash)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Distributors::ImageUrl).text())
                    .col(
                        ColumnDef::new(Distributors::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Distributors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Distributors::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_distributors_email")
                    .table(Distributors::Table)
                    .col(Distributors::Email)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_distributors_district")
                    .table(Distributors::Table)
                    .col(Distributors::District)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Distributors::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Distributors {
    Table,
    Id,
    Name,
    District,
    Province,
    OwnerName,
    ContactNo,
    Address,
    Email,
    PasswordHash,
    ImageUrl,
    Active,
    CreatedAt,
    UpdatedAt,
}
