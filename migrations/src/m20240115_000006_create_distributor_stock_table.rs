use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DistributorStock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DistributorStock::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DistributorStock::DistributorId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DistributorStock::ProductId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DistributorStock::VariantSize)
                            .string_len(100)
                            .not_null()
                            .default("Standard"),
                    )
                    .col(
                        ColumnDef::new(DistributorStock::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DistributorStock::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DistributorStock::LastUpdated)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_distributor_stock_distributor")
                            .from(DistributorStock::Table, DistributorStock::DistributorId)
                            .to(Distributors::Table, Distributors::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_distributor_stock_product")
                            .from(DistributorStock::Table, DistributorStock::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_distributor_stock_owner_product_variant")
                    .table(DistributorStock::Table)
                    .col(DistributorStock::DistributorId)
                    .col(DistributorStock::ProductId)
                    .col(DistributorStock::VariantSize)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_distributor_stock_distributor_id")
                    .table(DistributorStock::Table)
                    .col(DistributorStock::DistributorId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DistributorStock::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DistributorStock {
    Table,
    Id,
    DistributorId,
    ProductId,
    VariantSize,
    Quantity,
    UnitPrice,
    LastUpdated,
}

#[derive(Iden)]
enum Distributors {
    Table,
    Id,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
