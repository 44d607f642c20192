use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WarehouseStock::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WarehouseStock::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WarehouseStock::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(WarehouseStock::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WarehouseStock::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WarehouseStock::VariantSize)
                            .string_len(100)
                            .not_null()
                            .default("Standard"),
                    )
                    .col(
                        ColumnDef::new(WarehouseStock::AddedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WarehouseStock::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_warehouse_stock_product")
                            .from(WarehouseStock::Table, WarehouseStock::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_warehouse_stock_product_variant")
                    .table(WarehouseStock::Table)
                    .col(WarehouseStock::ProductId)
                    .col(WarehouseStock::VariantSize)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WarehouseStock::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WarehouseStock {
    Table,
    Id,
    ProductId,
    Quantity,
    UnitPrice,
    VariantSize,
    AddedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Products {
    Table,
    Id,
}
