use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sales::DistributorId).uuid().not_null())
                    .col(ColumnDef::new(Sales::StockId).uuid().not_null())
                    .col(ColumnDef::new(Sales::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(Sales::ProductName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::VariantSize)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sales::QuantitySold).integer().not_null())
                    .col(
                        ColumnDef::new(Sales::UnitPrice)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::TotalAmount)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::CustomerName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sales::CustomerContact).string_len(50))
                    .col(ColumnDef::new(Sales::Notes).text())
                    .col(ColumnDef::new(Sales::Status).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Sales::SoldAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sales::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_distributor")
                            .from(Sales::Table, Sales::DistributorId)
                            .to(Distributors::Table, Distributors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sales_stock")
                            .from(Sales::Table, Sales::StockId)
                            .to(DistributorStock::Table, DistributorStock::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_distributor_id")
                    .table(Sales::Table)
                    .col(Sales::DistributorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_sold_at")
                    .table(Sales::Table)
                    .col(Sales::SoldAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Sales {
    Table,
    Id,
    DistributorId,
    StockId,
    ProductId,
    ProductName,
    VariantSize,
    QuantitySold,
    UnitPrice,
    TotalAmount,
    CustomerName,
    CustomerContact,
    Notes,
    Status,
    SoldAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Distributors {
    Table,
    Id,
}

#[derive(Iden)]
enum DistributorStock {
    Table,
    Id,
}
