use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StockReturns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockReturns::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StockReturns::DistributorId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockReturns::StockId).uuid().not_null())
                    .col(ColumnDef::new(StockReturns::ProductId).uuid().not_null())
                    .col(
                        ColumnDef::new(StockReturns::VariantSize)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockReturns::QuantityReturned)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockReturns::Reason).text().not_null())
                    .col(
                        ColumnDef::new(StockReturns::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockReturns::DecisionNote).text())
                    .col(ColumnDef::new(StockReturns::DecidedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(StockReturns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockReturns::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_returns_distributor")
                            .from(StockReturns::Table, StockReturns::DistributorId)
                            .to(Distributors::Table, Distributors::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stock_returns_stock")
                            .from(StockReturns::Table, StockReturns::StockId)
                            .to(DistributorStock::Table, DistributorStock::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_returns_distributor_id")
                    .table(StockReturns::Table)
                    .col(StockReturns::DistributorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stock_returns_status")
                    .table(StockReturns::Table)
                    .col(StockReturns::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockReturns::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum StockReturns {
    Table,
    Id,
    DistributorId,
    StockId,
    ProductId,
    VariantSize,
    QuantityReturned,
    Reason,
    Status,
    DecisionNote,
    DecidedAt,
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
