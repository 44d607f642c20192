use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Admin order queue is filtered by status and sorted newest-first
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_orders_status_created")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .col((Orders::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Sales dashboard filters by distributor + status and by date range
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sales_distributor_status")
                    .table(Sales::Table)
                    .col(Sales::DistributorId)
                    .col(Sales::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sales_distributor_sold_at")
                    .table(Sales::Table)
                    .col(Sales::DistributorId)
                    .col((Sales::SoldAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_orders_status_created")
                    .table(Orders::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_sales_distributor_status")
                    .table(Sales::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_sales_distributor_sold_at")
                    .table(Sales::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum Orders {
    Table,
    Status,
    CreatedAt,
}

#[derive(Iden)]
enum Sales {
    Table,
    DistributorId,
    Status,
    SoldAt,
}
