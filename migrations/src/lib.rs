pub use sea_orm_migration::prelude::*;

mod m20240115_000001_create_admin_users_table;
mod m20240115_000002_create_distributors_table;
mod m20240115_000003_create_categories_table;
mod m20240115_000004_create_products_table;
mod m20240115_000005_create_warehouse_stock_table;
mod m20240115_000006_create_distributor_stock_table;
mod m20240115_000007_create_orders_table;
mod m20240115_000008_create_order_items_table;
mod m20240115_000009_create_sales_table;
mod m20240115_000010_create_stock_returns_table;
mod m20240115_000011_create_messages_table;
mod m20240612_000012_add_lookup_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240115_000001_create_admin_users_table::Migration),
            Box::new(m20240115_000002_create_distributors_table::Migration),
            Box::new(m20240115_000003_create_categories_table::Migration),
            Box::new(m20240115_000004_create_products_table::Migration),
            Box::new(m20240115_000005_create_warehouse_stock_table::Migration),
            Box::new(m20240115_000006_create_distributor_stock_table::Migration),
            Box::new(m20240115_000007_create_orders_table::Migration),
            Box::new(m20240115_000008_create_order_items_table::Migration),
            Box::new(m20240115_000009_create_sales_table::Migration),
            Box::new(m20240115_000010_create_stock_returns_table::Migration),
            Box::new(m20240115_000011_create_messages_table::Migration),
            Box::new(m20240612_000012_add_lookup_indexes::Migration),
        ]
    }
}
