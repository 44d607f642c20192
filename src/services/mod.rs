/*!
 * # Services Module
 *
 * Business logic for the Distribera API. Each service owns one slice of the
 * domain, works against the shared SeaORM connection pool, and publishes
 * domain events after its transactions commit.
 */

pub mod categories;
pub mod distributor_stock;
pub mod distributors;
pub mod messages;
pub mod orders;
pub mod products;
pub mod profile;
pub mod returns;
pub mod sales;
pub mod warehouse_stock;

pub use categories::CategoryService;
pub use distributor_stock::DistributorStockService;
pub use distributors::DistributorService;
pub use messages::MessageService;
pub use orders::OrderService;
pub use products::ProductService;
pub use profile::ProfileService;
pub use returns::ReturnService;
pub use sales::SaleService;
pub use warehouse_stock::WarehouseStockService;
