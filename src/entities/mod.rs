pub mod admin_user;
pub mod category;
pub mod distributor;
pub mod distributor_stock;
pub mod message;
pub mod order;
pub mod order_item;
pub mod product;
pub mod sale;
pub mod stock_return;
pub mod warehouse_stock;

// Re-export entities
pub use admin_user::{Entity as AdminUser, Model as AdminUserModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use distributor::{Entity as Distributor, Model as DistributorModel};
pub use distributor_stock::{Entity as DistributorStock, Model as DistributorStockModel};
pub use message::{Entity as Message, Model as MessageModel};
pub use order::{Entity as Order, Model as OrderModel};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use sale::{Entity as Sale, Model as SaleModel};
pub use stock_return::{Entity as StockReturn, Model as StockReturnModel};
pub use warehouse_stock::{Entity as WarehouseStock, Model as WarehouseStockModel};
