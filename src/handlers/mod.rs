pub mod categories;
pub mod common;
pub mod distributors;
pub mod messages;
pub mod my_stock;
pub mod orders;
pub mod products;
pub mod profile;
pub mod returns;
pub mod sales;
pub mod warehouse_stock;

use crate::config::AppConfig;
use crate::events::EventSender;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<crate::services::categories::CategoryService>,
    pub products: Arc<crate::services::products::ProductService>,
    pub warehouse_stock: Arc<crate::services::warehouse_stock::WarehouseStockService>,
    pub distributors: Arc<crate::services::distributors::DistributorService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub messages: Arc<crate::services::messages::MessageService>,
    pub distributor_stock: Arc<crate::services::distributor_stock::DistributorStockService>,
    pub sales: Arc<crate::services::sales::SaleService>,
    pub returns: Arc<crate::services::returns::ReturnService>,
    pub profile: Arc<crate::services::profile::ProfileService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        let categories = Arc::new(crate::services::categories::CategoryService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let products = Arc::new(crate::services::products::ProductService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let warehouse_stock = Arc::new(crate::services::warehouse_stock::WarehouseStockService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let distributors = Arc::new(crate::services::distributors::DistributorService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let messages = Arc::new(crate::services::messages::MessageService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let distributor_stock = Arc::new(
            crate::services::distributor_stock::DistributorStockService::new(
                db.clone(),
                event_sender.clone(),
                config,
            ),
        );
        let sales = Arc::new(crate::services::sales::SaleService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let returns = Arc::new(crate::services::returns::ReturnService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let profile = Arc::new(crate::services::profile::ProfileService::new(
            db,
            event_sender,
        ));

        Self {
            categories,
            products,
            warehouse_stock,
            distributors,
            orders,
            messages,
            distributor_stock,
            sales,
            returns,
            profile,
        }
    }
}
