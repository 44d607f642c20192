use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    middleware,
    routing::get,
    Router,
};
use distribera_api::{
    auth::{
        admin_permissions, distributor_permissions, AuthConfig, AuthService, Principal,
        RegisterAdminRequest, ROLE_ADMIN, ROLE_DISTRIBUTOR,
    },
    config::AppConfig,
    db,
    entities::{distributor_stock, product},
    events::{self, EventSender},
    services::{
        categories::CreateCategoryInput,
        distributors::CreateDistributorInput,
        orders::{CreateOrderInput, OrderDecisionAction, OrderDecisionInput},
        products::CreateProductInput,
        warehouse_stock::AddStockInput,
    },
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Credentials for the admin account every test application starts with.
pub const ADMIN_USERNAME: &str = "warehouse";
pub const ADMIN_PASSWORD: &str = "central-warehouse-pw-7";

/// Password shared by all seeded distributor accounts.
pub const DISTRIBUTOR_PASSWORD: &str = "district-route-pw-42";

const TEST_JWT_SECRET: &str =
    "integration_test_signing_secret_with_plenty_of_length_and_entropy_zx91!?";

/// A seeded distributor account plus a valid access token for it.
pub struct DistributorFixture {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database. Each instance gets its own database, so tests can run
/// in parallel without stepping on each other.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    admin_id: Uuid,
    admin_token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state and one
    /// registered warehouse admin.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single pooled connection keeps the in-memory database alive for
        // the lifetime of the harness.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(
            AuthConfig::from_app_config(&cfg),
            db_arc.clone(),
        ));

        let state = AppState::new(db_arc, Arc::new(cfg), event_sender);

        // Bootstrap registration: the first admin needs no caller.
        let admin = auth_service
            .register_admin(
                RegisterAdminRequest {
                    username: ADMIN_USERNAME.to_string(),
                    password: ADMIN_PASSWORD.to_string(),
                    display_name: Some("Warehouse Admin".to_string()),
                    email: Some("admin@distribera.test".to_string()),
                },
                None,
            )
            .await
            .expect("seed admin account");

        let admin_principal = Principal {
            id: admin.id,
            name: Some("Warehouse Admin".to_string()),
            email: Some("admin@distribera.test".to_string()),
            roles: vec![ROLE_ADMIN.to_string()],
            permissions: admin_permissions(),
        };
        let admin_token = auth_service
            .generate_token(&admin_principal)
            .await
            .expect("mint admin token")
            .access_token;

        let auth_for_layer = auth_service.clone();
        let router = Router::new()
            .route("/", get(|| async { "distribera-api up" }))
            .nest("/api/v1", distribera_api::api_v1_routes())
            .nest(
                "/auth",
                distribera_api::auth::auth_routes().with_state(auth_service.clone()),
            )
            .layer(middleware::from_fn_with_state(
                auth_for_layer,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .layer(middleware::from_fn(
                distribera_api::middleware_helpers::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            auth_service,
            admin_id: admin.id,
            admin_token,
            _event_task: event_task,
        }
    }

    /// Account ID of the seeded warehouse admin.
    pub fn admin_id(&self) -> Uuid {
        self.admin_id
    }

    /// Bearer token for the seeded warehouse admin.
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for requests made as the warehouse admin.
    pub async fn admin_request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(&self.admin_token))
            .await
    }

    /// Create a distributor account and mint an access token for it.
    pub async fn seed_distributor(&self, name: &str, email: &str) -> DistributorFixture {
        let created = self
            .state
            .services
            .distributors
            .create_distributor(CreateDistributorInput {
                name: name.to_string(),
                district: "Galle".to_string(),
                province: "Southern".to_string(),
                owner_name: format!("{} Owner", name),
                contact_no: "+94 77 123 4567".to_string(),
                address: None,
                email: email.to_string(),
                password: DISTRIBUTOR_PASSWORD.to_string(),
                image_url: None,
            })
            .await
            .expect("seed distributor account");

        let principal = Principal {
            id: created.id,
            name: Some(created.name.clone()),
            email: Some(created.email.clone()),
            roles: vec![ROLE_DISTRIBUTOR.to_string()],
            permissions: distributor_permissions(),
        };
        let token = self
            .auth_service
            .generate_token(&principal)
            .await
            .expect("mint distributor token")
            .access_token;

        DistributorFixture {
            id: created.id,
            email: created.email,
            token,
        }
    }

    /// Create a category and a product inside it, priced per unit.
    pub async fn seed_product(&self, name: &str, unit_price: Decimal) -> product::Model {
        let category = self
            .state
            .services
            .categories
            .create_category(CreateCategoryInput {
                name: format!("{} Category", name),
                description: "Category seeded for integration tests".to_string(),
            })
            .await
            .expect("seed category");

        self.state
            .services
            .products
            .create_product(CreateProductInput {
                name: name.to_string(),
                category_id: category.id,
                unit_price,
                variant_size: "500g".to_string(),
                shelf_life_days: 180,
                image_url: None,
            })
            .await
            .expect("seed product")
    }

    /// Put `quantity` units of a product into the central warehouse.
    pub async fn seed_warehouse_stock(&self, product_id: Uuid, quantity: i32) {
        self.state
            .services
            .warehouse_stock
            .add_stock(AddStockInput {
                product_id,
                quantity,
                unit_price: None,
                variant_size: None,
            })
            .await
            .expect("seed warehouse stock");
    }

    /// Move `quantity` units of a product into a distributor's stock by
    /// running a full order round: warehouse intake, order, acceptance.
    /// Returns the distributor stock row the transfer landed on.
    pub async fn grant_distributor_stock(
        &self,
        distributor_id: Uuid,
        product: &product::Model,
        quantity: i32,
    ) -> distributor_stock::Model {
        self.seed_warehouse_stock(product.id, quantity).await;

        let order = self
            .state
            .services
            .orders
            .create_order(
                distributor_id,
                CreateOrderInput {
                    product_id: product.id,
                    quantity,
                    notes: None,
                },
            )
            .await
            .expect("place fixture order");

        self.state
            .services
            .orders
            .decide_order(
                self.admin_id,
                order.order.id,
                OrderDecisionInput {
                    action: OrderDecisionAction::Accept,
                    quantity: None,
                    reason: None,
                },
            )
            .await
            .expect("accept fixture order");

        distributor_stock::Entity::find()
            .filter(distributor_stock::Column::DistributorId.eq(distributor_id))
            .filter(distributor_stock::Column::ProductId.eq(product.id))
            .filter(distributor_stock::Column::VariantSize.eq(product.variant_size.clone()))
            .one(&*self.state.db)
            .await
            .expect("query distributor stock")
            .expect("distributor stock row after acceptance")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
