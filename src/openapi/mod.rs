use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Distribera API",
        version = "1.0.0",
        description = r#"
# Distribera Inventory & Order Management API

An API for running a central warehouse with a network of distributors: catalog and
stock administration, distributor ordering, per-distributor inventory, customer
sales and stock returns.

## Features

- **Catalog Management**: Categories and products with size variants
- **Warehouse Stock**: Central stock rows per product and variant
- **Distributor Accounts**: Admin-managed distributor onboarding
- **Ordering**: Distributors order from the warehouse; admins accept or reject
- **My Stock**: Per-distributor inventory credited from accepted orders
- **Sales**: Customer sales drawn from distributor stock
- **Returns**: Stock returned to the warehouse with an approval step
- **Messaging**: Order-scoped conversation between admin and distributor

## Authentication

All API endpoints require a JWT obtained from `/auth/login` (admins) or
`/auth/distributor/login` (distributors). Include the token in the
Authorization header:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

The API uses consistent error response formats with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Order 550e8400-e29b-41d4-a716-446655440000 not found",
  "request_id": "req-abc123xyz",
  "timestamp": "2025-01-01T00:00:00Z"
}
```

## Pagination

List endpoints support pagination with the following query parameters:
- `page`: Page number (default: 1)
- `limit`: Items per page (default: 20, max: 100)
- `search`: Search term for filtering results
        "#,
        contact(
            name = "Distribera Support",
            email = "support@distribera.io",
            url = "https://distribera.io"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "https://api.distribera.io/v1", description = "Production server"),
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Distributor ordering and admin decisions"),
        (name = "Warehouse Stock", description = "Central warehouse stock administration"),
        (name = "Catalog", description = "Category and product management"),
        (name = "Distributors", description = "Distributor account administration"),
        (name = "My Stock", description = "Per-distributor inventory"),
        (name = "Sales", description = "Customer sales recorded by distributors"),
        (name = "Returns", description = "Stock returns to the warehouse"),
        (name = "Messages", description = "Order-scoped messaging"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::update_order,
        crate::handlers::orders::cancel_order,
        crate::handlers::orders::decide_order,

        // Warehouse stock
        crate::handlers::warehouse_stock::list_stock,
        crate::handlers::warehouse_stock::stock_summary,
        crate::handlers::warehouse_stock::add_stock,

        // Catalog, distributors, my-stock, sales, returns, messaging & health
        // intentionally omitted from OpenAPI paths for now
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Order types
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::orders::OrderDetailResponse,
            crate::handlers::orders::CreateOrderRequest,
            crate::handlers::orders::UpdateOrderRequest,
            crate::handlers::orders::OrderDecisionRequest,
            crate::services::orders::OrderStatus,
            crate::services::orders::OrderDecisionAction,

            // Messaging types
            crate::handlers::messages::MessageResponse,

            // Warehouse stock types
            crate::handlers::warehouse_stock::WarehouseStockResponse,
            crate::services::warehouse_stock::AddStockInput,
            crate::services::warehouse_stock::UpdateStockInput,
            crate::services::warehouse_stock::StockSummary,
            crate::services::warehouse_stock::ProductStockTotal,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
