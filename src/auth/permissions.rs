/*!
 * # Permissions Module
 *
 * This module defines permissions for resources in the system.
 * Permissions are organized by resource type and action.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Permission definition
#[derive(Debug, Clone)]
pub struct Permission {
    pub name: String,
    pub description: String,
    pub resource_type: String,
    pub action: String,
}

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const CREATE: &'static str = "create";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const CATEGORIES: &'static str = "categories";
    pub const PRODUCTS: &'static str = "products";
    pub const INVENTORY: &'static str = "inventory";
    pub const STOCK: &'static str = "stock";
    pub const DISTRIBUTORS: &'static str = "distributors";
    pub const ORDERS: &'static str = "orders";
    pub const SALES: &'static str = "sales";
    pub const RETURNS: &'static str = "returns";
    pub const MESSAGES: &'static str = "messages";
    pub const REPORTS: &'static str = "reports";
    pub const ADMIN: &'static str = "admin";
}

/// Common permission string constants for compile-time safety
pub mod consts {
    // Catalog
    pub const CATEGORIES_READ: &str = "categories:read";
    pub const CATEGORIES_MANAGE: &str = "categories:manage";
    pub const PRODUCTS_READ: &str = "products:read";
    pub const PRODUCTS_CREATE: &str = "products:create";
    pub const PRODUCTS_UPDATE: &str = "products:update";
    pub const PRODUCTS_DELETE: &str = "products:delete";

    // Central warehouse stock
    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_ADJUST: &str = "inventory:adjust";

    // Distributor-held stock
    pub const STOCK_READ: &str = "stock:read";
    pub const STOCK_UPDATE: &str = "stock:update";

    // Distributor accounts
    pub const DISTRIBUTORS_READ: &str = "distributors:read";
    pub const DISTRIBUTORS_MANAGE: &str = "distributors:manage";

    // Orders
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_CREATE: &str = "orders:create";
    pub const ORDERS_UPDATE: &str = "orders:update";
    pub const ORDERS_CANCEL: &str = "orders:cancel";
    pub const ORDERS_DECIDE: &str = "orders:decide";

    // Sales
    pub const SALES_READ: &str = "sales:read";
    pub const SALES_CREATE: &str = "sales:create";
    pub const SALES_UPDATE: &str = "sales:update";
    pub const SALES_DELETE: &str = "sales:delete";

    // Returns
    pub const RETURNS_READ: &str = "returns:read";
    pub const RETURNS_CREATE: &str = "returns:create";
    pub const RETURNS_DECIDE: &str = "returns:decide";

    // Messages
    pub const MESSAGES_READ: &str = "messages:read";
    pub const MESSAGES_CREATE: &str = "messages:create";

    // Stats and reports
    pub const REPORTS_READ: &str = "reports:read";

    // Full administrative access
    pub const ADMIN_ALL: &str = "admin:*";
}

/// Format a permission string
pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

/// Permissions granted to every distributor account on login.
pub fn distributor_permissions() -> Vec<String> {
    vec![
        consts::CATEGORIES_READ.to_string(),
        consts::PRODUCTS_READ.to_string(),
        consts::ORDERS_READ.to_string(),
        consts::ORDERS_CREATE.to_string(),
        consts::ORDERS_UPDATE.to_string(),
        consts::ORDERS_CANCEL.to_string(),
        consts::STOCK_READ.to_string(),
        consts::STOCK_UPDATE.to_string(),
        consts::SALES_READ.to_string(),
        consts::SALES_CREATE.to_string(),
        consts::SALES_UPDATE.to_string(),
        consts::SALES_DELETE.to_string(),
        consts::RETURNS_READ.to_string(),
        consts::RETURNS_CREATE.to_string(),
        consts::MESSAGES_READ.to_string(),
        consts::MESSAGES_CREATE.to_string(),
        consts::REPORTS_READ.to_string(),
    ]
}

/// Permissions granted to warehouse admin accounts on login.
pub fn admin_permissions() -> Vec<String> {
    vec![consts::ADMIN_ALL.to_string()]
}

// Permission set definition with descriptions
lazy_static! {
    pub static ref PERMISSIONS: HashMap<String, Permission> = {
        let mut perms = HashMap::new();

        // Catalog permissions
        perms.insert(
            format_permission(Resources::CATEGORIES, Actions::READ),
            Permission {
                name: format_permission(Resources::CATEGORIES, Actions::READ),
                description: "View product categories".to_string(),
                resource_type: Resources::CATEGORIES.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::CATEGORIES, Actions::MANAGE),
            Permission {
                name: format_permission(Resources::CATEGORIES, Actions::MANAGE),
                description: "Create, rename and delete product categories".to_string(),
                resource_type: Resources::CATEGORIES.to_string(),
                action: Actions::MANAGE.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::PRODUCTS, Actions::READ),
            Permission {
                name: format_permission(Resources::PRODUCTS, Actions::READ),
                description: "View products".to_string(),
                resource_type: Resources::PRODUCTS.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::PRODUCTS, Actions::CREATE),
            Permission {
                name: format_permission(Resources::PRODUCTS, Actions::CREATE),
                description: "Create products".to_string(),
                resource_type: Resources::PRODUCTS.to_string(),
                action: Actions::CREATE.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::PRODUCTS, Actions::UPDATE),
            Permission {
                name: format_permission(Resources::PRODUCTS, Actions::UPDATE),
                description: "Update products".to_string(),
                resource_type: Resources::PRODUCTS.to_string(),
                action: Actions::UPDATE.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::PRODUCTS, Actions::DELETE),
            Permission {
                name: format_permission(Resources::PRODUCTS, Actions::DELETE),
                description: "Delete products".to_string(),
                resource_type: Resources::PRODUCTS.to_string(),
                action: Actions::DELETE.to_string(),
            },
        );

        // Warehouse stock permissions
        perms.insert(
            format_permission(Resources::INVENTORY, Actions::READ),
            Permission {
                name: format_permission(Resources::INVENTORY, Actions::READ),
                description: "View central warehouse stock".to_string(),
                resource_type: Resources::INVENTORY.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            consts::INVENTORY_ADJUST.to_string(),
            Permission {
                name: consts::INVENTORY_ADJUST.to_string(),
                description: "Add, adjust and remove central warehouse stock".to_string(),
                resource_type: Resources::INVENTORY.to_string(),
                action: "adjust".to_string(),
            },
        );

        // Distributor stock permissions
        perms.insert(
            format_permission(Resources::STOCK, Actions::READ),
            Permission {
                name: format_permission(Resources::STOCK, Actions::READ),
                description: "View distributor-held stock".to_string(),
                resource_type: Resources::STOCK.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::STOCK, Actions::UPDATE),
            Permission {
                name: format_permission(Resources::STOCK, Actions::UPDATE),
                description: "Adjust distributor-held stock levels".to_string(),
                resource_type: Resources::STOCK.to_string(),
                action: Actions::UPDATE.to_string(),
            },
        );

        // Distributor account permissions
        perms.insert(
            format_permission(Resources::DISTRIBUTORS, Actions::READ),
            Permission {
                name: format_permission(Resources::DISTRIBUTORS, Actions::READ),
                description: "View distributor accounts".to_string(),
                resource_type: Resources::DISTRIBUTORS.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::DISTRIBUTORS, Actions::MANAGE),
            Permission {
                name: format_permission(Resources::DISTRIBUTORS, Actions::MANAGE),
                description: "Create, update and delete distributor accounts".to_string(),
                resource_type: Resources::DISTRIBUTORS.to_string(),
                action: Actions::MANAGE.to_string(),
            },
        );

        // Order permissions
        perms.insert(
            format_permission(Resources::ORDERS, Actions::READ),
            Permission {
                name: format_permission(Resources::ORDERS, Actions::READ),
                description: "View orders".to_string(),
                resource_type: Resources::ORDERS.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::ORDERS, Actions::CREATE),
            Permission {
                name: format_permission(Resources::ORDERS, Actions::CREATE),
                description: "Place orders against the central warehouse".to_string(),
                resource_type: Resources::ORDERS.to_string(),
                action: Actions::CREATE.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::ORDERS, Actions::UPDATE),
            Permission {
                name: format_permission(Resources::ORDERS, Actions::UPDATE),
                description: "Edit pending orders".to_string(),
                resource_type: Resources::ORDERS.to_string(),
                action: Actions::UPDATE.to_string(),
            },
        );

        perms.insert(
            consts::ORDERS_CANCEL.to_string(),
            Permission {
                name: consts::ORDERS_CANCEL.to_string(),
                description: "Cancel pending orders".to_string(),
                resource_type: Resources::ORDERS.to_string(),
                action: "cancel".to_string(),
            },
        );

        perms.insert(
            consts::ORDERS_DECIDE.to_string(),
            Permission {
                name: consts::ORDERS_DECIDE.to_string(),
                description: "Accept or reject pending orders".to_string(),
                resource_type: Resources::ORDERS.to_string(),
                action: "decide".to_string(),
            },
        );

        // Sale permissions
        perms.insert(
            format_permission(Resources::SALES, Actions::READ),
            Permission {
                name: format_permission(Resources::SALES, Actions::READ),
                description: "View customer sales".to_string(),
                resource_type: Resources::SALES.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::SALES, Actions::CREATE),
            Permission {
                name: format_permission(Resources::SALES, Actions::CREATE),
                description: "Record customer sales".to_string(),
                resource_type: Resources::SALES.to_string(),
                action: Actions::CREATE.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::SALES, Actions::UPDATE),
            Permission {
                name: format_permission(Resources::SALES, Actions::UPDATE),
                description: "Edit recorded sales".to_string(),
                resource_type: Resources::SALES.to_string(),
                action: Actions::UPDATE.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::SALES, Actions::DELETE),
            Permission {
                name: format_permission(Resources::SALES, Actions::DELETE),
                description: "Delete recorded sales and restock".to_string(),
                resource_type: Resources::SALES.to_string(),
                action: Actions::DELETE.to_string(),
            },
        );

        // Return permissions
        perms.insert(
            format_permission(Resources::RETURNS, Actions::READ),
            Permission {
                name: format_permission(Resources::RETURNS, Actions::READ),
                description: "View stock returns".to_string(),
                resource_type: Resources::RETURNS.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::RETURNS, Actions::CREATE),
            Permission {
                name: format_permission(Resources::RETURNS, Actions::CREATE),
                description: "Submit stock returns to the warehouse".to_string(),
                resource_type: Resources::RETURNS.to_string(),
                action: Actions::CREATE.to_string(),
            },
        );

        perms.insert(
            consts::RETURNS_DECIDE.to_string(),
            Permission {
                name: consts::RETURNS_DECIDE.to_string(),
                description: "Approve or reject stock returns".to_string(),
                resource_type: Resources::RETURNS.to_string(),
                action: "decide".to_string(),
            },
        );

        // Message permissions
        perms.insert(
            format_permission(Resources::MESSAGES, Actions::READ),
            Permission {
                name: format_permission(Resources::MESSAGES, Actions::READ),
                description: "Read order messages".to_string(),
                resource_type: Resources::MESSAGES.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        perms.insert(
            format_permission(Resources::MESSAGES, Actions::CREATE),
            Permission {
                name: format_permission(Resources::MESSAGES, Actions::CREATE),
                description: "Post order messages".to_string(),
                resource_type: Resources::MESSAGES.to_string(),
                action: Actions::CREATE.to_string(),
            },
        );

        // Report permissions
        perms.insert(
            format_permission(Resources::REPORTS, Actions::READ),
            Permission {
                name: format_permission(Resources::REPORTS, Actions::READ),
                description: "View stock and sales statistics".to_string(),
                resource_type: Resources::REPORTS.to_string(),
                action: Actions::READ.to_string(),
            },
        );

        // Administrative wildcard
        perms.insert(
            consts::ADMIN_ALL.to_string(),
            Permission {
                name: consts::ADMIN_ALL.to_string(),
                description: "Full administrative access".to_string(),
                resource_type: Resources::ADMIN.to_string(),
                action: Actions::ALL.to_string(),
            },
        );

        perms
    };
}

/// Service for managing permissions
#[derive(Clone)]
pub struct PermissionService {
    // In a real implementation, this would be backed by a database
}

impl PermissionService {
    /// Create a new permission service
    pub fn new() -> Self {
        Self {}
    }

    /// Get a permission by name
    pub fn get_permission(&self, name: &str) -> Option<&Permission> {
        PERMISSIONS.get(name)
    }

    /// Get all permissions
    pub fn get_all_permissions(&self) -> Vec<&Permission> {
        PERMISSIONS.values().collect()
    }

    /// Get all permissions for a resource
    pub fn get_resource_permissions(&self, resource: &str) -> Vec<&Permission> {
        PERMISSIONS
            .values()
            .filter(|p| p.resource_type == resource)
            .collect()
    }

    /// Check if a permission exists
    pub fn permission_exists(&self, name: &str) -> bool {
        PERMISSIONS.contains_key(name)
    }

    /// Check if a permission is implied by another permission
    pub fn is_permission_implied(&self, user_perm: &str, required_perm: &str) -> bool {
        // Direct match
        if user_perm == required_perm {
            return true;
        }

        // Wildcard match (resource:*)
        let user_parts: Vec<&str> = user_perm.split(':').collect();
        let required_parts: Vec<&str> = required_perm.split(':').collect();

        if user_parts.len() == 2 && required_parts.len() == 2 {
            let user_resource = user_parts[0];
            let user_action = user_parts[1];
            let required_resource = required_parts[0];

            // Check for resource wildcard (resource:*)
            if user_resource == required_resource && user_action == "*" {
                return true;
            }

            // Check for admin permission (admin:*)
            if user_resource == "admin" && user_action == "*" {
                return true;
            }
        }

        // Global wildcard match
        if user_perm == "*" {
            return true;
        }

        false
    }
}

/// Default implementation for PermissionService
impl Default for PermissionService {
    fn default() -> Self {
        Self::new()
    }
}
