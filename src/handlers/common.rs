use crate::auth::AuthUser;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use uuid::Uuid;

/// Resolves the distributor account behind the request. Admin tokens are
/// refused; these endpoints act on the caller's own inventory.
pub fn require_distributor(auth: &AuthUser) -> Result<Uuid, ServiceError> {
    if !auth.is_distributor() {
        return Err(ServiceError::Forbidden(
            "A distributor account is required for this operation".to_string(),
        ));
    }
    Ok(auth.account_id()?)
}

/// Resolves the admin account behind the request.
pub fn require_admin(auth: &AuthUser) -> Result<Uuid, ServiceError> {
    if !auth.is_admin() {
        return Err(ServiceError::Forbidden(
            "A warehouse admin account is required for this operation".to_string(),
        ));
    }
    Ok(auth.account_id()?)
}

/// Tenancy scope for shared read endpoints: admins see everything,
/// distributors only their own records.
pub fn visibility_scope(auth: &AuthUser) -> Result<Option<Uuid>, ServiceError> {
    if auth.is_admin() {
        Ok(None)
    } else {
        Ok(Some(auth.account_id()?))
    }
}

/// Clamps a requested page size to the configured bounds.
pub fn clamp_limit(config: &AppConfig, requested: Option<u64>) -> u64 {
    requested
        .unwrap_or(u64::from(config.api_default_page_size))
        .clamp(1, u64::from(config.api_max_page_size))
}

pub fn page_or_first(requested: Option<u64>) -> u64 {
    requested.unwrap_or(1).max(1)
}

pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
    }

    fn user_with_roles(roles: Vec<&str>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: Some("test".to_string()),
            email: None,
            roles: roles.into_iter().map(String::from).collect(),
            permissions: vec![],
            token_id: "tok".to_string(),
        }
    }

    #[test]
    fn scope_is_none_for_admins_and_some_for_distributors() {
        let admin = user_with_roles(vec![crate::auth::ROLE_ADMIN]);
        assert!(visibility_scope(&admin).unwrap().is_none());

        let distributor = user_with_roles(vec![crate::auth::ROLE_DISTRIBUTOR]);
        assert!(visibility_scope(&distributor).unwrap().is_some());
    }

    #[test]
    fn require_distributor_refuses_admins() {
        let admin = user_with_roles(vec![crate::auth::ROLE_ADMIN]);
        assert!(require_distributor(&admin).is_err());
    }
}
