/*!
 * # Authentication and Authorization Module
 *
 * This module provides authentication and authorization services for the
 * Distribera API. It issues JWT access/refresh token pairs for the two kinds
 * of accounts in the system:
 *
 * - Warehouse admins, who manage the catalog, central stock and distributors
 * - Distributors, who order stock, record sales and submit returns
 *
 * The module also provides role-based access control (RBAC) and permission
 * verification for routes.
 */

use async_trait::async_trait;
use axum::{
    extract::{DefaultBodyLimit, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::entities::{admin_user, distributor};

mod permissions;

pub use permissions::*;

/// Role assigned to warehouse admin accounts
pub const ROLE_ADMIN: &str = "admin";
/// Role assigned to distributor accounts
pub const ROLE_DISTRIBUTOR: &str = "distributor";

/// Scope value marking refresh tokens so they cannot be used as access tokens
const REFRESH_SCOPE: &str = "refresh";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,              // Subject (account ID)
    pub name: Option<String>,     // Account display name
    pub email: Option<String>,    // Account email
    pub roles: Vec<String>,       // Account roles
    pub permissions: Vec<String>, // Explicit permissions
    pub jti: String,              // JWT ID (unique identifier for this token)
    pub iat: i64,                 // Issued at time
    pub exp: i64,                 // Expiration time
    pub nbf: i64,                 // Not valid before time
    pub iss: String,              // Issuer
    pub aud: String,              // Audience
    pub scope: Option<String>,    // Token scope (set for refresh tokens)
}

/// Authenticated account data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl AuthUser {
    /// Check if the account has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the account has a specific permission
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Check if the account is a warehouse admin
    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    /// Check if the account is a distributor
    pub fn is_distributor(&self) -> bool {
        self.has_role(ROLE_DISTRIBUTOR)
    }

    /// Parse the account ID out of the token subject
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.user_id).map_err(|_| AuthError::InvalidToken)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // auth_middleware stores the validated account in request extensions
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(AuthError::MissingAuth)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
    pub access_token_expiration: Duration,
    pub refresh_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_audience: String,
        jwt_issuer: String,
        access_token_expiration: Duration,
        refresh_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_audience,
            jwt_issuer,
            access_token_expiration,
            refresh_token_expiration,
        }
    }

    /// Build auth configuration from application config
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_audience: cfg.auth_audience.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            access_token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
            refresh_token_expiration: Duration::from_secs(cfg.refresh_token_expiration as u64),
        }
    }
}

/// An authenticated account, resolved from the database during login
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    pub blacklisted_tokens: Arc<RwLock<Vec<BlacklistedToken>>>,
}

/// Token blacklist entry
#[derive(Clone, Debug)]
pub struct BlacklistedToken {
    jti: String,
    expiry: DateTime<Utc>,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>) -> Self {
        Self {
            config,
            db,
            blacklisted_tokens: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Authenticate a warehouse admin by username and password
    pub async fn authenticate_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let admin = admin_user::Entity::find()
            .filter(admin_user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &admin.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !admin.active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(Principal {
            id: admin.id,
            name: admin.display_name.clone().or(Some(admin.username.clone())),
            email: admin.email.clone(),
            roles: vec![ROLE_ADMIN.to_string()],
            permissions: admin_permissions(),
        })
    }

    /// Authenticate a distributor by email and password
    pub async fn authenticate_distributor(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let account = distributor::Entity::find()
            .filter(distributor::Column::Email.eq(email))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }
        if !account.active {
            return Err(AuthError::AccountDisabled);
        }

        Ok(Principal {
            id: account.id,
            name: Some(account.name.clone()),
            email: Some(account.email.clone()),
            roles: vec![ROLE_DISTRIBUTOR.to_string()],
            permissions: distributor_permissions(),
        })
    }

    /// Register a warehouse admin account.
    ///
    /// The first admin can always be created (bootstrap). Once one exists,
    /// only an authenticated admin may add further admin accounts.
    pub async fn register_admin(
        &self,
        req: RegisterAdminRequest,
        caller: Option<&AuthUser>,
    ) -> Result<admin_user::Model, AuthError> {
        let admin_count = admin_user::Entity::find()
            .count(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        if admin_count > 0 && !caller.map(AuthUser::is_admin).unwrap_or(false) {
            return Err(AuthError::InsufficientPermissions);
        }

        let existing = admin_user::Entity::find()
            .filter(admin_user::Column::Username.eq(req.username.clone()))
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        if existing.is_some() {
            return Err(AuthError::Conflict(format!(
                "Admin account {} already exists",
                req.username
            )));
        }

        let password_hash = hash_password(&req.password)?;
        let model = admin_user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(req.username),
            password_hash: Set(password_hash),
            display_name: Set(req.display_name),
            email: Set(req.email),
            active: Set(true),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };

        let created = model
            .insert(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;
        info!("Registered admin account {}", created.id);
        Ok(created)
    }

    /// Generate a JWT token pair for an authenticated principal
    pub async fn generate_token(&self, principal: &Principal) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;
        let refresh_exp = now
            + ChronoDuration::from_std(self.config.refresh_token_expiration)
                .map_err(|_| AuthError::InternalError("Invalid token duration".to_string()))?;

        // Generate unique token IDs
        let access_jti = Uuid::new_v4().to_string();
        let refresh_jti = Uuid::new_v4().to_string();

        // Create access token claims
        let access_claims = Claims {
            sub: principal.id.to_string(),
            name: principal.name.clone(),
            email: principal.email.clone(),
            roles: principal.roles.clone(),
            permissions: principal.permissions.clone(),
            jti: access_jti,
            iat: now.timestamp(),
            exp: access_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            scope: None,
        };

        // Refresh token claims carry the roles so the account can be
        // re-resolved on refresh, but no permissions
        let refresh_claims = Claims {
            sub: principal.id.to_string(),
            name: None,
            email: None,
            roles: principal.roles.clone(),
            permissions: vec![],
            jti: refresh_jti,
            iat: now.timestamp(),
            exp: refresh_exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
            scope: Some(REFRESH_SCOPE.to_string()),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &access_claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        let refresh_token = encode(
            &Header::new(Algorithm::HS256),
            &refresh_claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_expiration.as_secs() as i64,
            refresh_expires_in: self.config.refresh_token_expiration.as_secs() as i64,
        })
    }

    /// Validate a JWT token and extract the claims
    pub async fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.config.jwt_audience.clone()]);
        validation.set_issuer(&[self.config.jwt_issuer.clone()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        // Check if the token is blacklisted
        if self.is_token_blacklisted(&claims.jti).await {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims)
    }

    /// Refresh an access token using a refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.validate_token(refresh_token).await?;

        // Only refresh-scoped tokens may be exchanged
        if claims.scope.as_deref() != Some(REFRESH_SCOPE) {
            return Err(AuthError::InvalidToken);
        }

        let account_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        // Re-resolve the account so refreshed tokens pick up current state
        let principal = self.load_principal(account_id, &claims.roles).await?;
        let new_tokens = self.generate_token(&principal).await?;

        // Rotate: the used refresh token is revoked
        self.blacklist_jti(&claims.jti, claims.exp).await;
        debug!("Rotated refresh token for account {}", account_id);

        Ok(new_tokens)
    }

    /// Revoke a token (add it to the blacklist)
    pub async fn revoke_token(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.validate_token(token).await?;
        self.blacklist_jti(&claims.jti, claims.exp).await;
        Ok(())
    }

    async fn blacklist_jti(&self, jti: &str, exp: i64) {
        let expiry = Utc::now() + ChronoDuration::seconds(exp - Utc::now().timestamp());
        let mut blacklist = self.blacklisted_tokens.write().await;
        blacklist.push(BlacklistedToken {
            jti: jti.to_string(),
            expiry,
        });
        self.clean_blacklist(&mut blacklist);
    }

    /// Check if a token is blacklisted
    async fn is_token_blacklisted(&self, token_id: &str) -> bool {
        let blacklist = self.blacklisted_tokens.read().await;
        blacklist.iter().any(|t| t.jti == token_id)
    }

    /// Clean up expired tokens from the blacklist
    fn clean_blacklist(&self, blacklist: &mut Vec<BlacklistedToken>) {
        let now = Utc::now();
        blacklist.retain(|t| t.expiry > now);
    }

    /// Load a principal from the table matching its role
    async fn load_principal(
        &self,
        account_id: Uuid,
        roles: &[String],
    ) -> Result<Principal, AuthError> {
        if roles.iter().any(|r| r == ROLE_ADMIN) {
            let admin = admin_user::Entity::find_by_id(account_id)
                .one(&*self.db)
                .await
                .map_err(|e| AuthError::DatabaseError(e.to_string()))?
                .ok_or(AuthError::UserNotFound)?;
            if !admin.active {
                return Err(AuthError::AccountDisabled);
            }
            return Ok(Principal {
                id: admin.id,
                name: admin.display_name.clone().or(Some(admin.username.clone())),
                email: admin.email.clone(),
                roles: vec![ROLE_ADMIN.to_string()],
                permissions: admin_permissions(),
            });
        }

        let account = distributor::Entity::find_by_id(account_id)
            .one(&*self.db)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UserNotFound)?;
        if !account.active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(Principal {
            id: account.id,
            name: Some(account.name.clone()),
            email: Some(account.email.clone()),
            roles: vec![ROLE_DISTRIBUTOR.to_string()],
            permissions: distributor_permissions(),
        })
    }
}

/// Hash a password for storage using Argon2id with a random salt
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::InternalError(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Token pair response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
}

/// Warehouse admin login credentials
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminLoginRequest {
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Distributor login credentials
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DistributorLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

/// Warehouse admin registration payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterAdminRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub display_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token has been revoked")]
    RevokedToken,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("Account not found")]
    UserNotFound,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::MissingAuth => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING",
                "Authentication required".to_string(),
            ),
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
            ),
            Self::AccountDisabled => (
                StatusCode::FORBIDDEN,
                "AUTH_ACCOUNT_DISABLED",
                "Account has been disabled".to_string(),
            ),
            Self::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_MISSING_TOKEN",
                "No authentication token provided".to_string(),
            ),
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_TOKEN",
                "Invalid authentication token".to_string(),
            ),
            Self::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                "AUTH_TOKEN_EXPIRED",
                "Token has expired".to_string(),
            ),
            Self::RevokedToken => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REVOKED_TOKEN",
                "Authentication token has been revoked".to_string(),
            ),
            Self::TokenCreation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_TOKEN_CREATION_FAILED",
                msg.clone(),
            ),
            Self::UserNotFound => (
                StatusCode::NOT_FOUND,
                "AUTH_USER_NOT_FOUND",
                "Account not found".to_string(),
            ),
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_INSUFFICIENT_PERMISSIONS",
                "Insufficient permissions".to_string(),
            ),
            Self::ValidationFailed(msg) => {
                (StatusCode::BAD_REQUEST, "AUTH_VALIDATION_FAILED", msg.clone())
            }
            Self::Conflict(msg) => (StatusCode::CONFLICT, "AUTH_CONFLICT", msg.clone()),
            Self::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_DATABASE_ERROR",
                "An internal error occurred".to_string(),
            ),
            Self::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTH_INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<AuthError> for crate::errors::ServiceError {
    fn from(err: AuthError) -> Self {
        use crate::errors::ServiceError;
        match err {
            AuthError::MissingAuth
            | AuthError::MissingToken
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::RevokedToken
            | AuthError::InvalidCredentials => ServiceError::Unauthorized(err.to_string()),
            AuthError::AccountDisabled | AuthError::InsufficientPermissions => {
                ServiceError::Forbidden(err.to_string())
            }
            AuthError::UserNotFound => ServiceError::NotFound("Account not found".to_string()),
            AuthError::ValidationFailed(msg) => ServiceError::ValidationError(msg),
            AuthError::Conflict(msg) => ServiceError::Conflict(msg),
            AuthError::TokenCreation(msg) => ServiceError::JwtError(msg),
            AuthError::DatabaseError(msg) | AuthError::InternalError(msg) => {
                ServiceError::InternalError(msg)
            }
        }
    }
}

/// Permission middleware to check if an account has the required permission
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    // Admins have all permissions
    if user.has_role(ROLE_ADMIN) {
        return Ok(next.run(request).await);
    }

    let checker = PermissionService::new();
    let allowed = user
        .permissions
        .iter()
        .any(|granted| checker.is_permission_implied(granted, &required_permission));
    if !allowed {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Role middleware to check if an account has the required role
pub async fn role_middleware(
    State(required_role): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = match request.extensions().get::<AuthUser>() {
        Some(user) => user.clone(),
        None => return Err(AuthError::MissingAuth),
    };

    if !user.has_role(&required_role) {
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that extracts and validates auth tokens
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let headers = request.headers().clone();

    // The auth service is installed as a request extension at router setup
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let auth_result = extract_auth_from_headers(&headers, &auth_service).await;

    match auth_result {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Extract authentication info from request headers
async fn extract_auth_from_headers(
    headers: &HeaderMap,
    auth_service: &AuthService,
) -> Result<AuthUser, AuthError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_value) = auth_header.to_str() {
            if auth_value.starts_with("Bearer ") {
                let token = auth_value.trim_start_matches("Bearer ").trim();
                let claims = auth_service.validate_token(token).await?;

                // Refresh tokens cannot be used to call the API directly
                if claims.scope.as_deref() == Some(REFRESH_SCOPE) {
                    return Err(AuthError::InvalidToken);
                }

                return Ok(AuthUser {
                    user_id: claims.sub,
                    name: claims.name,
                    email: claims.email,
                    roles: claims.roles,
                    permissions: claims.permissions,
                    token_id: claims.jti,
                });
            }
        }
    }

    Err(AuthError::MissingAuth)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_permission(self, permission: &str) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
        .with_auth()
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

/// Build the authentication router
pub fn auth_routes() -> axum::Router<Arc<AuthService>> {
    use axum::routing::post;

    axum::Router::new()
        .route("/login", post(admin_login_handler))
        .route("/distributor/login", post(distributor_login_handler))
        .route("/register", post(register_handler))
        .route("/refresh", post(refresh_token_handler))
        .route("/logout", post(logout_handler))
        // Credentials and tokens are small; reject oversized bodies early
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// Warehouse admin login handler
async fn admin_login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<AdminLoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    credentials
        .validate()
        .map_err(|_| AuthError::InvalidCredentials)?;
    let principal = auth_service
        .authenticate_admin(&credentials.username, &credentials.password)
        .await?;
    let tokens = auth_service.generate_token(&principal).await?;
    Ok(Json(tokens))
}

/// Distributor login handler
async fn distributor_login_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(credentials): Json<DistributorLoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    credentials
        .validate()
        .map_err(|_| AuthError::InvalidCredentials)?;
    let principal = auth_service
        .authenticate_distributor(&credentials.email, &credentials.password)
        .await?;
    let tokens = auth_service.generate_token(&principal).await?;
    Ok(Json(tokens))
}

/// Admin registration handler. The route is public for the bootstrap case;
/// the service refuses further registrations unless the caller is an admin.
async fn register_handler(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
    Json(request): Json<RegisterAdminRequest>,
) -> Result<impl IntoResponse, AuthError> {
    request
        .validate()
        .map_err(|e| AuthError::ValidationFailed(e.to_string()))?;

    let caller = match extract_auth_from_headers(&headers, &auth_service).await {
        Ok(user) => Some(user),
        Err(AuthError::MissingAuth) => None,
        Err(e) => return Err(e),
    };

    let created = auth_service
        .register_admin(request, caller.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Token refresh handler
async fn refresh_token_handler(
    State(auth_service): State<Arc<AuthService>>,
    Json(request): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let tokens = auth_service.refresh_token(&request.refresh_token).await?;
    Ok(Json(tokens))
}

/// Logout handler that revokes the presented access token
async fn logout_handler(
    State(auth_service): State<Arc<AuthService>>,
    headers: HeaderMap,
) -> Result<StatusCode, AuthError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| v.starts_with("Bearer "))
        .map(|v| v.trim_start_matches("Bearer ").trim().to_string())
        .ok_or(AuthError::MissingToken)?;

    auth_service.revoke_token(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        let config = AuthConfig::new(
            "unit_test_signing_secret_with_plenty_of_length_and_entropy_zx91!?".to_string(),
            "distribera-clients".to_string(),
            "distribera-api".to_string(),
            Duration::from_secs(60),
            Duration::from_secs(3600),
        );
        AuthService::new(config, Arc::new(DatabaseConnection::default()))
    }

    fn test_principal(roles: Vec<String>, permissions: Vec<String>) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: Some("Test Account".to_string()),
            email: Some("test@example.com".to_string()),
            roles,
            permissions,
        }
    }

    #[tokio::test]
    async fn access_token_round_trips() {
        let service = test_service();
        let principal = test_principal(
            vec![ROLE_DISTRIBUTOR.to_string()],
            distributor_permissions(),
        );

        let pair = service.generate_token(&principal).await.unwrap();
        let claims = service.validate_token(&pair.access_token).await.unwrap();

        assert_eq!(claims.sub, principal.id.to_string());
        assert!(claims.roles.contains(&ROLE_DISTRIBUTOR.to_string()));
        assert!(claims.permissions.contains(&consts::ORDERS_CREATE.to_string()));
        assert_eq!(claims.scope, None);
    }

    #[tokio::test]
    async fn refresh_token_is_scoped() {
        let service = test_service();
        let principal = test_principal(vec![ROLE_ADMIN.to_string()], admin_permissions());

        let pair = service.generate_token(&principal).await.unwrap();
        let claims = service.validate_token(&pair.refresh_token).await.unwrap();

        assert_eq!(claims.scope.as_deref(), Some(REFRESH_SCOPE));
        assert!(claims.permissions.is_empty());
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let service = test_service();
        let principal = test_principal(vec![ROLE_ADMIN.to_string()], admin_permissions());

        let pair = service.generate_token(&principal).await.unwrap();
        service.revoke_token(&pair.access_token).await.unwrap();

        let result = service.validate_token(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::RevokedToken)));
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let service = test_service();
        let principal = test_principal(vec![ROLE_ADMIN.to_string()], admin_permissions());
        let pair = service.generate_token(&principal).await.unwrap();

        let other = AuthService::new(
            AuthConfig::new(
                "a_completely_different_signing_secret_also_long_enough_qpz734!?x".to_string(),
                "distribera-clients".to_string(),
                "distribera-api".to_string(),
                Duration::from_secs(60),
                Duration::from_secs(3600),
            ),
            Arc::new(DatabaseConnection::default()),
        );

        let result = other.validate_token(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn password_hash_round_trips() {
        let hash = hash_password("district-7-secret").unwrap();
        assert_ne!(hash, "district-7-secret");
        assert!(verify_password("district-7-secret", &hash));
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn auth_user_role_helpers() {
        let user = AuthUser {
            user_id: Uuid::new_v4().to_string(),
            name: None,
            email: None,
            roles: vec![ROLE_DISTRIBUTOR.to_string()],
            permissions: distributor_permissions(),
            token_id: Uuid::new_v4().to_string(),
        };
        assert!(user.is_distributor());
        assert!(!user.is_admin());
        assert!(user.has_permission(consts::SALES_CREATE));
        assert!(user.account_id().is_ok());
    }
}
