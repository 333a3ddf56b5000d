/*!
 * # Authentication and Authorization Module
 *
 * Employees log in with their phone number and password. A successful login
 * creates a row in `sessions` and returns an HS256 JWT whose `jti` is the
 * session id. Every protected request is checked against that row, so logging
 * out or deactivating an employee takes effect immediately.
 *
 * Role checks happen in router middleware; see [`AuthRouterExt`].
 */

use crate::{
    config::AppConfig,
    entities::{
        employee::{self, Entity as Employee},
        session::{self, Entity as Session},
        EmployeeRole,
    },
    events::{Event, EventSender},
    services::employees::EmployeeView,
    validation::{normalize_phone, validate_phone},
};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub mod password;

pub const SUPERVISOR_ROLE: &str = "supervisor";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // Employee id
    pub role: String, // supervisor | staff
    pub jti: String,  // Session id
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

/// Authenticated employee resolved from a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub employee_id: Uuid,
    pub name: String,
    pub role: EmployeeRole,
    pub session_id: Uuid,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.role.to_string() == role
    }

    pub fn is_supervisor(&self) -> bool {
        self.role.is_supervisor()
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub session_ttl: ChronoDuration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, jwt_issuer: String, session_ttl: ChronoDuration) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            session_ttl,
        }
    }

    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.session_ttl(),
        )
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(custom = "validate_phone")]
    pub phone: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub employee: EmployeeView,
}

/// Authentication service that handles login, session validation and logout
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
    pub db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            config,
            db,
            event_sender,
        }
    }

    /// Verifies phone and password and opens a new session.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        request
            .validate()
            .map_err(|_| AuthError::InvalidCredentials)?;

        let phone = normalize_phone(&request.phone);
        let employee = Employee::find()
            .filter(employee::Column::Phone.eq(phone))
            .filter(employee::Column::Active.eq(true))
            .one(&*self.db)
            .await?;

        let verified = match &employee {
            Some(found) => {
                password::verify_password_blocking(request.password, found.password_hash.clone())
                    .await
            }
            None => false,
        };
        let employee = match employee {
            Some(employee) if verified => employee,
            _ => {
                crate::metrics::record_login(false);
                warn!("login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let now = Utc::now();
        let expires_at = now + self.config.session_ttl;
        let session = session::ActiveModel {
            id: Set(Uuid::new_v4()),
            employee_id: Set(employee.id),
            created_at: Set(now),
            expires_at: Set(expires_at),
            revoked_at: Set(None),
        }
        .insert(&*self.db)
        .await?;

        let token = self.issue_token(&employee, &session)?;

        crate::metrics::record_login(true);
        self.event_sender.send_or_log(Event::SessionStarted {
            session_id: session.id,
            employee_id: employee.id,
        });
        info!(employee_id = %employee.id, session_id = %session.id, "employee logged in");

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_at: session.expires_at,
            employee: EmployeeView::from(employee),
        })
    }

    fn issue_token(
        &self,
        employee: &employee::Model,
        session: &session::Model,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: employee.id.to_string(),
            role: employee.role.to_string(),
            jti: session.id.to_string(),
            iat: session.created_at.timestamp(),
            exp: session.expires_at.timestamp(),
            iss: self.config.jwt_issuer.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.jwt_issuer.as_str()]);

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

        Ok(claims)
    }

    /// Resolves a bearer token into the employee behind a live session.
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.validate_token(token)?;
        let session_id = Uuid::parse_str(&claims.jti).map_err(|_| AuthError::InvalidToken)?;
        let employee_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let session = Session::find_by_id(session_id)
            .one(&*self.db)
            .await?
            .ok_or(AuthError::RevokedToken)?;

        if session.employee_id != employee_id {
            return Err(AuthError::InvalidToken);
        }
        if !session.is_usable_at(Utc::now()) {
            debug!(%session_id, "session revoked or expired");
            return Err(AuthError::RevokedToken);
        }

        let employee = Employee::find_by_id(employee_id)
            .one(&*self.db)
            .await?
            .filter(|e| e.active)
            .ok_or(AuthError::InactiveEmployee)?;

        Ok(AuthUser {
            employee_id: employee.id,
            name: employee.name,
            role: employee.role,
            session_id,
        })
    }

    /// Revokes one session. Revoking twice is harmless.
    #[instrument(skip(self))]
    pub async fn logout(&self, user: &AuthUser) -> Result<(), AuthError> {
        session::Entity::update_many()
            .col_expr(
                session::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(session::Column::Id.eq(user.session_id))
            .filter(session::Column::RevokedAt.is_null())
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::SessionRevoked {
            session_id: user.session_id,
            employee_id: user.employee_id,
        });
        info!(employee_id = %user.employee_id, session_id = %user.session_id, "employee logged out");
        Ok(())
    }

    /// Revokes every open session of an employee on the given connection or transaction.
    pub async fn revoke_employee_sessions<C: ConnectionTrait>(
        conn: &C,
        employee_id: Uuid,
    ) -> Result<u64, sea_orm::DbErr> {
        let result = session::Entity::update_many()
            .col_expr(
                session::Column::RevokedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(session::Column::EmployeeId.eq(employee_id))
            .filter(session::Column::RevokedAt.is_null())
            .exec(conn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Creates the configured supervisor when no employee exists yet.
    pub async fn bootstrap_supervisor(
        &self,
        name: &str,
        phone: &str,
        password: &str,
    ) -> Result<Option<Uuid>, AuthError> {
        let existing = Employee::find().count(&*self.db).await?;
        if existing > 0 {
            debug!(existing, "employees present; skipping supervisor bootstrap");
            return Ok(None);
        }

        let hash = password::hash_password_blocking(password.to_string())
            .await
            .map_err(AuthError::InternalError)?;
        let now = Utc::now();
        let model = employee::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            phone: Set(normalize_phone(phone)),
            password_hash: Set(hash),
            role: Set(EmployeeRole::Supervisor),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        info!(employee_id = %model.id, "bootstrap supervisor created");
        Ok(Some(model.id))
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Session has been revoked")]
    RevokedToken,

    #[error("Employee is inactive")]
    InactiveEmployee,

    #[error("Token creation failed: {0}")]
    TokenCreation(String),

    #[error("access denied")]
    InsufficientPermissions,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        AuthError::DatabaseError(err.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message): (StatusCode, &str, String) = match &self {
            Self::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INVALID_CREDENTIALS",
                "Invalid credentials".to_string(),
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
                "AUTH_SESSION_ENDED",
                "Session has ended; log in again".to_string(),
            ),
            Self::InactiveEmployee => (
                StatusCode::UNAUTHORIZED,
                "AUTH_INACTIVE_EMPLOYEE",
                "Employee account is inactive".to_string(),
            ),
            Self::TokenCreation(msg) => {
                tracing::error!(error = %msg, "token creation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_TOKEN_CREATION_FAILED",
                    "Internal server error".to_string(),
                )
            }
            Self::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                "AUTH_ACCESS_DENIED",
                "access denied".to_string(),
            ),
            Self::DatabaseError(msg) | Self::InternalError(msg) => {
                tracing::error!(error = %msg, "authentication failed internally");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "AUTH_INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
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

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Role middleware to check if a user has the required role
pub async fn role_middleware(
    axum::extract::State(required_role): axum::extract::State<String>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AuthError::MissingToken)?;

    if !user.has_role(&required_role) {
        warn!(employee_id = %user.employee_id, required_role = %required_role, "role check failed");
        return Err(AuthError::InsufficientPermissions);
    }

    Ok(next.run(request).await)
}

/// Authentication middleware that validates the bearer token against its session
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
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

    let token = match bearer_token(request.headers()) {
        Some(token) => token.to_string(),
        None => return AuthError::MissingToken.into_response(),
    };

    match auth_service.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Authentication routes, mounted under `/auth`
pub fn auth_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let session_routes = Router::new()
        .route("/logout", post(logout_handler))
        .route("/me", get(me_handler))
        .with_auth();

    Router::new()
        .route("/login", post(login_handler))
        .merge(session_routes)
        .layer(DefaultBodyLimit::max(1024 * 64))
}

/// Log in with phone and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let response = auth_service.login(credentials).await?;
    Ok(Json(response))
}

/// Revoke the current session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Session revoked")),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<serde_json::Value>, AuthError> {
    auth_service.logout(&user).await?;
    Ok(Json(serde_json::json!({ "message": "Successfully logged out" })))
}

/// Current session employee
#[utoipa::path(
    get,
    path = "/auth/me",
    responses((status = 200, description = "Session employee", body = EmployeeView)),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<EmployeeView>, AuthError> {
    let employee = Employee::find_by_id(user.employee_id)
        .one(&*auth_service.db)
        .await?
        .ok_or(AuthError::InactiveEmployee)?;
    Ok(Json(EmployeeView::from(employee)))
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_role(self, role: &str) -> Self;
}

impl<S> AuthRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_role(self, role: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            role.to_string(),
            role_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn service() -> AuthService {
        let (tx, _rx) = mpsc::channel(8);
        AuthService::new(
            AuthConfig::new(
                "k9Qz_w2Lr7Vt8Xn4Mb3Hj6Gf1Ds5Pa0Ey".into(),
                "estoque-api".into(),
                ChronoDuration::hours(8),
            ),
            Arc::new(DatabaseConnection::Disconnected),
            EventSender::new(tx),
        )
    }

    fn sign(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(exp: i64, iss: &str) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            role: "staff".into(),
            jti: Uuid::new_v4().to_string(),
            iat: Utc::now().timestamp(),
            exp,
            iss: iss.into(),
        }
    }

    #[test]
    fn valid_token_round_trips_claims() {
        let svc = service();
        let c = claims((Utc::now() + ChronoDuration::hours(1)).timestamp(), "estoque-api");
        let token = sign(&svc.config.jwt_secret, &c);

        let decoded = svc.validate_token(&token).unwrap();
        assert_eq!(decoded.jti, c.jti);
        assert_eq!(decoded.role, "staff");
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let c = claims((Utc::now() - ChronoDuration::hours(2)).timestamp(), "estoque-api");
        let token = sign(&svc.config.jwt_secret, &c);
        assert!(matches!(svc.validate_token(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn wrong_secret_or_issuer_is_rejected() {
        let svc = service();
        let exp = (Utc::now() + ChronoDuration::hours(1)).timestamp();

        let forged = sign("another_secret_value_with_enough_length!", &claims(exp, "estoque-api"));
        assert!(matches!(svc.validate_token(&forged), Err(AuthError::InvalidToken)));

        let foreign = sign(&svc.config.jwt_secret, &claims(exp, "someone-else"));
        assert!(matches!(svc.validate_token(&foreign), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }

    #[test]
    fn access_denied_is_forbidden() {
        let response = AuthError::InsufficientPermissions.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = AuthError::RevokedToken.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn role_names_match_employee_roles() {
        let user = AuthUser {
            employee_id: Uuid::new_v4(),
            name: "Ana".into(),
            role: EmployeeRole::Supervisor,
            session_id: Uuid::new_v4(),
        };
        assert!(user.has_role(SUPERVISOR_ROLE));
        assert!(!user.has_role("staff"));
    }
}
