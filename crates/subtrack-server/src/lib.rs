//! Subtrack Web Server
//!
//! Axum-based REST API over the subtrack core library.
//!
//! Security features:
//! - Every request resolves to a user id before any handler runs
//!   (access-proxy header or API key; a fixed dev user only with auth off)
//! - Restrictive CORS policy
//! - Audit logging for all API access (reads and writes)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use subtrack_core::{Error as CoreError, ErrorKind, SubscriptionRepository, ValidationErrors};

mod handlers;

/// Upstream access-proxy header carrying the authenticated user's email
const CF_ACCESS_USER_HEADER: &str = "cf-access-authenticated-user-email";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// An API key and the user it acts as
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiKey {
    pub key: String,
    pub user_id: String,
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Keys accepted as `Authorization: Bearer <key>`
    pub api_keys: Vec<ApiKey>,
    /// Identity used for unauthenticated requests when `require_auth` is off
    pub dev_user: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            dev_user: "local-dev".to_string(),
        }
    }
}

/// Parse a comma-separated list of `key=user_id` pairs
///
/// Malformed entries are skipped with a warning.
pub fn parse_api_keys(input: &str) -> Vec<ApiKey> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|entry| match entry.split_once('=') {
            Some((key, user)) if !key.trim().is_empty() && !user.trim().is_empty() => {
                Some(ApiKey {
                    key: key.trim().to_string(),
                    user_id: user.trim().to_string(),
                })
            }
            _ => {
                // Never log the entry itself: it may be a key
                warn!("Ignoring malformed API key entry (expected key=user_id)");
                None
            }
        })
        .collect()
}

/// Shared application state
pub struct AppState {
    pub repo: Arc<dyn SubscriptionRepository>,
    pub config: ServerConfig,
}

/// How a request was authenticated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    AccessProxy,
    ApiKey,
    None,
}

/// Resolved caller, stored in request extensions by [`auth_middleware`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub method: AuthMethod,
}

/// Find the caller's identity in the request headers
///
/// Order: access-proxy header, then API key, then the dev user when
/// authentication is disabled.
pub(crate) fn resolve_identity(headers: &HeaderMap, config: &ServerConfig) -> Option<Identity> {
    let proxy_user = headers
        .get(CF_ACCESS_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(email) = proxy_user {
        return Some(Identity {
            user_id: email.to_string(),
            method: AuthMethod::AccessProxy,
        });
    }

    let api_key_user = headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .and_then(|key| match_api_key(key.trim(), &config.api_keys));
    if let Some(user_id) = api_key_user {
        return Some(Identity {
            user_id,
            method: AuthMethod::ApiKey,
        });
    }

    (!config.require_auth).then(|| Identity {
        user_id: config.dev_user.clone(),
        method: AuthMethod::None,
    })
}

/// Look up an API key using constant-time comparison
fn match_api_key(provided: &str, keys: &[ApiKey]) -> Option<String> {
    use subtle::ConstantTimeEq;

    let provided = provided.as_bytes();
    let mut found = None;
    // Every key is compared so the time taken does not depend on which matched
    for key in keys {
        let candidate = key.key.as_bytes();
        if candidate.len() == provided.len() && bool::from(candidate.ct_eq(provided)) {
            found = Some(key.user_id.clone());
        }
    }
    found
}

/// Authentication middleware: attach an [`Identity`] or answer 401
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_identity(request.headers(), &state.config) {
        Some(identity) => {
            debug!(
                user = %identity.user_id,
                method = ?identity.method,
                path = %request.uri().path(),
                "Authenticated"
            );
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
            AppError::from(CoreError::Auth).into_response()
        }
    }
}

/// Extractor for the identity resolved by [`auth_middleware`]
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::from(CoreError::Auth))
    }
}

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0.user_id
    }
}

/// Write one audit line for an API action
pub(crate) fn audit(user: &str, action: &str, entity_id: Option<&str>, details: Option<&str>) {
    info!(
        target: "audit",
        user,
        action,
        entity = "subscription",
        entity_id,
        details,
        "API access"
    );
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(
    repo: Arc<dyn SubscriptionRepository>,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> Router {
    let state = Arc::new(AppState {
        repo,
        config: config.clone(),
    });

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Subscriptions
        .route(
            "/subscriptions",
            get(handlers::list_subscriptions).post(handlers::create_subscription),
        )
        .route(
            "/subscriptions/:id",
            get(handlers::get_subscription)
                .patch(handlers::update_subscription)
                .delete(handlers::delete_subscription),
        )
        .route(
            "/subscriptions/:id/details",
            get(handlers::get_subscription_details),
        )
        // Stats
        .route("/stats", get(handlers::get_stats))
        // Export / Import
        .route("/export", get(handlers::export_subscriptions))
        .route("/import", axum::routing::post(handlers::import_subscriptions))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; connect-src 'self'; frame-ancestors 'none'",
    );

    let mut app = Router::new().nest("/api", api_routes);

    // Serve the web UI, if any, for everything outside /api
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    repo: Arc<dyn SubscriptionRepository>,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!(
            user = %config.dev_user,
            "⚠️  Authentication disabled - all requests act as the dev user. Do not expose to network!"
        );
    }
    if config.require_auth && config.api_keys.is_empty() {
        info!("No API keys configured; only access-proxy authenticated requests will be accepted");
    }

    let app = create_router(repo, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    fields: Option<ValidationErrors>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            fields: None,
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            fields: None,
            // Keep full error for logging
            internal: Some(err),
        }
    }

    fn from_core(err: CoreError) -> Self {
        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Format => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Auth => StatusCode::UNAUTHORIZED,
            ErrorKind::Persistence => return Self::internal(err.into()),
        };
        match err {
            CoreError::Validation(fields) => Self {
                status,
                message: "Validation failed".to_string(),
                fields: Some(fields),
                internal: None,
            },
            CoreError::NotFound(msg) => Self {
                status,
                message: msg,
                fields: None,
                internal: None,
            },
            other => Self {
                status,
                message: other.to_string(),
                fields: None,
                internal: None,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = match self.fields {
            Some(fields) => serde_json::json!({
                "error": self.message,
                "fields": fields,
            }),
            None => serde_json::json!({
                "error": self.message
            }),
        };

        (self.status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        // Core errors carry their own classification
        match err.into().downcast::<CoreError>() {
            Ok(core) => Self::from_core(core),
            Err(other) => Self::internal(other),
        }
    }
}
