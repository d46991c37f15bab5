//! Cofre Web Server
//!
//! Axum-based REST API for the Cofre personal finance application.
//!
//! Security features:
//! - Bearer-JWT authentication on every route except register/login
//!   (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Per-user data isolation enforced at the database layer
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use cofre_core::chat::ChatClient;
use cofre_core::db::Database;

mod handlers;

/// Environment variable for the JWT signing secret
pub const JWT_SECRET_ENV: &str = "COFRE_JWT_SECRET";

/// Token lifetime
const TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// HS256 signing secret for login tokens
    pub jwt_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            jwt_secret: std::env::var(JWT_SECRET_ENV).unwrap_or_default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Client for the external AI chat webhook, when configured
    pub chat: Option<ChatClient>,
}

/// The authenticated caller, inserted by the auth middleware
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

/// JWT claims for login tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub email: String,
    /// Expiry (unix seconds)
    pub exp: i64,
}

/// Issue a login token for a user
pub fn issue_token(secret: &str, user_id: i64, email: &str) -> Result<String, AppError> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: chrono::Utc::now().timestamp() + TOKEN_TTL_SECS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_from(anyhow::anyhow!("Failed to sign token: {}", e)))
}

fn decode_token(secret: &str, token: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Token validation failed: {}", e))
}

/// Authentication middleware
///
/// Validates the bearer JWT and inserts `AuthUser` for the handlers. With
/// `require_auth` disabled (local dev), requests without a token run as the
/// first registered user; a valid token is still honored when present.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    if let Some(token) = bearer {
        match decode_token(&state.config.jwt_secret, &token) {
            Ok(claims) => {
                request
                    .extensions_mut()
                    .insert(AuthUser { user_id: claims.sub });
                return next.run(request).await;
            }
            Err(e) => {
                warn!(error = %e, path = %request.uri().path(), "Invalid token");
                if state.config.require_auth {
                    return unauthorized();
                }
            }
        }
    }

    if !state.config.require_auth {
        // Dev mode fallback: run as the first registered user
        if let Ok(Some(user)) = state.db.get_user(1) {
            request.extensions_mut().insert(AuthUser { user_id: user.id });
            return next.run(request).await;
        }
    }

    warn!(path = %request.uri().path(), "Unauthorized request");
    unauthorized()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let chat = match ChatClient::from_env() {
        Ok(Some(client)) => {
            info!("Chat webhook configured");
            Some(client)
        }
        Ok(None) => {
            info!(
                "Chat webhook not configured (set {} to enable /api/chat)",
                cofre_core::chat::AI_WEBHOOK_URL_ENV
            );
            None
        }
        Err(e) => {
            warn!(error = %e, "Failed to build chat client");
            None
        }
    };

    create_router_with_chat(db, config, chat)
}

/// Create the application router with an explicit chat client (for testing)
pub fn create_router_with_chat(
    db: Database,
    config: ServerConfig,
    chat: Option<ChatClient>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        chat,
    });

    let protected = Router::new()
        // Accounts
        .route(
            "/accounts",
            get(handlers::list_accounts).post(handlers::create_account),
        )
        .route(
            "/accounts/:id",
            get(handlers::get_account)
                .put(handlers::update_account)
                .delete(handlers::delete_account),
        )
        .route("/accounts/:id/status", post(handlers::toggle_account_status))
        // Banks
        .route("/banks", get(handlers::list_banks).post(handlers::create_bank))
        .route(
            "/banks/:id",
            get(handlers::get_bank)
                .put(handlers::update_bank)
                .delete(handlers::delete_bank),
        )
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/:id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route(
            "/categories/:id/status",
            post(handlers::toggle_category_status),
        )
        // Cards
        .route("/cards", get(handlers::list_cards).post(handlers::create_card))
        .route(
            "/cards/:id",
            get(handlers::get_card)
                .put(handlers::update_card)
                .delete(handlers::delete_card),
        )
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Invoices
        .route("/invoices", get(handlers::list_invoices))
        .route("/invoices/:id", get(handlers::get_invoice))
        .route("/invoices/:id/pay", post(handlers::pay_invoice))
        // Bills
        .route("/bills", get(handlers::list_bills).post(handlers::create_bill))
        .route("/bills/pending", get(handlers::list_pending_payments))
        .route(
            "/bills/:id",
            get(handlers::get_bill)
                .put(handlers::update_bill)
                .delete(handlers::delete_bill),
        )
        .route("/bills/:id/status", post(handlers::toggle_bill_status))
        .route("/bills/:id/payments", get(handlers::list_bill_payments))
        .route("/bills/payments/:id/pay", post(handlers::pay_bill))
        // Debts
        .route("/debts", get(handlers::list_debts).post(handlers::create_debt))
        .route(
            "/debts/:id",
            get(handlers::get_debt)
                .put(handlers::update_debt)
                .delete(handlers::cancel_debt),
        )
        .route("/debts/:id/pay", post(handlers::pay_debt))
        .route("/debts/:id/payments", get(handlers::list_debt_payments))
        // Investments
        .route(
            "/investments",
            get(handlers::list_investments).post(handlers::create_investment),
        )
        .route(
            "/investments/:id",
            get(handlers::get_investment)
                .put(handlers::update_investment)
                .delete(handlers::delete_investment),
        )
        // Export
        .route("/export/transactions", get(handlers::export_transactions))
        // Chat proxy
        .route("/chat", post(handlers::chat))
        // Me
        .route("/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let public = Router::new()
        .route("/users", post(handlers::register))
        .route("/login", post(handlers::login));

    let api_routes = public.merge(protected);

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("Authentication disabled - do not expose to network!");
    }
    if config.require_auth && config.jwt_secret.is_empty() {
        anyhow::bail!(
            "No JWT secret configured. Set {} or run with --no-auth for local development.",
            JWT_SECRET_ENV
        );
    }

    let app = create_router(db, config);
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
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    fn internal_from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            internal: Some(err),
        }
    }
}

impl From<cofre_core::Error> for AppError {
    fn from(err: cofre_core::Error) -> Self {
        use cofre_core::Error as E;

        let status = match &err {
            E::Validation(_) | E::InsufficientFunds(_) => StatusCode::BAD_REQUEST,
            E::Ownership(_) => StatusCode::FORBIDDEN,
            E::NotFound(_) => StatusCode::NOT_FOUND,
            E::Conflict(_) => StatusCode::CONFLICT,
            E::External(_) => StatusCode::BAD_GATEWAY,
            E::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            E::Database(_)
            | E::Pool(_)
            | E::Encryption(_)
            | E::Csv(_)
            | E::Io(_)
            | E::Http(_)
            | E::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            Self::internal_from(err.into())
        } else {
            Self {
                status,
                message: err.to_string(),
                internal: None,
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}
