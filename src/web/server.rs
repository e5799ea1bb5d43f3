//! Axum HTTP server for the chat widget gateway.
//!
//! Handles the public chat and widget routes, the bearer-protected admin
//! routes, and the embedded demo and admin pages.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Query, State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use include_dir::{Dir, include_dir};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::assistant::AssistantGateway;
use crate::config::AllowedOrigins;
use crate::error::{AuthError, GatewayError, ServerError};
use crate::settings::{PublicSettings, RedactedSettings, SettingsStore, SettingsUpdate};
use crate::web::auth::{AdminAuth, admin_auth_middleware};
use crate::web::types::*;
use crate::web::widget::{EmbedSnippets, embed_snippets, render_widget_script};

static WEB_STATIC_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/src/web/static");

/// Maximum accepted request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for all handlers.
pub struct GatewayState {
    pub settings: Arc<SettingsStore>,
    pub gateway: Arc<AssistantGateway>,
    pub auth: Arc<AdminAuth>,
}

/// A server bound to a socket and serving in the background.
pub struct RunningServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.task
            .await
            .map_err(|e| ServerError::Serve(std::io::Error::other(e)))??;
        Ok(())
    }
}

/// Build the full router: routes, auth gate, CORS, tracing and limits.
pub fn build_router(state: Arc<GatewayState>, origins: &AllowedOrigins) -> Router {
    let admin = Router::new()
        .route(
            "/api/admin/config",
            get(admin_config_get_handler).post(admin_config_post_handler),
        )
        .route("/api/admin/embed-code", get(embed_code_handler))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            admin_auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/widget.js", get(widget_js_handler))
        .route("/api/admin/login", post(login_handler))
        .route("/api/widget/config", get(widget_config_handler))
        .route("/api/chat", post(chat_handler));

    let statics = Router::new()
        .route("/", get(index_handler))
        .route("/admin", get(admin_page_handler))
        .route("/admin.js", get(admin_js_handler))
        .route("/style.css", get(css_handler));

    let routes = Router::new()
        .merge(public)
        .merge(admin)
        .merge(statics)
        .fallback(not_found_handler);
    with_middleware(routes, origins).with_state(state)
}

/// Shared middleware stack. CORS sits outside the panic handler so the JSON
/// 500 still carries the allow-origin header.
fn with_middleware<S>(router: Router<S>, origins: &AllowedOrigins) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::mirror_request(),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
        ]))
        .allow_credentials(true)
}

/// Bind `bind_address` and serve in a background task.
///
/// The returned handle carries the actual bound address, which matters when
/// binding to port 0.
pub async fn start_server(
    bind_address: &str,
    state: Arc<GatewayState>,
    origins: &AllowedOrigins,
) -> Result<RunningServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| ServerError::StartupFailed {
            reason: format!("Failed to bind to {bind_address}: {e}"),
        })?;
    let addr = listener
        .local_addr()
        .map_err(|e| ServerError::StartupFailed {
            reason: format!("Failed to get local addr: {e}"),
        })?;

    let app = build_router(state, origins);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("HTTP server shutting down");
            })
            .await;
        if let Err(e) = &result {
            tracing::error!("HTTP server error: {}", e);
        }
        result
    });

    Ok(RunningServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

// --- Errors ---

/// Error reply in the `{error}` envelope.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse::new(self.message))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self::new(status, err.public_message())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => Self::new(StatusCode::UNAUTHORIZED, err.to_string()),
            AuthError::InvalidToken(_) => Self::new(StatusCode::FORBIDDEN, "Invalid token"),
            AuthError::InvalidPassword => Self::new(StatusCode::UNAUTHORIZED, "Invalid password"),
            AuthError::Hash(_) | AuthError::Signing(_) | AuthError::TaskFailed(_) => {
                tracing::error!(error = %err, "Admin authentication failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
            }
        }
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(detail = %detail, "Request handler panicked");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}

async fn not_found_handler() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Not found")
}

// --- Static file handlers ---

async fn index_handler() -> Response {
    static_asset_response("index.html")
}

async fn admin_page_handler() -> Response {
    static_asset_response("admin.html")
}

async fn admin_js_handler() -> Response {
    static_asset_response("admin.js")
}

async fn css_handler() -> Response {
    static_asset_response("style.css")
}

fn static_asset_response(name: &str) -> Response {
    let Some(file) = WEB_STATIC_DIR.get_file(name) else {
        return ApiError::new(StatusCode::NOT_FOUND, "Not found").into_response();
    };
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    (
        [(header::CONTENT_TYPE, mime.essence_str().to_string())],
        file.contents(),
    )
        .into_response()
}

// --- Public handlers ---

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `<scheme>://<host>` of the incoming request, honouring a TLS-terminating
/// proxy's `X-Forwarded-Proto`.
fn request_origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

async fn widget_js_handler(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> Response {
    let api_endpoint = format!("{}/api", request_origin(&headers));
    let settings = state.settings.get_public().await;
    let script = render_widget_script(&api_endpoint, &settings);
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        script,
    )
        .into_response()
}

async fn widget_config_handler(State(state): State<Arc<GatewayState>>) -> Json<PublicSettings> {
    Json(state.settings.get_public().await)
}

async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = body?;
    let thread_id = req.thread_id.as_deref().filter(|id| !id.trim().is_empty());

    match state.gateway.get_reply(&req.message, thread_id).await {
        Ok(reply) => Ok(Json(ChatResponse {
            message: reply.text,
            thread_id: reply.thread_id,
        })),
        Err(e) => {
            // Run failures, timeouts and ended runs are logged by the gateway.
            if matches!(e, GatewayError::Provider(_) | GatewayError::EmptyReply) {
                tracing::error!(error = %e, "Chat request failed");
            }
            Err(e.into())
        }
    }
}

// --- Admin handlers ---

async fn login_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = body?;
    if let Err(e) = state.auth.verify_password(req.password).await {
        if matches!(e, AuthError::InvalidPassword) {
            tracing::warn!("Rejected admin login");
        }
        return Err(e.into());
    }
    let token = state.auth.issue_token()?;
    tracing::info!("Admin logged in");
    Ok(Json(LoginResponse { token }))
}

async fn admin_config_get_handler(
    State(state): State<Arc<GatewayState>>,
) -> Json<RedactedSettings> {
    Json(state.settings.get().await)
}

async fn admin_config_post_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(update) = body?;
    state.settings.set(update).await;
    tracing::info!("Widget configuration updated");
    Ok(Json(MessageResponse {
        message: "Configuration saved successfully".to_string(),
    }))
}

async fn embed_code_handler(
    headers: HeaderMap,
    Query(query): Query<EmbedCodeQuery>,
) -> Result<Json<EmbedSnippets>, ApiError> {
    let raw = query
        .backend_url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| request_origin(&headers));
    let backend_url = Url::parse(raw.trim())
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "Invalid backendUrl"))?;
    Ok(Json(embed_snippets(&backend_url)))
}
