//! api-server — HTTP API for the User Directory workspace.
//!
//! Exposes the directory core over JSON:
//! - `POST /users` create a user from `{name, email}`
//! - `GET /users/:id` fetch one user
//! - `GET /users?name=<query>` case-insensitive name search (lists all without `name`)
//! - `GET /health` static liveness check
//!
//! State is kept in memory for the lifetime of the process.
//!
//! Run:
//! ```bash
//! # pretty logs (default); PORT optional
//! cargo run -p api-server
//!
//! # JSON logs on a custom port
//! LOG_FORMAT=json PORT=3001 cargo run -p api-server
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.
//!

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use domain::adapters::memory_repo::InMemoryUserStore;
use domain::service::UserDirectory;
use domain::{CoreError, NewUser, User, UserId};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type Directory = UserDirectory<InMemoryUserStore>;

#[derive(Clone)]
struct AppState {
    directory: Arc<Directory>,
}

impl AppState {
    fn in_memory() -> Self {
        Self {
            directory: Arc::new(UserDirectory::new(InMemoryUserStore::new())),
        }
    }
}

#[tokio::main]
async fn main() {
    // Load and validate config first (fail fast on misconfiguration)
    let cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    cfg.warn_if_insecure();

    let state = AppState::in_memory();

    // Request ID header name
    let x_request_id = axum::http::HeaderName::from_static("x-request-id");

    let mut app = routes()
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .with_state(state);

    // CORS - already validated in Config::from_env()
    let cors = if cfg.cors_allow_origin == HeaderValue::from_static("*") {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list([cfg.cors_allow_origin.clone()]))
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers([axum::http::header::CONTENT_TYPE])
    };
    app = app.layer(cors);

    let addr = SocketAddr::new(cfg.bind_addr, cfg.port);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(%addr, err = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(%addr, "api-server listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(err = %e, "server error");
        std::process::exit(1);
    }
    info!("api-server stopped");
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stdout),
                )
                .init();
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM so in-flight requests can finish.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(err = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(err = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}

/// Route table without middleware; `main` adds tracing, request ids and CORS.
fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:id", get(get_user))
}

#[derive(Deserialize)]
struct CreateUserReq {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Serialize)]
struct UserOut {
    id: UserId,
    name: String,
    email: String,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name.as_str().to_string(),
            email: user.email.as_str().to_string(),
        }
    }
}

/// Map a core error onto its HTTP status and error envelope.
fn error_response(err: CoreError) -> Response {
    match err {
        CoreError::InvalidInput(msg) => (
            StatusCode::BAD_REQUEST,
            Json(http_common::json_error_with_message("invalid_request", &msg)),
        )
            .into_response(),
        CoreError::EmailConflict(email) => (
            StatusCode::CONFLICT,
            Json(http_common::json_error_with_message(
                "conflict",
                &format!("email already registered: {}", email),
            )),
        )
            .into_response(),
        CoreError::NotFound(_) => (
            StatusCode::NOT_FOUND,
            Json(http_common::json_err("not_found")),
        )
            .into_response(),
        CoreError::Repository(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(http_common::json_error_with_message(
                "internal",
                "server error",
            )),
        )
            .into_response(),
    }
}

async fn health() -> impl IntoResponse {
    Json(http_common::health_body())
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserReq>,
) -> Response {
    let candidate = match build_candidate(body) {
        Ok(c) => c,
        Err(e) => {
            warn!(err = %e, "create rejected");
            return error_response(e);
        }
    };

    match state.directory.create_user(candidate) {
        Ok(user) => {
            info!(id = %user.id, "create ok");
            (StatusCode::CREATED, Json(UserOut::from(user))).into_response()
        }
        Err(e @ CoreError::Repository(_)) => {
            error!(err = ?e, "create error");
            error_response(e)
        }
        Err(e) => {
            warn!(err = %e, "create rejected");
            error_response(e)
        }
    }
}

fn build_candidate(body: CreateUserReq) -> Result<NewUser, CoreError> {
    let name = body
        .name
        .ok_or_else(|| CoreError::InvalidInput("the name cannot be empty".into()))?;
    let email = body
        .email
        .ok_or_else(|| CoreError::InvalidInput("the email is invalid".into()))?;
    match body.id {
        Some(raw) => NewUser::with_id(UserId::parse(&raw)?, name, email),
        None => NewUser::new(name, email),
    }
}

async fn get_user(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let id = match UserId::parse(&raw_id) {
        Ok(id) => id,
        Err(e) => {
            warn!(id = %raw_id, "bad user id in path");
            return error_response(e);
        }
    };

    match state.directory.get_user_by_id(&id) {
        Ok(user) => (StatusCode::OK, Json(UserOut::from(user))).into_response(),
        Err(e @ CoreError::NotFound(_)) => {
            warn!(%id, "get 404");
            error_response(e)
        }
        Err(e) => {
            error!(%id, err = ?e, "get error");
            error_response(e)
        }
    }
}

async fn list_users(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    let result = match q.name.as_deref() {
        Some(query) => state.directory.search_users(Some(query)),
        None => state.directory.list_users(),
    };

    match result {
        Ok(users) => {
            info!(count = users.len(), query = ?q.name, "list ok");
            let out: Vec<UserOut> = users.into_iter().map(UserOut::from).collect();
            (StatusCode::OK, Json(out)).into_response()
        }
        Err(e) => {
            error!(err = ?e, "list error");
            error_response(e)
        }
    }
}
