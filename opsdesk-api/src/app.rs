/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use opsdesk_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = opsdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::{Config, CorsConfig},
    error::ApiError,
    middleware::{identity::require_caller, preflight::answer_options},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Routes
///
/// ```text
/// /
/// ├── GET    /health                       (public)
/// ├── POST   /auth/login                   (public)
/// ├── POST   /auth/refresh                 (public)
/// ├── GET    /dashboard
/// ├── GET|POST|PATCH|DELETE /budgets       PATCH/DELETE take ?id=
/// ├── GET|POST|PATCH|DELETE /invoices
/// ├── GET|POST|PATCH|DELETE /tasks
/// ├── GET|POST|PATCH|DELETE /notes
/// ├── GET|POST|PATCH|DELETE /team          PATCH takes ?userId=&action=role|status
/// └── GET|PATCH /profile                   caller only
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. CORS (tower-http CorsLayer); answers real preflights
/// 2. Logging (tower-http TraceLayer)
/// 3. Bare `OPTIONS` → 200
/// 4. Identity, on matched methods of protected routes only
///
/// Identity is a method-level route layer, so an unsupported method on a
/// known path is 405 whether or not the request carries a token.
pub fn build_router(state: AppState) -> Router {
    let auth = axum::middleware::from_fn_with_state(state.clone(), require_caller);

    let public_routes = Router::new()
        .route(
            "/health",
            get(routes::health::health_check).fallback(method_not_allowed),
        )
        .route(
            "/auth/login",
            post(routes::auth::login).fallback(method_not_allowed),
        )
        .route(
            "/auth/refresh",
            post(routes::auth::refresh).fallback(method_not_allowed),
        );

    let protected_routes = Router::new()
        .route(
            "/dashboard",
            get(routes::dashboard::get_dashboard)
                .fallback(method_not_allowed)
                .route_layer(auth.clone()),
        )
        .route(
            "/budgets",
            get(routes::budgets::list)
                .post(routes::budgets::create)
                .patch(routes::budgets::update)
                .delete(routes::budgets::delete)
                .fallback(method_not_allowed)
                .route_layer(auth.clone()),
        )
        .route(
            "/invoices",
            get(routes::invoices::list)
                .post(routes::invoices::create)
                .patch(routes::invoices::update)
                .delete(routes::invoices::delete)
                .fallback(method_not_allowed)
                .route_layer(auth.clone()),
        )
        .route(
            "/tasks",
            get(routes::tasks::list)
                .post(routes::tasks::create)
                .patch(routes::tasks::update)
                .delete(routes::tasks::delete)
                .fallback(method_not_allowed)
                .route_layer(auth.clone()),
        )
        .route(
            "/notes",
            get(routes::notes::list)
                .post(routes::notes::create)
                .patch(routes::notes::update)
                .delete(routes::notes::delete)
                .fallback(method_not_allowed)
                .route_layer(auth.clone()),
        )
        .route(
            "/team",
            get(routes::team::list)
                .post(routes::team::create)
                .patch(routes::team::update)
                .delete(routes::team::delete)
                .fallback(method_not_allowed)
                .route_layer(auth.clone()),
        )
        .route(
            "/profile",
            get(routes::profile::get_profile)
                .patch(routes::profile::update_profile)
                .fallback(method_not_allowed)
                .route_layer(auth),
        );

    let cors = cors_layer(&state.config.cors);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(answer_options))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// CORS layer for the configured origins
///
/// `*` is fully permissive. An explicit list allows those origins with
/// credentials, for the methods the API serves.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    match config {
        CorsConfig::Any => CorsLayer::permissive(),
        CorsConfig::Origins(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true)
                .max_age(std::time::Duration::from_secs(3600))
        }
    }
}
