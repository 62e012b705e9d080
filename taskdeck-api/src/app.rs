/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use taskdeck_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = taskdeck_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskdeck_shared::auth::gate::{require, Capability};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Uses Arc
/// internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Token signing secret
    pub fn secret(&self) -> &str {
        &self.config.auth.secret_key
    }

    /// Token audience claim
    pub fn audience(&self) -> &str {
        &self.config.auth.audience
    }

    /// Access token lifetime
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.config.auth.token_ttl_minutes)
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// Everything is served under the `/api` prefix:
/// ```text
/// /api
/// ├── GET    /health                    # liveness (public, no store access)
/// ├── POST   /login                     # form login (public)
/// ├── GET    /mine/profile              # authenticated
/// ├── PATCH  /mine/profile              # authenticated
/// ├── PATCH  /mine/password             # authenticated
/// ├── GET    /mine/watch-tasks/         # activated
/// ├── PUT    /mine/watch-tasks/:id/     # activated
/// ├── DELETE /mine/watch-tasks/:id/     # activated
/// ├── PUT    /accounts/:id/             # administrator
/// ├── DELETE /accounts/:id/             # administrator
/// ├── PATCH  /accounts/:id/password     # administrator
/// ├── POST   /tasks/                    # activated, non-provisional
/// ├── POST   /tasks/search              # activated
/// ├── GET    /tasks/:id/                # activated
/// ├── PATCH  /tasks/:id/                # activated, non-provisional
/// └── DELETE /tasks/:id/                # activated, non-provisional
/// ```
///
/// The task routes share one `Activated` gate layer because GET and
/// PATCH/DELETE live on the same path; the write handlers tighten this to
/// `ActivatedNotProvisional` themselves before touching the store.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authorization gate (per route group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Public routes, no gate
    let public_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/login", post(routes::auth::login))
        // Trailing-slash alias kept for existing clients
        .route("/login/", post(routes::auth::login));

    // Own-profile routes admit any authenticated account, active or not,
    // so a freshly provisioned holder can set their first password
    let profile_routes = Router::new()
        .route(
            "/mine/profile",
            get(routes::profile::get_profile).patch(routes::profile::patch_profile),
        )
        .route("/mine/password", patch(routes::profile::change_password))
        .layer(middleware::from_fn(require(
            state.db.clone(),
            state.config.auth.secret_key.clone(),
            state.config.auth.audience.clone(),
            Capability::Authenticated,
        )));

    let watch_routes = Router::new()
        .route("/mine/watch-tasks/", get(routes::watch_tasks::list))
        .route(
            "/mine/watch-tasks/:task_id/",
            put(routes::watch_tasks::upsert).delete(routes::watch_tasks::remove),
        )
        .layer(middleware::from_fn(require(
            state.db.clone(),
            state.config.auth.secret_key.clone(),
            state.config.auth.audience.clone(),
            Capability::Activated,
        )));

    let account_routes = Router::new()
        .route(
            "/accounts/:account_id/",
            put(routes::accounts::create).delete(routes::accounts::remove),
        )
        .route(
            "/accounts/:account_id/password",
            patch(routes::accounts::reset_password),
        )
        .layer(middleware::from_fn(require(
            state.db.clone(),
            state.config.auth.secret_key.clone(),
            state.config.auth.audience.clone(),
            Capability::ActivatedAdministrator,
        )));

    let task_routes = Router::new()
        .route("/tasks/", post(routes::tasks::create))
        .route("/tasks/search", post(routes::tasks::search))
        .route(
            "/tasks/:task_id/",
            get(routes::tasks::get_by_id)
                .patch(routes::tasks::patch)
                .delete(routes::tasks::remove),
        )
        .layer(middleware::from_fn(require(
            state.db.clone(),
            state.config.auth.secret_key.clone(),
            state.config.auth.audience.clone(),
            Capability::Activated,
        )));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(profile_routes)
        .merge(watch_routes)
        .merge(account_routes)
        .merge(task_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}
