/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// The state is generic over the [`Store`], so the same router runs against
/// PostgreSQL in production and the in-memory store in tests.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskflow_api::{app::{build_router, AppState}, config::Config};
/// use taskflow_shared::realtime::{ConnectionRegistry, LocalPublisher};
/// use taskflow_shared::store::MemoryStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let registry = ConnectionRegistry::new();
/// let events = Arc::new(LocalPublisher::new(registry.clone()));
/// let state = AppState::new(Arc::new(MemoryStore::new()), events, registry, config);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, build_router(state)).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self as axum_middleware, Next},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use taskflow_shared::{
    auth::{jwt::TokenSettings, middleware::jwt_auth_middleware},
    realtime::{ConnectionRegistry, EventPublisher},
    services::Services,
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
pub struct AppState<S: Store> {
    /// Persistence, for health checks and realtime room authorization
    pub store: Arc<S>,

    /// Domain services
    pub services: Arc<Services<S>>,

    /// This process's realtime connections
    pub registry: ConnectionRegistry,

    /// Token issue/verify keys
    pub tokens: Arc<TokenSettings>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            services: self.services.clone(),
            registry: self.registry.clone(),
            tokens: self.tokens.clone(),
            config: self.config.clone(),
            started_at: self.started_at,
        }
    }
}

impl<S: Store> AppState<S> {
    /// Creates new application state
    ///
    /// `events` decides how committed changes reach clients: straight into
    /// `registry`, or through Redis when several instances run.
    pub fn new(
        store: Arc<S>,
        events: Arc<dyn EventPublisher>,
        registry: ConnectionRegistry,
        config: Config,
    ) -> Self {
        let tokens = Arc::new(config.jwt.token_settings());
        let services = Arc::new(Services::new(store.clone(), tokens.clone(), events));

        Self {
            store,
            services,
            registry,
            tokens,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                       # Health check (public)
/// └── /api/
///     ├── /auth/                        # Public
///     │   ├── POST /signup
///     │   ├── POST /login
///     │   └── POST /refresh
///     ├── GET  /ws                      # WebSocket, authenticates itself
///     └── (Bearer access token required below)
///         ├── /users/me, /users/search
///         ├── /boards, /boards/:id, /boards/:id/members[/:user_id]
///         ├── /lists, /lists/:id, /lists/:id/reorder
///         ├── /tasks, /tasks/:id, /tasks/:id/move, /tasks/:id/assign,
///         │   /tasks/search/:board_id
///         └── /activity/:board_id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication (protected routes only)
pub fn build_router<S: Store>(state: AppState<S>) -> Router {
    let auth_routes = Router::new()
        .route("/signup", post(routes::auth::signup::<S>))
        .route("/login", post(routes::auth::login::<S>))
        .route("/refresh", post(routes::auth::refresh::<S>));

    let tokens = state.tokens.clone();
    let protected_routes = Router::new()
        .route("/users/me", get(routes::users::me::<S>))
        .route("/users/search", get(routes::users::search::<S>))
        .route(
            "/boards",
            post(routes::boards::create::<S>).get(routes::boards::list::<S>),
        )
        .route(
            "/boards/:id",
            get(routes::boards::get::<S>)
                .put(routes::boards::update::<S>)
                .delete(routes::boards::delete::<S>),
        )
        .route("/boards/:id/members", post(routes::boards::add_member::<S>))
        .route(
            "/boards/:id/members/:user_id",
            axum::routing::delete(routes::boards::remove_member::<S>),
        )
        .route("/lists", post(routes::lists::create::<S>))
        .route(
            "/lists/:id",
            put(routes::lists::update::<S>).delete(routes::lists::delete::<S>),
        )
        .route("/lists/:id/reorder", put(routes::lists::reorder::<S>))
        .route("/tasks", post(routes::tasks::create::<S>))
        .route("/tasks/search/:board_id", get(routes::tasks::search::<S>))
        .route(
            "/tasks/:id",
            get(routes::tasks::get::<S>)
                .put(routes::tasks::update::<S>)
                .delete(routes::tasks::delete::<S>),
        )
        .route("/tasks/:id/move", put(routes::tasks::move_task::<S>))
        .route("/tasks/:id/assign", put(routes::tasks::assign::<S>))
        .route("/activity/:board_id", get(routes::activity::list::<S>))
        .route_layer(axum_middleware::from_fn(move |req: Request, next: Next| {
            jwt_auth_middleware(tokens.clone(), req, next)
        }));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/ws", get(routes::realtime::connect::<S>))
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
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
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let production = state.config.api.production;

    Router::new()
        .route("/health", get(routes::health::health_check::<S>))
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(production))
        .with_state(state)
}
