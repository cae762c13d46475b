//! Application state and router builder
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskboard_api::app::{build_router, AppState};
//! use taskboard_shared::cache::MemoryCache;
//! use taskboard_shared::config::Config;
//! use taskboard_shared::store::MemoryStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let state = AppState::new(Arc::new(MemoryStore::new()), Arc::new(MemoryCache::new()), config);
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use crate::middleware::rate_limit::rate_limit_layer;
use crate::routes;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskboard_shared::auth::middleware::create_jwt_middleware;
use taskboard_shared::cache::CacheBackend;
use taskboard_shared::config::Config;
use taskboard_shared::service::{AccountService, ProjectService, Services, TaskService};
use taskboard_shared::store::Store;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every field
/// is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Backing store, used directly only by the health check
    pub store: Arc<dyn Store>,

    /// Cache backend, shared by the services and the rate limiter
    pub cache: Arc<dyn CacheBackend>,

    pub projects: ProjectService,
    pub tasks: TaskService,
    pub accounts: AccountService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the services from one store, one cache, and the configuration
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn CacheBackend>, config: Config) -> Self {
        let services = Services::new(store.clone(), cache.clone(), &config);
        Self::from_services(store, cache, services, config)
    }

    /// Uses prebuilt services, e.g. an account service with a cheaper hash
    pub fn from_services(
        store: Arc<dyn Store>,
        cache: Arc<dyn CacheBackend>,
        services: Services,
        config: Config,
    ) -> Self {
        Self {
            store,
            cache,
            projects: services.projects,
            tasks: services.tasks,
            accounts: services.accounts,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # public
/// └── /api/                           # rate limited per client IP
///     ├── /auth/
///     │   ├── POST /register          # public
///     │   ├── POST /login             # public
///     │   ├── POST /refresh           # public
///     │   ├── GET  /profile
///     │   └── GET  /users
///     ├── /projects/
///     │   ├── POST   /                # admin, manager
///     │   ├── GET    /?page&page_size
///     │   ├── GET    /:id
///     │   ├── PUT    /:id
///     │   └── DELETE /:id             # admin, manager
///     └── /tasks/
///         ├── POST   /
///         ├── GET    /:id
///         ├── GET    /project/:project_id
///         ├── GET    /assignee/:assignee_id
///         ├── PUT    /:id
///         └── DELETE /:id             # admin, manager
/// ```
///
/// Everything under `/api` except register, login, and refresh requires a
/// bearer access token.
///
/// # Middleware Stack
///
/// Outermost first: CORS, request tracing, rate limiting (`/api` only),
/// authentication (per route group).
pub fn build_router(state: AppState) -> Router {
    let jwt = axum::middleware::from_fn(create_jwt_middleware(state.config.jwt.secret.clone()));

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let private_auth_routes = Router::new()
        .route("/profile", get(routes::auth::profile))
        .route("/users", get(routes::auth::list_users))
        .layer(jwt.clone());

    let project_routes = Router::new()
        .route(
            "/",
            post(routes::projects::create_project).get(routes::projects::list_projects),
        )
        .route(
            "/:id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .layer(jwt.clone());

    let task_routes = Router::new()
        .route("/", post(routes::tasks::create_task))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/project/:project_id",
            get(routes::tasks::list_project_tasks),
        )
        .route(
            "/assignee/:assignee_id",
            get(routes::tasks::list_assignee_tasks),
        )
        .layer(jwt);

    let api_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(private_auth_routes))
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_layer,
        ));

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Permissive when the origin list contains `*`, otherwise an allow list
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
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
}
