use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{admins, assistants, auth, catalog, health, shop_owners, shops};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let admin_routes = Router::new()
        .route("/", post(admins::create))
        .route("/", get(admins::list))
        .route("/:id", get(admins::get))
        .route("/:id", put(admins::update))
        .route("/:id", delete(admins::delete))
        .route("/:id/status", put(admins::set_status))
        .route("/:id/permissions", put(admins::set_permissions));

    let owner_routes = Router::new()
        .route("/", post(shop_owners::create))
        .route("/", get(shop_owners::list))
        .route("/:id", get(shop_owners::get))
        .route("/:id", put(shop_owners::update))
        .route("/:id", delete(shop_owners::delete))
        .route("/:id/status", put(shop_owners::set_status))
        .route("/:id/permissions", put(shop_owners::set_permissions));

    let assistant_routes = Router::new()
        .route("/", post(assistants::create))
        .route("/", get(assistants::list))
        .route("/:id", get(assistants::get))
        .route("/:id", put(assistants::update))
        .route("/:id", delete(assistants::delete))
        .route("/:id/status", put(assistants::set_status))
        .route("/:id/permissions", put(assistants::set_permissions));

    // Shops carry no permission set of their own, so no /permissions route.
    let shop_routes = Router::new()
        .route("/", post(shops::create))
        .route("/", get(shops::list))
        .route("/:id", get(shops::get))
        .route("/:id", put(shops::update))
        .route("/:id", delete(shops::delete))
        .route("/:id/status", put(shops::set_status));

    let router = Router::new()
        .route("/health", get(health::health))
        .route("/permissions", get(catalog::list))
        .nest("/auth", auth_routes)
        .nest("/admins", admin_routes)
        .nest("/shop-owners", owner_routes)
        .nest("/assistants", assistant_routes)
        .nest("/shops", shop_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
