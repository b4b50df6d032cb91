//! HTTP API for the grocery list server.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check (no auth required)
//! - `GET /me`: Current user
//! - `GET /lists`, `POST /lists`
//! - `GET /lists/{id}`, `PUT /lists/{id}`, `DELETE /lists/{id}`
//! - `PUT /lists/{id}/shares/{username}`, `DELETE /lists/{id}/shares/{username}`
//!
//! Every route except `/health` requires `Authorization: Bearer <key>`.

mod auth;
mod error;
mod extract;
mod handlers;

pub use auth::AuthUser;
pub use error::{ApiError, ErrorBody};

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use grocery_list_core::ListService;

use crate::db::{ApiKeyRepository, SqliteStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ListService<SqliteStore>>,
    pub api_keys: ApiKeyRepository,
}

impl AppState {
    pub fn new(service: ListService<SqliteStore>, api_keys: ApiKeyRepository) -> Self {
        Self {
            service: Arc::new(service),
            api_keys,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // Public routes (no auth)
    let public_routes = Router::new().route("/health", get(handlers::health));

    let protected_routes = Router::new()
        .route("/me", get(handlers::me))
        .route(
            "/lists",
            get(handlers::list_names).post(handlers::create_list),
        )
        .route(
            "/lists/{id}",
            get(handlers::get_list)
                .put(handlers::save_list)
                .delete(handlers::delete_list),
        )
        .route(
            "/lists/{id}/shares/{username}",
            put(handlers::share_list).delete(handlers::unshare_list),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
