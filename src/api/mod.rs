pub mod auth;
mod cars;
pub mod error;
mod leads;
pub mod validation;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use error::ApiError;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session));

    // Public catalog and lead intake
    let public_routes = Router::new()
        .route("/cars", get(cars::list_cars))
        .route("/cars/:id", get(cars::get_car))
        .route("/pending-cars", post(cars::create_pending_car))
        .route("/contact-requests", post(leads::create_contact_request));

    // Admin-only lead management
    let admin_routes = Router::new()
        .route("/leads", get(leads::list_leads))
        .route("/leads/stats", get(leads::lead_stats))
        .route("/leads/:id/status", patch(leads::update_lead_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", public_routes.merge(admin_routes))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
