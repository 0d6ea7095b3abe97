use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::{handlers, tickets};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Static pages path (configurable via env)
    let pages_dir = std::env::var("TICKETD_PAGES_DIR").unwrap_or_else(|_| "pages".to_string());

    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Tickets
        .route("/tickets", post(tickets::create_ticket))
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/tickets/{id}", post(tickets::update_ticket))
        .with_state(state);

    // Serve the search/create/edit pages with an index fallback
    let index_path = format!("{}/index.html", pages_dir);
    let serve_dir = ServeDir::new(&pages_dir).fallback(ServeFile::new(&index_path));

    Router::new()
        .merge(api_routes)
        .fallback_service(serve_dir)
        .layer(TraceLayer::new_for_http())
}
