//! Order API Module
//!
//! Thin transport layer: every mutation routes through the lifecycle
//! state machine, never writes status directly.

mod handler;

use axum::{
    Router,
    routing::{get, patch, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        // Collection route lives outside the nest so `/api/orders` matches
        // without a trailing slash
        .route("/api/orders", post(handler::submit).get(handler::list))
        .nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        // Lookup
        .route("/{id}", get(handler::get_by_id))
        .route("/number/{number}", get(handler::get_by_number))
        // Labels
        .route("/{id}/label", post(handler::generate_label))
        .route("/{id}/return-label", post(handler::generate_return_label))
        // Re-offer sub-protocol
        .route("/{id}/reoffer", post(handler::submit_reoffer))
        .route("/{id}/reoffer/accept", post(handler::accept_reoffer))
        .route("/{id}/reoffer/decline", post(handler::decline_reoffer))
        // Explicit status request (same state machine underneath)
        .route("/{id}/status", patch(handler::update_status))
        // Scheduler trigger
        .route("/sweep", post(handler::sweep_reoffers))
}
