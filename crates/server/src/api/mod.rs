//! # HTTP API
//!
//! The coordinator's agent surface plus the optional directory service.

pub mod a2a;
pub mod directory;
pub mod generate;

use std::sync::Arc;

use axum::{routing::get, routing::post, Router};
use deckhand_core::swarm::Coordinator;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    /// Address advertised on the agent card
    pub public_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        // A2A JSON-RPC at the agent card url
        .route("/", post(a2a::send_message))
        .route("/api/v1/generate", post(generate::generate))
        .route("/api/v1/openapi.json", get(generate::serve_openapi))
        // A2A Discovery endpoint
        .route("/.well-known/agent-card.json", get(generate::serve_agent_card))
        .with_state(state)
}
