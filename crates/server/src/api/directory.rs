//! # Directory API
//!
//! `POST /find_agent` over a [`StaticDirectory`], for deployments without
//! a dedicated directory service.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::json;

use deckhand_core::discovery::{FindAgentRequest, StaticDirectory};

pub fn router(directory: Arc<StaticDirectory>) -> Router {
    Router::new()
        .route("/find_agent", post(find_agent))
        .with_state(directory)
}

/// Best provider for the query, or 404
async fn find_agent(
    State(directory): State<Arc<StaticDirectory>>,
    Json(req): Json<FindAgentRequest>,
) -> impl IntoResponse {
    match directory.best_match(&req.query) {
        Some(provider) => {
            tracing::info!(query = %req.query, provider = %provider.name, "Directory match");
            (StatusCode::OK, Json(provider.clone())).into_response()
        }
        None => {
            tracing::info!(query = %req.query, "No directory match");
            (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("no provider matches \"{}\"", req.query)})),
            )
                .into_response()
        }
    }
}
