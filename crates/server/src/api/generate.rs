//! # Generate API
//!
//! Starts a pipeline run and streams its progress events over SSE.

use std::convert::Infallible;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use utoipa::{OpenApi, ToSchema};

use deckhand_core::state::GenerationRequest;
use deckhand_core::swarm::ProgressEvent;

use super::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Presentation topic
    pub topic: String,
    pub num_slides: Option<u32>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Deckhand API",
        version = "1.0.0",
        description = "Topic in, slide deck out. Stage providers are discovered at runtime."
    ),
    paths(generate),
    components(schemas(GenerateRequest, ApiResponse)),
    tags((name = "generate", description = "Presentation generation"))
)]
pub struct ApiDoc;

impl GenerateRequest {
    pub(crate) fn into_generation_request(self) -> Result<GenerationRequest, String> {
        let topic = self.topic.trim();
        if topic.is_empty() {
            return Err("topic must not be empty".to_string());
        }
        let mut request = GenerationRequest::new(topic);
        if let Some(num_slides) = self.num_slides {
            if num_slides == 0 {
                return Err("num_slides must be at least 1".to_string());
            }
            request = request.with_num_slides(num_slides);
        }
        if let Some(style) = self.style.filter(|s| !s.trim().is_empty()) {
            request = request.with_style(style);
        }
        Ok(request)
    }
}

fn sse_event(event: &ProgressEvent) -> Event {
    let json = serde_json::to_string(event).unwrap_or_default();
    Event::default()
        .event(if event.is_final { "final" } else { "progress" })
        .data(json)
}

/// Generate a presentation
#[utoipa::path(
    post,
    path = "/api/v1/generate",
    tag = "generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Progress events; the last one has is_final set", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Invalid request", body = ApiResponse)
    )
)]
pub async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, Json<ApiResponse>)> {
    let request = req.into_generation_request().map_err(|message| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                success: false,
                message,
            }),
        )
    })?;

    let (tx, rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let coordinator = state.coordinator.clone();
    tokio::spawn(async move {
        let report = coordinator.run_with_channel(request, tx).await;
        tracing::info!(succeeded = report.succeeded(), "Generate request finished");
    });

    // Ends once the run drops its sender after the final event
    let stream = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|event| (Ok(sse_event(&event)), rx))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

// === OpenAPI Handler ===

pub async fn serve_openapi() -> impl IntoResponse {
    let spec = ApiDoc::openapi().to_json().unwrap_or_default();
    (
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(spec),
    )
}

// === A2A Agent Card Handler ===

/// Serve the A2A agent card for agent discovery
pub async fn serve_agent_card(State(state): State<AppState>) -> impl IntoResponse {
    Json(agent_card(&state.public_url))
}

fn agent_card(url: &str) -> serde_json::Value {
    serde_json::json!({
        "name": "Deckhand Coordinator",
        "description": "Generates a complete slide presentation from a topic by coordinating outline, content, image, and build agents.",
        "url": url,
        "version": "1.0.0",
        "capabilities": {
            "streaming": false,
            "pushNotifications": false,
            "stateTransitionHistory": false
        },
        "defaultInputModes": ["text/plain", "application/json"],
        "defaultOutputModes": ["text/plain"],
        "skills": [
            {
                "id": "generate_presentation",
                "name": "Generate Presentation",
                "description": "Turns a topic into a finished .pptx presentation with outline, body text, speaker notes, and images.",
                "tags": ["presentation", "slides", "pptx", "orchestration"],
                "examples": ["Create a 5-slide presentation about Mars colonization"],
                "inputModes": ["text/plain", "application/json"],
                "outputModes": ["text/plain"]
            }
        ]
    })
}
