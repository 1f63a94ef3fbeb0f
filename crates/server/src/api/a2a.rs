//! # A2A Endpoint
//!
//! JSON-RPC `message/send` at the address the agent card advertises. The
//! first text part is the request: a bare topic, or a JSON object shaped
//! like the generate API body. The reply is one agent message carrying the
//! run's final event text.

use axum::{extract::State, response::Json};
use serde_json::Value;
use tokio::sync::mpsc;

use deckhand_core::a2a::envelope::{
    rpc_code, OutboundMessage, RpcResponse, SendMessageParams, JSONRPC_VERSION,
    SEND_MESSAGE_METHOD,
};
use deckhand_core::state::GenerationRequest;
use deckhand_core::swarm::{Coordinator, ProgressEvent};

use super::generate::GenerateRequest;
use super::AppState;

/// Handle one JSON-RPC call. Protocol errors are JSON-RPC errors, not HTTP ones.
pub async fn send_message(State(state): State<AppState>, body: String) -> Json<RpcResponse> {
    Json(answer(&state.coordinator, &body).await)
}

async fn answer(coordinator: &Coordinator, body: &str) -> RpcResponse {
    let call: Value = match serde_json::from_str(body) {
        Ok(call) => call,
        Err(e) => {
            return RpcResponse::failure(Value::Null, rpc_code::PARSE_ERROR, e.to_string())
        }
    };
    let id = call.get("id").cloned().unwrap_or(Value::Null);

    let (params, text) = match read_call(&call) {
        Ok(read) => read,
        Err((code, message)) => {
            tracing::warn!(code, "Rejected A2A call: {}", message);
            return RpcResponse::failure(id, code, message);
        }
    };
    let request = match parse_generation_request(&text) {
        Ok(request) => request,
        Err(message) => return RpcResponse::failure(id, rpc_code::INVALID_PARAMS, message),
    };
    tracing::info!(
        message_id = %params.message.message_id,
        topic = %request.topic,
        "A2A generation request"
    );

    let reply = OutboundMessage::agent_text(run_to_final_text(coordinator, request).await);
    RpcResponse::success(id, serde_json::to_value(reply).unwrap_or_default())
}

fn read_call(call: &Value) -> Result<(SendMessageParams, String), (i64, String)> {
    if call.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err((
            rpc_code::INVALID_REQUEST,
            format!("jsonrpc must be \"{}\"", JSONRPC_VERSION),
        ));
    }
    let method = call
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| (rpc_code::INVALID_REQUEST, "missing method".to_string()))?;
    if method != SEND_MESSAGE_METHOD {
        return Err((
            rpc_code::METHOD_NOT_FOUND,
            format!("unsupported method: {}", method),
        ));
    }

    let params: SendMessageParams =
        serde_json::from_value(call.get("params").cloned().unwrap_or(Value::Null))
            .map_err(|e| (rpc_code::INVALID_PARAMS, format!("invalid params: {}", e)))?;
    let text = params
        .message
        .text()
        .map(str::to_string)
        .ok_or_else(|| (rpc_code::INVALID_PARAMS, "message has no text part".to_string()))?;
    Ok((params, text))
}

/// A JSON generate body if the text is one, otherwise the whole text is the topic
fn parse_generation_request(text: &str) -> Result<GenerationRequest, String> {
    let body = match serde_json::from_str::<GenerateRequest>(text.trim()) {
        Ok(body) => body,
        Err(_) => GenerateRequest {
            topic: text.to_string(),
            num_slides: None,
            style: None,
        },
    };
    body.into_generation_request()
}

async fn run_to_final_text(coordinator: &Coordinator, request: GenerationRequest) -> String {
    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let report = coordinator.run_with_channel(request, tx).await;

    let mut last = None;
    while let Some(event) = rx.recv().await {
        if event.is_final {
            last = Some(event.message);
        }
    }
    last.unwrap_or_else(|| match (report.artifact, report.error) {
        (Some(artifact), _) => format!("Presentation ready: {}", artifact),
        (None, Some(error)) => format!("Presentation generation failed: {}", error),
        (None, None) => "Presentation generation failed".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use deckhand_core::a2a::{extract_text, Part, ProviderClient, ResponseEnvelope};
    use deckhand_core::config::CoordinatorConfig;
    use deckhand_core::discovery::{
        CapabilityDirectory, CapabilityResolver, PassthroughFormulator, ProviderDescriptor,
    };
    use deckhand_core::error::{DiscoveryError, InvocationError};

    struct KeywordDirectory;

    #[async_trait]
    impl CapabilityDirectory for KeywordDirectory {
        async fn find(&self, query: &str) -> Result<ProviderDescriptor, DiscoveryError> {
            let name = if query.contains(".pptx") {
                "build"
            } else if query.contains("image") {
                "image"
            } else if query.contains("outline") {
                "outline"
            } else {
                "content"
            };
            Ok(ProviderDescriptor::new(
                name,
                format!("http://{}.agents.local/", name),
            ))
        }
    }

    /// Outline and build answer; content and image always fail
    struct CannedClient {
        build_ok: bool,
    }

    #[async_trait]
    impl ProviderClient for CannedClient {
        async fn invoke(
            &self,
            provider: &ProviderDescriptor,
            _request_text: &str,
            _timeout: Duration,
        ) -> Result<ResponseEnvelope, InvocationError> {
            let text = match provider.name.as_str() {
                "outline" => json!({
                    "topic": "Mars Colonization",
                    "slides": [{"page_number": 1, "title": "Why Mars"}]
                })
                .to_string(),
                "build" if self.build_ok => "decks/mars.pptx".to_string(),
                "build" => "Error: template missing".to_string(),
                _ => {
                    return Err(InvocationError::Transport {
                        provider: provider.name.clone(),
                        cause: "connection refused".to_string(),
                    })
                }
            };
            Ok(ResponseEnvelope::PlainMessage {
                parts: vec![Part::text(text)],
            })
        }
    }

    fn coordinator(build_ok: bool) -> Coordinator {
        Coordinator::new(
            CoordinatorConfig::default(),
            CapabilityResolver::new(Arc::new(KeywordDirectory), Arc::new(PassthroughFormulator)),
            Arc::new(CannedClient { build_ok }),
        )
    }

    fn send(text: &str) -> String {
        json!({
            "jsonrpc": "2.0",
            "id": "req-1",
            "method": "message/send",
            "params": {"message": {
                "kind": "message",
                "messageId": "m-1",
                "role": "user",
                "parts": [{"kind": "text", "text": text}]
            }}
        })
        .to_string()
    }

    fn reply_text(response: &RpcResponse) -> String {
        let result = response.result.clone().unwrap();
        let envelope = ResponseEnvelope::from_result(result).unwrap();
        extract_text(&envelope).unwrap()
    }

    #[tokio::test]
    async fn test_message_send_returns_final_event_text() {
        let response = answer(&coordinator(true), &send("Mars Colonization")).await;
        assert!(response.error.is_none());
        assert_eq!(response.id, json!("req-1"));
        assert_eq!(reply_text(&response), "Presentation ready: decks/mars.pptx");

        let result = response.result.unwrap();
        assert_eq!(result["kind"], "message");
        assert_eq!(result["role"], "agent");
    }

    #[tokio::test]
    async fn test_failed_run_is_still_a_reply() {
        let response = answer(&coordinator(false), &send("Mars Colonization")).await;
        assert!(response.error.is_none());
        let text = reply_text(&response);
        assert!(text.starts_with("Presentation generation failed at the build stage"));
        assert!(text.contains("template missing"));
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let coordinator = coordinator(true);

        let garbage = answer(&coordinator, "{not json").await;
        assert_eq!(garbage.error.unwrap().code, rpc_code::PARSE_ERROR);
        assert_eq!(garbage.id, Value::Null);

        let mut call: Value = serde_json::from_str(&send("Mars")).unwrap();
        call["method"] = json!("tasks/get");
        let unknown = answer(&coordinator, &call.to_string()).await;
        assert_eq!(unknown.error.unwrap().code, rpc_code::METHOD_NOT_FOUND);
        assert_eq!(unknown.id, json!("req-1"));

        let blank = answer(&coordinator, &send("   ")).await;
        assert_eq!(blank.error.unwrap().code, rpc_code::INVALID_PARAMS);

        call["method"] = json!("message/send");
        call["params"]["message"]["parts"] = json!([{"kind": "file", "file": {}}]);
        let no_text = answer(&coordinator, &call.to_string()).await;
        assert_eq!(no_text.error.unwrap().code, rpc_code::INVALID_PARAMS);
    }

    #[test]
    fn test_text_may_carry_a_generate_body() {
        let request =
            parse_generation_request(r#"{"topic": "Mars", "num_slides": 3, "style": "playful"}"#)
                .unwrap();
        assert_eq!(request.topic, "Mars");
        assert_eq!(request.num_slides, 3);
        assert_eq!(request.style, "playful");

        let bare = parse_generation_request("  Mars Colonization ").unwrap();
        assert_eq!(bare.topic, "Mars Colonization");
        assert_eq!(bare.num_slides, 5);
    }
}
