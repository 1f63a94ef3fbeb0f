//! # Query Formulators
//!
//! Phrase the directory query for a stage goal. Formulators never fail:
//! when phrasing goes wrong the goal itself is the query.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ModelConfig;

const SYSTEM_PROMPT: &str = include_str!("defaults/query_planner.md");

#[async_trait]
pub trait QueryFormulator: Send + Sync {
    async fn formulate(&self, goal: &str) -> String;
}

/// Uses the goal verbatim
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFormulator;

#[async_trait]
impl QueryFormulator for PassthroughFormulator {
    async fn formulate(&self, goal: &str) -> String {
        goal.trim().to_string()
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// Asks an LLM for a one-sentence capability query
#[derive(Debug, Clone)]
pub struct LlmFormulator {
    config: ModelConfig,
    http: reqwest::Client,
    timeout: Duration,
}

impl LlmFormulator {
    pub fn new(config: ModelConfig, timeout: Duration) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            timeout,
        }
    }

    async fn ask(&self, goal: &str) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: goal,
                },
            ],
        };

        let mut request = self
            .http
            .post(self.config.chat_completions_url())
            .json(&body)
            .timeout(self.timeout);
        if let Some(key) = self.config.api_key() {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("chat completion request failed")?
            .error_for_status()
            .context("chat completion rejected")?;
        let reply: ChatResponse = response
            .json()
            .await
            .context("chat completion reply unreadable")?;

        let query = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().trim_matches('"').trim().to_string())
            .unwrap_or_default();
        if query.is_empty() {
            anyhow::bail!("model returned an empty query");
        }
        Ok(query)
    }
}

#[async_trait]
impl QueryFormulator for LlmFormulator {
    async fn formulate(&self, goal: &str) -> String {
        tracing::info!(model = %self.config.model, goal = %goal, "Formulating capability query");
        match self.ask(goal).await {
            Ok(query) => {
                tracing::info!(query = %query, "Capability query ready");
                query
            }
            Err(e) => {
                tracing::warn!("Query formulation failed, searching with the goal itself: {:#}", e);
                goal.trim().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LlmProvider;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::net::SocketAddr;

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn formulator_at(addr: SocketAddr) -> LlmFormulator {
        let config = ModelConfig::with_provider(LlmProvider::OpenAI, "test-model")
            .with_base_url(format!("http://{}/v1", addr));
        LlmFormulator::new(config, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_passthrough() {
        assert_eq!(
            PassthroughFormulator.formulate("  write slide copy ").await,
            "write slide copy"
        );
    }

    #[tokio::test]
    async fn test_llm_query_is_cleaned() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|Json(req): Json<Value>| async move {
                assert_eq!(req["model"], "test-model");
                assert_eq!(req["messages"][0]["role"], "system");
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": " \"agent that writes slide outlines\"\n"}}]
                }))
            }),
        );
        let addr = serve(app).await;

        let query = formulator_at(addr).formulate("outline the deck").await;
        assert_eq!(query, "agent that writes slide outlines");
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_goal() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let addr = serve(app).await;

        let query = formulator_at(addr).formulate("generate images").await;
        assert_eq!(query, "generate images");
    }

    #[tokio::test]
    async fn test_llm_empty_reply_falls_back_to_goal() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let addr = serve(app).await;

        let query = formulator_at(addr).formulate("build the file").await;
        assert_eq!(query, "build the file");
    }
}
