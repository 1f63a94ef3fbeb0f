//! # Capability Directory
//!
//! Maps a free-text capability description to one reachable provider.
//!
//! Two implementations:
//! - [`HttpDirectory`] talks to a directory service (`POST /find_agent`)
//! - [`StaticDirectory`] matches against an in-memory registry, and is what
//!   `deckhand directory` serves over HTTP

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{render_cause_chain, DiscoveryError};

/// One skill declared on a provider card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SkillCard {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A reachable provider, as the directory describes it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: String,
    /// Base URL the provider accepts A2A requests on
    #[serde(rename = "url", alias = "address")]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Opaque capability declaration, passed through untouched
    #[serde(default, rename = "capabilities")]
    pub declared_capabilities: Value,
    #[serde(default)]
    pub skills: Vec<SkillCard>,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            description: None,
            declared_capabilities: Value::Null,
            skills: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_skill(mut self, skill: SkillCard) -> Self {
        self.skills.push(skill);
        self
    }

    /// Parsed address
    pub fn endpoint(&self) -> Result<reqwest::Url, String> {
        reqwest::Url::parse(&self.address).map_err(|e| e.to_string())
    }

    /// All capability tags across declared skills
    pub fn capability_tags(&self) -> Vec<&str> {
        self.skills
            .iter()
            .flat_map(|s| s.tags.iter().map(String::as_str))
            .collect()
    }

    fn haystack(&self) -> String {
        let mut text = format!(
            "{} {}",
            self.name,
            self.description.as_deref().unwrap_or_default()
        );
        for skill in &self.skills {
            text.push(' ');
            text.push_str(&skill.name);
            text.push(' ');
            text.push_str(&skill.description);
            for tag in &skill.tags {
                text.push(' ');
                text.push_str(tag);
            }
        }
        text
    }
}

/// Capability lookup
#[async_trait]
pub trait CapabilityDirectory: Send + Sync {
    async fn find(&self, query: &str) -> Result<ProviderDescriptor, DiscoveryError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FindAgentRequest {
    pub query: String,
}

/// Directory service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
            timeout,
        }
    }

    fn find_url(&self) -> String {
        format!("{}/find_agent", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CapabilityDirectory for HttpDirectory {
    async fn find(&self, query: &str) -> Result<ProviderDescriptor, DiscoveryError> {
        let url = self.find_url();
        let unreachable = |cause: String| DiscoveryError::Unreachable {
            url: url.clone(),
            cause,
        };

        let response = self
            .http
            .post(&url)
            .json(&FindAgentRequest {
                query: query.to_string(),
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| unreachable(render_cause_chain(&e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DiscoveryError::NotFound {
                query: query.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(unreachable(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| unreachable(render_cause_chain(&e)))?;
        serde_json::from_slice(&body).map_err(|e| DiscoveryError::Malformed(e.to_string()))
    }
}

/// Words that carry no capability signal
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "can", "for", "from", "i", "into", "need", "of", "on", "or",
    "that", "the", "this", "to", "with", "agent", "which", "each", "every", "me", "my",
];

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// In-memory registry matched by keyword overlap
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    providers: Vec<ProviderDescriptor>,
}

impl StaticDirectory {
    pub fn new(providers: Vec<ProviderDescriptor>) -> Self {
        Self { providers }
    }

    /// Load a JSON array of provider cards
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read registry: {:?}", path))?;
        let providers: Vec<ProviderDescriptor> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse registry: {:?}", path))?;
        Ok(Self::new(providers))
    }

    pub fn providers(&self) -> &[ProviderDescriptor] {
        &self.providers
    }

    /// Best keyword match; ties go to the provider registered first.
    pub fn best_match(&self, query: &str) -> Option<&ProviderDescriptor> {
        let wanted = tokenize(query);
        let mut best: Option<(usize, &ProviderDescriptor)> = None;
        for provider in &self.providers {
            let offered = tokenize(&provider.haystack());
            let score = wanted.intersection(&offered).count();
            if score > 0 && best.map_or(true, |(top, _)| score > top) {
                best = Some((score, provider));
            }
        }
        best.map(|(_, provider)| provider)
    }
}

#[async_trait]
impl CapabilityDirectory for StaticDirectory {
    async fn find(&self, query: &str) -> Result<ProviderDescriptor, DiscoveryError> {
        self.best_match(query)
            .cloned()
            .ok_or_else(|| DiscoveryError::NotFound {
                query: query.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse, routing::post, Json, Router};
    use serde_json::json;
    use std::net::SocketAddr;

    fn registry() -> StaticDirectory {
        StaticDirectory::new(vec![
            ProviderDescriptor::new("Outliner", "http://localhost:10201/")
                .with_description("Plans a structured presentation outline")
                .with_skill(SkillCard {
                    id: "outline".to_string(),
                    name: "Outline".to_string(),
                    description: "Create slide outlines".to_string(),
                    tags: vec!["outline".to_string(), "planning".to_string()],
                }),
            ProviderDescriptor::new("Image Generator", "http://localhost:10203/")
                .with_description("Generates image files from text prompts"),
        ])
    }

    #[test]
    fn test_descriptor_accepts_agent_card() {
        let card: ProviderDescriptor = serde_json::from_value(json!({
            "name": "Copywriter",
            "url": "http://localhost:10202/",
            "version": "1.0.0",
            "capabilities": {"streaming": true},
            "skills": [{"id": "write", "name": "Write", "description": "Slide copy", "tags": ["copy"]}]
        }))
        .unwrap();
        assert_eq!(card.address, "http://localhost:10202/");
        assert_eq!(card.declared_capabilities["streaming"], true);
        assert_eq!(card.capability_tags(), vec!["copy"]);
        assert!(card.endpoint().is_ok());
    }

    #[tokio::test]
    async fn test_static_directory_matches_keywords() {
        let dir = registry();
        let found = dir.find("generate image files from prompts").await.unwrap();
        assert_eq!(found.name, "Image Generator");

        let found = dir.find("I need a presentation outline").await.unwrap();
        assert_eq!(found.name, "Outliner");
    }

    #[tokio::test]
    async fn test_static_directory_no_match() {
        let err = registry().find("translate legal contracts").await.unwrap_err();
        assert_eq!(
            err,
            DiscoveryError::NotFound {
                query: "translate legal contracts".to_string()
            }
        );
    }

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_http_directory_found_and_not_found() {
        let app = Router::new().route(
            "/find_agent",
            post(|Json(req): Json<FindAgentRequest>| async move {
                if req.query.contains("outline") {
                    Json(json!({"name": "Outliner", "url": "http://localhost:10201/"}))
                        .into_response()
                } else {
                    StatusCode::NOT_FOUND.into_response()
                }
            }),
        );
        let addr = serve(app).await;
        let dir = HttpDirectory::new(format!("http://{}/", addr), Duration::from_secs(5));

        let found = dir.find("outline please").await.unwrap();
        assert_eq!(found.name, "Outliner");

        let err = dir.find("pictures").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_http_directory_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = HttpDirectory::new(format!("http://{}", addr), Duration::from_secs(2));
        let err = dir.find("anything").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_http_directory_malformed() {
        let app = Router::new().route("/find_agent", post(|| async { "not json" }));
        let addr = serve(app).await;
        let dir = HttpDirectory::new(format!("http://{}", addr), Duration::from_secs(5));

        let err = dir.find("outline").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Malformed(_)));
    }
}
