//! # Invocation Client
//!
//! Sends one A2A `message/send` request to a resolved provider and returns
//! the decoded [`ResponseEnvelope`]. One attempt, explicit timeout, no retry.

use std::time::Duration;

use async_trait::async_trait;

use super::envelope::{ResponseEnvelope, RpcResponse, SendMessageRequest};
use crate::discovery::ProviderDescriptor;
use crate::error::{render_cause_chain, InvocationError};

/// Longest slice of a rejected body kept in the error
const BODY_PREVIEW_CHARS: usize = 1000;

/// Invokes Stage Providers
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn invoke(
        &self,
        provider: &ProviderDescriptor,
        request_text: &str,
        timeout: Duration,
    ) -> Result<ResponseEnvelope, InvocationError>;
}

/// A2A JSON-RPC over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpProviderClient {
    http: reqwest::Client,
}

impl HttpProviderClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    fn classify(
        provider: &ProviderDescriptor,
        timeout: Duration,
        err: reqwest::Error,
    ) -> InvocationError {
        if err.is_timeout() {
            InvocationError::Timeout {
                provider: provider.name.clone(),
                secs: timeout.as_secs(),
            }
        } else {
            InvocationError::Transport {
                provider: provider.name.clone(),
                cause: render_cause_chain(&err),
            }
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn invoke(
        &self,
        provider: &ProviderDescriptor,
        request_text: &str,
        timeout: Duration,
    ) -> Result<ResponseEnvelope, InvocationError> {
        let url = provider
            .endpoint()
            .map_err(|reason| InvocationError::InvalidAddress {
                provider: provider.name.clone(),
                address: provider.address.clone(),
                reason,
            })?;

        let request = SendMessageRequest::user_text(request_text);
        tracing::info!(provider = %provider.name, url = %url, request_id = %request.id, "Invoking provider");

        let result = invoke_once(&self.http, provider, url, &request, timeout).await;
        if let Err(e) = &result {
            tracing::error!(provider = %provider.name, error = %e, "Provider call failed");
        }
        result
    }
}

async fn invoke_once(
    http: &reqwest::Client,
    provider: &ProviderDescriptor,
    url: reqwest::Url,
    request: &SendMessageRequest,
    timeout: Duration,
) -> Result<ResponseEnvelope, InvocationError> {
    let response = http
        .post(url)
        .json(request)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| HttpProviderClient::classify(provider, timeout, e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(InvocationError::Rejected {
            provider: provider.name.clone(),
            status: status.as_u16(),
            body: body.chars().take(BODY_PREVIEW_CHARS).collect(),
        });
    }

    let body = response.bytes().await.map_err(|e| {
        HttpProviderClient::classify(provider, timeout, e)
    })?;
    let reply: RpcResponse =
        serde_json::from_slice(&body).map_err(|e| InvocationError::Decode {
            provider: provider.name.clone(),
            cause: e.to_string(),
        })?;

    if let Some(error) = reply.error {
        return Err(InvocationError::Rpc {
            provider: provider.name.clone(),
            code: error.code,
            message: error.message,
        });
    }

    let result = reply.result.ok_or_else(|| InvocationError::Decode {
        provider: provider.name.clone(),
        cause: "reply has neither result nor error".to_string(),
    })?;

    let envelope =
        ResponseEnvelope::from_result(result).map_err(|cause| InvocationError::Decode {
            provider: provider.name.clone(),
            cause,
        })?;
    tracing::debug!(provider = %provider.name, shape = envelope.shape(), "Provider replied");
    Ok(envelope)
}
