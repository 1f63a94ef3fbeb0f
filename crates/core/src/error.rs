//! # Coordinator Errors
//!
//! Error taxonomy shared by discovery, invocation, and stage execution.

use thiserror::Error;

/// Marker a failed provider call is rendered with at the stage boundary.
/// Providers use the same prefix to report their own failures in-band.
pub const ERROR_MARKER: &str = "Error:";

/// Capability Directory failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The stage goal was blank
    #[error("capability goal must not be empty")]
    EmptyGoal,
    /// Directory could not be reached
    #[error("capability directory unreachable at {url}: {cause}")]
    Unreachable { url: String, cause: String },
    /// Directory answered but had no provider for the query
    #[error("no provider matches query \"{query}\"")]
    NotFound { query: String },
    /// Directory answered with something that is not a descriptor
    #[error("capability directory returned an unreadable descriptor: {0}")]
    Malformed(String),
}

/// Stage Provider call failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvocationError {
    #[error("provider {provider} has an invalid address {address}: {reason}")]
    InvalidAddress {
        provider: String,
        address: String,
        reason: String,
    },
    #[error("transport failure calling {provider}: {cause}")]
    Transport { provider: String, cause: String },
    #[error("call to {provider} timed out after {secs}s")]
    Timeout { provider: String, secs: u64 },
    #[error("{provider} rejected the request with HTTP {status}: {body}")]
    Rejected {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} returned JSON-RPC error {code}: {message}")]
    Rpc {
        provider: String,
        code: i64,
        message: String,
    },
    #[error("could not decode reply from {provider}: {cause}")]
    Decode { provider: String, cause: String },
}

/// Everything that can go wrong inside one stage call.
///
/// The display form leads with the error class so a final progress event
/// always says which kind of failure ended the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("DiscoveryError: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("InvocationError: {0}")]
    Invocation(#[from] InvocationError),
    #[error("ResponseParseError: {reason}; provider replied: {raw}")]
    ResponseParse { reason: String, raw: String },
    #[error("ProviderReportedError: {0}")]
    ProviderReported(String),
    /// The stage request itself could not be serialized
    #[error("PayloadError: {0}")]
    Payload(String),
}

impl StageError {
    /// Raw provider text carried by this error, if any
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            StageError::ResponseParse { raw, .. } => Some(raw),
            StageError::ProviderReported(raw) => Some(raw),
            _ => None,
        }
    }

    /// In-band form: the failure as text prefixed with [`ERROR_MARKER`]
    pub fn to_marker_text(&self) -> String {
        match self {
            StageError::ProviderReported(raw) if raw.starts_with(ERROR_MARKER) => raw.clone(),
            other => format!("{} {}", ERROR_MARKER, other),
        }
    }
}

/// Render an error and every `source()` below it as `top: cause: root`.
pub fn render_cause_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // reqwest and hyper repeat the inner message in the outer one
        if !rendered.contains(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("connect failed")]
    struct Outer(#[source] Inner);

    #[derive(Debug, Error)]
    #[error("connection refused")]
    struct Inner;

    #[test]
    fn test_cause_chain_includes_root() {
        let rendered = render_cause_chain(&Outer(Inner));
        assert_eq!(rendered, "connect failed: connection refused");
    }

    #[test]
    fn test_stage_error_names_its_class() {
        let err = StageError::from(InvocationError::Timeout {
            provider: "Outliner".to_string(),
            secs: 200,
        });
        let text = err.to_string();
        assert!(text.starts_with("InvocationError"));
        assert!(text.contains("200s"));
    }

    #[test]
    fn test_marker_text() {
        let err = StageError::from(DiscoveryError::EmptyGoal);
        assert!(err.to_marker_text().starts_with("Error: DiscoveryError"));

        let reported = StageError::ProviderReported("Error: quota exceeded".to_string());
        assert_eq!(reported.to_marker_text(), "Error: quota exceeded");
        assert_eq!(reported.raw_text(), Some("Error: quota exceeded"));
    }
}
