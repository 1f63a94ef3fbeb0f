//! # Response Normalizer
//!
//! Pulls a single text payload out of a [`ResponseEnvelope`].
//!
//! Extraction order, first match wins:
//! 1. artifacts, newest first, first part of each
//! 2. the task status message
//! 3. the plain message parts

use super::envelope::{Message, Part, ResponseEnvelope};

/// Extract the reply text, or `None` when the envelope carries no text.
pub fn extract_text(envelope: &ResponseEnvelope) -> Option<String> {
    match envelope {
        ResponseEnvelope::ArtifactBearing {
            artifacts,
            status_message,
        } => artifacts
            .iter()
            .rev()
            .filter_map(|artifact| artifact.parts.first())
            .find_map(non_empty_text)
            .or_else(|| status_message.as_ref().and_then(first_message_text)),
        ResponseEnvelope::StatusBearing { status_message } => {
            status_message.as_ref().and_then(first_message_text)
        }
        ResponseEnvelope::PlainMessage { parts } => parts.first().and_then(part_text),
    }
}

/// Text of the envelope for diagnostics: extracted text if there is any,
/// otherwise the stringified envelope. Never treat the latter as data.
pub fn text_or_raw(envelope: &ResponseEnvelope) -> (String, bool) {
    match extract_text(envelope) {
        Some(text) => (text, true),
        None => (render_raw(envelope), false),
    }
}

/// Stringified envelope
pub fn render_raw(envelope: &ResponseEnvelope) -> String {
    serde_json::to_string(envelope).unwrap_or_else(|_| format!("{:?}", envelope))
}

/// Remove Markdown code-fence wrapping around a structured reply.
/// A leading json fence (or bare fence line) and a trailing fence are dropped.
pub fn strip_code_fence(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        // bare fence, possibly with some other language tag on the same line
        cleaned = match rest.split_once('\n') {
            Some((tag, body)) if !tag.trim().contains(char::is_whitespace) => body,
            _ => rest,
        };
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

fn non_empty_text(part: &Part) -> Option<String> {
    part.as_text()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn part_text(part: &Part) -> Option<String> {
    part.as_text().map(str::to_string)
}

fn first_message_text(message: &Message) -> Option<String> {
    message.parts.first().and_then(part_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::envelope::Artifact;
    use crate::state::PresentationPlan;

    fn artifact(text: &str) -> Artifact {
        Artifact::from_parts(vec![Part::text(text)])
    }

    #[test]
    fn test_reverse_scan_skips_empty_placeholder() {
        let envelope = ResponseEnvelope::ArtifactBearing {
            artifacts: vec![artifact(""), artifact("x")],
            status_message: None,
        };
        assert_eq!(extract_text(&envelope), Some("x".to_string()));
    }

    #[test]
    fn test_latest_artifact_wins() {
        let envelope = ResponseEnvelope::ArtifactBearing {
            artifacts: vec![artifact("draft"), artifact("final")],
            status_message: None,
        };
        assert_eq!(extract_text(&envelope), Some("final".to_string()));
    }

    #[test]
    fn test_only_first_part_of_an_artifact_counts() {
        let envelope = ResponseEnvelope::ArtifactBearing {
            artifacts: vec![
                artifact("older"),
                Artifact::from_parts(vec![Part::Empty, Part::text("second part")]),
            ],
            status_message: None,
        };
        assert_eq!(extract_text(&envelope), Some("older".to_string()));
    }

    #[test]
    fn test_empty_artifacts_fall_back_to_status() {
        let envelope = ResponseEnvelope::ArtifactBearing {
            artifacts: vec![artifact(""), Artifact::from_parts(vec![])],
            status_message: Some(Message::from_parts(vec![Part::text("status says hi")])),
        };
        assert_eq!(extract_text(&envelope), Some("status says hi".to_string()));
    }

    #[test]
    fn test_status_and_plain_tiers() {
        let status = ResponseEnvelope::StatusBearing {
            status_message: Some(Message::from_parts(vec![Part::Nested(Box::new(
                Part::text("nested"),
            ))])),
        };
        assert_eq!(extract_text(&status), Some("nested".to_string()));

        let plain = ResponseEnvelope::PlainMessage {
            parts: vec![Part::text("sync"), Part::text("ignored")],
        };
        assert_eq!(extract_text(&plain), Some("sync".to_string()));
    }

    #[test]
    fn test_nothing_to_extract() {
        let status = ResponseEnvelope::StatusBearing {
            status_message: None,
        };
        assert_eq!(extract_text(&status), None);

        let plain = ResponseEnvelope::PlainMessage { parts: vec![] };
        let (text, extracted) = text_or_raw(&plain);
        assert!(!extracted);
        assert!(text.contains("plain_message"));
    }

    #[test]
    fn test_fenced_json_parses_like_bare_json() {
        let fenced = "```json\n{\"topic\":\"t\",\"slides\":[]}\n```";
        let bare = "{\"topic\":\"t\",\"slides\":[]}";
        let a = PresentationPlan::from_wire(strip_code_fence(fenced)).unwrap();
        let b = PresentationPlan::from_wire(strip_code_fence(bare)).unwrap();
        assert_eq!(a, b);
        assert_eq!(strip_code_fence(bare), bare);
    }

    #[test]
    fn test_strip_bare_fence_and_padding() {
        assert_eq!(strip_code_fence("  ```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fence("Error: boom"), "Error: boom");
    }
}
