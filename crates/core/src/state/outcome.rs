//! # Stage Outcome
//!
//! Result of one stage after normalization, parsing, and failure policy.

use serde::{Deserialize, Serialize};

use crate::error::StageError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOutcome<T> {
    pub succeeded: bool,
    pub payload: Option<T>,
    /// Diagnosable failure text, including raw provider text when there was any
    pub raw_error: Option<String>,
}

impl<T> StageOutcome<T> {
    pub fn success(payload: T) -> Self {
        Self {
            succeeded: true,
            payload: Some(payload),
            raw_error: None,
        }
    }

    /// Failed stage that still hands back a payload (the degraded value)
    pub fn degraded(payload: T, error: &StageError) -> Self {
        Self {
            succeeded: false,
            payload: Some(payload),
            raw_error: Some(error.to_string()),
        }
    }

    pub fn failure(error: &StageError) -> Self {
        Self {
            succeeded: false,
            payload: None,
            raw_error: Some(error.to_string()),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.succeeded, self.payload) {
            (true, Some(payload)) => Ok(payload),
            (_, _) => Err(self
                .raw_error
                .unwrap_or_else(|| "stage produced no payload".to_string())),
        }
    }
}
