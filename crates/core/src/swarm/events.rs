//! # Progress Events
//!
//! What a run reports while it works. Every run ends with exactly one
//! event where `is_final` is set, and nothing comes after it.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::stage::Stage;

/// A progress update from a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Unique event ID
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Human-readable status
    pub message: String,
    /// Set on the last event of a run only
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub stage: Option<Stage>,
    /// 1-based slide position within the stage loop
    #[serde(default)]
    pub slide_index: Option<usize>,
    #[serde(default)]
    pub slide_total: Option<usize>,
}

impl ProgressEvent {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            message: message.into(),
            is_final: false,
            stage: None,
            slide_index: None,
            slide_total: None,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_slide(mut self, index: usize, total: usize) -> Self {
        self.slide_index = Some(index);
        self.slide_total = Some(total);
        self
    }

    /// Mark as the run's final event
    pub fn finished(mut self) -> Self {
        self.is_final = true;
        self
    }
}

/// Fire-and-forget event output for one run.
///
/// Unbounded, so sending never waits on the reader. Send failures are
/// logged and ignored. Once a final event has gone out the sink drops
/// everything else.
#[derive(Debug, Default)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
    closed: AtomicBool,
}

impl ProgressSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self {
            tx: Some(tx),
            closed: AtomicBool::new(false),
        }
    }

    /// Sink that only logs
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: ProgressEvent) {
        if event.is_final {
            if self.closed.swap(true, Ordering::SeqCst) {
                tracing::warn!("Dropping second final event: {}", event.message);
                return;
            }
        } else if self.is_closed() {
            tracing::warn!("Dropping event after final: {}", event.message);
            return;
        }

        tracing::info!(stage = ?event.stage, is_final = event.is_final, "{}", event.message);
        if let Some(tx) = &self.tx {
            if let Err(e) = tx.send(event) {
                tracing::warn!("Progress receiver gone, event not delivered: {}", e.0.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = ProgressEvent::new("Writing slide 2 of 3")
            .with_stage(Stage::Content)
            .with_slide(2, 3);

        assert_eq!(event.stage, Some(Stage::Content));
        assert_eq!(event.slide_index, Some(2));
        assert!(!event.is_final);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["stage"], "content");
        assert_eq!(json["slide_total"], 3);
    }

    #[tokio::test]
    async fn test_nothing_after_final() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);

        sink.emit(ProgressEvent::new("started"));
        sink.emit(ProgressEvent::new("done").finished());
        sink.emit(ProgressEvent::new("late"));
        sink.emit(ProgressEvent::new("done again").finished());
        drop(sink);

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event.message);
        }
        assert_eq!(received, vec!["started", "done"]);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_not_fatal() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ProgressSink::new(tx);
        sink.emit(ProgressEvent::new("nobody listening"));
        sink.emit(ProgressEvent::new("bye").finished());
        assert!(sink.is_closed());
    }

    #[test]
    fn test_unread_receiver_never_blocks() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);
        for i in 0..1_000 {
            sink.emit(ProgressEvent::new(format!("event {}", i)));
        }
        sink.emit(ProgressEvent::new("done").finished());
        assert!(sink.is_closed());
        assert_eq!(rx.len(), 1_001);
    }
}
