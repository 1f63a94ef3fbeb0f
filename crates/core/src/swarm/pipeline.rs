//! # Pipeline States
//!
//! Forward-only state machine for one run.

use serde::{Deserialize, Serialize};

use super::stage::Stage;

/// State of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    #[default]
    Start,
    OutlinePlanned,
    ContentWritten,
    ImagesAttempted,
    Built,
    Done,
    /// Absorbing failure state
    Failed,
}

/// The pipeline state machine
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub state: PipelineState,
    /// Stage that failed, when `state` is `Failed`
    pub failed_stage: Option<Stage>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance to the next state
    pub fn advance(&mut self) {
        self.state = match self.state {
            PipelineState::Start => PipelineState::OutlinePlanned,
            PipelineState::OutlinePlanned => PipelineState::ContentWritten,
            PipelineState::ContentWritten => PipelineState::ImagesAttempted,
            PipelineState::ImagesAttempted => PipelineState::Built,
            PipelineState::Built => PipelineState::Done,
            PipelineState::Done => PipelineState::Done,
            PipelineState::Failed => PipelineState::Failed,
        };
    }

    /// Stage whose success moves the pipeline out of its current state
    pub fn next_stage(&self) -> Option<Stage> {
        match self.state {
            PipelineState::Start => Some(Stage::Outline),
            PipelineState::OutlinePlanned => Some(Stage::Content),
            PipelineState::ContentWritten => Some(Stage::Image),
            PipelineState::ImagesAttempted => Some(Stage::Build),
            _ => None,
        }
    }

    /// Fail the pipeline. No effect once it has finished.
    pub fn fail(&mut self, stage: Stage) {
        if !self.is_complete() {
            self.state = PipelineState::Failed;
            self.failed_stage = Some(stage);
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.state, PipelineState::Done | PipelineState::Failed)
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Done
    }
}
