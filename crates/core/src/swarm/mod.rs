//! # Swarm Orchestration
//!
//! Coordinates the four stage providers for Deckhand.
//!
//! ## Pipeline Flow
//!
//! ```text
//! Topic → Outline → Content (per slide) → Image (per slide) → Build → artifact
//! ```

pub mod coordinator;
pub mod events;
pub mod pipeline;
pub mod stage;

pub use coordinator::{Coordinator, RunReport};
pub use events::{ProgressEvent, ProgressSink};
pub use pipeline::{Pipeline, PipelineState};
pub use stage::{Stage, StageExecutor};
