//! # Presentation State
//!
//! The plan that moves through the stages, and what each stage hands back.

pub mod outcome;
pub mod plan;

pub use outcome::StageOutcome;
pub use plan::{
    ContentRequest, GenerationRequest, ImageReply, ImageRequest, PresentationPlan, SlideLayout,
    SlideSpec,
};
