//! # Deckhand Core
//!
//! Turns a topic into a finished slide deck by driving four independently
//! running stage providers, each discovered at runtime through a capability
//! directory and called over A2A.
//!
//! ## Architecture
//!
//! - `a2a/` - Provider invocation and reply normalization
//! - `discovery/` - Capability directory, query formulation, provider resolution
//! - `swarm/` - Stage execution, pipeline state, progress events
//! - `state/` - The presentation plan and stage outcomes
//! - `config` - Coordinator configuration
//! - `models` - LLM provider settings for the query formulator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use deckhand_core::config::CoordinatorConfig;
//! use deckhand_core::state::GenerationRequest;
//! use deckhand_core::swarm::{Coordinator, ProgressSink};
//!
//! let coordinator = Coordinator::from_config(CoordinatorConfig::default());
//! let report = coordinator
//!     .run(GenerationRequest::new("Mars Colonization"), &ProgressSink::silent())
//!     .await;
//! ```

pub mod a2a;
pub mod config;
pub mod discovery;
pub mod error;
pub mod models;
pub mod state;
pub mod swarm;
