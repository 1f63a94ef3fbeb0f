//! # A2A Plumbing
//!
//! Talking to Stage Providers over the A2A protocol.
//!
//! ## Architecture
//!
//! ```text
//! Stage Executor
//!     │
//!     ├── ProviderClient::invoke ──── message/send ───▶ Stage Provider
//!     │ ◀──────────────────────── ResponseEnvelope ───┘
//!     │
//!     └── normalizer::extract_text → strip_code_fence → parse
//! ```

pub mod client;
pub mod envelope;
pub mod normalizer;

pub use client::{HttpProviderClient, ProviderClient};
pub use envelope::{Artifact, Message, Part, ResponseEnvelope, SendMessageRequest};
pub use normalizer::{extract_text, render_raw, strip_code_fence, text_or_raw};
