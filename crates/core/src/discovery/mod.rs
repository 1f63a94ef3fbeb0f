//! # Capability Discovery
//!
//! Finds the provider for a stage at runtime.
//!
//! ```text
//! stage goal → QueryFormulator → query → CapabilityDirectory → ProviderDescriptor
//! ```

pub mod directory;
pub mod formulator;
pub mod resolver;

pub use directory::{
    CapabilityDirectory, FindAgentRequest, HttpDirectory, ProviderDescriptor, SkillCard,
    StaticDirectory,
};
pub use formulator::{LlmFormulator, PassthroughFormulator, QueryFormulator};
pub use resolver::CapabilityResolver;
