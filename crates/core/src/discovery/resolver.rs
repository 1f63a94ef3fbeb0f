//! # Capability Resolver
//!
//! Goal → query → directory lookup → provider. One round trip, no retry,
//! and nothing is cached between stages.

use std::sync::Arc;

use super::directory::{CapabilityDirectory, ProviderDescriptor};
use super::formulator::QueryFormulator;
use crate::error::DiscoveryError;

#[derive(Clone)]
pub struct CapabilityResolver {
    directory: Arc<dyn CapabilityDirectory>,
    formulator: Arc<dyn QueryFormulator>,
}

impl CapabilityResolver {
    pub fn new(
        directory: Arc<dyn CapabilityDirectory>,
        formulator: Arc<dyn QueryFormulator>,
    ) -> Self {
        Self {
            directory,
            formulator,
        }
    }

    /// Resolve a natural-language stage goal to a provider.
    ///
    /// The directory's best match is trusted as-is.
    pub async fn resolve(&self, goal: &str) -> Result<ProviderDescriptor, DiscoveryError> {
        if goal.trim().is_empty() {
            return Err(DiscoveryError::EmptyGoal);
        }

        let mut query = self.formulator.formulate(goal).await;
        if query.trim().is_empty() {
            query = goal.to_string();
        }

        tracing::info!(query = %query, "Searching capability directory");
        let provider = self.directory.find(&query).await?;
        tracing::info!(provider = %provider.name, url = %provider.address, "Provider resolved");
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{PassthroughFormulator, StaticDirectory};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingDirectory {
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CapabilityDirectory for RecordingDirectory {
        async fn find(&self, query: &str) -> Result<ProviderDescriptor, DiscoveryError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(ProviderDescriptor::new("Any", "http://localhost:1/"))
        }
    }

    struct BlankFormulator;

    #[async_trait]
    impl QueryFormulator for BlankFormulator {
        async fn formulate(&self, _goal: &str) -> String {
            String::new()
        }
    }

    #[tokio::test]
    async fn test_empty_goal_rejected() {
        let resolver = CapabilityResolver::new(
            Arc::new(StaticDirectory::default()),
            Arc::new(PassthroughFormulator),
        );
        assert_eq!(
            resolver.resolve("   ").await.unwrap_err(),
            DiscoveryError::EmptyGoal
        );
    }

    #[tokio::test]
    async fn test_blank_query_falls_back_to_goal() {
        let directory = Arc::new(RecordingDirectory {
            queries: Mutex::new(Vec::new()),
        });
        let resolver = CapabilityResolver::new(directory.clone(), Arc::new(BlankFormulator));

        resolver.resolve("write slide copy").await.unwrap();
        resolver.resolve("write slide copy").await.unwrap();

        // every call goes to the directory
        assert_eq!(
            *directory.queries.lock().unwrap(),
            vec!["write slide copy", "write slide copy"]
        );
    }

    #[tokio::test]
    async fn test_not_found_propagates() {
        let resolver = CapabilityResolver::new(
            Arc::new(StaticDirectory::default()),
            Arc::new(PassthroughFormulator),
        );
        let err = resolver.resolve("outline").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NotFound { .. }));
    }
}
