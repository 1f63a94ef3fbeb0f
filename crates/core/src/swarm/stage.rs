//! # Stage Executor
//!
//! One stage call: resolve a provider, send the request, normalize the
//! reply, parse it, fold it into the plan.
//!
//! The executor never decides whether a failure is fatal. It hands back a
//! [`StageOutcome`] and the coordinator applies the stage policy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::a2a::{normalizer, ProviderClient};
use crate::config::CoordinatorConfig;
use crate::discovery::{CapabilityResolver, ProviderDescriptor};
use crate::error::{StageError, ERROR_MARKER};
use crate::state::StageOutcome;

/// The four pipeline stages, in run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Outline,
    Content,
    Image,
    Build,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Outline, Stage::Content, Stage::Image, Stage::Build];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Outline => "outline",
            Stage::Content => "content",
            Stage::Image => "image",
            Stage::Build => "build",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outline" => Some(Stage::Outline),
            "content" => Some(Stage::Content),
            "image" => Some(Stage::Image),
            "build" => Some(Stage::Build),
            _ => None,
        }
    }

    /// 1-based position in the run
    pub fn step(&self) -> usize {
        match self {
            Stage::Outline => 1,
            Stage::Content => 2,
            Stage::Image => 3,
            Stage::Build => 4,
        }
    }

    /// Outline and Build end the run on failure; Content and Image degrade per item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Stage::Outline | Stage::Build)
    }

    /// Built-in capability description used to find this stage's provider
    pub fn default_goal(&self) -> &'static str {
        match self {
            Stage::Outline => "I need to generate a structured outline for a presentation.",
            Stage::Content => {
                "I need to write detailed body content and speaker notes for each slide."
            }
            Stage::Image => "I need to generate image files from text prompts.",
            Stage::Build => "I need to compile all slide data into a .pptx file.",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs single stage calls against discovered providers
#[derive(Clone)]
pub struct StageExecutor {
    resolver: CapabilityResolver,
    client: Arc<dyn ProviderClient>,
    config: Arc<CoordinatorConfig>,
}

impl StageExecutor {
    pub fn new(
        resolver: CapabilityResolver,
        client: Arc<dyn ProviderClient>,
        config: Arc<CoordinatorConfig>,
    ) -> Self {
        Self {
            resolver,
            client,
            config,
        }
    }

    /// Find the provider for a stage. Fresh lookup every time.
    pub async fn resolve(&self, stage: Stage) -> Result<ProviderDescriptor, StageError> {
        let goal = self.config.goal_for(stage);
        self.resolver.resolve(&goal).await.map_err(|e| {
            tracing::error!(stage = %stage, "Provider discovery failed: {}", e);
            StageError::from(e)
        })
    }

    /// Send one request and return the normalized reply text.
    ///
    /// Envelopes with no text anywhere are rendered raw so the caller still
    /// has something to show. A reply starting with the error marker is the
    /// provider reporting its own failure.
    pub async fn call(
        &self,
        stage: Stage,
        provider: &ProviderDescriptor,
        request: &str,
    ) -> Result<String, StageError> {
        let timeout = self.config.timeout_for(stage);
        let envelope = self
            .client
            .invoke(provider, request, timeout)
            .await
            .map_err(|e| {
                tracing::error!(stage = %stage, provider = %provider.name, "Invocation failed: {}", e);
                StageError::from(e)
            })?;

        let (text, extracted) = normalizer::text_or_raw(&envelope);
        if !extracted {
            tracing::warn!(
                stage = %stage,
                shape = envelope.shape(),
                "Reply carried no text, using raw envelope"
            );
        }

        let text = normalizer::strip_code_fence(&text).to_string();
        if text.starts_with(ERROR_MARKER) {
            return Err(StageError::ProviderReported(text));
        }
        Ok(text)
    }

    /// [`call`](Self::call), then parse the text
    pub async fn exchange<T, P>(
        &self,
        stage: Stage,
        provider: &ProviderDescriptor,
        request: &str,
        parse: P,
    ) -> Result<T, StageError>
    where
        P: FnOnce(&str) -> Result<T, String>,
    {
        let text = self.call(stage, provider, request).await?;
        parse(&text).map_err(|reason| StageError::ResponseParse { reason, raw: text })
    }

    /// Resolve the stage provider, then [`run_with`](Self::run_with).
    pub async fn run_stage<S, T, B, P, M>(
        &self,
        stage: Stage,
        state: S,
        build: B,
        parse: P,
        mutate: M,
    ) -> StageOutcome<S>
    where
        B: FnOnce(&S) -> Result<String, serde_json::Error>,
        P: FnOnce(&str) -> Result<T, String>,
        M: FnOnce(S, T) -> S,
    {
        match self.resolve(stage).await {
            Ok(provider) => {
                self.run_with(stage, &provider, state, build, parse, mutate)
                    .await
            }
            Err(e) => StageOutcome::degraded(state, &e),
        }
    }

    /// Build the payload from `state`, call `provider`, parse the reply and
    /// fold it into `state`.
    ///
    /// On any failure the outcome carries `state` untouched.
    pub async fn run_with<S, T, B, P, M>(
        &self,
        stage: Stage,
        provider: &ProviderDescriptor,
        state: S,
        build: B,
        parse: P,
        mutate: M,
    ) -> StageOutcome<S>
    where
        B: FnOnce(&S) -> Result<String, serde_json::Error>,
        P: FnOnce(&str) -> Result<T, String>,
        M: FnOnce(S, T) -> S,
    {
        let request = match build(&state) {
            Ok(request) => request,
            Err(e) => return StageOutcome::degraded(state, &StageError::Payload(e.to_string())),
        };

        match self.exchange(stage, provider, &request, parse).await {
            Ok(parsed) => StageOutcome::success(mutate(state, parsed)),
            Err(e) => StageOutcome::degraded(state, &e),
        }
    }
}
