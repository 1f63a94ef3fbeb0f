//! # Coordinator Configuration
//!
//! Loaded once at startup from an optional JSON file, then overlaid with
//! `DECKHAND_*` environment variables. Read-only afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::discovery::{
    CapabilityResolver, HttpDirectory, LlmFormulator, PassthroughFormulator, QueryFormulator,
};
use crate::models::ModelConfig;
use crate::swarm::Stage;

pub const ENV_DIRECTORY_URL: &str = "DECKHAND_DIRECTORY_URL";
pub const ENV_INVOKE_TIMEOUT: &str = "DECKHAND_INVOKE_TIMEOUT_SECS";
pub const ENV_DIRECTORY_TIMEOUT: &str = "DECKHAND_DIRECTORY_TIMEOUT_SECS";
pub const ENV_FORMULATOR_TIMEOUT: &str = "DECKHAND_FORMULATOR_TIMEOUT_SECS";

/// How directory queries are phrased
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormulatorConfig {
    /// Query with the stage goal as written
    #[default]
    Passthrough,
    /// Ask an LLM to phrase the query
    Llm { model: ModelConfig },
}

/// Configuration for the coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Capability Directory base URL
    pub directory_url: String,
    pub directory_timeout_secs: u64,
    /// Provider call timeout for stages without an override
    pub invoke_timeout_secs: u64,
    /// Per-stage call timeout overrides (stage name -> seconds)
    pub stage_timeouts_secs: HashMap<String, u64>,
    /// Per-stage goal overrides (stage name -> goal text)
    pub stage_goals: HashMap<String, String>,
    pub formulator: FormulatorConfig,
    /// LLM formulator call timeout
    pub formulator_timeout_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            directory_url: "http://localhost:10100".to_string(),
            directory_timeout_secs: 10,
            invoke_timeout_secs: 200,
            stage_timeouts_secs: HashMap::new(),
            stage_goals: HashMap::new(),
            formulator: FormulatorConfig::default(),
            formulator_timeout_secs: 60,
        }
    }
}

impl CoordinatorConfig {
    /// Read a JSON config file. A missing file means defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `DECKHAND_*` variables from the process environment
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from any lookup
    pub fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_DIRECTORY_URL).filter(|v| !v.trim().is_empty()) {
            self.directory_url = url.trim().to_string();
        }
        if let Some(secs) = lookup(ENV_INVOKE_TIMEOUT) {
            self.invoke_timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", ENV_INVOKE_TIMEOUT))?;
        }
        if let Some(secs) = lookup(ENV_DIRECTORY_TIMEOUT) {
            self.directory_timeout_secs = secs.trim().parse().with_context(|| {
                format!("{} must be a number of seconds", ENV_DIRECTORY_TIMEOUT)
            })?;
        }
        if let Some(secs) = lookup(ENV_FORMULATOR_TIMEOUT) {
            self.formulator_timeout_secs = secs.trim().parse().with_context(|| {
                format!("{} must be a number of seconds", ENV_FORMULATOR_TIMEOUT)
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        for key in self.stage_timeouts_secs.keys().chain(self.stage_goals.keys()) {
            if Stage::from_str(key).is_none() {
                anyhow::bail!("Unknown stage '{}' in config", key);
            }
        }
        if self.invoke_timeout_secs == 0
            || self.directory_timeout_secs == 0
            || self.formulator_timeout_secs == 0
        {
            anyhow::bail!("Timeouts must be at least one second");
        }
        Ok(())
    }

    /// Goal used to discover the provider for `stage`
    pub fn goal_for(&self, stage: Stage) -> String {
        self.stage_goals
            .iter()
            .find(|(key, goal)| Stage::from_str(key) == Some(stage) && !goal.trim().is_empty())
            .map(|(_, goal)| goal.clone())
            .unwrap_or_else(|| stage.default_goal().to_string())
    }

    /// Provider call timeout for `stage`
    pub fn timeout_for(&self, stage: Stage) -> Duration {
        let secs = self
            .stage_timeouts_secs
            .iter()
            .find(|(key, _)| Stage::from_str(key) == Some(stage))
            .map(|(_, secs)| *secs)
            .unwrap_or(self.invoke_timeout_secs);
        Duration::from_secs(secs)
    }

    pub fn directory_timeout(&self) -> Duration {
        Duration::from_secs(self.directory_timeout_secs)
    }

    pub fn formulator_timeout(&self) -> Duration {
        Duration::from_secs(self.formulator_timeout_secs)
    }

    pub fn build_formulator(&self) -> Arc<dyn QueryFormulator> {
        match &self.formulator {
            FormulatorConfig::Passthrough => Arc::new(PassthroughFormulator),
            FormulatorConfig::Llm { model } => {
                Arc::new(LlmFormulator::new(model.clone(), self.formulator_timeout()))
            }
        }
    }

    /// Resolver backed by the HTTP directory at `directory_url`
    pub fn build_resolver(&self) -> CapabilityResolver {
        CapabilityResolver::new(
            Arc::new(HttpDirectory::new(
                self.directory_url.clone(),
                self.directory_timeout(),
            )),
            self.build_formulator(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LlmProvider;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.directory_url, "http://localhost:10100");
        assert_eq!(config.timeout_for(Stage::Outline), Duration::from_secs(200));
        assert_eq!(config.directory_timeout(), Duration::from_secs(10));
        assert_eq!(config.formulator_timeout(), Duration::from_secs(60));
        assert_eq!(config.goal_for(Stage::Image), Stage::Image.default_goal());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: CoordinatorConfig = serde_json::from_str(
            r#"{
                "stage_timeouts_secs": {"build": 600},
                "stage_goals": {"content": "write speaker notes"},
                "formulator": {"kind": "llm", "model": {"provider": "openai", "model": "gpt-4o"}}
            }"#,
        )
        .unwrap();

        assert_eq!(config.invoke_timeout_secs, 200);
        assert_eq!(config.timeout_for(Stage::Build), Duration::from_secs(600));
        assert_eq!(config.timeout_for(Stage::Content), Duration::from_secs(200));
        assert_eq!(config.goal_for(Stage::Content), "write speaker notes");
        assert_eq!(
            config.formulator,
            FormulatorConfig::Llm {
                model: ModelConfig::with_provider(LlmProvider::OpenAI, "gpt-4o")
            }
        );
    }

    #[test]
    fn test_env_overlay() {
        let config = CoordinatorConfig::default()
            .apply_vars(|key| match key {
                ENV_DIRECTORY_URL => Some("http://directory:9000".to_string()),
                ENV_INVOKE_TIMEOUT => Some(" 30 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.directory_url, "http://directory:9000");
        assert_eq!(config.invoke_timeout_secs, 30);
        assert_eq!(config.directory_timeout_secs, 10);
    }

    #[test]
    fn test_formulator_timeout_is_its_own_setting() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{"directory_timeout_secs": 5, "formulator_timeout_secs": 90}"#)
                .unwrap();
        assert_eq!(config.directory_timeout(), Duration::from_secs(5));
        assert_eq!(config.formulator_timeout(), Duration::from_secs(90));

        let config = config
            .apply_vars(|key| (key == ENV_FORMULATOR_TIMEOUT).then(|| "45".to_string()))
            .unwrap();
        assert_eq!(config.formulator_timeout(), Duration::from_secs(45));
        assert_eq!(config.directory_timeout(), Duration::from_secs(5));

        let zero = CoordinatorConfig::default()
            .apply_vars(|key| (key == ENV_FORMULATOR_TIMEOUT).then(|| "0".to_string()));
        assert!(zero.is_err());
    }

    #[test]
    fn test_bad_env_value() {
        let result = CoordinatorConfig::default().apply_vars(|key| {
            (key == ENV_DIRECTORY_TIMEOUT).then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_stage_rejected() {
        let mut config = CoordinatorConfig::default();
        config.stage_goals.insert("render".to_string(), "x".to_string());
        assert!(config.apply_vars(|_| None).is_err());
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = CoordinatorConfig::load("/nonexistent/deckhand.json").unwrap();
        assert_eq!(config, CoordinatorConfig::default());
    }
}
