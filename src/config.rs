use crate::error::{PlaybookError, Result};
use crate::loader::SourcePaths;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 60;

pub const ENV_DATA_DIR: &str = "PLAYBOOK_DATA_DIR";
pub const ENV_MODEL: &str = "PLAYBOOK_MODEL";
pub const ENV_NARRATIVE_TIMEOUT: &str = "PLAYBOOK_NARRATIVE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookConfig {
    pub sources: SourcePaths,
    /// Model id passed to the narrative service.
    pub model: String,
    /// Upper bound for a single narrative call.
    pub narrative_timeout_secs: u64,
}

impl Default for PlaybookConfig {
    fn default() -> Self {
        Self {
            sources: SourcePaths::default(),
            model: DEFAULT_MODEL.to_string(),
            narrative_timeout_secs: DEFAULT_NARRATIVE_TIMEOUT_SECS,
        }
    }
}

impl PlaybookConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `PLAYBOOK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by the `ENV_*` names.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.sources = SourcePaths::in_dir(dir);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.model = model;
        }
        if let Some(raw) = lookup(ENV_NARRATIVE_TIMEOUT) {
            self.narrative_timeout_secs = raw.trim().parse().map_err(|_| {
                PlaybookError::Config(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_NARRATIVE_TIMEOUT, raw
                ))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn narrative_timeout(&self) -> Duration {
        Duration::from_secs(self.narrative_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.narrative_timeout_secs == 0 {
            return Err(PlaybookError::Config(
                "narrative_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(PlaybookError::Config("model must not be empty".to_string()));
        }
        Ok(())
    }
}
