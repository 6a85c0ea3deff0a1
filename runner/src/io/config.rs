//! Runner configuration, optionally loaded from a TOML file and overridden by CLI flags.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;

use crate::core::duration::serde_text;
use crate::core::template::{CommandTemplate, validate_parts};

/// Runner configuration (TOML).
///
/// Missing fields take the defaults below, so an empty file is valid.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Wall-clock budget for a single item.
    #[serde(with = "serde_text")]
    pub timeout: Duration,

    /// Time between `SIGTERM` and `SIGKILL` when an item times out.
    #[serde(with = "serde_text")]
    pub grace_period: Duration,

    /// Interpreter command template (e.g. `["python3","ssm_interpreter.py"]`).
    pub command: Vec<String>,

    /// Only run entries with this extension (no leading dot).
    pub extension: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            grace_period: Duration::from_secs(2),
            command: vec!["python3".to_string(), "ssm_interpreter.py".to_string()],
            extension: None,
        }
    }
}

/// CLI-level overrides applied on top of a loaded config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub timeout: Option<Duration>,
    pub grace_period: Option<Duration>,
    pub command: Option<CommandTemplate>,
    pub extension: Option<String>,
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(anyhow!("timeout must be > 0"));
        }
        if self.grace_period.is_zero() {
            return Err(anyhow!("grace_period must be > 0"));
        }
        validate_parts(&self.command)?;
        if let Some(ext) = &self.extension
            && (ext.is_empty() || ext.starts_with('.'))
        {
            return Err(anyhow!("extension must be non-empty and without a leading '.'"));
        }
        Ok(())
    }

    /// Apply overrides and re-validate the merged config.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        if let Some(grace_period) = overrides.grace_period {
            self.grace_period = grace_period;
        }
        if let Some(command) = &overrides.command {
            self.command = command.parts().to_vec();
        }
        if let Some(extension) = &overrides.extension {
            self.extension = Some(extension.clone());
        }
        self.validate()?;
        Ok(self)
    }

    pub fn template(&self) -> Result<CommandTemplate> {
        CommandTemplate::new(self.command.clone())
    }
}

/// Load config from a TOML file given on the command line.
///
/// The file must exist; fields it omits keep their defaults.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        bail!("config file {} not found", path.display());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
