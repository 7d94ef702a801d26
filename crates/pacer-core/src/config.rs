//! Run configuration
//!
//! [`RunConfig`] is read from a TOML project file and supplies defaults.
//! [`RunArgs`] holds the values the argument collaborator settled on for this
//! run; plugins validate them when the arguments-parsed event fires.
//!
//! ```toml
//! [repeater]
//! repeats = 3
//! repeats_delay = 0.5
//!
//! [seeder]
//! fixed_seed = true
//!
//! [runner]
//! interrupt_on = ["keyboard_interrupt", "terminate"]
//! ```

use crate::errors::{PacerError, Result};
use crate::interrupt::InterruptReason;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Trait for configuration validation
pub trait ConfigValidation {
    /// Validate configuration parameters
    fn validate(&self) -> Result<()>;
}

/// `[repeater]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepeaterConfig {
    /// Executions per scenario, including the first
    pub repeats: u32,
    /// Seconds awaited before each extra execution is scheduled
    pub repeats_delay: f64,
}

impl Default for RepeaterConfig {
    fn default() -> Self {
        Self {
            repeats: 1,
            repeats_delay: 0.0,
        }
    }
}

/// `[rerunner]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerunnerConfig {
    /// Extra attempts granted to a failed scenario
    pub reruns: u32,
    /// Seconds awaited before each rerun is scheduled
    pub reruns_delay: f64,
}

/// `[seeder]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeederConfig {
    /// Reuse one seed for every execution of the same scenario
    pub fixed_seed: bool,
    /// Run-level seed; synthesized when absent
    pub seed: Option<String>,
}

/// `[runner]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Signals that stop the run instead of failing a single scenario
    pub interrupt_on: Vec<InterruptReason>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interrupt_on: InterruptReason::designated_defaults(),
        }
    }
}

/// Project-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Repeat policy defaults
    pub repeater: RepeaterConfig,
    /// Rerun policy defaults
    pub rerunner: RerunnerConfig,
    /// Seed allocator defaults
    pub seeder: SeederConfig,
    /// Runner behaviour
    pub runner: RunnerConfig,
}

impl RunConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl ConfigValidation for RunConfig {
    fn validate(&self) -> Result<()> {
        self.repeater.validate()?;
        self.rerunner.validate()?;
        self.runner.validate()?;
        Ok(())
    }
}

impl ConfigValidation for RepeaterConfig {
    fn validate(&self) -> Result<()> {
        if !self.repeats_delay.is_finite() {
            return Err(PacerError::config_file("repeats_delay must be a finite number"));
        }
        Ok(())
    }
}

impl ConfigValidation for RerunnerConfig {
    fn validate(&self) -> Result<()> {
        if !self.reruns_delay.is_finite() {
            return Err(PacerError::config_file("reruns_delay must be a finite number"));
        }
        Ok(())
    }
}

impl ConfigValidation for RunnerConfig {
    fn validate(&self) -> Result<()> {
        if self
            .interrupt_on
            .iter()
            .any(|reason| matches!(reason, InterruptReason::HandlerFailed(_)))
        {
            return Err(PacerError::config_file(
                "interrupt_on accepts external signals only",
            ));
        }
        Ok(())
    }
}

/// Operator values consumed by the core for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// `--repeats`
    pub repeats: u32,
    /// `--repeats-delay`, in seconds
    pub repeats_delay: f64,
    /// `--reruns`
    pub reruns: u32,
    /// `--reruns-delay`, in seconds
    pub reruns_delay: f64,
    /// `--fixed-seed`
    pub fixed_seed: bool,
    /// `--seed`; synthesized by the seed allocator when absent
    pub seed: Option<String>,
}

impl RunArgs {
    /// Start from the project configuration
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            repeats: config.repeater.repeats,
            repeats_delay: config.repeater.repeats_delay,
            reruns: config.rerunner.reruns,
            reruns_delay: config.rerunner.reruns_delay,
            fixed_seed: config.seeder.fixed_seed,
            seed: config.seeder.seed.clone(),
        }
    }

    /// Override `--repeats`
    pub fn with_repeats(mut self, repeats: u32) -> Self {
        self.repeats = repeats;
        self
    }

    /// Override `--repeats-delay`
    pub fn with_repeats_delay(mut self, delay: f64) -> Self {
        self.repeats_delay = delay;
        self
    }

    /// Override `--reruns`
    pub fn with_reruns(mut self, reruns: u32) -> Self {
        self.reruns = reruns;
        self
    }

    /// Override `--reruns-delay`
    pub fn with_reruns_delay(mut self, delay: f64) -> Self {
        self.reruns_delay = delay;
        self
    }

    /// Override `--fixed-seed`
    pub fn with_fixed_seed(mut self, fixed_seed: bool) -> Self {
        self.fixed_seed = fixed_seed;
        self
    }

    /// Override `--seed`
    pub fn with_seed(mut self, seed: impl Into<String>) -> Self {
        self.seed = Some(seed.into());
        self
    }
}

impl Default for RunArgs {
    fn default() -> Self {
        Self::from_config(&RunConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.repeater.repeats, 1);
        assert_eq!(config.rerunner.reruns, 0);
        assert!(!config.seeder.fixed_seed);
        assert_eq!(config.runner.interrupt_on.len(), 3);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml_str(
            r#"
            [repeater]
            repeats = 3

            [seeder]
            seed = "replay-me"
            "#,
        )
        .unwrap();

        assert_eq!(config.repeater.repeats, 3);
        assert_eq!(config.repeater.repeats_delay, 0.0);
        assert_eq!(config.seeder.seed.as_deref(), Some("replay-me"));
        assert_eq!(config.runner, RunnerConfig::default());
    }

    #[test]
    fn test_malformed_toml_is_config_file_error() {
        let err = RunConfig::from_toml_str("[repeater\nrepeats = ").unwrap_err();
        assert!(matches!(err, PacerError::ConfigFile { .. }));
    }

    #[test]
    fn test_handler_failure_not_allowed_in_interrupt_set() {
        let err = RunConfig::from_toml_str(
            r#"
            [runner]
            interrupt_on = [{ handler_failed = "x" }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, PacerError::ConfigFile { .. }));
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::load(dir.path().join("pacer.toml")).unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rerunner]\nreruns = 2\nreruns_delay = 0.25").unwrap();

        let config = RunConfig::load(file.path()).unwrap();

        assert_eq!(config.rerunner.reruns, 2);
        assert_eq!(config.rerunner.reruns_delay, 0.25);
    }

    #[test]
    fn test_args_from_config() {
        let mut config = RunConfig::default();
        config.repeater.repeats = 4;
        config.seeder.fixed_seed = true;

        let args = RunArgs::from_config(&config).with_seed("abc");

        assert_eq!(args.repeats, 4);
        assert!(args.fixed_seed);
        assert_eq!(args.seed.as_deref(), Some("abc"));
    }
}
