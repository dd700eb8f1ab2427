//! Configuration management for quill

use crate::error::{QuillError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for the schedule lead and stale-schedule bump, one year
pub const MAX_SCHEDULE_MINUTES: i64 = 525_600;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Publication scheduling settings
    pub publication: PublicationConfig,
    /// Comment moderation settings
    pub moderation: ModerationConfig,
    /// Reply thread settings
    pub threads: ThreadConfig,
    /// Asynchronous analysis settings
    pub analysis: AnalysisConfig,
    /// Taxonomy housekeeping settings
    pub housekeeping: HousekeepingConfig,
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| QuillError::Toml(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QuillError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| e.with_context(format!("Failed to load {}", path.display())))
    }

    /// Render configuration as pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| QuillError::Toml(e.to_string()))
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("moderation.toxicity_threshold", self.moderation.toxicity_threshold),
            ("moderation.spam_threshold", self.moderation.spam_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(QuillError::Config(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if self.publication.words_per_minute == 0 {
            return Err(QuillError::Config(
                "publication.words_per_minute must be positive".to_string(),
            ));
        }
        for (name, value) in [
            (
                "publication.schedule_lead_minutes",
                self.publication.schedule_lead_minutes,
            ),
            (
                "publication.stale_schedule_bump_minutes",
                self.publication.stale_schedule_bump_minutes,
            ),
        ] {
            if !(1..=MAX_SCHEDULE_MINUTES).contains(&value) {
                return Err(QuillError::Config(format!(
                    "{} must be within [1, {}], got {}",
                    name, MAX_SCHEDULE_MINUTES, value
                )));
            }
        }
        if self.moderation.max_comment_length == 0 {
            return Err(QuillError::Config(
                "moderation.max_comment_length must be positive".to_string(),
            ));
        }
        if self.analysis.max_attempts == 0 {
            return Err(QuillError::Config(
                "analysis.max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Publication scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationConfig {
    /// Reading speed used for reading-time estimates
    pub words_per_minute: usize,
    /// Lead time for scheduled posts without a requested date
    pub schedule_lead_minutes: i64,
    /// Replacement lead time when a schedule request lands in the past
    pub stale_schedule_bump_minutes: i64,
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
            schedule_lead_minutes: 60,
            stale_schedule_bump_minutes: 30,
        }
    }
}

/// What happens to a comment once the analyzer flags it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlaggedPolicy {
    /// Keep it pending and surface it for priority human review
    #[default]
    Review,
    /// Reject it outright
    Reject,
}

/// Comment moderation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    /// Toxicity score at or above which a comment is flagged
    pub toxicity_threshold: f64,
    /// Spam score at or above which a comment is flagged
    pub spam_threshold: f64,
    /// Host disposition for flagged comments
    pub flagged_policy: FlaggedPolicy,
    /// Maximum comment content length in characters
    pub max_comment_length: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            toxicity_threshold: 0.8,
            spam_threshold: 0.8,
            flagged_policy: FlaggedPolicy::Review,
            max_comment_length: 5000,
        }
    }
}

/// Reply thread configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Deepest reply level rendered; deeper replies are flattened
    pub max_depth: usize,
    /// Whether readers see comments still awaiting moderation
    pub show_pending: bool,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            max_depth: 6,
            show_pending: true,
        }
    }
}

/// Asynchronous analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Per-call analyzer timeout in milliseconds
    pub timeout_ms: u64,
    /// Total analyzer attempts per comment
    pub max_attempts: u32,
    /// Delay before the first retry in milliseconds
    pub initial_backoff_ms: u64,
    /// Upper bound for the retry delay in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 5000,
        }
    }
}

/// Taxonomy housekeeping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HousekeepingConfig {
    /// Category names never removed by pruning
    pub protected_categories: Vec<String>,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            protected_categories: vec!["General".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.publication.words_per_minute, 200);
        assert_eq!(config.moderation.toxicity_threshold, 0.8);
        assert_eq!(config.moderation.spam_threshold, 0.8);
        assert_eq!(config.moderation.flagged_policy, FlaggedPolicy::Review);
        assert_eq!(config.threads.max_depth, 6);
        assert!(config.threads.show_pending);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = config.to_toml_string().unwrap();
        assert!(toml.contains("[publication]"));
        assert!(toml.contains("[moderation]"));
        assert!(toml.contains("flagged_policy = \"review\""));

        let config2 = Config::from_toml_str(&toml).unwrap();
        assert_eq!(config.threads.max_depth, config2.threads.max_depth);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml_str(
            "[moderation]\nspam_threshold = 0.5\nflagged_policy = \"reject\"\n",
        )
        .unwrap();
        assert_eq!(config.moderation.spam_threshold, 0.5);
        assert_eq!(config.moderation.toxicity_threshold, 0.8);
        assert_eq!(config.moderation.flagged_policy, FlaggedPolicy::Reject);
        assert_eq!(config.analysis.max_attempts, 3);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let result = Config::from_toml_str("[moderation]\ntoxicity_threshold = 1.5\n");
        assert!(matches!(result, Err(QuillError::Config(_))));
    }

    #[test]
    fn test_schedule_minutes_are_bounded() {
        for toml in [
            "[publication]\nschedule_lead_minutes = 0\n",
            "[publication]\nschedule_lead_minutes = -30\n",
            "[publication]\nschedule_lead_minutes = 9223372036854775807\n",
            "[publication]\nstale_schedule_bump_minutes = 0\n",
            "[publication]\nstale_schedule_bump_minutes = 600000\n",
        ] {
            assert!(
                matches!(Config::from_toml_str(toml), Err(QuillError::Config(_))),
                "accepted {:?}",
                toml
            );
        }

        let config = Config::from_toml_str(
            "[publication]\nschedule_lead_minutes = 525600\nstale_schedule_bump_minutes = 1\n",
        )
        .unwrap();
        assert_eq!(config.publication.schedule_lead_minutes, MAX_SCHEDULE_MINUTES);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/quill/config.toml"));
        assert!(matches!(result, Err(QuillError::FileNotFound(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[threads]\nmax_depth = 3\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.threads.max_depth, 3);
    }
}
