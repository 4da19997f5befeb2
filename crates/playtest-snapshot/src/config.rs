//! Configuration loading and typed config structures for playtest runs.
//!
//! The canonical configuration lives in `playtest-config.yaml` at the project
//! root. Every field has a default, so an empty or partial file is valid.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level playtest configuration.
///
/// Mirrors the structure of `playtest-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlaytestConfig {
    /// Snapshot strategy and persistence.
    #[serde(default)]
    pub snapshots: SnapshotConfig,

    /// Event rule source.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Diff computation switches.
    #[serde(default)]
    pub diff: DiffConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlaytestConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `PLAYTEST_SNAPSHOT_DIR` overrides `snapshots.snapshot_dir`
    /// - `PLAYTEST_RULES_PATH` overrides `rules.path`
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. Applies the same environment
    /// overrides as [`PlaytestConfig::from_file`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `PLAYTEST_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PLAYTEST_SNAPSHOT_DIR") {
            self.snapshots.snapshot_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = std::env::var("PLAYTEST_RULES_PATH") {
            self.rules.path = PathBuf::from(val);
        }
    }
}

/// Snapshot strategy thresholds and the optional backing directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SnapshotConfig {
    /// Force a full snapshot once this many ticks have passed since the last.
    #[serde(default = "default_full_snapshot_interval")]
    pub full_snapshot_interval: u64,

    /// Force a full snapshot once this many non-full snapshots are chained.
    #[serde(default = "default_max_incremental_chain")]
    pub max_incremental_chain: u32,

    /// Event ids that force a checkpoint snapshot.
    #[serde(default = "default_checkpoint_triggers")]
    pub checkpoint_triggers: Vec<String>,

    /// Directory snapshots are written to. In-memory only when unset.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            full_snapshot_interval: default_full_snapshot_interval(),
            max_incremental_chain: default_max_incremental_chain(),
            checkpoint_triggers: default_checkpoint_triggers(),
            snapshot_dir: None,
        }
    }
}

/// Where the event rule document lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RulesConfig {
    /// Path of the JSON rule document.
    #[serde(default = "default_rules_path")]
    pub path: PathBuf,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: default_rules_path(),
        }
    }
}

/// Diff computation switches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DiffConfig {
    /// Skip rule inference and always use the legacy diff.
    #[serde(default)]
    pub force_legacy: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

const fn default_full_snapshot_interval() -> u64 {
    100
}

const fn default_max_incremental_chain() -> u32 {
    20
}

fn default_checkpoint_triggers() -> Vec<String> {
    ["level_up", "floor_advance", "player_death"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

fn default_rules_path() -> PathBuf {
    PathBuf::from("config/event_rules.json")
}

fn default_log_level() -> String {
    "info".to_owned()
}
