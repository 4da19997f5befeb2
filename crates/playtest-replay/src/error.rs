//! Error types for the replay binary.

use playtest_rules::RuleError;
use playtest_snapshot::{ConfigError, ReplayError};

/// Top-level error for the replay binary.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// The rule document could not be loaded.
    #[error("rule error: {source}")]
    Rules {
        /// The underlying rule error.
        #[from]
        source: RuleError,
    },

    /// Opening the snapshot directory failed.
    #[error("replay error: {source}")]
    Replay {
        /// The underlying replay error.
        #[from]
        source: ReplayError,
    },

    /// The config names no snapshot directory.
    #[error("no snapshot directory: set snapshots.snapshot_dir or PLAYTEST_SNAPSHOT_DIR")]
    NoSnapshotDir,
}

#[cfg(test)]
mod tests {
    use super::*;
    use playtest_rules::RuleSet;

    #[test]
    fn rule_load_failure_is_a_rules_error() {
        let err = RuleSet::parse("{ not json").map_err(CliError::from);
        assert!(matches!(err, Err(CliError::Rules { .. })));
    }
}
