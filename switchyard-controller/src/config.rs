//! Runtime configuration.

use anyhow::{Context, Result};
use serde::Deserialize;

/// The default interval at which the cluster is re-evaluated.
const DEFAULT_RECOMPUTE_INTERVAL_SECONDS: u64 = 10;

/// Runtime configuration data.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The controller's logging config, which uses Rust's `env_logger` directives.
    pub rust_log: String,
    /// The name of the cluster this controller manages.
    pub cluster_name: String,

    /// The path of the cluster snapshot file, YAML or JSON encoded.
    ///
    /// The snapshot is re-read on every pass, so whatever maintains it only needs to replace
    /// the file for the controller to converge on the new state of the cluster.
    pub snapshot_path: String,
    /// The path to the database on disk.
    #[serde(default = "crate::database::default_data_path")]
    pub storage_data_path: String,
    /// The interval in seconds at which the cluster is re-evaluated.
    #[serde(default = "Config::default_recompute_interval_seconds")]
    pub recompute_interval_seconds: u64,
}

impl Config {
    /// Create a new config instance.
    ///
    /// Reads the cluster name, snapshot path, data path and recompute interval from the
    /// environment, and rejects an empty cluster name or a zero interval.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Result<Self> {
        let config: Config = envy::from_env().context("error building config from env")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the given config.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.recompute_interval_seconds == 0 {
            anyhow::bail!("RECOMPUTE_INTERVAL_SECONDS must be greater than 0");
        }
        if self.cluster_name.is_empty() {
            anyhow::bail!("CLUSTER_NAME may not be empty");
        }
        Ok(())
    }

    fn default_recompute_interval_seconds() -> u64 {
        DEFAULT_RECOMPUTE_INTERVAL_SECONDS
    }

    /// Create a config for testing, backed by a temporary data directory.
    #[cfg(test)]
    pub fn new_test() -> Result<(std::sync::Arc<Self>, tempfile::TempDir)> {
        let tmpdir = tempfile::tempdir().context("error creating tmp dir for test")?;
        let config = Self {
            rust_log: "error".into(),
            cluster_name: "test".into(),
            snapshot_path: tmpdir.path().join("snapshot.yaml").to_string_lossy().into_owned(),
            storage_data_path: tmpdir.path().to_string_lossy().into_owned(),
            recompute_interval_seconds: 1,
        };
        Ok((std::sync::Arc::new(config), tmpdir))
    }
}
