//! Player configuration.
//!
//! Values come from, lowest precedence first: built-in defaults, an
//! optional JSON file, and command-line flags (applied by the binary).

use crate::graph::cache::InstanceCache;
use crate::graph::instance::DirectoryLoader;
use crate::policy::{BiddingPolicy, PolicyKind};
use log::{info, LevelFilter};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one player process.
///
/// Missing fields in a config file fall back to the defaults below.
///
/// # Examples
///
/// ```
/// use fctp_player::config::PlayerConfig;
/// use fctp_player::policy::PolicyKind;
///
/// let config: PlayerConfig = serde_json::from_str(r#"{ "policy": "FirstEdges" }"#).unwrap();
/// assert_eq!(config.policy, PolicyKind::FirstEdges);
/// assert_eq!(config.name, "Parallax");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Name reported to the referee.
    pub name: String,
    /// Referee address, `host:port`.
    pub server: String,
    /// Directory holding `<instance>.DAT` files.
    pub data: PathBuf,
    /// Load every instance before connecting.
    pub preload: bool,
    pub policy: PolicyKind,
    /// Price multiplier. `RandomEdges` uses its integer part.
    pub factor: f64,
    /// 0 = warnings only, 1 = protocol traffic, 2 = debug, 3 = trace.
    pub verbose: u8,
    pub seed: Option<u64>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: "Parallax".to_string(),
            server: "localhost:8080".to_string(),
            data: PathBuf::from("./data"),
            preload: true,
            policy: PolicyKind::default(),
            factor: 2.0,
            verbose: 1,
            seed: None,
        }
    }
}

impl PlayerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PlayerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() || self.name.contains(char::is_whitespace) {
            return Err(ConfigError::Invalid(format!(
                "player name '{}' must be a single non-empty word",
                self.name
            )));
        }
        if !self.factor.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "factor must be finite, got {}",
                self.factor
            )));
        }
        if self.server.is_empty() {
            return Err(ConfigError::Invalid("server address is empty".to_string()));
        }
        Ok(())
    }

    /// Default log level for this verbosity; `RUST_LOG` overrides it.
    pub fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Instance cache over the data directory, preloaded if configured.
    pub fn build_cache(&self) -> Arc<InstanceCache> {
        let cache = InstanceCache::new(DirectoryLoader::new(self.data.clone()));
        if self.preload {
            let loaded = cache.load_all();
            info!("Preloaded {} instances from {}", loaded, self.data.display());
        }
        Arc::new(cache)
    }

    pub fn build_policy(&self, cache: Arc<InstanceCache>) -> Box<dyn BiddingPolicy> {
        self.policy.build(cache, self.factor, self.seed)
    }
}
