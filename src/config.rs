//! Service configuration
//!
//! Loaded from an optional TOML file, then overridden by the environment and
//! command-line flags:
//!
//! ```toml
//! environment = "production"
//!
//! [server]
//! bind = "0.0.0.0:8080"
//! workers = 8
//! max_body_bytes = 10485760
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Overrides `environment` from the config file
pub const ENV_VAR: &str = "FRAMECOUNT_ENV";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Reported by the ping endpoint
    pub environment: String,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub workers: usize,
    /// Larger request bodies are rejected with 413
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            workers: 4,
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str, path: &Path) -> Result<Self> {
        toml::from_str(s).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from `path`, or use defaults when no path is given.
    /// The environment override is applied either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&contents, path)?
            }
            None => Self::default(),
        };

        if let Ok(env) = std::env::var(ENV_VAR) {
            if !env.is_empty() {
                config.environment = env;
            }
        }

        Ok(config)
    }

    pub fn with_bind(mut self, bind: Option<String>) -> Self {
        if let Some(bind) = bind {
            self.server.bind = bind;
        }
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if let Some(workers) = workers {
            self.server.workers = workers.max(1);
        }
        self
    }
}
