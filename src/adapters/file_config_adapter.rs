//! INI file configuration adapter with environment overrides.
//!
//! Any key can be overridden by `QUANTAGENT_<SECTION>_<KEY>`; the section is
//! the first segment after the prefix, the rest is the key.

use std::collections::HashMap;
use std::path::Path;

use configparser::ini::Ini;
use tracing::debug;

use crate::domain::error::AgentError;
use crate::ports::config_port::ConfigPort;

pub const ENV_PREFIX: &str = "QUANTAGENT_";

pub struct FileConfigAdapter {
    config: Ini,
    overrides: HashMap<(String, String), String>,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| AgentError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self {
            config,
            overrides: HashMap::new(),
        })
    }

    pub fn from_string(content: &str) -> Result<Self, AgentError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| AgentError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self {
            config,
            overrides: HashMap::new(),
        })
    }

    /// Configuration with no file; defaults plus environment overrides only.
    pub fn empty() -> Self {
        Self {
            config: Ini::new(),
            overrides: HashMap::new(),
        }
    }

    /// Apply `QUANTAGENT_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::vars())
    }

    /// Apply `(name, value)` pairs; names without the prefix are ignored.
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in vars {
            let Some(rest) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let Some((section, key)) = rest.split_once('_') else {
                continue;
            };
            if section.is_empty() || key.is_empty() {
                continue;
            }
            let section = section.to_lowercase();
            let key = key.to_lowercase();
            debug!(%section, %key, "config override from environment");
            self.overrides.insert((section, key), value.into());
        }
        self
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.overrides
            .get(&(section.to_lowercase(), key.to_lowercase()))
            .cloned()
            .or_else(|| self.config.get(section, key))
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_string(section, key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }
}
