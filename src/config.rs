//! Project configuration (`gatecheck.toml`)
//!
//! ```toml
//! [run]
//! mode = "blocking"
//! timeout_secs = 30
//! max_parallel = 4
//! retries = 0
//!
//! [variables]
//! MIN_COVERAGE = "80"
//!
//! [profiles.rust]
//! TEST_COMMAND = "cargo nextest run"
//!
//! [policy]
//! allow = ["^cargo build --offline$"]
//! deny = ["\\bdocker\\b"]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::GateError;
use crate::report::GateMode;

pub const CONFIG_FILE_NAME: &str = "gatecheck.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    pub run: RunSettings,
    pub variables: BTreeMap<String, String>,
    pub profiles: BTreeMap<String, BTreeMap<String, String>>,
    pub policy: PolicyConfig,
}

/// `[run]` table; unset values fall back to CLI flags or built-in defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub mode: Option<GateMode>,
    pub timeout_secs: Option<u64>,
    pub max_parallel: Option<usize>,
    pub retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Commands matching any of these are exempt from every class
    pub allow: Vec<String>,
    /// Extra patterns rejected as the `custom` class
    pub deny: Vec<String>,
}

impl GateConfig {
    /// Load `explicit` if given, else `<project_root>/gatecheck.toml` if it
    /// exists, else defaults. An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>, project_root: &Path) -> Result<Self, GateError> {
        let path: PathBuf = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = project_root.join(CONFIG_FILE_NAME);
                if !candidate.exists() {
                    debug!("no {CONFIG_FILE_NAME} found, using defaults");
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let content = fs::read_to_string(&path).map_err(|source| GateError::Io {
            path: path.clone(),
            source,
        })?;
        let config = Self::parse(&content, &path)?;
        debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, GateError> {
        let config: GateConfig = toml::from_str(content).map_err(|e| GateError::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })?;
        if config.run.max_parallel == Some(0) {
            return Err(GateError::Config {
                path: path.to_path_buf(),
                message: "run.max_parallel must be at least 1".to_string(),
            });
        }
        if config.run.timeout_secs == Some(0) {
            return Err(GateError::Config {
                path: path.to_path_buf(),
                message: "run.timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(config)
    }
}
