use crate::domain::model::RouteStyle;
use crate::utils::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::WorkerMode;

/// On-disk configuration. Every field is optional; whatever is present
/// overrides the built-in defaults and is itself overridden by CLI flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub server: Option<ServerSection>,
    pub fibonacci: Option<FibonacciSection>,
    pub sort: Option<SortSection>,
    pub workers: Option<WorkersSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FibonacciSection {
    pub service_url: Option<String>,
    pub route_style: Option<RouteStyle>,
    pub max_n: Option<u64>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortSection {
    pub max_n: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkersSection {
    pub count: Option<usize>,
    pub mode: Option<WorkerMode>,
    pub respawn: Option<bool>,
    pub max_restarts: Option<u32>,
    pub restart_delay_ms: Option<u64>,
    pub monitor: Option<bool>,
    pub monitor_interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BenchError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BenchError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of the environment variable `VAR`.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;

        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BenchError::ConfigError {
            message: e.to_string(),
        })?;

        let mut missing = Vec::new();
        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| {
                missing.push(var_name.to_string());
                String::new()
            })
        });

        if !missing.is_empty() {
            return Err(BenchError::ConfigError {
                message: format!("undefined environment variables: {}", missing.join(", ")),
            });
        }

        Ok(result.into_owned())
    }
}
