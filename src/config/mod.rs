pub mod bench_cli;
pub mod cli;
pub mod toml_config;

pub use bench_cli::{BenchCli, BenchCommand};
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::domain::model::{RouteStyle, MAX_REPRESENTABLE_N};
use crate::utils::error::{BenchError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Which part of the pool this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Role {
    /// Supervises workers and serves nothing itself.
    #[default]
    Primary,
    /// Serves HTTP; started by a primary.
    Worker,
    /// Serves HTTP without any supervision.
    Standalone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WorkerMode {
    /// One OS process per worker (re-executes this binary).
    #[default]
    Process,
    /// One OS thread per worker, each with its own runtime and listener.
    Thread,
}

/// Fully resolved service settings, built once at startup and handed to
/// the server, the engine and the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub service_url: String,
    pub route_style: RouteStyle,
    pub max_fibonacci_n: u64,
    pub request_timeout_secs: u64,
    pub max_sort_n: i64,
    pub workers: usize,
    pub worker_mode: WorkerMode,
    pub respawn: bool,
    pub max_restarts: u32,
    pub restart_delay_ms: u64,
    pub monitor: bool,
    pub monitor_interval_secs: u64,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            service_url: "http://127.0.0.1:8080".to_string(),
            route_style: RouteStyle::Path,
            max_fibonacci_n: 40,
            request_timeout_secs: 0,
            max_sort_n: 100_000,
            workers: 0,
            worker_mode: WorkerMode::Process,
            respawn: true,
            max_restarts: 10,
            restart_delay_ms: 250,
            monitor: false,
            monitor_interval_secs: 30,
            verbose: false,
            json_logs: false,
        }
    }
}

impl Settings {
    /// Defaults, then the TOML file named by `--config`, then CLI/env overrides.
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(path) = &cli.config {
            let file = TomlConfig::from_file(path)?;
            settings.apply_toml(&file);
        }

        settings.apply_cli(cli);
        settings.validate()?;
        Ok(settings)
    }

    pub fn apply_toml(&mut self, file: &TomlConfig) {
        if let Some(server) = &file.server {
            if let Some(host) = &server.host {
                self.host = host.clone();
            }
            if let Some(port) = server.port {
                self.port = port;
            }
        }

        if let Some(fibonacci) = &file.fibonacci {
            if let Some(url) = &fibonacci.service_url {
                self.service_url = url.clone();
            }
            if let Some(style) = fibonacci.route_style {
                self.route_style = style;
            }
            if let Some(max_n) = fibonacci.max_n {
                self.max_fibonacci_n = max_n;
            }
            if let Some(timeout) = fibonacci.request_timeout_secs {
                self.request_timeout_secs = timeout;
            }
        }

        if let Some(max_n) = file.sort.as_ref().and_then(|s| s.max_n) {
            self.max_sort_n = max_n;
        }

        if let Some(workers) = &file.workers {
            if let Some(count) = workers.count {
                self.workers = count;
            }
            if let Some(mode) = workers.mode {
                self.worker_mode = mode;
            }
            if let Some(respawn) = workers.respawn {
                self.respawn = respawn;
            }
            if let Some(max_restarts) = workers.max_restarts {
                self.max_restarts = max_restarts;
            }
            if let Some(delay) = workers.restart_delay_ms {
                self.restart_delay_ms = delay;
            }
            if let Some(monitor) = workers.monitor {
                self.monitor = monitor;
            }
            if let Some(interval) = workers.monitor_interval_secs {
                self.monitor_interval_secs = interval;
            }
        }

        if let Some(logging) = &file.logging {
            if let Some(verbose) = logging.verbose {
                self.verbose = verbose;
            }
            if let Some(json) = logging.json {
                self.json_logs = json;
            }
        }
    }

    pub fn apply_cli(&mut self, cli: &CliConfig) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(url) = cli.service_url.as_ref().or(cli.app_url.as_ref()) {
            self.service_url = url.clone();
        }
        if let Some(style) = cli.route_style {
            self.route_style = style;
        }
        if let Some(max_n) = cli.max_fibonacci_n {
            self.max_fibonacci_n = max_n;
        }
        if let Some(timeout) = cli.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
        if let Some(max_n) = cli.max_sort_n {
            self.max_sort_n = max_n;
        }
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(mode) = cli.worker_mode {
            self.worker_mode = mode;
        }
        if cli.no_respawn {
            self.respawn = false;
        }
        if let Some(max_restarts) = cli.max_restarts {
            self.max_restarts = max_restarts;
        }
        if let Some(delay) = cli.restart_delay_ms {
            self.restart_delay_ms = delay;
        }
        // Flags only ever switch these on.
        self.monitor |= cli.monitor;
        self.verbose |= cli.verbose;
        self.json_logs |= cli.json_logs;
        if let Some(interval) = cli.monitor_interval_secs {
            self.monitor_interval_secs = interval;
        }
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| BenchError::InvalidConfigValueError {
                field: "host".to_string(),
                value: self.host.clone(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| BenchError::InvalidConfigValueError {
                field: "host".to_string(),
                value: self.host.clone(),
                reason: "host resolved to no addresses".to_string(),
            })
    }

    /// Configured worker count, or one per logical CPU when unset.
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    /// Per sub-call timeout. A sub-call's time covers its whole subtree, so
    /// a tight value fails deep recursions that would otherwise finish.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("host", &self.host)?;
        validate_positive_number("port", self.port, 1)?;
        validate_url("service_url", &self.service_url)?;
        validate_range("max_fibonacci_n", self.max_fibonacci_n, 1, MAX_REPRESENTABLE_N)?;
        validate_positive_number("max_sort_n", self.max_sort_n, 0)?;
        validate_positive_number("monitor_interval_secs", self.monitor_interval_secs, 1)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.route_style, RouteStyle::Path);
        assert!(settings.respawn);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_worker_count_defaults_to_cpus() {
        let mut settings = Settings::default();
        assert_eq!(settings.worker_count(), num_cpus::get());

        settings.workers = 3;
        assert_eq!(settings.worker_count(), 3);
    }

    #[test]
    fn test_request_timeout_is_off_unless_set() {
        let mut settings = Settings::default();
        assert_eq!(settings.request_timeout(), None);

        settings.request_timeout_secs = 120;
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_cli_overrides_toml() {
        let file = TomlConfig::from_toml_str(
            r#"
[server]
port = 9000

[fibonacci]
service_url = "http://from-file:8080"
max_n = 20

[workers]
count = 2
monitor = true
"#,
        )
        .unwrap();

        let cli = CliConfig {
            port: Some(9100),
            no_respawn: true,
            ..Default::default()
        };

        let mut settings = Settings::default();
        settings.apply_toml(&file);
        settings.apply_cli(&cli);

        assert_eq!(settings.port, 9100);
        assert_eq!(settings.service_url, "http://from-file:8080");
        assert_eq!(settings.max_fibonacci_n, 20);
        assert_eq!(settings.workers, 2);
        assert!(settings.monitor);
        assert!(!settings.respawn);
    }

    #[test]
    fn test_app_url_is_a_service_url_fallback() {
        let cli = CliConfig {
            app_url: Some("http://legacy-app:3000".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        settings.apply_cli(&cli);
        assert_eq!(settings.service_url, "http://legacy-app:3000");

        let cli = CliConfig {
            service_url: Some("http://peer:8080".to_string()),
            app_url: Some("http://legacy-app:3000".to_string()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        settings.apply_cli(&cli);
        assert_eq!(settings.service_url, "http://peer:8080");
    }

    #[test]
    fn test_resolve_reads_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[fibonacci]\nroute_style = \"query\"\n")
            .unwrap();

        let cli = CliConfig {
            config: Some(temp_file.path().to_path_buf()),
            ..Default::default()
        };

        let settings = Settings::resolve(&cli).unwrap();
        assert_eq!(settings.route_style, RouteStyle::Query);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.service_url = "not a url".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.max_fibonacci_n = MAX_REPRESENTABLE_N + 1;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.max_fibonacci_n = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.port = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.max_sort_n = -1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_listen_addr() {
        let mut settings = Settings::default();
        settings.host = "127.0.0.1".to_string();
        settings.port = 3000;
        assert_eq!(
            settings.listen_addr().unwrap(),
            "127.0.0.1:3000".parse::<SocketAddr>().unwrap()
        );
    }
}
