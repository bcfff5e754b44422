use crate::domain::model::RouteStyle;
use clap::Parser;
use std::path::PathBuf;

use super::{Role, WorkerMode};

/// Command line / environment overrides. Anything left unset falls back to
/// the TOML file (if any) and then to the built-in defaults.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "fibload")]
#[command(about = "Recursive Fibonacci and bubble-sort load service with a supervised worker pool")]
pub struct CliConfig {
    #[arg(short, long, env = "FIBLOAD_CONFIG", help = "Path to a TOML config file")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "BIND_HOST")]
    pub host: Option<String>,

    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "SERVICE_URL", help = "Base URL Fibonacci sub-calls are sent to")]
    pub service_url: Option<String>,

    /// Older deployments name the base URL `APP_URL`; `--service-url` wins.
    #[arg(long, env = "APP_URL", hide = true)]
    pub app_url: Option<String>,

    #[arg(long, value_enum, env = "ROUTE_STYLE")]
    pub route_style: Option<RouteStyle>,

    #[arg(long, env = "MAX_FIBONACCI_N")]
    pub max_fibonacci_n: Option<u64>,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", help = "Timeout for each Fibonacci sub-call in seconds, covering its whole recursive subtree; 0 (default) disables it")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "MAX_SORT_N")]
    pub max_sort_n: Option<i64>,

    #[arg(short, long, env = "WORKERS", help = "Worker count, 0 means one per CPU")]
    pub workers: Option<usize>,

    #[arg(long, value_enum, env = "WORKER_MODE")]
    pub worker_mode: Option<WorkerMode>,

    #[arg(long, env = "NO_RESPAWN", help = "Do not restart workers that exit")]
    pub no_respawn: bool,

    #[arg(long, env = "MAX_RESTARTS")]
    pub max_restarts: Option<u32>,

    #[arg(long, env = "RESTART_DELAY_MS")]
    pub restart_delay_ms: Option<u64>,

    #[arg(long, env = "MONITOR", help = "Periodically log worker CPU and memory usage")]
    pub monitor: bool,

    #[arg(long, env = "MONITOR_INTERVAL_SECS")]
    pub monitor_interval_secs: Option<u64>,

    #[arg(short, long, env = "VERBOSE", help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    #[arg(long, value_enum, default_value_t = Role::Primary, hide = true)]
    pub role: Role,

    #[arg(long, hide = true)]
    pub worker_id: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let cli = CliConfig::try_parse_from(["fibload"]).unwrap();
        assert_eq!(cli.role, Role::Primary);
        assert!(cli.worker_id.is_none());
        assert!(!cli.no_respawn);
    }

    #[test]
    fn test_parse_worker_invocation() {
        let cli = CliConfig::try_parse_from([
            "fibload",
            "--port",
            "9000",
            "--route-style",
            "query",
            "--role",
            "worker",
            "--worker-id",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.route_style, Some(RouteStyle::Query));
        assert_eq!(cli.role, Role::Worker);
        assert_eq!(cli.worker_id, Some(2));
    }

    #[test]
    fn test_parse_app_url_flag() {
        let cli =
            CliConfig::try_parse_from(["fibload", "--app-url", "http://legacy-app:3000"]).unwrap();
        assert_eq!(cli.app_url.as_deref(), Some("http://legacy-app:3000"));
    }

    #[test]
    fn test_rejects_non_numeric_port() {
        assert!(CliConfig::try_parse_from(["fibload", "--port", "http"]).is_err());
    }
}
