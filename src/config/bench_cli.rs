use crate::core::bench::SearchLimits;
use crate::domain::bench::CaseKind;
use crate::domain::model::RouteStyle;
use crate::utils::error::Result;
use crate::utils::validation::{validate_positive_number, validate_range, validate_url, Validate};
use clap::{Parser, Subcommand};
use std::time::Duration;

/// Load client for a running fibload service. Every run is saved as a
/// timestamped JSON file under `--storage`.
#[derive(Debug, Clone, Parser)]
#[command(name = "fibload-bench")]
#[command(about = "Drives a fibload service at fixed request rates and stores the results as JSON")]
pub struct BenchCli {
    #[command(subcommand)]
    pub command: BenchCommand,

    #[arg(long, env = "APP_URL", default_value = "http://localhost:8080", global = true)]
    pub url: String,

    #[arg(long, env = "BENCH_STORAGE", default_value = "db", global = true, help = "Directory results are written to")]
    pub storage: String,

    #[arg(long, default_value_t = 30, global = true, help = "Seconds each fixed-rate run lasts")]
    pub duration_per_test: u64,

    #[arg(long, value_enum, default_value_t = RouteStyle::Path, global = true)]
    pub route_style: RouteStyle,

    #[arg(long, default_value_t = 30, global = true, help = "Per-request timeout in seconds")]
    pub timeout_secs: u64,

    #[arg(short, long, env = "VERBOSE", global = true)]
    pub verbose: bool,

    #[arg(long, env = "JSON_LOGS", global = true)]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum BenchCommand {
    /// Finds the load limit, then the maximum rate for the loads just below it.
    Benchmark {
        #[arg(long, value_enum, num_args = 1.., default_values_t = [CaseKind::Fibonacci, CaseKind::BubbleSort])]
        test_cases: Vec<CaseKind>,

        #[arg(long, default_value_t = 2.0)]
        max_response_time: f64,

        #[arg(long = "max-n-loads-to-test", default_value_t = 3)]
        max_loads_to_test: u64,

        #[arg(long, default_value_t = 1)]
        min_requests_per_second: u32,

        #[arg(long, default_value_t = 30, help = "Seconds to pause between searches")]
        rest_time: u64,

        #[arg(long, default_value_t = 10, help = "Highest rate tried is 2^max-power per second")]
        max_power: u32,
    },

    /// One fixed-rate run at one load.
    TestExecution {
        #[arg(long, value_enum, default_value_t = CaseKind::Fibonacci)]
        test_case: CaseKind,

        #[arg(long, default_value_t = 1)]
        load: u64,

        #[arg(long, default_value_t = 1)]
        requests_per_second: u32,
    },

    /// Raises the load at a fixed rate until responses get too slow.
    MaxLoad {
        #[arg(long, value_enum, default_value_t = CaseKind::Fibonacci)]
        test_case: CaseKind,

        #[arg(long, default_value_t = 1)]
        requests_per_second: u32,

        #[arg(long, default_value_t = 2.0)]
        max_response_time: f64,
    },

    /// Searches the highest rate one load can sustain.
    MaxRps {
        #[arg(long, value_enum, default_value_t = CaseKind::Fibonacci)]
        test_case: CaseKind,

        #[arg(long, default_value_t = 1)]
        load: u64,

        #[arg(long, default_value_t = 2.0)]
        max_response_time: f64,

        #[arg(long, default_value_t = 10)]
        max_power: u32,
    },
}

impl BenchCli {
    pub fn duration_per_test(&self) -> Duration {
        Duration::from_secs(self.duration_per_test)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Search bounds for the chosen command; fields a command has no flag
    /// for keep their defaults.
    pub fn limits(&self) -> SearchLimits {
        let defaults = SearchLimits::default();
        match &self.command {
            BenchCommand::Benchmark {
                max_response_time,
                max_loads_to_test,
                min_requests_per_second,
                rest_time,
                max_power,
                ..
            } => SearchLimits {
                max_avg_response_secs: *max_response_time,
                max_power: *max_power,
                max_loads_to_test: *max_loads_to_test,
                min_requests_per_second: *min_requests_per_second,
                rest: Duration::from_secs(*rest_time),
                ..defaults
            },
            BenchCommand::MaxLoad {
                max_response_time, ..
            } => SearchLimits {
                max_avg_response_secs: *max_response_time,
                ..defaults
            },
            BenchCommand::MaxRps {
                max_response_time,
                max_power,
                ..
            } => SearchLimits {
                max_avg_response_secs: *max_response_time,
                max_power: *max_power,
                ..defaults
            },
            BenchCommand::TestExecution { .. } => defaults,
        }
    }
}

impl Validate for BenchCli {
    fn validate(&self) -> Result<()> {
        validate_url("url", &self.url)?;
        validate_positive_number("duration_per_test", self.duration_per_test, 1)?;
        validate_positive_number("timeout_secs", self.timeout_secs, 1)?;

        match &self.command {
            BenchCommand::Benchmark {
                min_requests_per_second,
                max_power,
                ..
            } => {
                validate_positive_number("min_requests_per_second", *min_requests_per_second, 1)?;
                validate_range("max_power", *max_power, 0, 31)?;
            }
            BenchCommand::TestExecution {
                requests_per_second,
                ..
            }
            | BenchCommand::MaxLoad {
                requests_per_second,
                ..
            } => validate_positive_number("requests_per_second", *requests_per_second, 1)?,
            BenchCommand::MaxRps { max_power, .. } => {
                validate_range("max_power", *max_power, 0, 31)?
            }
        }

        validate_positive_number(
            "max_response_time",
            self.limits().max_avg_response_secs,
            0.001,
        )
    }
}
