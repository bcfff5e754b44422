pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::app::{build_router, run_bench, run_primary, run_worker, AppState};
pub use crate::config::{BenchCli, CliConfig, Role, Settings};
pub use crate::core::{FibonacciEngine, SortBenchmark, Supervisor};
pub use crate::utils::error::{BenchError, Result};
