use crate::adapters::{HttpLoadTarget, LocalStorage};
use crate::config::{BenchCli, BenchCommand};
use crate::core::bench::{BenchPlanner, LoadRunner, SearchLimits};
use crate::domain::bench::{BenchmarkReport, CaseKind};
use crate::domain::model::RouteStyle;
use crate::domain::ports::{LoadExecutor, Storage};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use chrono::{Local, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Where and how the load client reaches the service.
#[derive(Debug, Clone)]
pub struct BenchTarget {
    pub url: String,
    pub route_style: RouteStyle,
    pub request_timeout: Duration,
    pub duration_per_test: Duration,
}

impl BenchTarget {
    pub fn from_cli(cli: &BenchCli) -> Self {
        Self {
            url: cli.url.clone(),
            route_style: cli.route_style,
            request_timeout: cli.request_timeout(),
            duration_per_test: cli.duration_per_test(),
        }
    }

    pub fn runner(&self, case: CaseKind) -> Result<LoadRunner> {
        let target =
            HttpLoadTarget::new(&self.url, case, self.route_style, self.request_timeout)?;
        Ok(LoadRunner::new(Arc::new(target), self.duration_per_test))
    }

    pub fn planner(&self, case: CaseKind, limits: SearchLimits) -> Result<BenchPlanner<LoadRunner>> {
        Ok(BenchPlanner::new(self.runner(case)?, limits))
    }
}

/// Benchmarks each case in turn, resting between cases.
pub async fn benchmark_cases(
    target: &BenchTarget,
    cases: &[CaseKind],
    limits: &SearchLimits,
) -> Result<BenchmarkReport> {
    let mut benchmarks = Vec::with_capacity(cases.len());

    for (i, case) in cases.iter().enumerate() {
        if i > 0 && !limits.rest.is_zero() {
            tokio::time::sleep(limits.rest).await;
        }
        info!("🚀 Running benchmark for {}", case.name());
        let planner = target.planner(*case, limits.clone())?;
        benchmarks.push(planner.run_benchmark().await?);
    }

    Ok(BenchmarkReport {
        created_at: Utc::now(),
        target: target.url.clone(),
        benchmarks,
    })
}

/// Writes `value` as `{YYYYmmdd_HHMMSS}_{kind}.json` and returns the file name.
pub async fn save_json<S: Storage, T: Serialize>(
    storage: &S,
    kind: &str,
    value: &T,
) -> Result<String> {
    let file_name = format!("{}_{}.json", Local::now().format("%Y%m%d_%H%M%S"), kind);
    let data = serde_json::to_vec_pretty(value)?;
    storage.write_file(&file_name, &data).await?;
    Ok(file_name)
}

/// Runs one load client command and returns the name of the saved file.
pub async fn run_bench(cli: &BenchCli) -> Result<String> {
    cli.validate()?;

    let storage = LocalStorage::new(cli.storage.clone());
    let target = BenchTarget::from_cli(cli);
    let limits = cli.limits();

    let file_name = match &cli.command {
        BenchCommand::Benchmark { test_cases, .. } => {
            let report = benchmark_cases(&target, test_cases, &limits).await?;
            save_json(&storage, "benchmark", &report).await?
        }
        BenchCommand::TestExecution {
            test_case,
            load,
            requests_per_second,
        } => {
            let execution = target
                .runner(*test_case)?
                .execute(*requests_per_second, *load)
                .await?;
            if execution.has_errors() {
                warn!(
                    "test execution hit {} errors, first: {}",
                    execution.errors.len(),
                    execution.errors[0]
                );
            }
            save_json(&storage, "test_execution", &execution).await?
        }
        BenchCommand::MaxLoad {
            test_case,
            requests_per_second,
            ..
        } => {
            let execution = target
                .planner(*test_case, limits)?
                .find_max_acceptable_load(*requests_per_second)
                .await?;
            save_json(&storage, "max_load", &execution).await?
        }
        BenchCommand::MaxRps {
            test_case, load, ..
        } => {
            let execution = target
                .planner(*test_case, limits)?
                .find_max_requests_per_second(*load, 0)
                .await?;
            save_json(&storage, "max_rps", &execution).await?
        }
    };

    info!("💾 Results saved to {} in {}", file_name, cli.storage);
    Ok(file_name)
}
