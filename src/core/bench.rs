use crate::domain::bench::{CaseBenchmark, Execution, Timespan};
use crate::domain::ports::{LoadExecutor, LoadTarget};
use crate::utils::error::{BenchError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Sends requests to a target at a fixed rate for a fixed duration, without
/// waiting for earlier requests to finish.
pub struct LoadRunner {
    target: Arc<dyn LoadTarget>,
    duration: Duration,
}

impl LoadRunner {
    pub fn new(target: Arc<dyn LoadTarget>, duration: Duration) -> Self {
        Self { target, duration }
    }

    pub fn request_count(&self, requests_per_second: u32) -> u64 {
        (f64::from(requests_per_second) * self.duration.as_secs_f64()).round() as u64
    }
}

#[async_trait]
impl LoadExecutor for LoadRunner {
    fn name(&self) -> &str {
        self.target.name()
    }

    fn min_recommended_load(&self) -> u64 {
        self.target.min_recommended_load()
    }

    async fn execute(&self, requests_per_second: u32, load: u64) -> Result<Execution> {
        if requests_per_second == 0 {
            return Err(BenchError::InvalidConfigValueError {
                field: "requests_per_second".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let total = self.request_count(requests_per_second);
        let period = Duration::from_secs_f64(1.0 / f64::from(requests_per_second));
        info!(
            "⏱️ {}: {} requests at {}/s with load {}",
            self.target.name(),
            total,
            requests_per_second,
            load
        );

        let start = Utc::now();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut in_flight = JoinSet::new();
        for _ in 0..total {
            ticker.tick().await;
            let target = Arc::clone(&self.target);
            in_flight.spawn(async move { target.run(load).await });
        }

        let span_making_requests = Timespan::until_now(start)?;
        let behind = span_making_requests.seconds() - self.duration.as_secs_f64();
        if behind > period.as_secs_f64() {
            warn!(
                "could not keep {} requests per second, sending ran {:.2}s over",
                requests_per_second, behind
            );
        }

        let mut results = Vec::new();
        let mut errors = Vec::new();
        while let Some(joined) = in_flight.join_next().await {
            match joined {
                Ok(Ok(sample)) => results.push(sample),
                Ok(Err(e)) => errors.push(e.to_string()),
                Err(e) => errors.push(format!("request task failed: {}", e)),
            }
        }
        results.sort_by_key(|sample| sample.request_span.start);

        if !errors.is_empty() {
            warn!("{} of {} requests failed", errors.len(), total);
        }

        Ok(Execution {
            test_case_name: self.target.name().to_string(),
            load,
            requests_per_second,
            duration_secs: self.duration.as_secs_f64(),
            total_span: Timespan::until_now(start)?,
            span_making_requests,
            results,
            errors,
        })
    }
}

/// Bounds for the load and rate searches.
#[derive(Debug, Clone)]
pub struct SearchLimits {
    pub max_avg_response_secs: f64,
    pub load_increment: u64,
    pub max_load_iterations: usize,
    /// Highest rate tried is `2^max_power` requests per second.
    pub max_power: u32,
    pub max_loads_to_test: u64,
    pub min_requests_per_second: u32,
    /// Pause between searches so the service can settle.
    pub rest: Duration,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_avg_response_secs: 2.0,
            load_increment: 1,
            max_load_iterations: 100,
            max_power: 10,
            max_loads_to_test: 3,
            min_requests_per_second: 1,
            rest: Duration::from_secs(30),
        }
    }
}

pub struct BenchPlanner<E: LoadExecutor> {
    executor: E,
    limits: SearchLimits,
}

impl<E: LoadExecutor> BenchPlanner<E> {
    pub fn new(executor: E, limits: SearchLimits) -> Self {
        Self { executor, limits }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Raises the load from the target's recommended minimum at a fixed
    /// rate. Returns the first execution over budget, or the last one tried
    /// if none went over.
    pub async fn find_max_acceptable_load(&self, requests_per_second: u32) -> Result<Execution> {
        let max_avg = self.limits.max_avg_response_secs;
        let mut load = self.executor.min_recommended_load();
        let mut last = None;

        for _ in 0..self.limits.max_load_iterations.max(1) {
            let execution = self.executor.execute(requests_per_second, load).await?;
            debug!(load, avg = ?execution.avg_response_time(), "load step finished");

            if execution.exceeds(max_avg) {
                info!(
                    "📈 {} went over {:.2}s at load {} ({}/s)",
                    self.executor.name(),
                    max_avg,
                    load,
                    requests_per_second
                );
                return Ok(execution);
            }

            last = Some(execution);
            load += self.limits.load_increment;
        }

        warn!(
            "{} stayed within budget for {} load steps",
            self.executor.name(),
            self.limits.max_load_iterations
        );
        last.ok_or_else(|| BenchError::ConfigError {
            message: "load search ran no executions".to_string(),
        })
    }

    /// Doubles the rate from `2^start_power` until the budget is exceeded,
    /// then binary-searches the last doubling. The returned execution is the
    /// one run at the highest acceptable rate; a rate of 0 means even the
    /// slowest rate tried was over budget.
    pub async fn find_max_requests_per_second(
        &self,
        load: u64,
        start_power: u32,
    ) -> Result<Execution> {
        let max_avg = self.limits.max_avg_response_secs;
        let max_power = self.limits.max_power.min(31);
        let start_power = start_power.min(max_power);

        let mut executions = Vec::new();
        let mut ceiling = None;
        for power in start_power..=max_power {
            let rate = 1u32 << power;
            let execution = self.executor.execute(rate, load).await?;
            let over = execution.exceeds(max_avg);
            executions.push(execution);
            if over {
                ceiling = Some((power, rate));
                break;
            }
        }

        let Some((power, over_rate)) = ceiling else {
            warn!(
                "{} kept up with {}/s at load {}",
                self.executor.name(),
                1u32 << max_power,
                load
            );
            return executions.pop().ok_or_else(|| BenchError::ConfigError {
                message: "rate search ran no executions".to_string(),
            });
        };

        let mut lower = if power == start_power { 0 } else { over_rate / 2 };
        let mut upper = over_rate - 1;
        while lower < upper {
            let mid = lower + (upper - lower + 1) / 2;
            let execution = self.executor.execute(mid, load).await?;
            if execution.exceeds(max_avg) {
                upper = mid - 1;
            } else {
                lower = mid;
            }
            executions.push(execution);
        }

        info!(
            "🏁 {} at load {}: max {} requests per second",
            self.executor.name(),
            load,
            lower
        );

        if lower == 0 {
            let duration_secs = executions.first().map_or(0.0, |e| e.duration_secs);
            return Ok(Execution::empty(self.executor.name(), load, duration_secs));
        }

        executions
            .into_iter()
            .rev()
            .find(|e| e.requests_per_second == lower && !e.exceeds(max_avg))
            .ok_or_else(|| BenchError::ConfigError {
                message: format!("no execution recorded at {} requests per second", lower),
            })
    }

    /// Finds the load at which the minimum rate goes over budget, then the
    /// maximum rate for each of the next `max_loads_to_test` loads below it.
    pub async fn run_benchmark(&self) -> Result<CaseBenchmark> {
        let first = self
            .find_max_acceptable_load(self.limits.min_requests_per_second.max(1))
            .await?;
        let top = first.load;
        let stop = top.saturating_sub(self.limits.max_loads_to_test).max(1);
        let mut executions = vec![first];

        for load in (stop + 1..top).rev() {
            if !self.limits.rest.is_zero() {
                tokio::time::sleep(self.limits.rest).await;
            }

            let previous_rate = executions
                .last()
                .map_or(1, |e| e.requests_per_second)
                .max(1);
            let execution = self
                .find_max_requests_per_second(load, previous_rate.ilog2())
                .await?;
            executions.push(execution);
        }

        Ok(CaseBenchmark {
            test_case_name: self.executor.name().to_string(),
            test_executions: executions,
        })
    }
}
