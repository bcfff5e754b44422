use crate::utils::error::{BenchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closed time interval; `start` never lies after `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timespan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Timespan {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(BenchError::invalid_input(
                "timespan",
                format!("{} .. {}", start, end),
                "start lies after end",
            ));
        }
        Ok(Self { start, end })
    }

    /// Span from `start` until now.
    pub fn until_now(start: DateTime<Utc>) -> Result<Self> {
        Self::new(start, Utc::now())
    }

    pub fn seconds(&self) -> f64 {
        (self.end - self.start).num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0
    }
}

/// Which endpoint a load test drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CaseKind {
    /// `GET /fibonacci/{load}`
    Fibonacci,
    /// `GET /bubble-sort?n=2^load`
    BubbleSort,
}

impl CaseKind {
    pub fn name(&self) -> &'static str {
        match self {
            CaseKind::Fibonacci => "FibonacciTestCase",
            CaseKind::BubbleSort => "BubbleSortTestCase",
        }
    }

    /// Smallest load worth measuring; below it the request is noise.
    pub fn min_recommended_load(&self) -> u64 {
        match self {
            CaseKind::Fibonacci => 1,
            CaseKind::BubbleSort => 10,
        }
    }

    /// The `n` sent to the service for a given load.
    pub fn request_n(&self, load: u64) -> Result<u64> {
        match self {
            CaseKind::Fibonacci => Ok(load),
            CaseKind::BubbleSort => u32::try_from(load)
                .ok()
                .and_then(|load| 1u64.checked_shl(load))
                .filter(|n| *n <= i64::MAX as u64)
                .ok_or_else(|| BenchError::invalid_input("load", load, "2^load does not fit in i64")),
        }
    }
}

/// One request of a load test: what the client saw and what the server
/// reported for its own processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub test_case_name: String,
    pub load: u64,
    pub request_span: Timespan,
    pub server_processing_span: Timespan,
}

impl Sample {
    /// Client-observed response time in seconds.
    pub fn response_time(&self) -> f64 {
        self.request_span.seconds()
    }
}

/// A fixed-rate run: `requests_per_second` for `duration_secs` at one load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub test_case_name: String,
    pub load: u64,
    pub requests_per_second: u32,
    pub duration_secs: f64,
    pub total_span: Timespan,
    pub span_making_requests: Timespan,
    pub results: Vec<Sample>,
    pub errors: Vec<String>,
}

impl Execution {
    /// A run that sent nothing, used when no rate was acceptable.
    pub fn empty(test_case_name: &str, load: u64, duration_secs: f64) -> Self {
        let now = Utc::now();
        let span = Timespan {
            start: now,
            end: now,
        };
        Self {
            test_case_name: test_case_name.to_string(),
            load,
            requests_per_second: 0,
            duration_secs,
            total_span: span,
            span_making_requests: span,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn avg_response_time(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        let total: f64 = self.results.iter().map(Sample::response_time).sum();
        Some(total / self.results.len() as f64)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// A run is over budget when any request failed, nothing came back, or
    /// the average response time is above `max_avg_secs`.
    pub fn exceeds(&self, max_avg_secs: f64) -> bool {
        self.has_errors()
            || self
                .avg_response_time()
                .map_or(true, |avg| avg > max_avg_secs)
    }
}

/// Every execution a benchmark ran for one test case, in run order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBenchmark {
    pub test_case_name: String,
    pub test_executions: Vec<Execution>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub created_at: DateTime<Utc>,
    pub target: String,
    pub benchmarks: Vec<CaseBenchmark>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(ms)
    }

    fn sample(request_ms: i64) -> Sample {
        Sample {
            test_case_name: "FibonacciTestCase".to_string(),
            load: 5,
            request_span: Timespan::new(at(0), at(request_ms)).unwrap(),
            server_processing_span: Timespan::new(at(1), at(2)).unwrap(),
        }
    }

    #[test]
    fn test_timespan_rejects_reversed_bounds() {
        assert!(Timespan::new(at(5), at(4)).is_err());
        assert_eq!(Timespan::new(at(0), at(1500)).unwrap().seconds(), 1.5);
    }

    #[test]
    fn test_bubble_sort_load_is_an_exponent() {
        assert_eq!(CaseKind::Fibonacci.request_n(12).unwrap(), 12);
        assert_eq!(CaseKind::BubbleSort.request_n(10).unwrap(), 1024);
        assert!(CaseKind::BubbleSort.request_n(63).is_err());
        assert!(CaseKind::BubbleSort.request_n(u64::MAX).is_err());
    }

    #[test]
    fn test_case_kind_serializes_like_the_cli() {
        assert_eq!(
            serde_json::to_string(&CaseKind::BubbleSort).unwrap(),
            "\"bubble-sort\""
        );
    }

    #[test]
    fn test_execution_average_and_budget() {
        let mut execution = Execution::empty("FibonacciTestCase", 5, 1.0);
        assert_eq!(execution.avg_response_time(), None);
        assert!(execution.exceeds(10.0));

        execution.results = vec![sample(1000), sample(3000)];
        assert_eq!(execution.avg_response_time(), Some(2.0));
        assert!(!execution.exceeds(2.0));
        assert!(execution.exceeds(1.5));

        execution.errors.push("HTTP request failed".to_string());
        assert!(execution.exceeds(2.0));
    }
}
