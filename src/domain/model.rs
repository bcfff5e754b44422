use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Largest `n` whose Fibonacci number fits in a `u64`.
pub const MAX_REPRESENTABLE_N: u64 = 93;

/// Serializes like JavaScript's `Date#toJSON`: millisecond precision, `Z` suffix.
fn iso_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciRequest {
    pub n: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FibonacciResult {
    #[serde(serialize_with = "iso_millis")]
    pub start: DateTime<Utc>,
    #[serde(rename = "fibonacci")]
    pub value: u64,
    #[serde(serialize_with = "iso_millis")]
    pub end: DateTime<Utc>,
}

impl FibonacciResult {
    pub fn base_case() -> Self {
        let now = Utc::now();
        Self {
            start: now,
            value: 1,
            end: now,
        }
    }
}

/// The only part of a peer's answer the engine reads. Peers that send only
/// `{"fibonacci": n}` without timestamps are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct FibonacciPayload {
    pub fibonacci: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortRequest {
    pub n: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortResult {
    #[serde(serialize_with = "iso_millis")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "iso_millis")]
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub method: String,
    pub path: String,
}

impl EndpointDescriptor {
    pub fn get(path: &str) -> Self {
        Self {
            method: "GET".to_string(),
            path: path.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// How outbound Fibonacci sub-calls address the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RouteStyle {
    /// `/fibonacci/{n}`
    #[default]
    Path,
    /// `/fibonacci?n={n}`
    Query,
}

impl RouteStyle {
    pub fn request_path(&self, n: u64) -> String {
        match self {
            RouteStyle::Path => format!("/fibonacci/{}", n),
            RouteStyle::Query => format!("/fibonacci?n={}", n),
        }
    }

    pub fn descriptor_path(&self) -> &'static str {
        match self {
            RouteStyle::Path => "/fibonacci/:n",
            RouteStyle::Query => "/fibonacci?n=<number>",
        }
    }
}

/// Identity and liveness of one supervised worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerProcess {
    pub slot: usize,
    pub pid: Option<u32>,
    pub alive: bool,
    pub restarts: u32,
}

/// How a worker left the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    pub slot: usize,
    pub pid: Option<u32>,
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl WorkerExit {
    pub fn from_status(slot: usize, pid: Option<u32>, status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            slot,
            pid,
            code: status.code(),
            signal,
        }
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (_, Some(signal)) => write!(f, "killed by signal {}", signal),
            (Some(code), None) => write!(f, "exited with code {}", code),
            (None, None) => write!(f, "exited"),
        }
    }
}
