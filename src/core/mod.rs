pub mod bench;
pub mod fibonacci;
pub mod sort;
pub mod supervisor;

pub use crate::domain::model::{FibonacciResult, SortResult, WorkerExit};
pub use crate::domain::ports::{
    FibonacciTransport, LoadExecutor, LoadTarget, Storage, WorkerHandle, WorkerSpawner,
};
pub use crate::utils::error::Result;
pub use bench::{BenchPlanner, LoadRunner, SearchLimits};
pub use fibonacci::FibonacciEngine;
pub use sort::SortBenchmark;
pub use supervisor::{Supervisor, SupervisorConfig, SupervisorEvent, SupervisorReport};
