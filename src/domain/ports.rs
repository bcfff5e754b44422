use crate::domain::bench::{Execution, Sample};
use crate::domain::model::WorkerExit;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Fetches fib(n) from wherever the recursion is delegated to.
#[async_trait]
pub trait FibonacciTransport: Send + Sync {
    async fn fetch(&self, n: u64) -> Result<u64>;
}

/// Starts one worker for a pool slot.
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    async fn spawn(&self, slot: usize) -> Result<Box<dyn WorkerHandle>>;
}

/// A running worker owned by the supervisor.
#[async_trait]
pub trait WorkerHandle: Send {
    fn pid(&self) -> Option<u32>;

    /// Resolves once the worker is gone, however it went.
    async fn wait(&mut self) -> Result<WorkerExit>;

    async fn kill(&mut self) -> Result<()>;
}

/// Something a load test can hit once at a given load.
#[async_trait]
pub trait LoadTarget: Send + Sync {
    fn name(&self) -> &str;

    fn min_recommended_load(&self) -> u64;

    async fn run(&self, load: u64) -> Result<Sample>;
}

/// Runs one fixed-rate execution; the load searches are written against it.
#[async_trait]
pub trait LoadExecutor: Send + Sync {
    fn name(&self) -> &str;

    fn min_recommended_load(&self) -> u64;

    async fn execute(&self, requests_per_second: u32, load: u64) -> Result<Execution>;
}

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
