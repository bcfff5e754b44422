use crate::domain::model::{FibonacciRequest, FibonacciResult, MAX_REPRESENTABLE_N};
use crate::domain::ports::FibonacciTransport;
use crate::utils::error::{BenchError, Result};
use chrono::Utc;
use std::sync::Arc;

/// Resolves fib(n) by delegating fib(n-1) and fib(n-2) to a transport,
/// which normally points back at this same service.
#[derive(Clone)]
pub struct FibonacciEngine {
    transport: Arc<dyn FibonacciTransport>,
    max_n: u64,
}

impl FibonacciEngine {
    pub fn new(transport: Arc<dyn FibonacciTransport>, max_n: u64) -> Self {
        Self {
            transport,
            max_n: max_n.min(MAX_REPRESENTABLE_N),
        }
    }

    pub fn max_n(&self) -> u64 {
        self.max_n
    }

    /// Checks a raw request parameter and turns it into a request.
    pub fn request(&self, n: i64) -> Result<FibonacciRequest> {
        if n < 1 {
            return Err(BenchError::invalid_input("n", n, "must be a positive integer"));
        }
        let n = n as u64;
        if n > self.max_n {
            return Err(BenchError::invalid_input(
                "n",
                n,
                format!("must not exceed {}", self.max_n),
            ));
        }
        Ok(FibonacciRequest { n })
    }

    pub async fn compute(&self, request: FibonacciRequest) -> Result<FibonacciResult> {
        let n = request.n;
        if n <= 2 {
            return Ok(FibonacciResult::base_case());
        }

        let start = Utc::now();

        // Both sub-calls must be in flight before either is awaited.
        let (minus_one, minus_two) =
            tokio::try_join!(self.transport.fetch(n - 1), self.transport.fetch(n - 2))?;

        let value = minus_one
            .checked_add(minus_two)
            .ok_or(BenchError::OverflowError { n })?;

        tracing::debug!(n, value, "fibonacci resolved");

        Ok(FibonacciResult {
            start,
            value,
            end: Utc::now(),
        })
    }
}
