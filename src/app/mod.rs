// Application layer: the HTTP endpoint layer, the two process roles
// (primary and worker) wired from resolved settings, and the load client.

pub mod bench;
pub mod error;
pub mod primary;
pub mod server;
pub mod worker;

pub use bench::{run_bench, BenchTarget};
pub use primary::run_primary;
pub use server::{build_router, AppState};
pub use worker::{run_worker, run_worker_thread};
