// Adapters layer: concrete implementations of the domain ports (HTTP
// transport, load target, worker spawners, local storage) plus socket setup.

pub mod http_transport;
pub mod listener;
pub mod load_target;
pub mod storage;
pub mod workers;

pub use http_transport::HttpTransport;
pub use listener::bind_shared;
pub use load_target::HttpLoadTarget;
pub use storage::LocalStorage;
pub use workers::{ProcessSpawner, ThreadSpawner, WorkerMain};
