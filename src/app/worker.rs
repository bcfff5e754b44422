use std::sync::Arc;

use tracing::{info, Instrument};

use crate::adapters::bind_shared;
use crate::app::server::{self, AppState};
use crate::config::Settings;
use crate::utils::error::Result;

/// Builds the full HTTP service, binds the shared port and serves on the
/// current runtime.
pub async fn run_worker(settings: Settings) -> Result<()> {
    let state = Arc::new(AppState::from_settings(&settings)?);
    let addr = settings.listen_addr()?;
    let listener = bind_shared(addr)?;

    info!("🚀 started at {}", listener.local_addr()?.port());
    info!("🔗 service url {}", settings.service_url);

    server::serve(listener, state).await
}

/// Thread-mode worker body: a private single-threaded runtime per worker.
pub fn run_worker_thread(settings: Settings, slot: usize) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_worker(settings).instrument(tracing::info_span!("worker", id = slot)))
}
