use std::ffi::OsString;
use std::sync::Arc;

use tracing::{error, info};

use crate::adapters::{ProcessSpawner, ThreadSpawner};
use crate::app::worker::run_worker_thread;
use crate::config::{Settings, WorkerMode};
use crate::core::{Supervisor, SupervisorConfig, SupervisorReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs the primary role: starts the pool in the configured mode and
/// supervises it until Ctrl-C, SIGTERM or until no worker is left.
///
/// `args` are the primary's own command line arguments (without the
/// program name); process workers are started with the same arguments.
pub async fn run_primary(settings: Settings, args: Vec<OsString>) -> Result<SupervisorReport> {
    let config = SupervisorConfig::from_settings(&settings);
    let monitor = SystemMonitor::new(settings.monitor);

    info!(
        "🧭 primary {} supervising {} {:?} workers on {}:{}",
        std::process::id(),
        config.worker_count,
        settings.worker_mode,
        settings.host,
        settings.port
    );

    let shutdown = shutdown_signal();

    match settings.worker_mode {
        WorkerMode::Process => {
            let spawner = ProcessSpawner::current_exe(args)?;
            Supervisor::new(config, spawner)
                .with_monitor(monitor)
                .run(shutdown)
                .await
        }
        WorkerMode::Thread => {
            let worker_settings = settings.clone();
            let spawner = ThreadSpawner::new(Arc::new(move |slot: usize| {
                run_worker_thread(worker_settings.clone(), slot)
            }));
            Supervisor::new(config, spawner)
                .with_monitor(monitor)
                .run(shutdown)
                .await
        }
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM. A signal that cannot be
/// installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("🛑 Ctrl-C received"),
        _ = terminate => info!("🛑 SIGTERM received"),
    }
}
