use crate::config::Settings;
use crate::domain::model::{WorkerExit, WorkerProcess};
use crate::domain::ports::{WorkerHandle, WorkerSpawner};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// What the supervisor tells an attached listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Spawned { slot: usize, pid: Option<u32> },
    Exited(WorkerExit),
    RestartsExhausted { slot: usize, restarts: u32 },
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub worker_count: usize,
    pub respawn: bool,
    pub max_restarts: u32,
    pub restart_delay: Duration,
    pub monitor_interval: Duration,
}

impl SupervisorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            worker_count: settings.worker_count(),
            respawn: settings.respawn,
            max_restarts: settings.max_restarts,
            restart_delay: settings.restart_delay(),
            monitor_interval: settings.monitor_interval(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorReport {
    pub spawned: usize,
    pub exits: usize,
}

/// Keeps `worker_count` workers alive, logging every exit once and
/// replacing dead workers while their restart budget lasts.
pub struct Supervisor<S: WorkerSpawner> {
    config: SupervisorConfig,
    spawner: S,
    workers: Vec<WorkerProcess>,
    events: Option<mpsc::UnboundedSender<SupervisorEvent>>,
    monitor: SystemMonitor,
    report: SupervisorReport,
}

impl<S: WorkerSpawner> Supervisor<S> {
    pub fn new(config: SupervisorConfig, spawner: S) -> Self {
        let workers = (0..config.worker_count)
            .map(|slot| WorkerProcess {
                slot,
                pid: None,
                alive: false,
                restarts: 0,
            })
            .collect();

        Self {
            config,
            spawner,
            workers,
            events: None,
            monitor: SystemMonitor::default(),
            report: SupervisorReport::default(),
        }
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<SupervisorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn workers(&self) -> &[WorkerProcess] {
        &self.workers
    }

    pub fn alive_count(&self) -> usize {
        self.workers.iter().filter(|w| w.alive).count()
    }

    fn live_pids(&self) -> Vec<(usize, u32)> {
        self.workers
            .iter()
            .filter(|w| w.alive)
            .filter_map(|w| w.pid.map(|pid| (w.slot, pid)))
            .collect()
    }

    fn emit(&self, event: SupervisorEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }

    /// Starts the pool and supervises it until `shutdown` resolves or no
    /// worker is left. Remaining workers are killed before returning.
    pub async fn run<F>(mut self, shutdown: F) -> Result<SupervisorReport>
    where
        F: Future<Output = ()>,
    {
        let (exit_tx, mut exit_rx) = mpsc::unbounded_channel::<WorkerExit>();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut watchers = JoinSet::new();

        info!(
            "👷 starting {} workers (respawn: {})",
            self.config.worker_count, self.config.respawn
        );

        for slot in 0..self.config.worker_count {
            if let Err(e) = self
                .start_worker(slot, &mut watchers, &exit_tx, &stop_rx)
                .await
            {
                error!("❌ failed to start worker {}: {}", slot, e);
                let _ = stop_tx.send(true);
                while watchers.join_next().await.is_some() {}
                return Err(e);
            }
        }

        let mut monitor_tick = tokio::time::interval(self.config.monitor_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("🛑 shutdown requested, stopping {} workers", self.alive_count());
                    break;
                }
                Some(exit) = exit_rx.recv() => {
                    if !self.record_exit(exit.clone()) {
                        if self.alive_count() == 0 {
                            break;
                        }
                        continue;
                    }

                    if !self.config.restart_delay.is_zero() {
                        tokio::select! {
                            _ = tokio::time::sleep(self.config.restart_delay) => {}
                            _ = &mut shutdown => {
                                info!("🛑 shutdown requested during restart of worker {}", exit.slot);
                                break;
                            }
                        }
                    }

                    if let Err(e) = self
                        .start_worker(exit.slot, &mut watchers, &exit_tx, &stop_rx)
                        .await
                    {
                        error!("❌ failed to restart worker {}: {}", exit.slot, e);
                        if self.alive_count() == 0 {
                            break;
                        }
                    }
                }
                _ = monitor_tick.tick(), if self.monitor.is_enabled() => {
                    self.monitor.log_stats(&self.live_pids());
                }
            }
        }

        if self.alive_count() == 0 {
            warn!("no workers left, primary exiting");
        }

        let _ = stop_tx.send(true);
        while watchers.join_next().await.is_some() {}

        Ok(self.report)
    }

    async fn start_worker(
        &mut self,
        slot: usize,
        watchers: &mut JoinSet<()>,
        exit_tx: &mpsc::UnboundedSender<WorkerExit>,
        stop_rx: &watch::Receiver<bool>,
    ) -> Result<()> {
        let handle = self.spawner.spawn(slot).await?;
        let pid = handle.pid();

        let worker = &mut self.workers[slot];
        worker.pid = pid;
        worker.alive = true;
        self.report.spawned += 1;

        info!("✅ worker {} started (pid {:?})", slot, pid);
        self.emit(SupervisorEvent::Spawned { slot, pid });

        watchers.spawn(watch_worker(
            slot,
            handle,
            exit_tx.clone(),
            stop_rx.clone(),
        ));
        Ok(())
    }

    /// Logs the exit and returns whether the slot should be refilled.
    fn record_exit(&mut self, exit: WorkerExit) -> bool {
        let respawn = self.config.respawn;
        let max_restarts = self.config.max_restarts;
        let worker = &mut self.workers[exit.slot];
        worker.alive = false;
        self.report.exits += 1;

        warn!(
            slot = exit.slot,
            pid = ?exit.pid,
            "💀 worker {} died: {}",
            exit.slot,
            exit
        );

        let restarts = worker.restarts;
        let refill = respawn && restarts < max_restarts;
        if refill {
            worker.restarts += 1;
        }

        self.emit(SupervisorEvent::Exited(exit.clone()));

        if respawn && !refill {
            warn!(
                "worker {} reached its restart limit ({}), leaving the slot empty",
                exit.slot, restarts
            );
            self.emit(SupervisorEvent::RestartsExhausted {
                slot: exit.slot,
                restarts,
            });
        }

        refill
    }
}

/// Owns one worker handle: reports its exit, or kills it on stop.
async fn watch_worker(
    slot: usize,
    mut handle: Box<dyn WorkerHandle>,
    exit_tx: mpsc::UnboundedSender<WorkerExit>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let pid = handle.pid();

    let exited = tokio::select! {
        exit = handle.wait() => Some(exit),
        _ = async { let _ = stop_rx.wait_for(|stop| *stop).await; } => None,
    };

    match exited {
        Some(Ok(exit)) => {
            let _ = exit_tx.send(exit);
        }
        Some(Err(e)) => {
            error!("failed waiting on worker {}: {}", slot, e);
            let _ = exit_tx.send(WorkerExit {
                slot,
                pid,
                code: None,
                signal: None,
            });
        }
        None => {
            debug!("stopping worker {}", slot);
            if let Err(e) = handle.kill().await {
                debug!("failed to kill worker {}: {}", slot, e);
            }
        }
    }
}
