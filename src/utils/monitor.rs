#[cfg(feature = "monitor")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
#[cfg(feature = "monitor")]
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub slot: usize,
    pub pid: u32,
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
}

#[cfg(feature = "monitor")]
pub struct SystemMonitor {
    system: Mutex<System>,
    enabled: bool,
}

#[cfg(feature = "monitor")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            system: Mutex::new(System::new()),
            enabled,
        }
    }

    /// Samples CPU and memory for the given `(slot, pid)` pairs. Pids that
    /// have already gone away are skipped.
    pub fn sample(&self, workers: &[(usize, u32)]) -> Vec<WorkerStats> {
        if !self.enabled || workers.is_empty() {
            return Vec::new();
        }

        let Ok(mut system) = self.system.lock() else {
            return Vec::new();
        };

        let pids: Vec<Pid> = workers.iter().map(|(_, pid)| Pid::from_u32(*pid)).collect();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&pids),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );

        workers
            .iter()
            .filter_map(|(slot, pid)| {
                let process = system.process(Pid::from_u32(*pid))?;
                Some(WorkerStats {
                    slot: *slot,
                    pid: *pid,
                    cpu_usage: process.cpu_usage(),
                    memory_usage_mb: process.memory() / 1024 / 1024,
                })
            })
            .collect()
    }

    pub fn log_stats(&self, workers: &[(usize, u32)]) {
        for stats in self.sample(workers) {
            tracing::info!(
                "📊 worker {} (pid {}) - CPU: {:.1}%, Memory: {}MB",
                stats.slot,
                stats.pid,
                stats.cpu_usage,
                stats.memory_usage_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "monitor")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// Without sysinfo the monitor never reports anything.
#[cfg(not(feature = "monitor"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "monitor"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn sample(&self, _workers: &[(usize, u32)]) -> Vec<WorkerStats> {
        Vec::new()
    }

    pub fn log_stats(&self, _workers: &[(usize, u32)]) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}
