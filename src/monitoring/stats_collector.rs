use std::{sync::LazyLock, time::Instant};

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::server::SessionRegistry;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Milliseconds since the collector was created.
    pub uptime: u64,
    pub sessions: usize,
    pub playing_sessions: usize,
    pub memory: Memory,
    pub cpu: Cpu,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    /// Resident memory of this process in bytes.
    pub used: u64,
    pub free: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    pub cores: usize,
    /// Fraction of all cores busy, `0.0..=1.0`.
    pub system_load: f64,
    /// Fraction of all cores used by this process, `0.0..=1.0`.
    pub process_load: f64,
}

/// Samples process and host resources.
///
/// CPU figures are deltas between calls, so the first sample reports zero load.
pub struct StatsCollector {
    system: Mutex<System>,
    pid: Option<Pid>,
    started_at: Instant,
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            pid: sysinfo::get_current_pid().ok(),
            started_at: Instant::now(),
        }
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    pub fn collect(&self, registry: &SessionRegistry) -> Stats {
        let cores = num_cpus();
        let mut system = self.system.lock();

        system.refresh_memory();
        system.refresh_cpu_usage();

        let (used, process_cpu) = match self.pid {
            Some(pid) => {
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::nothing().with_memory().with_cpu(),
                );
                system
                    .process(pid)
                    .map(|p| (p.memory(), p.cpu_usage() as f64))
                    .unwrap_or((0, 0.0))
            }
            None => (0, 0.0),
        };

        Stats {
            uptime: self.uptime_ms(),
            sessions: registry.len(),
            playing_sessions: registry.active(),
            memory: Memory {
                used,
                free: system.available_memory(),
                total: system.total_memory(),
            },
            cpu: Cpu {
                cores,
                system_load: (system.global_cpu_usage() as f64 / 100.0).clamp(0.0, 1.0),
                process_load: (process_cpu / (cores as f64 * 100.0)).clamp(0.0, 1.0),
            },
        }
    }
}

static PROCESS: LazyLock<Mutex<(System, Option<Pid>)>> =
    LazyLock::new(|| Mutex::new((System::new(), sysinfo::get_current_pid().ok())));

/// Resident memory of this process in bytes.
pub fn process_memory_bytes() -> Option<u64> {
    let mut guard = PROCESS.lock();
    let (system, pid) = &mut *guard;
    let pid = (*pid)?;
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        false,
        ProcessRefreshKind::nothing().with_memory(),
    );
    system.process(pid).map(|p| p.memory())
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        configs::Config,
        media::fakes::ScriptedFetcher,
        protocol::EventHub,
        sink::fakes::{Behaviour, ScriptedSink},
    };

    #[tokio::test]
    async fn test_collect_with_no_sessions() {
        let registry = SessionRegistry::new(
            &Config::default(),
            Arc::new(ScriptedFetcher::default()),
            Arc::new(ScriptedSink::new(vec![], Behaviour::Hang)),
            EventHub::new(),
        );
        let collector = StatsCollector::new();

        let stats = collector.collect(&registry);
        assert_eq!(stats.sessions, 0);
        assert_eq!(stats.playing_sessions, 0);
        assert!(stats.cpu.cores >= 1);
        assert!((0.0..=1.0).contains(&stats.cpu.process_load));

        let json = serde_json::to_value(&stats).expect("serializable");
        assert!(json["memory"]["used"].is_u64());
        assert!(json["cpu"]["systemLoad"].is_f64());
    }

    #[test]
    fn test_process_memory_is_reported() {
        let rss = process_memory_bytes().expect("own process is visible");
        assert!(rss > 0);
    }
}
