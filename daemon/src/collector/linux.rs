use super::{ProcessCollector, ProcessInfo};
use crate::error::EnumerationError;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::Mutex;
use std::time::Instant;
use tracing::debug;

#[derive(Clone)]
struct CpuSample {
    total_ticks: u64, // utime + stime
    timestamp: Instant,
}

/// Parsed fields of `/proc/<pid>/stat` needed for ranking.
#[derive(Debug, PartialEq)]
pub(crate) struct StatLine {
    pub name: String,
    pub state: char,
    pub total_ticks: u64,
}

/// Parse a stat line. The command name sits between the first `(` and the
/// last `)` and may itself contain spaces or parentheses.
pub(crate) fn parse_stat(content: &str) -> Option<StatLine> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    let name = content[open + 1..close].to_string();
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    // rest[0] is field 3 (state); utime and stime are fields 14 and 15
    if rest.len() < 13 {
        return None;
    }
    let state = rest[0].chars().next()?;
    let utime: u64 = rest[11].parse().ok()?;
    let stime: u64 = rest[12].parse().ok()?;
    Some(StatLine {
        name,
        state,
        total_ticks: utime + stime,
    })
}

pub struct LinuxProcessCollector {
    clock_ticks: u64,
    cpu_samples: Mutex<HashMap<u32, CpuSample>>,
}

impl LinuxProcessCollector {
    pub fn new() -> Self {
        let clock_ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
        Self {
            clock_ticks: if clock_ticks > 0 { clock_ticks as u64 } else { 100 },
            cpu_samples: Mutex::new(HashMap::new()),
        }
    }

    fn read_process(&self, pid: u32) -> Result<ProcessInfo, EnumerationError> {
        let content = fs::read_to_string(format!("/proc/{}/stat", pid)).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => EnumerationError::AccessDenied(pid),
            _ => EnumerationError::Vanished(pid),
        })?;
        let stat = parse_stat(&content).ok_or(EnumerationError::Malformed(pid))?;
        // Exited, waiting to be reaped
        if stat.state == 'Z' {
            return Err(EnumerationError::Vanished(pid));
        }
        let now = Instant::now();

        // CPU percentage relative to the previous scan of this pid
        let mut samples = self.cpu_samples.lock().unwrap_or_else(|e| e.into_inner());
        let cpu_percent = match samples.get(&pid) {
            Some(prev) => {
                let tick_delta = stat.total_ticks.saturating_sub(prev.total_ticks);
                let time_delta = now.duration_since(prev.timestamp).as_secs_f64();
                if time_delta > 0.0 {
                    let cpu_seconds = tick_delta as f64 / self.clock_ticks as f64;
                    (cpu_seconds / time_delta) * 100.0
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        samples.insert(
            pid,
            CpuSample {
                total_ticks: stat.total_ticks,
                timestamp: now,
            },
        );

        Ok(ProcessInfo {
            pid,
            name: stat.name,
            cpu_percent,
        })
    }

    /// Remove stale CPU samples for processes that no longer exist
    pub fn cleanup_stale(&self, active_pids: &[u32]) {
        let mut samples = self.cpu_samples.lock().unwrap_or_else(|e| e.into_inner());
        samples.retain(|pid, _| active_pids.contains(pid));
    }
}

impl Default for LinuxProcessCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector for LinuxProcessCollector {
    fn list_processes(&self) -> Vec<ProcessInfo> {
        let mut processes = Vec::new();
        if let Ok(entries) = fs::read_dir("/proc") {
            for entry in entries.flatten() {
                let Some(pid) = entry.file_name().to_str().and_then(|n| n.parse::<u32>().ok()) else {
                    continue;
                };
                match self.read_process(pid) {
                    Ok(info) => processes.push(info),
                    Err(e) => debug!("Skipping process: {}", e),
                }
            }
        }
        let pids: Vec<u32> = processes.iter().map(|p| p.pid).collect();
        self.cleanup_stale(&pids);
        processes
    }

    fn get_process(&self, pid: u32) -> Option<ProcessInfo> {
        self.read_process(pid).ok()
    }
}
