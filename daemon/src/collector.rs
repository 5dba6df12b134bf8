//! Process information collector (reads /proc on Linux)

mod linux;

pub use linux::LinuxProcessCollector;

/// Snapshot of one process, valid only for the scan that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>, cpu_percent: f64) -> Self {
        Self {
            pid,
            name: name.into(),
            cpu_percent,
        }
    }
}

pub trait ProcessCollector: Send + Sync {
    fn list_processes(&self) -> Vec<ProcessInfo>;
    fn get_process(&self, pid: u32) -> Option<ProcessInfo>;
}
