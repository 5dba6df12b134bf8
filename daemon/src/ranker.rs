//! Ranking of the heaviest non-whitelisted processes

use crate::collector::{ProcessCollector, ProcessInfo};
use crate::whitelist::Whitelist;
use std::cmp::Ordering;
use std::sync::Arc;

/// Sort by CPU descending, ties broken by pid ascending, whitelisted names
/// removed, truncated to `limit`.
pub fn rank(processes: Vec<ProcessInfo>, whitelist: &Whitelist, limit: usize) -> Vec<ProcessInfo> {
    let mut candidates: Vec<ProcessInfo> = processes
        .into_iter()
        .filter(|p| !whitelist.contains(&p.name))
        .collect();
    candidates.sort_by(|a, b| {
        b.cpu_percent
            .partial_cmp(&a.cpu_percent)
            .unwrap_or(Ordering::Equal)
            .then(a.pid.cmp(&b.pid))
    });
    candidates.truncate(limit);
    candidates
}

pub struct ProcessRanker {
    collector: Arc<dyn ProcessCollector>,
    whitelist: Arc<Whitelist>,
}

impl ProcessRanker {
    pub fn new(collector: Arc<dyn ProcessCollector>, whitelist: Arc<Whitelist>) -> Self {
        Self { collector, whitelist }
    }

    /// Reset per-process CPU baselines; the next ranking measures from here.
    pub fn prime(&self) {
        let _ = self.collector.list_processes();
    }

    /// Takes a fresh snapshot on every call.
    pub fn rank_heavy_processes(&self, limit: usize) -> Vec<ProcessInfo> {
        rank(self.collector.list_processes(), &self.whitelist, limit)
    }
}
