//! Fakes for the session's external collaborators

#![allow(dead_code)]

use async_trait::async_trait;
use cpu_shield::{
    collector::{ProcessCollector, ProcessInfo},
    error::{MeasurementError, NotificationError, SinkWriteError, TerminationError},
    executor::ProcessControl,
    hibernation::PowerHook,
    notifier::Notifier,
    report::AlertLog,
    sampler::CpuSampler,
};
use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays readings in order; `None` is a failed measurement. Once the
/// script runs out every reading is `idle`.
pub struct ScriptedSampler {
    readings: VecDeque<Option<f64>>,
    idle: f64,
    window: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedSampler {
    pub fn new(readings: &[f64]) -> Self {
        Self::with_failures(readings.iter().map(|r| Some(*r)).collect())
    }

    pub fn with_failures(readings: Vec<Option<f64>>) -> Self {
        Self {
            readings: readings.into(),
            idle: 10.0,
            window: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Each measurement takes `window`, like a real sampler.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

#[async_trait]
impl CpuSampler for ScriptedSampler {
    async fn measure(&mut self) -> Result<f64, MeasurementError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.window.is_zero() {
            tokio::time::sleep(self.window).await;
        }
        match self.readings.pop_front() {
            Some(Some(v)) => Ok(v),
            Some(None) => Err(MeasurementError::Malformed(PathBuf::from("/proc/stat"))),
            None => Ok(self.idle),
        }
    }
}

pub struct StaticCollector {
    processes: Vec<ProcessInfo>,
}

impl StaticCollector {
    pub fn new(processes: Vec<ProcessInfo>) -> Self {
        Self { processes }
    }
}

impl ProcessCollector for StaticCollector {
    fn list_processes(&self) -> Vec<ProcessInfo> {
        self.processes.clone()
    }

    fn get_process(&self, pid: u32) -> Option<ProcessInfo> {
        self.processes.iter().find(|p| p.pid == pid).cloned()
    }
}

/// One process burning a full core from `busy_from` on. Like the `/proc`
/// collector, its figure is the average since the previous scan.
pub struct BaselineCollector {
    pid: u32,
    name: String,
    busy_from: tokio::time::Instant,
    last_scan: Mutex<Option<tokio::time::Instant>>,
}

impl BaselineCollector {
    pub fn new(pid: u32, name: &str, busy_after: Duration) -> Self {
        Self {
            pid,
            name: name.to_string(),
            busy_from: tokio::time::Instant::now() + busy_after,
            last_scan: Mutex::new(None),
        }
    }

    fn scan(&self) -> ProcessInfo {
        let now = tokio::time::Instant::now();
        let previous = self.last_scan.lock().unwrap().replace(now);
        let cpu = match previous {
            Some(prev) if now > prev => {
                let busy_start = prev.max(self.busy_from);
                let busy = now.saturating_duration_since(busy_start);
                busy.as_secs_f64() / (now - prev).as_secs_f64() * 100.0
            }
            _ => 0.0,
        };
        ProcessInfo::new(self.pid, self.name.clone(), cpu)
    }
}

impl ProcessCollector for BaselineCollector {
    fn list_processes(&self) -> Vec<ProcessInfo> {
        vec![self.scan()]
    }

    fn get_process(&self, pid: u32) -> Option<ProcessInfo> {
        (pid == self.pid).then(|| self.scan())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCall {
    Terminate(u32),
    Kill(u32),
}

/// Process table stand-in. Processes exit on SIGTERM unless listed in
/// `ignores_term`; pids in `missing` or `denied` fail every signal.
#[derive(Default)]
pub struct FakeControl {
    pub calls: Mutex<Vec<ControlCall>>,
    pub ignores_term: HashSet<u32>,
    pub missing: HashSet<u32>,
    pub denied: HashSet<u32>,
    dead: Mutex<HashSet<u32>>,
}

impl FakeControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignoring_term(pids: &[u32]) -> Self {
        Self {
            ignores_term: pids.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ControlCall> {
        self.calls.lock().unwrap().clone()
    }

    fn check(&self, pid: u32) -> Result<(), TerminationError> {
        if self.missing.contains(&pid) {
            return Err(TerminationError::NotFound(pid));
        }
        if self.denied.contains(&pid) {
            return Err(TerminationError::PermissionDenied(pid));
        }
        Ok(())
    }
}

impl ProcessControl for FakeControl {
    fn terminate(&self, pid: u32) -> Result<(), TerminationError> {
        self.calls.lock().unwrap().push(ControlCall::Terminate(pid));
        self.check(pid)?;
        if !self.ignores_term.contains(&pid) {
            self.dead.lock().unwrap().insert(pid);
        }
        Ok(())
    }

    fn kill(&self, pid: u32) -> Result<(), TerminationError> {
        self.calls.lock().unwrap().push(ControlCall::Kill(pid));
        self.check(pid)?;
        self.dead.lock().unwrap().insert(pid);
        Ok(())
    }

    fn is_alive(&self, pid: u32) -> bool {
        !self.missing.contains(&pid) && !self.dead.lock().unwrap().contains(&pid)
    }
}

#[derive(Clone, Default)]
pub struct MemoryLog {
    pub records: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl MemoryLog {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<String> {
        self.records.lock().unwrap().clone()
    }
}

impl AlertLog for MemoryLog {
    fn append(&mut self, record: &str) -> Result<(), SinkWriteError> {
        if self.fail {
            return Err(SinkWriteError {
                path: PathBuf::from("system_alert.log"),
                source: io::Error::new(io::ErrorKind::Other, "disk full"),
            });
        }
        self.records.lock().unwrap().push(record.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push((title.to_string(), body.to_string()));
        if self.fail {
            return Err(NotificationError::Desktop("no notification daemon".into()));
        }
        Ok(())
    }
}

/// A notification mechanism that never answers.
pub struct HangingNotifier;

#[async_trait]
impl Notifier for HangingNotifier {
    async fn notify(&self, _title: &str, _body: &str) -> Result<(), NotificationError> {
        std::future::pending().await
    }
}

#[derive(Clone, Default)]
pub struct RecordingPower {
    pub suspends: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingPower {
    pub fn suspends(&self) -> Vec<Duration> {
        self.suspends.lock().unwrap().clone()
    }
}

#[async_trait]
impl PowerHook for RecordingPower {
    async fn suspend(&self, duration: Duration) {
        self.suspends.lock().unwrap().push(duration);
        tokio::time::sleep(duration).await;
    }
}

pub fn proc(pid: u32, name: &str, cpu: f64) -> ProcessInfo {
    ProcessInfo::new(pid, name, cpu)
}
