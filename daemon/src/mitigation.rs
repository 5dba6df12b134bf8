//! Best-effort termination of processes above the kill threshold

use crate::collector::ProcessInfo;
use crate::error::TerminationError;
use crate::executor::ProcessControl;
use crate::whitelist::Whitelist;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum MitigationAction {
    /// Whitelisted; never signalled regardless of usage.
    Whitelisted,
    /// At or below the kill threshold.
    NoAction,
    /// Exited after the graceful request.
    Terminated,
    /// Still alive after the grace period; forcefully killed.
    Killed,
    Failed(TerminationError),
}

#[derive(Debug)]
pub struct MitigationReport {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub action: MitigationAction,
}

pub struct Mitigator {
    control: Arc<dyn ProcessControl>,
    whitelist: Arc<Whitelist>,
    kill_threshold: f64,
    grace_period: Duration,
    enabled: bool,
}

impl Mitigator {
    pub fn new(
        control: Arc<dyn ProcessControl>,
        whitelist: Arc<Whitelist>,
        kill_threshold: f64,
        grace_period: Duration,
    ) -> Self {
        Self {
            control,
            whitelist,
            kill_threshold,
            grace_period,
            enabled: true,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Inspect candidates in rank order. A failure on one candidate never
    /// stops the pass.
    pub async fn mitigate(&self, candidates: &[ProcessInfo]) -> Vec<MitigationReport> {
        if !self.enabled {
            return Vec::new();
        }
        let mut reports = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let action = self.mitigate_one(candidate).await;
            reports.push(MitigationReport {
                pid: candidate.pid,
                name: candidate.name.clone(),
                cpu_percent: candidate.cpu_percent,
                action,
            });
        }
        reports
    }

    async fn mitigate_one(&self, p: &ProcessInfo) -> MitigationAction {
        if self.whitelist.contains(&p.name) {
            info!("[!] Process {} (PID: {}) is whitelisted. No action taken.", p.name, p.pid);
            return MitigationAction::Whitelisted;
        }
        if p.cpu_percent <= self.kill_threshold {
            debug!("Process {} (PID: {}) at {:.1}% is below the kill threshold", p.name, p.pid, p.cpu_percent);
            return MitigationAction::NoAction;
        }

        warn!(
            "[!] ACTIVE DEFENSE: Terminating {} (PID: {}) due to excessive CPU usage ({:.1}%).",
            p.name, p.pid, p.cpu_percent
        );
        if let Err(e) = self.control.terminate(p.pid) {
            warn!("Unable to terminate process {} (PID: {}): {}", p.name, p.pid, e);
            return MitigationAction::Failed(e);
        }

        tokio::time::sleep(self.grace_period).await;

        if !self.control.is_alive(p.pid) {
            info!("Process {} (PID: {}) terminated successfully.", p.name, p.pid);
            return MitigationAction::Terminated;
        }
        match self.control.kill(p.pid) {
            Ok(()) => {
                warn!("Process {} (PID: {}) killed forcefully.", p.name, p.pid);
                MitigationAction::Killed
            }
            // Exited between the liveness check and the kill
            Err(TerminationError::NotFound(_)) => {
                info!("Process {} (PID: {}) terminated successfully.", p.name, p.pid);
                MitigationAction::Terminated
            }
            Err(e) => {
                warn!("Unable to kill process {} (PID: {}): {}", p.name, p.pid, e);
                MitigationAction::Failed(e)
            }
        }
    }
}
