//! The monitoring session: sample, escalate, report, mitigate, repeat

use crate::collector::{LinuxProcessCollector, ProcessCollector};
use crate::config::Config;
use crate::error::SinkWriteError;
use crate::escalation::{EscalationMachine, EscalationState, Transition};
use crate::executor::{ProcessControl, SignalExecutor};
use crate::hibernation::{PowerHook, SimulatedSuspend, SuspendPicker};
use crate::mitigation::{MitigationReport, Mitigator};
use crate::notifier::{select_notifier, Notifier};
use crate::ranker::ProcessRanker;
use crate::report::{AlertLog, FileAlertLog, Reporter};
use crate::sampler::{CpuSampler, ProcStatSampler, Sampler};
use crate::whitelist::Whitelist;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// How a session ended. Both are clean exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Hibernated { after: Duration },
    Stopped,
}

#[derive(Debug)]
pub enum TickOutcome {
    /// Measurement failed; nothing changed.
    Skipped,
    Stable { cpu_percent: f64 },
    Alert {
        count: u32,
        mitigations: Vec<MitigationReport>,
    },
    Hibernate {
        count: u32,
        mitigations: Vec<MitigationReport>,
    },
}

/// External collaborators the session drives.
pub struct Collaborators<S> {
    pub sampler: S,
    pub collector: Arc<dyn ProcessCollector>,
    pub control: Arc<dyn ProcessControl>,
    pub log: Box<dyn AlertLog>,
    pub notifier: Box<dyn Notifier>,
    pub power: Box<dyn PowerHook>,
}

impl Collaborators<ProcStatSampler> {
    /// The real host: `/proc`, signals, the log file and the configured notifier.
    pub fn host(config: &Config) -> Self {
        Self {
            sampler: ProcStatSampler::new(config.sample_window()),
            collector: Arc::new(LinuxProcessCollector::new()),
            control: Arc::new(SignalExecutor::new()),
            log: Box::new(FileAlertLog::new(config.general.log_file.clone())),
            notifier: select_notifier(config.general.notification_method),
            power: Box::new(SimulatedSuspend),
        }
    }
}

pub struct MonitoringSession<S> {
    sampler: Sampler<S>,
    machine: EscalationMachine,
    ranker: ProcessRanker,
    reporter: Reporter,
    mitigator: Mitigator,
    power: Box<dyn PowerHook>,
    picker: SuspendPicker,
    top_processes: usize,
    max_consecutive: u32,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<S: CpuSampler> MonitoringSession<S> {
    pub fn new(config: &Config, parts: Collaborators<S>, shutdown: watch::Receiver<bool>) -> Self {
        let whitelist = Arc::new(Whitelist::new(&config.whitelist));
        let picker = match config.hibernation.seed {
            Some(seed) => SuspendPicker::seeded(seed, config.hibernation.min_secs, config.hibernation.max_secs),
            None => SuspendPicker::from_clock(config.hibernation.min_secs, config.hibernation.max_secs),
        };
        Self {
            sampler: Sampler::new(parts.sampler, config.detection.cpu_threshold),
            machine: EscalationMachine::new(config.detection.max_consecutive),
            ranker: ProcessRanker::new(parts.collector, Arc::clone(&whitelist)),
            reporter: Reporter::new(parts.log, parts.notifier),
            mitigator: Mitigator::new(
                parts.control,
                whitelist,
                config.mitigation.kill_threshold,
                config.grace_period(),
            )
            .enabled(config.mitigation.enabled),
            power: parts.power,
            picker,
            top_processes: config.detection.top_processes,
            max_consecutive: config.detection.max_consecutive,
            interval: config.interval(),
            shutdown,
        }
    }

    pub fn with_picker(mut self, picker: SuspendPicker) -> Self {
        self.picker = picker;
        self
    }

    pub fn state(&self) -> EscalationState {
        self.machine.state()
    }

    pub fn counter(&self) -> u32 {
        self.machine.counter()
    }

    /// One sample and everything it triggers. Only a failed log append is
    /// returned as an error.
    pub async fn tick(&mut self) -> Result<TickOutcome, SinkWriteError> {
        // Per-process figures on an alert cover this tick's window only
        self.ranker.prime();
        let sample = match self.sampler.sample().await {
            Ok(sample) => sample,
            Err(e) => {
                warn!("CPU measurement failed, skipping tick: {}", e);
                return Ok(TickOutcome::Skipped);
            }
        };

        let (count, hibernate) = match self.machine.observe(&sample) {
            Transition::Stable => {
                info!("CPU usage is at {:.1}%. System stable.", sample.cpu_percent);
                return Ok(TickOutcome::Stable {
                    cpu_percent: sample.cpu_percent,
                });
            }
            Transition::Ignored => return Ok(TickOutcome::Skipped),
            Transition::Alert { count } => (count, false),
            Transition::Hibernate { count } => (count, true),
        };

        let heavy = self.ranker.rank_heavy_processes(self.top_processes);
        self.reporter.report(&sample, &heavy).await?;
        let mitigations = self.mitigator.mitigate(&heavy).await;

        if hibernate {
            Ok(TickOutcome::Hibernate { count, mitigations })
        } else {
            Ok(TickOutcome::Alert { count, mitigations })
        }
    }

    /// Run until hibernation or an interrupt.
    pub async fn run(mut self) -> Result<SessionEnd, SinkWriteError> {
        info!("Welcome to the CPU Monitoring System.");
        info!("Monitoring in progress...");

        loop {
            let stop = *self.shutdown.borrow();
            if stop {
                return Ok(self.stop());
            }
            if let TickOutcome::Hibernate { .. } = self.tick().await? {
                return Ok(self.hibernate().await);
            }
            self.wait_between_ticks().await;
        }
    }

    fn stop(&mut self) -> SessionEnd {
        self.machine.stop();
        info!("Monitoring stopped manually by the user.");
        SessionEnd::Stopped
    }

    async fn hibernate(&mut self) -> SessionEnd {
        warn!(
            "Warning: High CPU usage detected for more than {} consecutive checks. \
             System will hibernate for safety reasons.",
            self.max_consecutive
        );
        let after = self.picker.next_duration();
        self.power.suspend(after).await;
        info!("Protective suspend finished after {:?}", after);
        SessionEnd::Hibernated { after }
    }

    /// Sleep the inter-tick delay, cut short by a shutdown request.
    async fn wait_between_ticks(&mut self) {
        let delay = tokio::time::sleep(self.interval);
        tokio::pin!(delay);
        loop {
            tokio::select! {
                _ = &mut delay => return,
                changed = self.shutdown.changed() => {
                    // Sender gone: no interrupt can arrive any more
                    if changed.is_err() {
                        (&mut delay).await;
                        return;
                    }
                    let stop = *self.shutdown.borrow();
                    if stop {
                        return;
                    }
                }
            }
        }
    }
}

pub type InterruptFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

/// Turn the first interrupt into a shutdown request, observed between ticks.
/// Returns once a second interrupt arrives, so the caller can exit at once.
pub async fn forward_interrupts<F>(mut next_interrupt: F, shutdown: watch::Sender<bool>) -> io::Result<()>
where
    F: FnMut() -> InterruptFuture,
{
    next_interrupt().await?;
    info!("Interrupt received, stopping after the current tick. Interrupt again to exit now.");
    let _ = shutdown.send(true);
    next_interrupt().await
}
