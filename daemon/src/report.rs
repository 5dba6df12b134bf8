//! Alert records: append to the audit log, then notify the operator

use crate::collector::ProcessInfo;
use crate::error::SinkWriteError;
use crate::notifier::Notifier;
use crate::sampler::Sample;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const ALERT_TITLE: &str = "High CPU Alert";

/// Upper bound on one notification attempt.
pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Append-only destination for alert records.
pub trait AlertLog: Send {
    fn append(&mut self, record: &str) -> Result<(), SinkWriteError>;
}

pub struct FileAlertLog {
    path: PathBuf,
}

impl FileAlertLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlertLog for FileAlertLog {
    fn append(&mut self, record: &str) -> Result<(), SinkWriteError> {
        let wrap = |source| SinkWriteError {
            path: self.path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(wrap)?;
        file.write_all(record.as_bytes()).map_err(wrap)?;
        file.sync_data().map_err(wrap)?;
        Ok(())
    }
}

pub fn format_alert_record(timestamp: &DateTime<Local>, cpu_percent: f64, heavy: &[ProcessInfo]) -> String {
    let mut record = format!(
        "[{}] ALERT: CPU Usage at {:.1}%\nTop CPU-consuming processes:\n",
        timestamp.format("%Y-%m-%d %H:%M:%S"),
        cpu_percent
    );
    for p in heavy {
        let _ = writeln!(record, "  PID: {}, Name: {}, CPU%: {:.1}", p.pid, p.name, p.cpu_percent);
    }
    record.push_str(&"-".repeat(20));
    record.push('\n');
    record
}

pub fn notification_body(cpu_percent: f64) -> String {
    format!("CPU usage is at {:.1}%\nCheck logs for details.", cpu_percent)
}

pub struct Reporter {
    log: Box<dyn AlertLog>,
    notifier: Box<dyn Notifier>,
    notify_timeout: Duration,
}

impl Reporter {
    pub fn new(log: Box<dyn AlertLog>, notifier: Box<dyn Notifier>) -> Self {
        Self {
            log,
            notifier,
            notify_timeout: NOTIFY_TIMEOUT,
        }
    }

    pub fn notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// The log append must succeed; the notification is best effort, bounded
    /// by the timeout, and attempted even when the append fails.
    pub async fn report(&mut self, sample: &Sample, heavy: &[ProcessInfo]) -> Result<(), SinkWriteError> {
        let record = format_alert_record(&sample.timestamp, sample.cpu_percent, heavy);
        info!("{}", record.trim_end());
        let appended = self.log.append(&record);

        let body = notification_body(sample.cpu_percent);
        match tokio::time::timeout(self.notify_timeout, self.notifier.notify(ALERT_TITLE, &body)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Error sending notification: {}", e),
            Err(_) => warn!("Notification timed out after {:?}, skipped", self.notify_timeout),
        }
        appended
    }
}
