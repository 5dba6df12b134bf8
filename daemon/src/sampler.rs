//! System-wide CPU sampling over a fixed measurement window

use crate::error::MeasurementError;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// One tick's reading. Immutable once taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub cpu_percent: f64,
    pub is_alert: bool,
}

/// Source of aggregate CPU utilization. Implementations block for their
/// measurement window before returning.
#[async_trait]
pub trait CpuSampler: Send {
    async fn measure(&mut self) -> Result<f64, MeasurementError>;
}

/// Cumulative jiffies from the aggregate `cpu` line of `/proc/stat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTimes {
    pub busy: u64,
    pub total: u64,
}

impl CpuTimes {
    pub fn parse(stat: &str) -> Option<Self> {
        let line = stat.lines().find(|l| l.starts_with("cpu "))?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .take(8)
            .map(|f| f.parse().ok())
            .collect::<Option<_>>()?;
        if fields.len() < 4 {
            return None;
        }
        // idle + iowait
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        let total: u64 = fields.iter().sum();
        Some(Self {
            busy: total.saturating_sub(idle),
            total,
        })
    }

    /// Utilization between an earlier reading and this one, in percent.
    pub fn usage_since(&self, earlier: &CpuTimes) -> f64 {
        let total = self.total.saturating_sub(earlier.total);
        if total == 0 {
            return 0.0;
        }
        let busy = self.busy.saturating_sub(earlier.busy);
        (busy as f64 / total as f64 * 100.0).min(100.0)
    }
}

pub struct ProcStatSampler {
    path: PathBuf,
    window: Duration,
}

impl ProcStatSampler {
    pub fn new(window: Duration) -> Self {
        Self::with_path("/proc/stat", window)
    }

    pub fn with_path(path: impl Into<PathBuf>, window: Duration) -> Self {
        Self {
            path: path.into(),
            window,
        }
    }

    fn read_times(&self) -> Result<CpuTimes, MeasurementError> {
        let content = fs::read_to_string(&self.path).map_err(|source| MeasurementError::Read {
            path: self.path.clone(),
            source,
        })?;
        CpuTimes::parse(&content).ok_or_else(|| MeasurementError::Malformed(self.path.clone()))
    }
}

#[async_trait]
impl CpuSampler for ProcStatSampler {
    async fn measure(&mut self) -> Result<f64, MeasurementError> {
        let before = self.read_times()?;
        tokio::time::sleep(self.window).await;
        let after = self.read_times()?;
        Ok(after.usage_since(&before))
    }
}

/// Turns raw measurements into [`Sample`]s against the alert threshold.
pub struct Sampler<S> {
    source: S,
    threshold: f64,
}

impl<S: CpuSampler> Sampler<S> {
    pub fn new(source: S, threshold: f64) -> Self {
        Self { source, threshold }
    }

    pub async fn sample(&mut self) -> Result<Sample, MeasurementError> {
        let cpu_percent = self.source.measure().await?;
        Ok(Sample {
            timestamp: Local::now(),
            cpu_percent,
            is_alert: cpu_percent > self.threshold,
        })
    }
}
