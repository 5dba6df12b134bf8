//! Configuration management (TOML)

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "CPU_SHIELD_CONFIG";

const DEFAULT_WHITELIST: &[&str] = &[
    "explorer.exe",
    "cpumonitor.py",
    "kernel_task.exe",
    "System Idle Process",
    "System",
    "python.exe",
    "taskhostw.exe",
    "services.exe",
    "wininit.exe",
    "cpu-shield",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub whitelist: Vec<String>,
    pub general: GeneralConfig,
    pub detection: DetectionConfig,
    pub mitigation: MitigationConfig,
    pub hibernation: HibernationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub sample_window_ms: u64,
    pub interval_secs: u64,
    pub log_file: PathBuf,
    pub notification_method: NotificationMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMethod {
    Desktop,
    Command,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub cpu_threshold: f64,
    pub max_consecutive: u32,
    pub top_processes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MitigationConfig {
    pub enabled: bool,
    pub kill_threshold: f64,
    pub grace_period_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HibernationConfig {
    pub min_secs: u64,
    pub max_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            sample_window_ms: 1000,
            interval_secs: 2,
            log_file: PathBuf::from("system_alert.log"),
            notification_method: NotificationMethod::Desktop,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        DetectionConfig {
            cpu_threshold: 80.0,
            max_consecutive: 3,
            top_processes: 3,
        }
    }
}

impl Default for MitigationConfig {
    fn default() -> Self {
        MitigationConfig {
            enabled: true,
            kill_threshold: 90.0,
            grace_period_ms: 500,
        }
    }
}

impl Default for HibernationConfig {
    fn default() -> Self {
        HibernationConfig {
            min_secs: 1,
            max_secs: 5,
            seed: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            whitelist: DEFAULT_WHITELIST.iter().map(|s| s.to_string()).collect(),
            general: GeneralConfig::default(),
            detection: DetectionConfig::default(),
            mitigation: MitigationConfig::default(),
            hibernation: HibernationConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        directories::ProjectDirs::from("", "", "cpu-shield")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let percent = 0.0..=100.0;
        if !percent.contains(&self.detection.cpu_threshold) {
            return Err(ConfigError::Invalid(format!(
                "detection.cpu_threshold {} is not a percentage",
                self.detection.cpu_threshold
            )));
        }
        if !percent.contains(&self.mitigation.kill_threshold) {
            return Err(ConfigError::Invalid(format!(
                "mitigation.kill_threshold {} is not a percentage",
                self.mitigation.kill_threshold
            )));
        }
        if self.detection.max_consecutive == 0 {
            return Err(ConfigError::Invalid("detection.max_consecutive must be at least 1".into()));
        }
        if self.detection.top_processes == 0 {
            return Err(ConfigError::Invalid("detection.top_processes must be at least 1".into()));
        }
        if self.general.sample_window_ms == 0 {
            return Err(ConfigError::Invalid("general.sample_window_ms must be positive".into()));
        }
        if self.hibernation.min_secs > self.hibernation.max_secs {
            return Err(ConfigError::Invalid(format!(
                "hibernation.min_secs {} exceeds max_secs {}",
                self.hibernation.min_secs, self.hibernation.max_secs
            )));
        }
        Ok(())
    }

    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.general.sample_window_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.general.interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.mitigation.grace_period_ms)
    }
}
