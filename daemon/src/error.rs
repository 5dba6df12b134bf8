//! Error types, one per failure scope

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Aggregate CPU measurement failed. Only the current tick is lost.
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no aggregate cpu line in {0}")]
    Malformed(PathBuf),
}

/// A single process entry could not be read during enumeration.
#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error("process {0} vanished")]
    Vanished(u32),
    #[error("access to process {0} denied")]
    AccessDenied(u32),
    #[error("unparseable stat for process {0}")]
    Malformed(u32),
}

#[derive(Debug, Error)]
pub enum TerminationError {
    #[error("process {0} not found")]
    NotFound(u32),
    #[error("permission denied for process {0}")]
    PermissionDenied(u32),
    #[error("signal to process {pid} failed: {source}")]
    Os {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

impl TerminationError {
    pub fn from_errno(pid: u32, err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ESRCH) => TerminationError::NotFound(pid),
            Some(libc::EPERM) => TerminationError::PermissionDenied(pid),
            _ => TerminationError::Os { pid, source: err },
        }
    }
}

/// The alert log could not be appended to. Fatal to the session.
#[derive(Debug, Error)]
#[error("failed to append alert record to {path}: {source}")]
pub struct SinkWriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("desktop notification failed: {0}")]
    Desktop(String),
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {status}")]
    Exit {
        program: &'static str,
        status: std::process::ExitStatus,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
