//! Process action executor (terminate, kill)

use crate::error::TerminationError;
use std::fs;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

impl Signal {
    fn as_raw(self) -> libc::c_int {
        match self {
            Signal::Term => libc::SIGTERM,
            Signal::Kill => libc::SIGKILL,
        }
    }
}

/// Host process control surface used by mitigation.
pub trait ProcessControl: Send + Sync {
    /// Request graceful termination.
    fn terminate(&self, pid: u32) -> Result<(), TerminationError>;
    /// Request forceful termination.
    fn kill(&self, pid: u32) -> Result<(), TerminationError>;
    fn is_alive(&self, pid: u32) -> bool;
}

// 0 addresses the whole process group and must never be signalled
fn raw_pid(pid: u32) -> Option<libc::pid_t> {
    libc::pid_t::try_from(pid).ok().filter(|p| *p > 0)
}

pub fn send_signal(pid: u32, signal: Signal) -> Result<(), TerminationError> {
    let pid_t = raw_pid(pid).ok_or(TerminationError::NotFound(pid))?;
    let result = unsafe { libc::kill(pid_t, signal.as_raw()) };
    if result == 0 {
        Ok(())
    } else {
        Err(TerminationError::from_errno(pid, io::Error::last_os_error()))
    }
}

/// Signal-based control for Unix hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SignalExecutor;

impl SignalExecutor {
    pub fn new() -> Self {
        Self
    }

    fn is_zombie(pid: u32) -> bool {
        fs::read_to_string(format!("/proc/{}/stat", pid))
            .ok()
            .and_then(|s| s.rfind(')').and_then(|i| s[i + 1..].trim_start().chars().next()))
            == Some('Z')
    }
}

impl ProcessControl for SignalExecutor {
    fn terminate(&self, pid: u32) -> Result<(), TerminationError> {
        send_signal(pid, Signal::Term)
    }

    fn kill(&self, pid: u32) -> Result<(), TerminationError> {
        send_signal(pid, Signal::Kill)
    }

    fn is_alive(&self, pid: u32) -> bool {
        let Some(pid_t) = raw_pid(pid) else {
            return false;
        };
        let result = unsafe { libc::kill(pid_t, 0) };
        let exists = result == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM);
        exists && !Self::is_zombie(pid)
    }
}
