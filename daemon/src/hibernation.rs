//! Protective suspend placeholder
//!
//! The session ends with a short randomized pause standing in for a real
//! power-management action. Nothing here touches the host's power state.

use async_trait::async_trait;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Power-management action taken when the session hibernates.
#[async_trait]
pub trait PowerHook: Send + Sync {
    async fn suspend(&self, duration: Duration);
}

/// Sleeps for the requested duration and does nothing else.
#[derive(Debug, Default)]
pub struct SimulatedSuspend;

#[async_trait]
impl PowerHook for SimulatedSuspend {
    async fn suspend(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Seedable picker for the suspend duration, whole seconds in `[min, max]`.
#[derive(Debug, Clone)]
pub struct SuspendPicker {
    state: u64,
    min_secs: u64,
    max_secs: u64,
}

impl SuspendPicker {
    pub fn seeded(seed: u64, min_secs: u64, max_secs: u64) -> Self {
        Self {
            state: seed,
            min_secs: min_secs.min(max_secs),
            max_secs: max_secs.max(min_secs),
        }
    }

    pub fn from_clock(min_secs: u64, max_secs: u64) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self::seeded(seed, min_secs, max_secs)
    }

    // splitmix64
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    pub fn next_duration(&mut self) -> Duration {
        let span = (self.max_secs - self.min_secs).saturating_add(1);
        Duration::from_secs(self.min_secs + self.next_u64() % span)
    }
}
