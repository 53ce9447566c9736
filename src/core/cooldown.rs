//! Fixed server-imposed wait before a form submission

use std::time::Duration;
use tracing::info;

/// Wait lksfy enforces between page load and form POST
pub const SUBMIT_COOLDOWN: Duration = Duration::from_secs(5);

/// A named, fixed delay. Not a backoff: the duration never adapts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    duration: Duration,
}

impl Cooldown {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// No wait at all (tests, replaying recorded sessions)
    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Suspend for the configured duration
    pub async fn wait(&self) {
        if self.duration.is_zero() {
            return;
        }
        info!("Waiting {:?} before submitting", self.duration);
        tokio::time::sleep(self.duration).await;
    }
}

impl Default for Cooldown {
    fn default() -> Self {
        Self::new(SUBMIT_COOLDOWN)
    }
}
