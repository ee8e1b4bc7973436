//! Detects when the upstream stops producing fresh samples.

use std::time::Duration;

use tagwatch_types::RunStatus;
use tokio::time::Instant;

/// Default time without a successful poll before the system counts as paused.
pub const DEFAULT_STALE_TIMEOUT: Duration = Duration::from_secs(5);

/// Two-state `Running`/`Paused` machine driven by a deadline.
///
/// Every successful poll pushes the deadline out by the timeout and forces
/// `Running`. A periodic [`check`](Self::check) flips to `Paused` once the
/// deadline has passed. A failing upstream and a silent one look the same
/// here: both simply stop calling `record_success`.
#[derive(Debug, Clone)]
pub struct StalenessDetector {
    timeout: Duration,
    deadline: Instant,
    status: RunStatus,
}

impl StalenessDetector {
    /// Start in `Running` with the first deadline at `now + timeout`.
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            deadline: now + timeout,
            status: RunStatus::Running,
        }
    }

    /// A poll returned fresh samples.
    ///
    /// Returns the previous status.
    pub fn record_success(&mut self, now: Instant) -> RunStatus {
        let previous = self.status;
        self.deadline = now + self.timeout;
        self.status = RunStatus::Running;
        if previous.is_paused() {
            tracing::info!("Fresh samples received, monitoring resumed");
        }
        previous
    }

    /// Compare `now` against the deadline and return the resulting status.
    pub fn check(&mut self, now: Instant) -> RunStatus {
        if self.status == RunStatus::Running && now >= self.deadline {
            self.status = RunStatus::Paused;
            tracing::warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "No fresh samples before deadline, system paused"
            );
        }
        self.status
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
