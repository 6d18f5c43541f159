//! Process lifecycle tracking
//!
//! The server moves forward through `Booting -> Ready -> Draining -> Stopped`
//! and never backward. The gateway consults the current state before
//! accepting work, and drain waits for tracked in-flight requests.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{EngineError, Result};

/// Lifecycle states, in transition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Booting,
    Ready,
    Draining,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Booting => "booting",
            LifecycleState::Ready => "ready",
            LifecycleState::Draining => "draining",
            LifecycleState::Stopped => "stopped",
        }
    }
}

/// Shared lifecycle cell with an in-flight request counter
pub struct Lifecycle {
    state: parking_lot::RwLock<LifecycleState>,
    in_flight: AtomicUsize,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: parking_lot::RwLock::new(LifecycleState::Booting),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.read()
    }

    /// Booting -> Ready, once startup work has finished
    pub fn set_ready(&self) {
        let mut state = self.state.write();
        match *state {
            LifecycleState::Booting => {
                *state = LifecycleState::Ready;
                info!("Server is ready");
            }
            other => warn!(state = other.as_str(), "Ignoring ready transition"),
        }
    }

    /// Ready (or Booting) -> Draining
    pub fn begin_drain(&self) {
        let mut state = self.state.write();
        match *state {
            LifecycleState::Booting | LifecycleState::Ready => {
                *state = LifecycleState::Draining;
                info!(
                    in_flight = self.in_flight.load(Ordering::SeqCst),
                    "Server is draining"
                );
            }
            other => warn!(state = other.as_str(), "Ignoring drain transition"),
        }
    }

    /// Terminal transition
    pub fn set_stopped(&self) {
        let mut state = self.state.write();
        if *state != LifecycleState::Stopped {
            *state = LifecycleState::Stopped;
            info!("Server is stopped");
        }
    }

    /// Err unless the server currently accepts inference requests
    pub fn check_accepting(&self) -> Result<()> {
        match self.state() {
            LifecycleState::Ready => Ok(()),
            LifecycleState::Booting => Err(EngineError::not_ready("server is booting")),
            LifecycleState::Draining => Err(EngineError::not_ready("server is draining")),
            LifecycleState::Stopped => Err(EngineError::not_ready("server is stopped")),
        }
    }

    /// Count a request as in-flight until the guard drops
    pub fn track(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            lifecycle: Arc::clone(self),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Wait until no requests are in flight, up to `grace`.
    /// Returns false if the grace period expired first.
    pub async fn wait_idle(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        while self.in_flight() > 0 {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight counter on drop
pub struct InFlightGuard {
    lifecycle: Arc<Lifecycle>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.lifecycle.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Booting);

        lifecycle.set_ready();
        assert_eq!(lifecycle.state(), LifecycleState::Ready);

        lifecycle.begin_drain();
        assert_eq!(lifecycle.state(), LifecycleState::Draining);

        lifecycle.set_stopped();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_no_backward_transitions() {
        let lifecycle = Lifecycle::new();
        lifecycle.set_ready();
        lifecycle.begin_drain();

        // Ready after draining started is ignored
        lifecycle.set_ready();
        assert_eq!(lifecycle.state(), LifecycleState::Draining);

        lifecycle.set_stopped();
        lifecycle.begin_drain();
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[test]
    fn test_drain_during_boot() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_drain();
        assert_eq!(lifecycle.state(), LifecycleState::Draining);
    }

    #[test]
    fn test_check_accepting() {
        let lifecycle = Lifecycle::new();
        let err = lifecycle.check_accepting().unwrap_err();
        assert!(err.to_string().contains("booting"));
        assert_eq!(err.status_code(), 503);

        lifecycle.set_ready();
        assert!(lifecycle.check_accepting().is_ok());

        lifecycle.begin_drain();
        let err = lifecycle.check_accepting().unwrap_err();
        assert!(err.to_string().contains("draining"));
    }

    #[test]
    fn test_in_flight_tracking() {
        let lifecycle = Arc::new(Lifecycle::new());
        assert_eq!(lifecycle.in_flight(), 0);

        let a = lifecycle.track();
        let b = lifecycle.track();
        assert_eq!(lifecycle.in_flight(), 2);

        drop(a);
        assert_eq!(lifecycle.in_flight(), 1);
        drop(b);
        assert_eq!(lifecycle.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_wait_idle_completes() {
        let lifecycle = Arc::new(Lifecycle::new());
        let guard = lifecycle.track();

        let waiter = Arc::clone(&lifecycle);
        let task = tokio::spawn(async move { waiter.wait_idle(Duration::from_secs(1)).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(guard);

        assert!(task.await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_idle_times_out() {
        let lifecycle = Arc::new(Lifecycle::new());
        let _guard = lifecycle.track();
        assert!(!lifecycle.wait_idle(Duration::from_millis(30)).await);
    }
}
