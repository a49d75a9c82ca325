//! Execution Control
//!
//! Pause/stop/step flags shared between the executor and its callers.
//! The executor polls these at known safe points: before each command,
//! inside WAIT, and at every retry boundary. A paused executor
//! cooperatively spins until resumed or stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const SPIN_INTERVAL: Duration = Duration::from_millis(20);

/// What the per-command boundary decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryAction {
    Proceed,
    Stopped,
}

#[derive(Debug, Default)]
struct ControlFlags {
    paused: AtomicBool,
    stopped: AtomicBool,
    single_step: AtomicBool,
    step_requested: AtomicBool,
}

/// Cheaply clonable handle controlling one executor.
#[derive(Debug, Clone, Default)]
pub struct ControlHandle {
    flags: Arc<ControlFlags>,
}

impl ControlHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every flag at the start of a run.
    pub fn reset(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
        self.flags.stopped.store(false, Ordering::SeqCst);
        self.flags.step_requested.store(false, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.flags.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.flags.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.flags.stopped.store(true, Ordering::SeqCst);
    }

    /// In single-step mode, let exactly one command run.
    pub fn step(&self) {
        self.flags.step_requested.store(true, Ordering::SeqCst);
    }

    pub fn set_single_step(&self, enabled: bool) {
        self.flags.single_step.store(enabled, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.flags.stopped.load(Ordering::SeqCst)
    }

    pub fn is_single_step(&self) -> bool {
        self.flags.single_step.load(Ordering::SeqCst)
    }

    /// Gate at a per-command boundary: honor stop immediately, wait for a
    /// step() in single-step mode, otherwise wait out a pause.
    pub async fn wait_at_boundary(&self) -> BoundaryAction {
        loop {
            if self.is_stopped() {
                return BoundaryAction::Stopped;
            }
            if self.is_single_step() {
                if self.flags.step_requested.swap(false, Ordering::SeqCst) {
                    return BoundaryAction::Proceed;
                }
            } else if !self.is_paused() {
                return BoundaryAction::Proceed;
            }
            tokio::time::sleep(SPIN_INTERVAL).await;
        }
    }

    /// Non-busy sleep that wakes early on stop(). Returns true when the
    /// run was stopped while sleeping.
    pub async fn sleep_cancellable(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let slice = std::cmp::min(deadline - now, Duration::from_millis(100));
            tokio::time::sleep(slice).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_boundary_proceeds_when_idle() {
        let control = ControlHandle::new();
        assert_eq!(control.wait_at_boundary().await, BoundaryAction::Proceed);
    }

    #[tokio::test]
    async fn test_boundary_honors_stop() {
        let control = ControlHandle::new();
        control.stop();
        assert_eq!(control.wait_at_boundary().await, BoundaryAction::Stopped);
    }

    #[tokio::test]
    async fn test_paused_boundary_waits_for_resume() {
        let control = ControlHandle::new();
        control.pause();
        let waiter = control.clone();
        let handle = tokio::spawn(async move { waiter.wait_at_boundary().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        control.resume();
        assert_eq!(handle.await.unwrap(), BoundaryAction::Proceed);
    }

    #[tokio::test]
    async fn test_paused_boundary_observes_stop() {
        let control = ControlHandle::new();
        control.pause();
        let waiter = control.clone();
        let handle = tokio::spawn(async move { waiter.wait_at_boundary().await });
        control.stop();
        assert_eq!(handle.await.unwrap(), BoundaryAction::Stopped);
    }

    #[tokio::test]
    async fn test_single_step_consumes_one_step() {
        let control = ControlHandle::new();
        control.set_single_step(true);
        control.step();
        assert_eq!(control.wait_at_boundary().await, BoundaryAction::Proceed);
        // second boundary blocks until stepped again
        let waiter = control.clone();
        let handle = tokio::spawn(async move { waiter.wait_at_boundary().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        control.step();
        assert_eq!(handle.await.unwrap(), BoundaryAction::Proceed);
    }

    #[tokio::test]
    async fn test_sleep_cancellable_wakes_on_stop() {
        let control = ControlHandle::new();
        let sleeper = control.clone();
        let started = Instant::now();
        let handle =
            tokio::spawn(async move { sleeper.sleep_cancellable(Duration::from_secs(30)).await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        control.stop();
        assert!(handle.await.unwrap());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_sleep_cancellable_completes() {
        let control = ControlHandle::new();
        assert!(!control.sleep_cancellable(Duration::from_millis(10)).await);
    }
}
