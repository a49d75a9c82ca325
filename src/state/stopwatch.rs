//! Stopwatches
//!
//! Named stopwatches driven by the STOPWATCH command. Each watch keeps its
//! running flag, accumulated time and recorded laps; misuse maps to the
//! stopwatch state error codes.

use crate::errors::ErrorCode;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct Stopwatch {
    started_at: Option<Instant>,
    accumulated: Duration,
    pub laps: Vec<f64>,
}

impl Stopwatch {
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Seconds measured so far, including the currently running span.
    pub fn elapsed_seconds(&self) -> f64 {
        let running = self
            .started_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO);
        (self.accumulated + running).as_secs_f64()
    }
}

/// All stopwatches of one executor, by upper-cased id.
#[derive(Debug, Default)]
pub struct StopwatchMap {
    watches: HashMap<String, Stopwatch>,
}

impl StopwatchMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&Stopwatch> {
        self.watches.get(&id.to_uppercase())
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.get(id).map(|w| w.is_running()).unwrap_or(false)
    }

    pub fn start(&mut self, id: &str) -> Result<(), ErrorCode> {
        let watch = self.watches.entry(id.to_uppercase()).or_default();
        if watch.is_running() {
            return Err(ErrorCode::StopwatchAlreadyRunning);
        }
        watch.started_at = Some(Instant::now());
        Ok(())
    }

    /// Stop a running watch and return its total elapsed seconds.
    pub fn stop(&mut self, id: &str) -> Result<f64, ErrorCode> {
        let watch = self
            .watches
            .get_mut(&id.to_uppercase())
            .ok_or(ErrorCode::StopwatchNotRunning)?;
        let started = watch.started_at.take().ok_or(ErrorCode::StopwatchNotRunning)?;
        watch.accumulated += started.elapsed();
        Ok(watch.accumulated.as_secs_f64())
    }

    /// Record a lap on a running watch and return the lap value.
    pub fn lap(&mut self, id: &str) -> Result<f64, ErrorCode> {
        let watch = self
            .watches
            .get_mut(&id.to_uppercase())
            .ok_or(ErrorCode::StopwatchNotRunning)?;
        if !watch.is_running() {
            return Err(ErrorCode::StopwatchNotRunning);
        }
        let elapsed = watch.elapsed_seconds();
        watch.laps.push(elapsed);
        Ok(elapsed)
    }

    pub fn reset(&mut self, id: &str) {
        self.watches.remove(&id.to_uppercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop() {
        let mut map = StopwatchMap::new();
        map.start("a").unwrap();
        assert!(map.is_running("a"));
        let elapsed = map.stop("a").unwrap();
        assert!(elapsed >= 0.0);
        assert!(!map.is_running("a"));
    }

    #[test]
    fn test_start_twice_is_state_error() {
        let mut map = StopwatchMap::new();
        map.start("a").unwrap();
        assert_eq!(map.start("a"), Err(ErrorCode::StopwatchAlreadyRunning));
    }

    #[test]
    fn test_stop_without_start_is_state_error() {
        let mut map = StopwatchMap::new();
        assert_eq!(map.stop("a"), Err(ErrorCode::StopwatchNotRunning));
    }

    #[test]
    fn test_lap_requires_running_watch() {
        let mut map = StopwatchMap::new();
        assert_eq!(map.lap("a"), Err(ErrorCode::StopwatchNotRunning));
        map.start("a").unwrap();
        map.lap("a").unwrap();
        assert_eq!(map.get("a").unwrap().laps.len(), 1);
    }

    #[test]
    fn test_ids_case_insensitive() {
        let mut map = StopwatchMap::new();
        map.start("Total").unwrap();
        assert!(map.is_running("TOTAL"));
    }

    #[test]
    fn test_accumulates_across_restarts() {
        let mut map = StopwatchMap::new();
        map.start("a").unwrap();
        let first = map.stop("a").unwrap();
        map.start("a").unwrap();
        let second = map.stop("a").unwrap();
        assert!(second >= first);
    }
}
