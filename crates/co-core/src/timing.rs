//! Wall-clock timing for simulation runs.
//!
//! Timeouts are advisory: they are only checked between communication points
//! and never interrupt a call into a model instance.

use std::time::{Duration, Instant};

/// Measures elapsed wall-clock time since a run started.
#[derive(Clone, Copy, Debug)]
pub struct Stopwatch {
    start: Instant,
    timeout: Option<Duration>,
}

impl Stopwatch {
    /// Start a stopwatch without a deadline.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            timeout: None,
        }
    }

    /// Start a stopwatch that expires after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            timeout,
        }
    }

    /// Elapsed time in seconds.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// True once the configured timeout has passed.
    pub fn expired(&self) -> bool {
        match self.timeout {
            Some(timeout) => self.start.elapsed() > timeout,
            None => false,
        }
    }
}

/// Counters collected while a master algorithm runs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunStats {
    /// Calls into the solver (ME) or `do_step` (CS).
    pub steps: usize,
    /// Events handled, of any kind.
    pub events: usize,
    /// Iterations of the discrete-state update loop over all events.
    pub event_iterations: usize,
    /// Solver resets after discontinuous state changes.
    pub solver_resets: usize,
    /// Wall-clock duration of the run in seconds.
    pub wall_time_s: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwatch_without_timeout_never_expires() {
        let sw = Stopwatch::start();
        assert!(!sw.expired());
        assert!(sw.elapsed_s() >= 0.0);
    }

    #[test]
    fn zero_timeout_expires() {
        let sw = Stopwatch::with_timeout(Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(2));
        assert!(sw.expired());
    }

    #[test]
    fn run_stats_default_is_zero() {
        let stats = RunStats::default();
        assert_eq!(stats.steps, 0);
        assert_eq!(stats.events, 0);
    }
}
