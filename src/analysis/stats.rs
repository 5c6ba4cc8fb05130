//! Counters and stopwatches for analysis diagnostics.
//!
//! A purely observational side channel keyed by string labels. The analysis
//! core is single-threaded, so the storage is thread-local; nothing recorded
//! here may affect analysis results.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

thread_local! {
    static COUNTERS: RefCell<BTreeMap<String, u64>> = RefCell::new(BTreeMap::new());
    static STOPWATCHES: RefCell<BTreeMap<String, Stopwatch>> = RefCell::new(BTreeMap::new());
}

#[derive(Clone, Debug, Default)]
struct Stopwatch {
    started: Option<Instant>,
    elapsed: Duration,
}

impl Stopwatch {
    fn resume(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
        }
    }

    fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed += started.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        match self.started {
            Some(started) => self.elapsed + started.elapsed(),
            None => self.elapsed,
        }
    }
}

/// Increments a counter.
pub fn count(name: &str) {
    COUNTERS.with(|counters| {
        *counters.borrow_mut().entry(name.to_string()).or_insert(0) += 1;
    });
}

/// Raises a counter to `value` if it is below it.
pub fn count_max(name: &str, value: u64) {
    COUNTERS.with(|counters| {
        let mut counters = counters.borrow_mut();
        let counter = counters.entry(name.to_string()).or_insert(0);
        *counter = (*counter).max(value);
    });
}

/// The current value of a counter.
pub fn get(name: &str) -> u64 {
    COUNTERS.with(|counters| counters.borrow().get(name).cloned().unwrap_or(0))
}

/// Starts or resumes the stopwatch `name`.
pub fn resume(name: &str) {
    STOPWATCHES.with(|stopwatches| {
        stopwatches
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .resume();
    });
}

/// Stops the stopwatch `name`, accumulating elapsed time.
pub fn stop(name: &str) {
    STOPWATCHES.with(|stopwatches| {
        stopwatches
            .borrow_mut()
            .entry(name.to_string())
            .or_default()
            .stop();
    });
}

/// Accumulated time on the stopwatch `name`.
pub fn elapsed(name: &str) -> Duration {
    STOPWATCHES.with(|stopwatches| {
        stopwatches
            .borrow()
            .get(name)
            .map(Stopwatch::elapsed)
            .unwrap_or_default()
    })
}

/// Clears all counters and stopwatches.
pub fn reset() {
    COUNTERS.with(|counters| counters.borrow_mut().clear());
    STOPWATCHES.with(|stopwatches| stopwatches.borrow_mut().clear());
}

/// A snapshot of all counters, for reporting.
pub fn counters() -> BTreeMap<String, u64> {
    COUNTERS.with(|counters| counters.borrow().clone())
}

/// Resumes a stopwatch for the duration of a scope.
pub struct ScopedTimer {
    name: &'static str,
}

impl ScopedTimer {
    pub fn new(name: &'static str) -> ScopedTimer {
        resume(name);
        ScopedTimer { name }
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        stop(self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        reset();
        count("test.counter");
        count("test.counter");
        assert_eq!(get("test.counter"), 2);

        count_max("test.max", 5);
        count_max("test.max", 3);
        assert_eq!(get("test.max"), 5);

        reset();
        assert_eq!(get("test.counter"), 0);
    }

    #[test]
    fn test_scoped_timer() {
        reset();
        {
            let _timer = ScopedTimer::new("test.timer");
        }
        // the stopwatch was stopped on drop; elapsed no longer grows
        let elapsed_once = elapsed("test.timer");
        assert_eq!(elapsed("test.timer"), elapsed_once);
    }
}
