//! Per-node channel-occupancy accounting.
//!
//! Each node owns one leaky bucket measured in nanoseconds of air time.
//! Admissions race from every concurrent transmission event, so the level is
//! a single atomic; the drain runs on its own thread.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Concurrency-safe leaky bucket.
///
/// Two quirks of the accounting are load-bearing for simulation fidelity and
/// must not be "fixed":
///
/// - `fill` checks the level *before* adding, so one accepted call may push
///   the level past capacity (a one-step overshoot), after which further
///   calls are rejected until the drain catches up.
/// - The drain subtracts a fixed step whenever the level is positive, without
///   clamping, so the level can sit below zero by up to one step.
pub struct LeakyBucket {
    capacity: i64,
    drain_interval: Duration,
    drain_size: i64,
    level: Arc<AtomicI64>,
    stop: Arc<AtomicBool>,
    started: AtomicBool,
    drain_handle: Mutex<Option<JoinHandle<()>>>,
}

impl LeakyBucket {
    pub fn new(capacity: i64, drain_interval: Duration, drain_size: i64) -> Self {
        Self {
            capacity,
            drain_interval,
            drain_size,
            level: Arc::new(AtomicI64::new(0)),
            stop: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            drain_handle: Mutex::new(None),
        }
    }

    /// Try to admit `amount` into the bucket.
    ///
    /// Rejects without mutating when the current level already exceeds
    /// capacity; otherwise adds and accepts. Never blocks.
    pub fn fill(&self, amount: i64) -> bool {
        if self.level.load(Ordering::Relaxed) > self.capacity {
            return false;
        }
        self.level.fetch_add(amount, Ordering::Relaxed);
        true
    }

    /// Spawn the drain thread: every `drain_interval`, subtract `drain_size`
    /// if the level is currently positive.
    ///
    /// # Panics
    ///
    /// Starting the same bucket twice is a caller contract violation and
    /// panics rather than silently doubling the drain rate.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            panic!("LeakyBucket: start() called more than once");
        }
        let level = Arc::clone(&self.level);
        let stop = Arc::clone(&self.stop);
        let interval = self.drain_interval;
        let drain_size = self.drain_size;
        let handle = thread::spawn(move || loop {
            thread::sleep(interval);
            if stop.load(Ordering::Relaxed) {
                break;
            }
            if level.load(Ordering::Relaxed) > 0 {
                level.fetch_sub(drain_size, Ordering::Relaxed);
            }
        });
        *self
            .drain_handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
    }

    /// Signal the drain thread to exit and wait for it.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
        let handle = self
            .drain_handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Fraction of capacity in use. Unclamped: can exceed 1.0 right after an
    /// overshooting admission and dip below 0.0 after a final drain step.
    pub fn usage(&self) -> f64 {
        self.level.load(Ordering::Relaxed) as f64 / self.capacity as f64
    }
}

impl Drop for LeakyBucket {
    fn drop(&mut self) {
        // Signal without joining; the thread exits within one interval.
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_until_level_exceeds_capacity() {
        let bucket = LeakyBucket::new(100, Duration::from_secs(3600), 10);
        assert!(bucket.fill(60));
        // Level 60 <= 100: accepted, overshooting to 110.
        assert!(bucket.fill(50));
        // Level 110 > 100: rejected without mutating.
        assert!(!bucket.fill(1));
        assert!((bucket.usage() - 1.1).abs() < 1e-9);
    }

    #[test]
    fn drain_lowers_usage_by_fixed_step() {
        let bucket = LeakyBucket::new(1_000, Duration::from_millis(10), 100);
        assert!(bucket.fill(500));
        bucket.start();
        thread::sleep(Duration::from_millis(100));
        bucket.stop();
        // At least one drain step of 100/1000 happened, and the level never
        // drains below zero minus one step.
        let usage = bucket.usage();
        assert!(usage <= 0.4, "usage {usage} should have drained");
        assert!(usage >= -0.1);
    }

    #[test]
    fn drain_can_leave_level_below_zero() {
        let bucket = LeakyBucket::new(1_000, Duration::from_millis(5), 100);
        assert!(bucket.fill(1));
        bucket.start();
        thread::sleep(Duration::from_millis(50));
        bucket.stop();
        // One drain fires while positive (1 -> -99); the level is then
        // non-positive so no further steps apply.
        assert!((bucket.usage() - (-0.099)).abs() < 1e-9);
    }

    #[test]
    fn stop_halts_draining() {
        let bucket = LeakyBucket::new(1_000, Duration::from_millis(5), 100);
        bucket.start();
        bucket.stop();
        assert!(bucket.fill(500));
        thread::sleep(Duration::from_millis(20));
        assert!((bucket.usage() - 0.5).abs() < 1e-9);
    }

    #[test]
    #[should_panic(expected = "more than once")]
    fn double_start_is_fatal() {
        let bucket = LeakyBucket::new(100, Duration::from_millis(5), 10);
        bucket.start();
        bucket.start();
    }
}
