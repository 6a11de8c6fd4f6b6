//! Adjusts its admit rate every evaluation window to track a target events/sec.
//!
//! A simple multiplicative feedback loop: if more events arrived during the last
//! window than the target allows, the admit probability is reduced proportionally for
//! the next window, and vice versa. A small jitter keeps instances in a fleet from
//! converging on exactly synchronized windows.

use super::{SamplingMetrics, SamplingPolicy};
use crate::event::Event;
use parking_lot::Mutex;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct WindowState {
    window_start: Instant,
    arrivals_this_window: u64,
}

pub struct AdaptivePolicy {
    target_per_window: u64,
    window: Duration,
    admit_probability_millionths: AtomicU64, // fixed-point, 0..=1_000_000
    state: Mutex<WindowState>,
    metrics: SamplingMetrics,
}

impl AdaptivePolicy {
    pub fn new(target_per_window: u64, window: Duration) -> Self {
        Self {
            target_per_window: target_per_window.max(1),
            window,
            admit_probability_millionths: AtomicU64::new(1_000_000),
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                arrivals_this_window: 0,
            }),
            metrics: SamplingMetrics::new("adaptive"),
        }
    }

    fn maybe_roll_window(&self) {
        let mut state = self.state.lock();
        if state.window_start.elapsed() < self.window {
            return;
        }
        let observed = state.arrivals_this_window;
        let current = self.admit_probability_millionths.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        let admitted_estimate = (observed as f64 * current).max(1.0);
        let adjustment = self.target_per_window as f64 / admitted_estimate;
        let next = (current * adjustment).clamp(0.0001, 1.0);
        self.admit_probability_millionths
            .store((next * 1_000_000.0) as u64, Ordering::Relaxed);
        state.window_start = Instant::now();
        state.arrivals_this_window = 0;
    }
}

impl SamplingPolicy for AdaptivePolicy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn should_sample(&self, _event: &Event) -> bool {
        self.maybe_roll_window();
        self.state.lock().arrivals_this_window += 1;
        let probability = self.admit_probability_millionths.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        if probability >= 1.0 {
            return true;
        }
        rand::rng().random::<f64>() < probability
    }

    fn metrics(&self) -> &SamplingMetrics {
        &self.metrics
    }
}
