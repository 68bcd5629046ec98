//! Rolling-window transfer speed.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Minimum wall time between speed recalculations
pub const SPEED_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

/// Span of samples averaged into one reading
const SPEED_WINDOW: Duration = Duration::from_secs(3);

/// Smooths byte counters into bytes/second over a short window.
///
/// Samples are taken at most every [`SPEED_UPDATE_INTERVAL`], so a burst of
/// small chunks produces one reading rather than one per chunk.
#[derive(Debug)]
pub struct SpeedTracker {
    samples: VecDeque<(Instant, u64)>,
    last_sample: Instant,
}

impl SpeedTracker {
    /// Start tracking from `initial_bytes` (the resume offset) at `now`
    pub fn new(initial_bytes: u64, now: Instant) -> Self {
        let mut samples = VecDeque::with_capacity(8);
        samples.push_back((now, initial_bytes));
        Self {
            samples,
            last_sample: now,
        }
    }

    /// Feed the running byte total; returns a new speed when a sample was taken
    pub fn record(&mut self, total_bytes: u64, now: Instant) -> Option<f64> {
        if now.duration_since(self.last_sample) < SPEED_UPDATE_INTERVAL {
            return None;
        }
        self.last_sample = now;
        self.samples.push_back((now, total_bytes));

        // Keep one sample at or beyond the window edge as the baseline
        while self.samples.len() > 2
            && self
                .samples
                .get(1)
                .is_some_and(|(t, _)| now.duration_since(*t) >= SPEED_WINDOW)
        {
            self.samples.pop_front();
        }

        let (oldest_at, oldest_bytes) = *self.samples.front()?;
        let elapsed = now.duration_since(oldest_at).as_secs_f64();
        if elapsed <= 0.0 {
            return Some(0.0);
        }
        Some(total_bytes.saturating_sub(oldest_bytes) as f64 / elapsed)
    }
}
