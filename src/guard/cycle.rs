//! Fixed period pacing for control loops.

use std::thread;
use std::time::{Duration, Instant};
use tracing::trace;

/// Paces a loop on an absolute schedule, so the time spent in the loop
/// body does not accumulate as drift.
///
/// When a cycle overruns its deadline the schedule restarts from now
/// instead of running the missed cycles back to back.
#[derive(Debug, Clone)]
pub struct CycleTimer {
    period: Duration,
    next: Instant,
    cycles: u64,
    overruns: u64,
}

impl CycleTimer {
    /// A timer whose first deadline is one `period` from now.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
            cycles: 0,
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycles that ended after their deadline.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Restart the schedule from now.
    pub fn restart(&mut self) {
        self.next = Instant::now() + self.period;
    }

    /// Sleep until the end of the current cycle; `false` if it had already
    /// passed.
    pub fn wait(&mut self) -> bool {
        let now = Instant::now();
        self.cycles += 1;
        if now < self.next {
            thread::sleep(self.next - now);
            self.next += self.period;
            true
        } else {
            self.overruns += 1;
            trace!("cycle {} overran by {:?}", self.cycles, now - self.next);
            self.next = now + self.period;
            false
        }
    }
}
