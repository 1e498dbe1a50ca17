//! Shared wall clock for the update pass.
//!
//! Advanced by the loop's monotonic elapsed time so every item in a pass sees
//! the same timestamp, and resynchronized against real time when the two
//! drift apart by more than a second (suspend, clock adjustment).

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    secs: i64,
    msec: u32,
}

impl WallClock {
    #[must_use]
    pub fn now() -> Self {
        let (secs, msec) = real_time();
        Self { secs, msec }
    }

    /// Seconds since the epoch.
    #[must_use]
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// Millisecond offset within the current second, `0..1000`.
    #[must_use]
    pub fn msec(&self) -> u32 {
        self.msec
    }

    /// Advance by the monotonic elapsed time, resyncing on drift.
    pub fn advance(&mut self, elapsed_ms: u64) {
        self.advance_against(elapsed_ms, real_time());
    }

    fn advance_against(&mut self, elapsed_ms: u64, real: (i64, u32)) {
        let total = u64::from(self.msec) + elapsed_ms;
        self.secs += (total / 1000) as i64;
        self.msec = (total % 1000) as u32;

        let (real_secs, real_msec) = real;
        if (self.secs - real_secs).abs() > 1 {
            self.secs = real_secs;
            self.msec = real_msec;
        }
    }
}

fn real_time() -> (i64, u32) {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(since) => (since.as_secs() as i64, since.subsec_millis()),
        Err(_) => (0, 0),
    }
}
