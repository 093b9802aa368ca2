// SPDX-License-Identifier: GPL-3.0-only

//! Frame pacing on the device clock
//!
//! Pacing only throttles: when the device already took longer than the
//! interval between two frames, nothing sleeps. Wall-clock time never
//! enters the interval math, so time spent encoding and writing does not
//! shift the spacing.

use super::Sleeper;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    previous: Option<Duration>,
}

impl FramePacer {
    /// `None` when `fps` is zero
    pub fn new(fps: u32) -> Option<Self> {
        Some(Self {
            interval: Duration::from_secs(1).checked_div(fps)?,
            previous: None,
        })
    }

    /// Target spacing between color frames
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Device timestamp of the last paced frame
    pub fn previous(&self) -> Option<Duration> {
        self.previous
    }

    /// Extra wait needed after `current` so it sits one interval past
    /// `previous`
    ///
    /// A device clock that went backwards needs no wait.
    pub fn required_wait(&self, previous: Duration, current: Duration) -> Duration {
        current
            .checked_sub(previous)
            .map_or(Duration::ZERO, |elapsed| self.interval.saturating_sub(elapsed))
    }

    /// Sleep as needed after the frame stamped `current`
    ///
    /// The first frame of a session never sleeps. Returns the time slept.
    pub fn pace(&mut self, current: Duration, sleeper: &mut dyn Sleeper) -> Duration {
        let wait = self
            .previous
            .map_or(Duration::ZERO, |previous| self.required_wait(previous, current));
        self.previous = Some(current);

        if !wait.is_zero() {
            trace!(wait_us = wait.as_micros() as u64, "Pacing");
            sleeper.sleep(wait);
        }
        wait
    }

    /// Forget the previous frame so the next one is treated as first
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
