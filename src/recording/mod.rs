// SPDX-License-Identifier: GPL-3.0-only

//! Recording loop and its timing seams
//!
//! - [`pacer`]: spaces color frames on the device clock
//! - [`recorder`]: the capture / write / pace state machine
//!
//! Every wait in the loop goes through a [`Sleeper`] so tests can observe
//! the requested durations without sleeping.

pub mod pacer;
pub mod recorder;

pub use pacer::FramePacer;
pub use recorder::{LoopState, RecordingLoop, RecordingStats, StepOutcome};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Blocking wait used by the loop
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

impl<T: Sleeper + ?Sized> Sleeper for Box<T> {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Shared flag that ends a recording session
///
/// Cloned into the Ctrl+C handler; checked at the top of every iteration and
/// between pause polls.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_signal_is_shared() {
        let signal = StopSignal::new();
        let handler_copy = signal.clone();
        assert!(!signal.is_stopped());
        handler_copy.stop();
        assert!(signal.is_stopped());
    }
}
