// SPDX-License-Identifier: GPL-3.0-only
//! Reader thread lifecycle for device sources
//!
//! A device that only offers blocking reads (V4L2 `DQBUF`) gets one reader
//! thread per stream. The recording loop never sees these threads; it polls
//! the channel they feed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// What a reader iteration wants next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerAction {
    Continue,
    Stop,
}

/// Handle to a named reader thread
///
/// Dropping the handle stops the thread and joins it.
pub struct CaptureWorker {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl CaptureWorker {
    /// Spawn a reader with per-thread state
    ///
    /// `init_fn` runs on the new thread (device handles are opened there so
    /// they never cross threads). If it fails the thread exits and
    /// `loop_fn` never runs. `loop_fn` is called until it returns
    /// [`WorkerAction::Stop`] or [`CaptureWorker::stop`] is called.
    pub fn spawn<S, I, F>(name: &str, init_fn: I, mut loop_fn: F) -> Self
    where
        S: 'static,
        I: FnOnce() -> Result<S, String> + Send + 'static,
        F: FnMut(&mut S) -> WorkerAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, "Starting capture worker");

        let thread_handle = thread::spawn(move || {
            let mut state = match init_fn() {
                Ok(state) => state,
                Err(e) => {
                    warn!(name = %thread_name, error = %e, "Capture worker initialization failed");
                    return;
                }
            };
            debug!(name = %thread_name, "Capture worker initialized");

            while !thread_stop.load(Ordering::SeqCst) {
                if loop_fn(&mut state) == WorkerAction::Stop {
                    debug!(name = %thread_name, "Capture worker requested stop");
                    break;
                }
            }

            info!(name = %thread_name, "Capture worker exiting");
        });

        Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        }
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the thread and wait for it to finish
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take()
            && handle.join().is_err()
        {
            warn!(name = %self.name, "Capture worker panicked");
        }
    }
}

impl Drop for CaptureWorker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}
