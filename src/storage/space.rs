// SPDX-License-Identifier: GPL-3.0-only

//! Disk budget backpressure
//!
//! The recordings tree is measured with a directory walk and compared
//! against two watermarks derived from [`SpaceBudget`]:
//!
//! ```text
//!   used ──────────────────────────────────────────────▶
//!   0          resume_below (3.0)   pause_above (4.7)  ceiling (5.0)
//!   │ Record ◀────────┤                   ├────────▶ Pause │
//!                      └──── keeps state ──┘
//! ```
//!
//! A failed measurement is "unknown" and keeps the current decision; it is
//! never read as zero bytes used.

use crate::config::{SpaceBudget, bytes_to_gb};
use crate::errors::StorageError;
use std::io::ErrorKind;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Measures the cumulative size of a directory tree
pub trait DirectorySizer {
    fn measure(&self, path: &Path) -> Result<u64, StorageError>;
}

impl<T: DirectorySizer + ?Sized> DirectorySizer for Box<T> {
    fn measure(&self, path: &Path) -> Result<u64, StorageError> {
        (**self).measure(path)
    }
}

/// Sums regular file sizes with `walkdir`
///
/// A missing root is 0 bytes. Entries that vanish during the walk (files
/// being deleted to free space) are skipped; any other error fails the
/// measurement.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkDirSizer;

impl DirectorySizer for WalkDirSizer {
    fn measure(&self, path: &Path) -> Result<u64, StorageError> {
        if !path.try_exists().map_err(|e| StorageError::measure(path, e))? {
            return Ok(0);
        }

        let mut total: u64 = 0;
        for entry in WalkDir::new(path).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if vanished(e.io_error()) => continue,
                Err(e) => return Err(StorageError::measure(path, e)),
            };
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) => total += metadata.len(),
                Err(e) if vanished(e.io_error()) => continue,
                Err(e) => return Err(StorageError::measure(entry.path(), e)),
            }
        }
        Ok(total)
    }
}

fn vanished(err: Option<&std::io::Error>) -> bool {
    err.is_some_and(|e| e.kind() == ErrorKind::NotFound)
}

/// What the recording loop should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceDecision {
    Record,
    Pause,
}

/// Hysteresis state over directory size measurements
#[derive(Debug)]
pub struct SpaceMonitor {
    budget: SpaceBudget,
    check_interval: Duration,
    decision: SpaceDecision,
    last_check: Option<Instant>,
    last_used: Option<u64>,
}

impl SpaceMonitor {
    pub fn new(budget: SpaceBudget, check_interval: Duration) -> Self {
        Self {
            budget,
            check_interval,
            decision: SpaceDecision::Record,
            last_check: None,
            last_used: None,
        }
    }

    /// Bytes used at the last successful measurement
    pub fn last_used(&self) -> Option<u64> {
        self.last_used
    }

    /// Space left under the ceiling at the last successful measurement, in GB
    pub fn available_gb(&self) -> Option<f64> {
        self.last_used.map(|used| self.budget.available_gb(used))
    }

    /// Apply one measurement (`None` = unknown) and return the new decision
    pub fn evaluate(&mut self, used: Option<u64>) -> SpaceDecision {
        let Some(used) = used else {
            return self.decision;
        };
        self.last_used = Some(used);

        let next = match self.decision {
            SpaceDecision::Record if used > self.budget.pause_above_bytes() => {
                SpaceDecision::Pause
            }
            SpaceDecision::Pause if used < self.budget.resume_below_bytes() => {
                SpaceDecision::Record
            }
            current => current,
        };

        if next != self.decision {
            info!(
                used_gb = bytes_to_gb(used),
                ceiling_gb = self.budget.ceiling_gb,
                decision = ?next,
                "Space decision changed"
            );
            self.decision = next;
        }
        next
    }

    /// Measure `root` and evaluate
    ///
    /// While recording, measurements closer together than the check interval
    /// reuse the last decision. While paused every call measures.
    pub fn check(&mut self, sizer: &dyn DirectorySizer, root: &Path) -> SpaceDecision {
        if self.decision == SpaceDecision::Record
            && self
                .last_check
                .is_some_and(|at| at.elapsed() < self.check_interval)
        {
            return self.decision;
        }
        self.last_check = Some(Instant::now());

        let used = match sizer.measure(root) {
            Ok(bytes) => {
                debug!(root = %root.display(), bytes, "Measured recordings tree");
                Some(bytes)
            }
            Err(e) => {
                warn!(
                    root = %root.display(),
                    error = %e,
                    "Space measurement failed, keeping last decision"
                );
                None
            }
        };
        self.evaluate(used)
    }
}
