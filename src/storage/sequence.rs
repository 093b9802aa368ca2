// SPDX-License-Identifier: GPL-3.0-only

//! Sequence numbering across sessions
//!
//! A new session continues after the highest index already on disk so
//! restarting the recorder never overwrites earlier output.

use std::path::Path;
use tracing::{debug, warn};

/// Index embedded in a file name
///
/// The index is the run of ASCII digits immediately after `prefix`.
/// Names without the prefix, without digits, or with an index that does
/// not fit in a `u64` give 0.
pub fn index_from_name(name: &str, prefix: &str) -> u64 {
    let Some(rest) = name.strip_prefix(prefix) else {
        return 0;
    };
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .map_or(rest, |end| &rest[..end]);
    digits.parse().unwrap_or(0)
}

/// Highest index among the entries of `dir` named with `prefix`
///
/// A missing directory has no entries. Unreadable entries are skipped.
pub fn highest_index(dir: &Path, prefix: &str) -> u64 {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "No output directory yet");
            return 0;
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Failed to scan output directory");
            return 0;
        }
    };

    entries
        .flatten()
        .filter_map(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| index_from_name(name, prefix))
        })
        .max()
        .unwrap_or(0)
}

/// First index for a new session in `dir`
pub fn next_index(dir: &Path, prefix: &str) -> u64 {
    let next = highest_index(dir, prefix).saturating_add(1);
    debug!(dir = %dir.display(), prefix, next, "Sequence seeded");
    next
}
