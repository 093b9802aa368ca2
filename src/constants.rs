// SPDX-License-Identifier: GPL-3.0-only

//! Recorder-wide constants
//!
//! These are the compile-time defaults. The values actually used by a
//! session live in [`crate::config::RecorderConfig`], which starts from here.

/// Target color frame rate
pub const TARGET_FPS: u32 = 15;

/// Bytes per GB for budget math (binary gigabytes)
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Storage budget constants
pub mod budget {
    /// Ceiling on the cumulative size of the recordings tree, in GB
    pub const CEILING_GB: f64 = 5.0;

    /// Buffer below the ceiling that absorbs in-flight write growth, in GB
    pub const MARGIN_GB: f64 = 0.3;

    /// Headroom below the ceiling required before recording resumes, in GB
    pub const RESUME_HEADROOM_GB: f64 = 2.0;
}

/// Timing constants
pub mod timing {
    /// Minimum spacing between space measurements while recording
    pub const SPACE_CHECK_INTERVAL_MS: u64 = 1_000;

    /// Wait after entering the paused state before the first re-check
    pub const PAUSE_SETTLE_MS: u64 = 2_000;

    /// Interval between re-checks while paused
    pub const RESUME_POLL_MS: u64 = 10_000;

    /// Capture counter modulo for periodic progress logging
    pub const CAPTURE_LOG_INTERVAL: u64 = 150;
}

/// Output layout and file naming
pub mod layout {
    /// Root directory created under the base path
    pub const RECORDINGS_DIR: &str = "recordings";

    /// Color image subdirectory
    pub const COLOR_DIR: &str = "rgb_images";

    /// Point cloud subdirectory
    pub const POINT_CLOUD_DIR: &str = "point_cloud";

    /// Color image file prefix (followed by the sequence number)
    pub const COLOR_PREFIX: &str = "image_";

    /// Point cloud file prefix (followed by the sequence number)
    pub const POINT_CLOUD_PREFIX: &str = "pointcloud_";

    /// Point cloud file extension (raw little-endian f32, no header)
    pub const POINT_CLOUD_EXTENSION: &str = "npy";
}

/// Application information utilities
pub mod app_info {
    /// Version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }
}
