// SPDX-License-Identifier: GPL-3.0-only

//! Recorder configuration
//!
//! A [`RecorderConfig`] starts from [`crate::constants`], may be loaded from
//! a JSON file, is adjusted by CLI flags, validated once, and then moved
//! into the recording loop. Nothing reads configuration from globals.

use crate::constants::{self, budget, layout, timing};
use crate::errors::{AppError, AppResult};
use crate::pipelines::color::EncodingFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which frame source to open
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Paired V4L2 color + depth nodes (Kinect kernel driver)
    #[default]
    V4l2,
    /// Generated frames, no hardware needed
    Synthetic,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::V4l2 => write!(f, "v4l2"),
            SourceKind::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// How sequence numbers are shared between the color and point cloud streams
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum SequencePolicy {
    /// One counter seeded from the color directory, advanced only when a
    /// color frame was captured; depth-only captures reuse the pending index
    #[default]
    ColorDriven,
    /// One counter seeded from the color directory, advanced on every capture
    PerCapture,
    /// Separate counters, each seeded from its own directory
    Independent,
}

/// Capture polling strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PollMode {
    /// Non-blocking poll, loop again immediately when nothing is ready
    #[default]
    Busy,
    /// Block inside the source up to `timeout_ms` waiting for a capture
    Wait { timeout_ms: u64 },
}

impl PollMode {
    /// Timeout to pass to [`crate::backends::FrameSource::poll_capture`]
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            PollMode::Busy => None,
            PollMode::Wait { timeout_ms } => Some(Duration::from_millis(*timeout_ms)),
        }
    }
}

/// Storage ceiling with its hysteresis watermarks
///
/// Recording pauses above `ceiling - margin` and resumes below
/// `ceiling - resume_headroom`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceBudget {
    pub ceiling_gb: f64,
    pub margin_gb: f64,
    pub resume_headroom_gb: f64,
}

impl SpaceBudget {
    /// Budget with the default margin and headroom
    pub fn with_ceiling(ceiling_gb: f64) -> Self {
        Self {
            ceiling_gb,
            ..Self::default()
        }
    }

    pub fn pause_above_gb(&self) -> f64 {
        self.ceiling_gb - self.margin_gb
    }

    pub fn resume_below_gb(&self) -> f64 {
        self.ceiling_gb - self.resume_headroom_gb
    }

    pub fn pause_above_bytes(&self) -> u64 {
        gb_to_bytes(self.pause_above_gb())
    }

    pub fn resume_below_bytes(&self) -> u64 {
        gb_to_bytes(self.resume_below_gb())
    }

    /// Space left under the ceiling, in GB (negative when over)
    pub fn available_gb(&self, used_bytes: u64) -> f64 {
        self.ceiling_gb - bytes_to_gb(used_bytes)
    }

    fn validate(&self) -> AppResult<()> {
        if !(self.ceiling_gb > 0.0) {
            return Err(AppError::Config(format!(
                "budget ceiling must be positive, got {} GB",
                self.ceiling_gb
            )));
        }
        if self.margin_gb < 0.0 || self.resume_headroom_gb < 0.0 {
            return Err(AppError::Config(
                "budget margin and resume headroom must not be negative".to_string(),
            ));
        }
        if self.resume_below_gb() <= 0.0 {
            return Err(AppError::Config(format!(
                "resume headroom ({} GB) leaves no room under the {} GB ceiling",
                self.resume_headroom_gb, self.ceiling_gb
            )));
        }
        if self.resume_below_gb() >= self.pause_above_gb() {
            return Err(AppError::Config(format!(
                "resume watermark ({:.3} GB) must be below pause watermark ({:.3} GB)",
                self.resume_below_gb(),
                self.pause_above_gb()
            )));
        }
        Ok(())
    }
}

impl Default for SpaceBudget {
    fn default() -> Self {
        Self {
            ceiling_gb: budget::CEILING_GB,
            margin_gb: budget::MARGIN_GB,
            resume_headroom_gb: budget::RESUME_HEADROOM_GB,
        }
    }
}

/// Convert GB to bytes, clamping negatives to zero
pub fn gb_to_bytes(gb: f64) -> u64 {
    (gb.max(0.0) * constants::BYTES_PER_GB) as u64
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / constants::BYTES_PER_GB
}

/// Frame source selection and geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Explicit color node, skips discovery when set with `depth_device`
    pub color_device: Option<String>,
    /// Explicit depth node
    pub depth_device: Option<String>,
    pub color_width: u32,
    pub color_height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
    /// Device frame rate of the synthetic source
    pub synthetic_fps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            color_device: None,
            depth_device: None,
            color_width: 640,
            color_height: 480,
            depth_width: 640,
            depth_height: 480,
            synthetic_fps: 30,
        }
    }
}

/// Everything one recording session needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Directory the `recordings` tree is created under
    pub base_dir: PathBuf,
    /// Color frames per second the pacer enforces
    pub target_fps: u32,
    pub budget: SpaceBudget,
    /// Minimum spacing between space measurements while recording
    pub space_check_interval_ms: u64,
    /// Wait after pausing before the first re-check
    pub pause_settle_ms: u64,
    /// Interval between re-checks while paused
    pub resume_poll_ms: u64,
    pub poll_mode: PollMode,
    pub sequence_policy: SequencePolicy,
    pub image_format: EncodingFormat,
    /// JPEG quality (1-100), ignored for PNG
    pub jpeg_quality: u8,
    /// Stop after this many captures (unbounded when None)
    pub max_captures: Option<u64>,
    pub source: SourceConfig,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            target_fps: constants::TARGET_FPS,
            budget: SpaceBudget::default(),
            space_check_interval_ms: timing::SPACE_CHECK_INTERVAL_MS,
            pause_settle_ms: timing::PAUSE_SETTLE_MS,
            resume_poll_ms: timing::RESUME_POLL_MS,
            poll_mode: PollMode::default(),
            sequence_policy: SequencePolicy::default(),
            image_format: EncodingFormat::default(),
            jpeg_quality: 92,
            max_captures: None,
            source: SourceConfig::default(),
        }
    }
}

impl RecorderConfig {
    /// Load a JSON configuration file; missing fields take their defaults
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Reject values the loop cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.target_fps == 0 {
            return Err(AppError::Config("target fps must be at least 1".to_string()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(AppError::Config(format!(
                "jpeg quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.source.kind == SourceKind::Synthetic && self.source.synthetic_fps == 0 {
            return Err(AppError::Config(
                "synthetic source fps must be at least 1".to_string(),
            ));
        }
        self.budget.validate()
    }

    /// Root of the output tree (`<base>/recordings`)
    pub fn recordings_root(&self) -> PathBuf {
        self.base_dir.join(layout::RECORDINGS_DIR)
    }

    pub fn space_check_interval(&self) -> Duration {
        Duration::from_millis(self.space_check_interval_ms)
    }

    pub fn pause_settle(&self) -> Duration {
        Duration::from_millis(self.pause_settle_ms)
    }

    pub fn resume_poll(&self) -> Duration {
        Duration::from_millis(self.resume_poll_ms)
    }
}

/// Home directory, or the working directory when there is none
fn default_base_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}
