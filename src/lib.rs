// SPDX-License-Identifier: GPL-3.0-only

//! Depth Recorder - paced color and point cloud recording for depth cameras
//!
//! Pulls synchronized color + depth captures from a depth camera, projects
//! depth into a grid point cloud, and writes both streams to disk at a
//! bounded frame rate. Recording pauses when the output tree grows past its
//! storage budget and resumes once space is freed.
//!
//! # Architecture
//!
//! - [`backends`]: frame source abstraction (V4L2 Kinect, synthetic)
//! - [`pipelines`]: color encoding and point cloud projection
//! - [`storage`]: output layout, sequence numbering, disk budget
//! - [`recording`]: frame pacer and the recording loop
//! - [`config`]: session configuration
//!
//! # Example
//!
//! ```no_run
//! use depth_recorder::backends::synthetic::{SyntheticConfig, SyntheticSource};
//! use depth_recorder::recording::{RecordingLoop, StopSignal, ThreadSleeper};
//! use depth_recorder::storage::space::WalkDirSizer;
//! use depth_recorder::RecorderConfig;
//!
//! let config = RecorderConfig {
//!     max_captures: Some(30),
//!     ..Default::default()
//! };
//! let source = SyntheticSource::new(SyntheticConfig::default());
//! let mut recorder = RecordingLoop::new(config, source, WalkDirSizer, ThreadSleeper)?;
//! let stats = recorder.run(&StopSignal::new())?;
//! println!("{} captures", stats.captures);
//! # Ok::<(), depth_recorder::AppError>(())
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;
pub mod recording;
pub mod storage;

// Re-export commonly used types
pub use config::{RecorderConfig, SequencePolicy, SourceKind};
pub use errors::{AppError, AppResult};
pub use recording::{RecordingLoop, RecordingStats, StopSignal};
