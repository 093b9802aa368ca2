// SPDX-License-Identifier: GPL-3.0-only

//! The recording loop
//!
//! ```text
//!             ┌──────────────────────────────────────────────┐
//!             ▼                                              │
//!      CheckingSpace ──over budget──▶ Paused ──resumed──┐    │
//!             │                         │               │    │
//!             │◀────────────────────────┼───────────────┘    │
//!             ▼                         └──stop──▶ (return)  │
//!         Capturing ──nothing ready──────────────────────────┤
//!             ▼                                              │
//!          Writing ──▶ Pacing (color only) ──▶ Writing ──────┘
//! ```
//!
//! One capture is processed per [`RecordingLoop::step`]. The loop owns the
//! RGB scratch buffer and the point cloud and lends them to one iteration
//! at a time; the capture itself is moved into the iteration and dropped
//! at its end on every path.

use super::{FramePacer, Sleeper, StopSignal};
use crate::backends::{Capture, FrameSource};
use crate::config::{RecorderConfig, SequencePolicy};
use crate::constants::{layout, timing};
use crate::errors::{AppError, AppResult, StorageError};
use crate::pipelines::color::ColorImageWriter;
use crate::pipelines::point_cloud::{self, PointCloud};
use crate::storage::space::{DirectorySizer, SpaceDecision, SpaceMonitor};
use crate::storage::{OutputLayout, sequence, wall_clock_millis};
use std::time::Duration;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

/// Where the loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    CheckingSpace,
    Paused,
    Capturing,
    Writing,
    Pacing,
}

/// Result of one [`RecordingLoop::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Over budget and the stop signal fired before space was freed
    Paused,
    /// The source had nothing ready
    Idle,
    /// A capture was processed. Each field holds the sequence number the
    /// stream was written under, `None` when the capture had no such frame.
    Captured {
        color: Option<u64>,
        depth: Option<u64>,
        failures: u32,
    },
}

/// Session counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingStats {
    pub captures: u64,
    pub color_frames: u64,
    pub point_clouds: u64,
    pub write_failures: u64,
    pub idle_polls: u64,
    pub pauses: u64,
    /// Total time slept by the pacer
    pub paced: Duration,
}

pub struct RecordingLoop<S, Z, L>
where
    S: FrameSource,
    Z: DirectorySizer,
    L: Sleeper,
{
    config: RecorderConfig,
    source: S,
    sizer: Z,
    sleeper: L,
    output: OutputLayout,
    monitor: SpaceMonitor,
    pacer: FramePacer,
    color_writer: ColorImageWriter,
    cloud: PointCloud,
    color_sequence: u64,
    depth_sequence: u64,
    state: LoopState,
    stats: RecordingStats,
    session_id: Uuid,
}

impl<S, Z, L> RecordingLoop<S, Z, L>
where
    S: FrameSource,
    Z: DirectorySizer,
    L: Sleeper,
{
    /// Validate the configuration, create the output tree, and seed the
    /// sequence counters from what is already on disk
    pub fn new(config: RecorderConfig, source: S, sizer: Z, sleeper: L) -> AppResult<Self> {
        config.validate()?;

        let output = OutputLayout::create(&config.recordings_root())?;
        let color_sequence = sequence::next_index(output.color_dir(), layout::COLOR_PREFIX);
        let depth_sequence = match config.sequence_policy {
            SequencePolicy::Independent => {
                sequence::next_index(output.point_cloud_dir(), layout::POINT_CLOUD_PREFIX)
            }
            SequencePolicy::ColorDriven | SequencePolicy::PerCapture => color_sequence,
        };

        let pacer = FramePacer::new(config.target_fps)
            .ok_or_else(|| AppError::Config("target fps must be at least 1".to_string()))?;

        let session_id = Uuid::new_v4();
        info!(
            session = %session_id,
            root = %output.root().display(),
            source = source.name(),
            color_sequence,
            depth_sequence,
            policy = ?config.sequence_policy,
            "Recording loop ready"
        );

        Ok(Self {
            monitor: SpaceMonitor::new(config.budget, config.space_check_interval()),
            pacer,
            color_writer: ColorImageWriter::new(config.image_format, config.jpeg_quality),
            cloud: PointCloud::default(),
            config,
            source,
            sizer,
            sleeper,
            output,
            color_sequence,
            depth_sequence,
            state: LoopState::CheckingSpace,
            stats: RecordingStats::default(),
            session_id,
        })
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &RecordingStats {
        &self.stats
    }

    pub fn output(&self) -> &OutputLayout {
        &self.output
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Sequence number the next color frame will be written under
    pub fn color_sequence(&self) -> u64 {
        self.color_sequence
    }

    /// Sequence number the next point cloud will be written under
    pub fn depth_sequence(&self) -> u64 {
        match self.config.sequence_policy {
            SequencePolicy::Independent => self.depth_sequence,
            SequencePolicy::ColorDriven | SequencePolicy::PerCapture => self.color_sequence,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn sleeper(&self) -> &L {
        &self.sleeper
    }

    /// Run until `stop` fires, the capture limit is reached, or the source
    /// fails
    pub fn run(&mut self, stop: &StopSignal) -> AppResult<RecordingStats> {
        let span = info_span!("recording", session = %self.session_id);
        let _enter = span.enter();

        info!(
            fps = self.config.target_fps,
            ceiling_gb = self.config.budget.ceiling_gb,
            max_captures = ?self.config.max_captures,
            "Recording started"
        );

        let result = self.run_until_stopped(stop);
        match &result {
            Ok(()) => self.log_stats("Recording finished"),
            Err(e) => {
                warn!(error = %e, "Recording aborted");
                self.log_stats("Recording aborted");
            }
        }
        result.map(|()| self.stats.clone())
    }

    fn run_until_stopped(&mut self, stop: &StopSignal) -> AppResult<()> {
        while !stop.is_stopped() {
            if self
                .config
                .max_captures
                .is_some_and(|max| self.stats.captures >= max)
            {
                info!(captures = self.stats.captures, "Capture limit reached");
                break;
            }
            self.step(stop)?;
        }
        Ok(())
    }

    /// One iteration: space check, poll, write, pace
    ///
    /// Blocks while over budget until space is freed or `stop` fires.
    pub fn step(&mut self, stop: &StopSignal) -> AppResult<StepOutcome> {
        self.state = LoopState::CheckingSpace;
        if self.monitor.check(&self.sizer, self.output.root()) == SpaceDecision::Pause
            && !self.wait_for_space(stop)
        {
            return Ok(StepOutcome::Paused);
        }

        self.state = LoopState::Capturing;
        let Some(capture) = self.source.poll_capture(self.config.poll_mode.timeout())? else {
            self.stats.idle_polls += 1;
            self.state = LoopState::CheckingSpace;
            return Ok(StepOutcome::Idle);
        };

        let outcome = self.process(capture);
        self.state = LoopState::CheckingSpace;
        Ok(outcome)
    }

    /// Block in the paused state; returns false if stopped while paused
    fn wait_for_space(&mut self, stop: &StopSignal) -> bool {
        self.state = LoopState::Paused;
        self.stats.pauses += 1;
        println!(
            "Recording paused: {} of {:.3} GB budget available",
            self.available_text(),
            self.config.budget.ceiling_gb
        );

        self.sleeper.sleep(self.config.pause_settle());
        loop {
            if stop.is_stopped() {
                info!("Stopped while paused");
                return false;
            }
            if self.monitor.check(&self.sizer, self.output.root()) == SpaceDecision::Record {
                println!("Recording resumed: {} available", self.available_text());
                return true;
            }
            debug!(available = %self.available_text(), "Still over budget");
            self.sleeper.sleep(self.config.resume_poll());
        }
    }

    fn available_text(&self) -> String {
        match self.monitor.available_gb() {
            Some(gb) => format!("{:.3} GB", gb),
            None => "unknown".to_string(),
        }
    }

    fn process(&mut self, capture: Capture) -> StepOutcome {
        self.state = LoopState::Writing;
        let Capture { color, depth } = capture;
        let policy = self.config.sequence_policy;
        let color_index = self.color_sequence;
        let depth_index = self.depth_sequence();
        let mut failures = 0;

        if let Some(frame) = &color {
            let path = self
                .output
                .color_path(color_index, wall_clock_millis(), self.color_writer.format());
            match self.color_writer.write(frame, &path) {
                Ok(_) => self.stats.color_frames += 1,
                Err(e) => {
                    self.record_failure(&e);
                    failures += 1;
                }
            }

            self.state = LoopState::Pacing;
            self.stats.paced += self.pacer.pace(frame.device_timestamp, &mut self.sleeper);
            self.state = LoopState::Writing;
        }

        if let Some(frame) = &depth {
            point_cloud::project_into(frame, &mut self.cloud);
            let path = self.output.point_cloud_path(depth_index, wall_clock_millis());
            match point_cloud::write_point_cloud(&path, &self.cloud) {
                Ok(_) => self.stats.point_clouds += 1,
                Err(e) => {
                    self.record_failure(&e);
                    failures += 1;
                }
            }
        }

        // Counters advance on attempts, not successes
        match policy {
            SequencePolicy::ColorDriven => {
                if color.is_some() {
                    self.color_sequence += 1;
                }
            }
            SequencePolicy::PerCapture => self.color_sequence += 1,
            SequencePolicy::Independent => {
                if color.is_some() {
                    self.color_sequence += 1;
                }
                if depth.is_some() {
                    self.depth_sequence += 1;
                }
            }
        }

        self.stats.captures += 1;
        if self.stats.captures % timing::CAPTURE_LOG_INTERVAL == 0 {
            self.log_stats("Recording progress");
        }

        StepOutcome::Captured {
            color: color.is_some().then_some(color_index),
            depth: depth.is_some().then_some(depth_index),
            failures,
        }
    }

    fn record_failure(&mut self, err: &StorageError) {
        self.stats.write_failures += 1;
        warn!(
            path = %err.path().display(),
            error = %err,
            failures = self.stats.write_failures,
            "Output write failed, frame dropped"
        );
    }

    fn log_stats(&self, message: &str) {
        info!(
            captures = self.stats.captures,
            color_frames = self.stats.color_frames,
            point_clouds = self.stats.point_clouds,
            write_failures = self.stats.write_failures,
            idle_polls = self.stats.idle_polls,
            pauses = self.stats.pauses,
            paced_ms = self.stats.paced.as_millis() as u64,
            "{}",
            message
        );
    }
}
