// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - `record`: run a recording session until Ctrl+C or the capture limit
//! - `list`: list depth cameras the V4L2 scan finds
//! - `inspect`: summarize a recorded point cloud file

use crate::RecordArgs;
use depth_recorder::backends::{self, FrameSource};
use depth_recorder::config::{PollMode, RecorderConfig};
use depth_recorder::errors::{AppError, AppResult};
use depth_recorder::pipelines::point_cloud::{self, PointCloud};
use depth_recorder::recording::{RecordingLoop, StopSignal, ThreadSleeper};
use depth_recorder::storage::space::WalkDirSizer;
use std::path::Path;
use tracing::info;

/// Record until Ctrl+C
pub fn record(args: RecordArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;

    let source = backends::open_source(&config.source)?;
    println!("Using source: {}", source.name());
    println!("Output: {}", config.recordings_root().display());
    println!(
        "Target: {} fps, budget {:.3} GB",
        config.target_fps, config.budget.ceiling_gb
    );

    let stop = StopSignal::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        handler_stop.stop();
    })?;

    let mut recorder = RecordingLoop::new(config, source, WalkDirSizer, ThreadSleeper)?;
    println!(
        "Starting at sequence {} (session {})",
        recorder.color_sequence(),
        recorder.session_id()
    );
    println!();
    println!("Recording... (press Ctrl+C to stop)");

    let stats = recorder.run(&stop)?;

    println!();
    println!("Captures: {}", stats.captures);
    println!("Color images: {}", stats.color_frames);
    println!("Point clouds: {}", stats.point_clouds);
    if stats.write_failures > 0 {
        println!("Write failures: {}", stats.write_failures);
    }
    if stats.pauses > 0 {
        println!("Paused for space: {} time(s)", stats.pauses);
    }
    Ok(())
}

/// Defaults, then the config file, then flags
fn build_config(args: &RecordArgs) -> AppResult<RecorderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            RecorderConfig::load(path)?
        }
        None => RecorderConfig::default(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut RecorderConfig, args: &RecordArgs) {
    if let Some(kind) = args.source {
        config.source.kind = kind;
    }
    if let Some(device) = &args.color_device {
        config.source.color_device = Some(device.clone());
    }
    if let Some(device) = &args.depth_device {
        config.source.depth_device = Some(device.clone());
    }
    if let Some(dir) = &args.output {
        config.base_dir = dir.clone();
    }
    if let Some(fps) = args.fps {
        config.target_fps = fps;
    }
    if let Some(ceiling) = args.budget_gb {
        config.budget.ceiling_gb = ceiling;
    }
    if let Some(format) = args.format {
        config.image_format = format;
    }
    if let Some(timeout_ms) = args.wait_ms {
        config.poll_mode = PollMode::Wait { timeout_ms };
    }
    if let Some(policy) = args.sequence_policy {
        config.sequence_policy = policy;
    }
    if args.max_captures.is_some() {
        config.max_captures = args.max_captures;
    }
}

/// List depth cameras
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let devices = backends::list_devices();

    if devices.is_empty() {
        println!("No depth cameras found.");
        if !cfg!(feature = "v4l2") {
            println!("(built without the v4l2 feature; only --source synthetic is available)");
        }
        return Ok(());
    }

    println!("Available depth cameras:");
    println!();
    for (index, device) in devices.iter().enumerate() {
        println!("  [{}] {}", index, device.name);
        println!("      Color: {}", device.color_path);
        println!("      Depth: {}", device.depth_path);
        if !device.bus.is_empty() {
            println!("      Bus:   {}", device.bus);
        }
        println!();
    }
    Ok(())
}

/// Summarize a point cloud file
pub fn inspect(path: &Path, width: u32) -> Result<(), Box<dyn std::error::Error>> {
    let points = point_cloud::read_point_cloud(path)?;
    let cloud = PointCloud::from_raw(width, points).map_err(AppError::Other)?;

    println!("File: {}", path.display());
    println!("Points: {}", cloud.point_count());
    println!("Raster: {}x{}", cloud.width, cloud.height);
    println!("Zero depth: {}", cloud.zero_depth_count());
    match cloud.depth_range() {
        Some((near, far)) => println!("Depth range: {} - {}", near, far),
        None => println!("Depth range: no valid samples"),
    }
    Ok(())
}
