// SPDX-License-Identifier: GPL-3.0-only

//! End-to-end recording loop tests with a scripted source, a fake clock and
//! the real directory walker

use depth_recorder::backends::synthetic::{SyntheticConfig, SyntheticSource};
use depth_recorder::backends::{
    BackendResult, Capture, ColorFrame, DepthFrame, FrameSource, PixelLayout,
};
use depth_recorder::config::{PollMode, RecorderConfig};
use depth_recorder::pipelines::color::EncodingFormat;
use depth_recorder::pipelines::point_cloud::{self, read_point_cloud};
use depth_recorder::recording::{RecordingLoop, Sleeper, StepOutcome, StopSignal};
use depth_recorder::storage::sequence::index_from_name;
use depth_recorder::storage::space::WalkDirSizer;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEPTH_W: u32 = 4;
const DEPTH_H: u32 = 3;

struct ScriptedSource(VecDeque<Capture>);

impl FrameSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn poll_capture(&mut self, _timeout: Option<Duration>) -> BackendResult<Option<Capture>> {
        Ok(self.0.pop_front())
    }
}

#[derive(Default)]
struct RecordingSleeper(Vec<Duration>);

impl Sleeper for RecordingSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.0.push(duration);
    }
}

fn depth_frame(seed: u16, micros: u64) -> DepthFrame {
    let data = (0..DEPTH_W * DEPTH_H)
        .map(|i| if i == 0 { 0 } else { seed + i as u16 })
        .collect();
    DepthFrame::new(DEPTH_W, DEPTH_H, data, Duration::from_micros(micros)).unwrap()
}

fn full_capture(micros: u64) -> Capture {
    let ts = Duration::from_micros(micros);
    Capture::new(
        Some(ColorFrame::new(4, 4, PixelLayout::Bgra, vec![200; 64], ts).unwrap()),
        Some(depth_frame(micros as u16, micros)),
    )
}

fn temp_base() -> PathBuf {
    std::env::temp_dir().join(format!("recording-e2e-{}", uuid::Uuid::new_v4()))
}

fn config(base: &Path) -> RecorderConfig {
    RecorderConfig {
        base_dir: base.to_path_buf(),
        image_format: EncodingFormat::Png,
        poll_mode: PollMode::Busy,
        ..Default::default()
    }
}

fn sorted_indices(dir: &Path, prefix: &str) -> Vec<u64> {
    let mut indices: Vec<u64> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|e| index_from_name(e.file_name().to_str().unwrap(), prefix))
        .collect();
    indices.sort();
    indices
}

#[test]
fn test_three_captures_pace_and_number_in_lockstep() {
    let base = temp_base();
    let stop = StopSignal::new();
    let source = ScriptedSource(
        vec![full_capture(0), full_capture(50_000), full_capture(140_000)].into(),
    );
    let mut recorder = RecordingLoop::new(
        RecorderConfig {
            max_captures: Some(3),
            ..config(&base)
        },
        source,
        WalkDirSizer,
        RecordingSleeper::default(),
    )
    .unwrap();

    let stats = recorder.run(&stop).unwrap();

    // First frame never sleeps, the third arrived 90 ms after the second
    let interval = Duration::from_secs(1) / 15;
    assert_eq!(
        recorder.sleeper().0,
        vec![interval - Duration::from_micros(50_000)]
    );
    assert_eq!(stats.captures, 3);
    assert_eq!(stats.color_frames, 3);
    assert_eq!(stats.point_clouds, 3);
    assert_eq!(stats.write_failures, 0);

    let output = recorder.output();
    assert_eq!(sorted_indices(output.color_dir(), "image_"), vec![1, 2, 3]);
    assert_eq!(
        sorted_indices(output.point_cloud_dir(), "pointcloud_"),
        vec![1, 2, 3]
    );

    std::fs::remove_dir_all(&base).unwrap();
}

#[test]
fn test_written_point_cloud_matches_projection() {
    let base = temp_base();
    let stop = StopSignal::new();
    let depth = depth_frame(700, 0);
    let expected = point_cloud::project(&depth);

    let mut recorder = RecordingLoop::new(
        config(&base),
        ScriptedSource(vec![Capture::new(None, Some(depth))].into()),
        WalkDirSizer,
        RecordingSleeper::default(),
    )
    .unwrap();

    let outcome = recorder.step(&stop).unwrap();
    assert_eq!(
        outcome,
        StepOutcome::Captured {
            color: None,
            depth: Some(1),
            failures: 0
        }
    );

    let file = std::fs::read_dir(recorder.output().point_cloud_dir())
        .unwrap()
        .flatten()
        .next()
        .unwrap()
        .path();
    let points = read_point_cloud(&file).unwrap();
    assert_eq!(points.len(), 3 * (DEPTH_W * DEPTH_H) as usize);
    assert!(
        points
            .iter()
            .zip(&expected.points)
            .all(|(a, b)| a.to_bits() == b.to_bits())
    );

    std::fs::remove_dir_all(&base).unwrap();
}

#[test]
fn test_new_session_continues_numbering() {
    let base = temp_base();
    let stop = StopSignal::new();

    for _ in 0..2 {
        let mut recorder = RecordingLoop::new(
            RecorderConfig {
                max_captures: Some(2),
                ..config(&base)
            },
            ScriptedSource(vec![full_capture(0), full_capture(100_000)].into()),
            WalkDirSizer,
            RecordingSleeper::default(),
        )
        .unwrap();
        recorder.run(&stop).unwrap();
    }

    let color_dir = base.join("recordings").join("rgb_images");
    assert_eq!(sorted_indices(&color_dir, "image_"), vec![1, 2, 3, 4]);
    std::fs::remove_dir_all(&base).unwrap();
}

#[test]
fn test_synthetic_source_records_until_limit() {
    let base = temp_base();
    let stop = StopSignal::new();
    let source = SyntheticSource::new(SyntheticConfig {
        color_width: 32,
        color_height: 24,
        depth_width: 16,
        depth_height: 12,
        fps: 30,
        realtime: false,
        depth_every: 1,
    });

    let mut recorder = RecordingLoop::new(
        RecorderConfig {
            max_captures: Some(6),
            image_format: EncodingFormat::Jpeg,
            ..config(&base)
        },
        source,
        WalkDirSizer,
        RecordingSleeper::default(),
    )
    .unwrap();

    let stats = recorder.run(&stop).unwrap();
    assert_eq!(stats.captures, 6);
    assert_eq!(stats.point_clouds, 6);
    // 30 fps device paced to 15 fps: every frame after the first waits half an interval
    assert_eq!(recorder.sleeper().0.len(), 5);

    std::fs::remove_dir_all(&base).unwrap();
}
