// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic depth camera
//!
//! Produces a moving BGRA gradient and a depth ramp on an emulated device
//! clock. Used to run the recorder without hardware and to drive tests.
//!
//! In real-time mode a frame becomes ready once wall-clock time reaches its
//! device timestamp, like a camera delivering at its native rate. Otherwise
//! every poll returns the next frame immediately.

use super::{BackendResult, Capture, ColorFrame, DepthFrame, FrameSource, PixelLayout};
use crate::config::SourceConfig;
use std::time::{Duration, Instant};
use tracing::debug;

/// Depth value used for the invalid border band
const INVALID_DEPTH: u16 = 0;

/// Nearest and farthest depth emitted, in millimeters
const DEPTH_RANGE_MM: (u16, u16) = (500, 4000);

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub color_width: u32,
    pub color_height: u32,
    pub depth_width: u32,
    pub depth_height: u32,
    /// Native device frame rate
    pub fps: u32,
    /// Gate frames on wall-clock time
    pub realtime: bool,
    /// Emit a depth frame on every Nth capture only (1 = every capture)
    pub depth_every: u32,
}

impl SyntheticConfig {
    pub fn from_source_config(config: &SourceConfig) -> Self {
        Self {
            color_width: config.color_width,
            color_height: config.color_height,
            depth_width: config.depth_width,
            depth_height: config.depth_height,
            fps: config.synthetic_fps.max(1),
            realtime: true,
            depth_every: 1,
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self::from_source_config(&SourceConfig::default())
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_period: Duration,
    frame_index: u64,
    started_at: Instant,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let frame_period = Duration::from_secs(1) / config.fps.max(1);
        debug!(
            color_width = config.color_width,
            color_height = config.color_height,
            depth_width = config.depth_width,
            depth_height = config.depth_height,
            fps = config.fps,
            "Synthetic source created"
        );
        Self {
            config,
            frame_period,
            frame_index: 0,
            started_at: Instant::now(),
        }
    }

    /// Device timestamp of the next frame, saturating at `u64::MAX` ns
    fn next_timestamp(&self) -> Duration {
        let nanos = self
            .frame_period
            .as_nanos()
            .saturating_mul(u128::from(self.frame_index));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn render_color(&self, timestamp: Duration) -> BackendResult<ColorFrame> {
        let (w, h) = (self.config.color_width, self.config.color_height);
        let shift = (self.frame_index % 256) as u32;
        let mut data = Vec::with_capacity(w as usize * h as usize * 4);
        for y in 0..h {
            for x in 0..w {
                // B G R A
                data.push(((y * 255) / h.max(1)) as u8);
                data.push(((x + shift) % 256) as u8);
                data.push(((x * 255) / w.max(1)) as u8);
                data.push(255);
            }
        }
        ColorFrame::new(w, h, PixelLayout::Bgra, data, timestamp)
    }

    fn render_depth(&self, timestamp: Duration) -> BackendResult<DepthFrame> {
        let (w, h) = (self.config.depth_width, self.config.depth_height);
        let (near, far) = DEPTH_RANGE_MM;
        let span = (far - near) as u64;
        let mut data = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                // Outer column band reads as invalid, like the sensor's blind edge
                if x < 8u32.min(w / 4) {
                    data.push(INVALID_DEPTH);
                    continue;
                }
                let ramp = (x as u64 + y as u64 + self.frame_index) % span;
                data.push(near + ramp as u16);
            }
        }
        DepthFrame::new(w, h, data, timestamp)
    }

    fn wait_until(&self, timestamp: Duration, timeout: Option<Duration>) -> bool {
        let elapsed = self.started_at.elapsed();
        if elapsed >= timestamp {
            return true;
        }
        match timeout {
            Some(limit) if timestamp - elapsed <= limit => {
                std::thread::sleep(timestamp - elapsed);
                true
            }
            Some(limit) => {
                std::thread::sleep(limit);
                false
            }
            None => false,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn poll_capture(&mut self, timeout: Option<Duration>) -> BackendResult<Option<Capture>> {
        let timestamp = self.next_timestamp();
        if self.config.realtime && !self.wait_until(timestamp, timeout) {
            return Ok(None);
        }

        let color = self.render_color(timestamp)?;
        let depth = if self.frame_index % self.config.depth_every.max(1) as u64 == 0 {
            Some(self.render_depth(timestamp)?)
        } else {
            None
        };
        self.frame_index += 1;

        Ok(Some(Capture::new(Some(color), depth)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(depth_every: u32) -> SyntheticSource {
        SyntheticSource::new(SyntheticConfig {
            color_width: 16,
            color_height: 8,
            depth_width: 12,
            depth_height: 6,
            fps: 30,
            realtime: false,
            depth_every,
        })
    }

    #[test]
    fn test_frames_have_configured_shapes() {
        let mut source = offline(1);
        let capture = source.poll_capture(None).unwrap().unwrap();
        let color = capture.color.unwrap();
        let depth = capture.depth.unwrap();
        assert_eq!((color.width, color.height), (16, 8));
        assert_eq!(color.data.len(), 16 * 8 * 4);
        assert_eq!(depth.data.len(), 12 * 6);
    }

    #[test]
    fn test_device_clock_advances_by_frame_period() {
        let mut source = offline(1);
        let first = source.poll_capture(None).unwrap().unwrap();
        let second = source.poll_capture(None).unwrap().unwrap();
        let period = second.color.unwrap().device_timestamp - first.color.unwrap().device_timestamp;
        assert_eq!(period, Duration::from_secs(1) / 30);
    }

    #[test]
    fn test_depth_every_skips_depth() {
        let mut source = offline(2);
        assert!(source.poll_capture(None).unwrap().unwrap().depth.is_some());
        assert!(source.poll_capture(None).unwrap().unwrap().depth.is_none());
        assert!(source.poll_capture(None).unwrap().unwrap().depth.is_some());
    }

    #[test]
    fn test_invalid_band_is_zero() {
        let mut source = offline(1);
        let depth = source.poll_capture(None).unwrap().unwrap().depth.unwrap();
        assert_eq!(depth.data[0], INVALID_DEPTH);
        assert!(depth.data[11] >= DEPTH_RANGE_MM.0);
    }

    #[test]
    fn test_device_clock_does_not_wrap() {
        let mut source = offline(1);
        source.frame_index = 1 << 33;
        let expected = Duration::from_nanos(33_333_333 * (1 << 33));
        assert_eq!(source.next_timestamp(), expected);

        source.frame_index = u64::MAX;
        assert_eq!(source.next_timestamp(), Duration::from_nanos(u64::MAX));
    }

    #[test]
    fn test_bounded_wait_expires_before_frame() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            fps: 1,
            ..SyntheticConfig::default()
        });
        assert!(source.poll_capture(None).unwrap().is_some());

        let before = Instant::now();
        let limit = Duration::from_millis(5);
        assert!(source.poll_capture(Some(limit)).unwrap().is_none());
        assert!(before.elapsed() >= limit);
        assert_eq!(source.frame_index, 1);
    }

    #[test]
    fn test_bounded_wait_delivers_frame_due_within_limit() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            fps: 200,
            ..SyntheticConfig::default()
        });
        assert!(source.poll_capture(None).unwrap().is_some());

        // Frame 1 is due 5 ms after start
        let capture = source
            .poll_capture(Some(Duration::from_secs(1)))
            .unwrap()
            .unwrap();
        assert_eq!(
            capture.color.unwrap().device_timestamp,
            Duration::from_millis(5)
        );
        assert!(source.started_at.elapsed() >= Duration::from_millis(5));
    }

    #[test]
    fn test_realtime_not_ready_returns_none() {
        let mut source = SyntheticSource::new(SyntheticConfig {
            fps: 1,
            ..SyntheticConfig::default()
        });
        // Frame 0 is due immediately, frame 1 a second later
        assert!(source.poll_capture(None).unwrap().is_some());
        assert!(source.poll_capture(None).unwrap().is_none());
    }
}
