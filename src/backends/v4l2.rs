// SPDX-License-Identifier: GPL-3.0-only

//! Kinect kernel driver source (V4L2)
//!
//! The `gspca_kinect` driver exposes one physical Kinect as two V4L2 nodes:
//! a color node (UYVY or Bayer GRBG) and a depth node (Y10B or Y16). They
//! are paired by their `bus_info`.
//!
//! Each node gets a reader thread ([`CaptureWorker`]) because `DQBUF` blocks.
//! Readers push frames into a bounded channel; [`V4l2PairSource`] drains it
//! and pairs the newest color and depth frames into [`Capture`]s. A frame
//! superseded before its partner arrives is emitted on its own.
//!
//! Both nodes stamp buffers from the kernel monotonic clock, so the color
//! timestamp is usable for pacing directly.

use super::format_converters::{grbg_to_rgba, unpack_y10b, uyvy_to_rgba, y16_to_u16};
use super::frame_loop::{CaptureWorker, WorkerAction};
use super::{
    BackendResult, Capture, ColorFrame, DepthFrame, DeviceInfo, FrameSource, PixelLayout,
};
use crate::errors::CameraError;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::time::Duration;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture as _;
use v4l::{Format, FourCC};

/// Frames buffered between the readers and the recording loop
const CHANNEL_DEPTH: usize = 8;

/// Memory-mapped buffers per stream
const STREAM_BUFFERS: u32 = 4;

/// Consecutive DQBUF failures before a stream is declared lost
const MAX_CONSECUTIVE_ERRORS: u32 = 30;

/// How long `open` waits for both readers to configure their devices
const START_TIMEOUT: Duration = Duration::from_secs(5);

const COLOR_WIDTH: u32 = 640;
const COLOR_HEIGHT: u32 = 480;

/// Message from a reader thread
enum StreamFrame {
    Color(ColorFrame),
    Depth(DepthFrame),
    Lost(&'static str),
}

/// Find Kinect color/depth node pairs driven by the kernel driver
pub fn find_kinect_pairs() -> Vec<DeviceInfo> {
    #[derive(Default)]
    struct Nodes {
        card: String,
        driver: String,
        color: Option<String>,
        depth: Option<String>,
    }

    let mut paths: Vec<_> = std::fs::read_dir("/dev")
        .into_iter()
        .flatten()
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("video"))
        })
        .collect();
    paths.sort();

    let mut by_bus: HashMap<String, Nodes> = HashMap::new();
    for path in paths {
        let Ok(dev) = Device::with_path(&path) else {
            continue;
        };
        let Ok(caps) = dev.query_caps() else {
            continue;
        };
        if caps.driver != "kinect" {
            continue;
        }

        let formats: Vec<FourCC> = dev
            .enum_formats()
            .into_iter()
            .flatten()
            .map(|f| f.fourcc)
            .collect();
        let is_depth = formats
            .iter()
            .any(|f| *f == FourCC::new(b"Y10B") || *f == FourCC::new(b"Y16 "));
        let is_color = formats
            .iter()
            .any(|f| *f == FourCC::new(b"UYVY") || *f == FourCC::new(b"GRBG"));

        let path_str = path.to_string_lossy().to_string();
        debug!(path = %path_str, bus = %caps.bus, is_depth, is_color, "Kinect node");

        let nodes = by_bus.entry(caps.bus.clone()).or_default();
        nodes.driver = caps.driver.clone();
        // Depth formats win: the depth node may also list a gray format
        if is_depth {
            nodes.depth.get_or_insert(path_str);
        } else if is_color {
            nodes.card = caps.card.clone();
            nodes.color.get_or_insert(path_str);
        }
    }

    let mut pairs: Vec<DeviceInfo> = by_bus
        .into_iter()
        .filter_map(|(bus, nodes)| match (nodes.color, nodes.depth) {
            (Some(color_path), Some(depth_path)) => Some(DeviceInfo {
                name: if nodes.card.is_empty() {
                    "Kinect".to_string()
                } else {
                    nodes.card
                },
                driver: nodes.driver,
                bus,
                color_path,
                depth_path,
            }),
            _ => None,
        })
        .collect();
    pairs.sort_by(|a, b| a.color_path.cmp(&b.color_path));

    for pair in &pairs {
        info!(device = %pair, "Found Kinect device pair");
    }
    pairs
}

/// Paired color + depth capture from one Kinect
pub struct V4l2PairSource {
    name: String,
    receiver: Receiver<StreamFrame>,
    pending_color: Option<ColorFrame>,
    pending_depth: Option<DepthFrame>,
    ready: VecDeque<Capture>,
    _color_worker: CaptureWorker,
    _depth_worker: CaptureWorker,
}

impl V4l2PairSource {
    /// Open both nodes and start streaming
    ///
    /// Returns once both readers have configured their device, or fails with
    /// [`CameraError::StartFailed`].
    pub fn open(device: &DeviceInfo, depth_width: u32, depth_height: u32) -> BackendResult<Self> {
        info!(device = %device, depth_width, depth_height, "Opening Kinect pair");

        let (sender, receiver) = mpsc::sync_channel(CHANNEL_DEPTH);
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), String>>();

        let color_worker = spawn_color_reader(&device.color_path, sender.clone(), ready_tx.clone());
        let depth_worker = spawn_depth_reader(
            &device.depth_path,
            depth_width,
            depth_height,
            sender,
            ready_tx,
        );

        for _ in 0..2 {
            match ready_rx.recv_timeout(START_TIMEOUT) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(CameraError::StartFailed(e)),
                Err(_) => {
                    return Err(CameraError::StartFailed(
                        "timed out waiting for streams to start".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            name: device.name.clone(),
            receiver,
            pending_color: None,
            pending_depth: None,
            ready: VecDeque::new(),
            _color_worker: color_worker,
            _depth_worker: depth_worker,
        })
    }

    fn accept(&mut self, frame: StreamFrame) -> BackendResult<()> {
        match frame {
            StreamFrame::Color(color) => {
                if let Some(stale) = self.pending_color.replace(color) {
                    self.ready.push_back(Capture::new(Some(stale), None));
                }
            }
            StreamFrame::Depth(depth) => {
                if let Some(stale) = self.pending_depth.replace(depth) {
                    self.ready.push_back(Capture::new(None, Some(stale)));
                }
            }
            StreamFrame::Lost(stream) => {
                warn!(stream, "V4L2 stream lost");
                return Err(CameraError::Disconnected);
            }
        }

        if self.pending_color.is_some() && self.pending_depth.is_some() {
            self.ready.push_back(Capture::new(
                self.pending_color.take(),
                self.pending_depth.take(),
            ));
        }
        Ok(())
    }
}

impl FrameSource for V4l2PairSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn poll_capture(&mut self, timeout: Option<Duration>) -> BackendResult<Option<Capture>> {
        if let Some(capture) = self.ready.pop_front() {
            return Ok(Some(capture));
        }

        let first = match timeout {
            None => match self.receiver.try_recv() {
                Ok(frame) => frame,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(CameraError::Disconnected),
            },
            Some(limit) => match self.receiver.recv_timeout(limit) {
                Ok(frame) => frame,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => return Err(CameraError::Disconnected),
            },
        };
        self.accept(first)?;

        loop {
            match self.receiver.try_recv() {
                Ok(frame) => self.accept(frame)?,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(CameraError::Disconnected),
            }
        }

        Ok(self.ready.pop_front())
    }
}

/// Per-thread state of a reader
struct Reader {
    stream: Stream<'static>,
    width: u32,
    height: u32,
    fourcc: FourCC,
    sender: SyncSender<StreamFrame>,
    errors: u32,
}

impl Reader {
    /// Dequeue one buffer and convert it, or `None` on a transient failure
    fn next_buffer<T>(
        &mut self,
        stream_name: &'static str,
        convert: impl FnOnce(&[u8], u32, u32, FourCC, Duration) -> Option<T>,
    ) -> Result<Option<T>, ()> {
        let (buf, meta) = match self.stream.next() {
            Ok(frame) => frame,
            Err(e) => {
                self.errors += 1;
                warn!(stream = stream_name, error = %e, "Failed to dequeue buffer");
                if self.errors >= MAX_CONSECUTIVE_ERRORS {
                    return Err(());
                }
                return Ok(None);
            }
        };
        self.errors = 0;

        let timestamp = Duration::from_secs(meta.timestamp.sec.max(0) as u64)
            + Duration::from_micros(meta.timestamp.usec.max(0) as u64);
        Ok(convert(buf, self.width, self.height, self.fourcc, timestamp))
    }

    /// Hand a frame to the recording loop, dropping it when the loop is behind
    fn send(&self, frame: StreamFrame) -> WorkerAction {
        match self.sender.try_send(frame) {
            Ok(()) => WorkerAction::Continue,
            Err(TrySendError::Full(_)) => {
                debug!("Frame channel full, dropping frame");
                WorkerAction::Continue
            }
            Err(TrySendError::Disconnected(_)) => WorkerAction::Stop,
        }
    }
}

/// Open a node, negotiate the first accepted format, and map its buffers
fn open_reader(
    path: &str,
    width: u32,
    height: u32,
    formats: [&[u8; 4]; 2],
    sender: SyncSender<StreamFrame>,
) -> Result<Reader, String> {
    let dev = Device::with_path(path).map_err(|e| format!("Failed to open {}: {}", path, e))?;

    let actual = match dev.set_format(&Format::new(width, height, FourCC::new(formats[0]))) {
        Ok(f) => f,
        Err(_) => dev
            .set_format(&Format::new(width, height, FourCC::new(formats[1])))
            .map_err(|e| format!("Failed to set format on {}: {}", path, e))?,
    };

    info!(
        path,
        width = actual.width,
        height = actual.height,
        fourcc = ?actual.fourcc,
        "V4L2 format configured"
    );

    let stream = Stream::with_buffers(&dev, Type::VideoCapture, STREAM_BUFFERS)
        .map_err(|e| format!("Failed to create stream on {}: {}", path, e))?;

    Ok(Reader {
        stream,
        width: actual.width,
        height: actual.height,
        fourcc: actual.fourcc,
        sender,
        errors: 0,
    })
}

fn spawn_color_reader(
    path: &str,
    sender: SyncSender<StreamFrame>,
    ready: mpsc::Sender<Result<(), String>>,
) -> CaptureWorker {
    let path = path.to_string();
    CaptureWorker::spawn(
        "kinect-color",
        move || {
            let reader = open_reader(&path, COLOR_WIDTH, COLOR_HEIGHT, [b"UYVY", b"GRBG"], sender);
            let _ = ready.send(reader.as_ref().map(|_| ()).map_err(|e| e.clone()));
            reader
        },
        |reader: &mut Reader| {
            let frame = reader.next_buffer("color", |buf, w, h, fourcc, ts| {
                let rgba = if fourcc == FourCC::new(b"UYVY") {
                    uyvy_to_rgba(buf, w, h)
                } else if fourcc == FourCC::new(b"GRBG") {
                    grbg_to_rgba(buf, w, h)
                } else {
                    warn!(fourcc = ?fourcc, "Unsupported color format");
                    return None;
                };
                ColorFrame::new(w, h, PixelLayout::Rgba, rgba, ts).ok()
            });
            match frame {
                Ok(Some(color)) => reader.send(StreamFrame::Color(color)),
                Ok(None) => WorkerAction::Continue,
                Err(()) => {
                    reader.send(StreamFrame::Lost("color"));
                    WorkerAction::Stop
                }
            }
        },
    )
}

fn spawn_depth_reader(
    path: &str,
    width: u32,
    height: u32,
    sender: SyncSender<StreamFrame>,
    ready: mpsc::Sender<Result<(), String>>,
) -> CaptureWorker {
    let path = path.to_string();
    CaptureWorker::spawn(
        "kinect-depth",
        move || {
            let reader = open_reader(&path, width, height, [b"Y10B", b"Y16 "], sender);
            let _ = ready.send(reader.as_ref().map(|_| ()).map_err(|e| e.clone()));
            reader
        },
        |reader: &mut Reader| {
            let frame = reader.next_buffer("depth", |buf, w, h, fourcc, ts| {
                let samples = if fourcc == FourCC::new(b"Y10B") {
                    unpack_y10b(buf, w, h)
                } else if fourcc == FourCC::new(b"Y16 ") {
                    y16_to_u16(buf, w, h)
                } else {
                    warn!(fourcc = ?fourcc, "Unsupported depth format");
                    return None;
                };
                DepthFrame::new(w, h, samples, ts).ok()
            });
            match frame {
                Ok(Some(depth)) => reader.send(StreamFrame::Depth(depth)),
                Ok(None) => WorkerAction::Continue,
                Err(()) => {
                    reader.send(StreamFrame::Lost("depth"));
                    WorkerAction::Stop
                }
            }
        },
    )
}
