// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for frame sources

use crate::errors::CameraError;
use std::time::Duration;

/// Result type for frame source operations
pub type BackendResult<T> = Result<T, CameraError>;

/// Byte order of a 4-byte color pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelLayout {
    /// B G R A (Azure Kinect style BGRA32)
    #[default]
    Bgra,
    /// R G B A (output of the V4L2 format converters)
    Rgba,
}

impl PixelLayout {
    /// Offsets of the R, G and B channels within a pixel
    pub fn rgb_offsets(&self) -> [usize; 3] {
        match self {
            PixelLayout::Bgra => [2, 1, 0],
            PixelLayout::Rgba => [0, 1, 2],
        }
    }
}

impl std::fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelLayout::Bgra => write!(f, "BGRA"),
            PixelLayout::Rgba => write!(f, "RGBA"),
        }
    }
}

/// Color raster: `width * height` pixels of 4 bytes each
#[derive(Clone)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
    /// Device clock at exposure (microsecond resolution)
    pub device_timestamp: Duration,
}

impl ColorFrame {
    /// Build a frame, rejecting data that doesn't match the dimensions
    pub fn new(
        width: u32,
        height: u32,
        layout: PixelLayout,
        data: Vec<u8>,
        device_timestamp: Duration,
    ) -> BackendResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(CameraError::InvalidFrame(format!(
                "color frame {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            data,
            device_timestamp,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Debug for ColorFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("bytes", &self.data.len())
            .field("device_timestamp", &self.device_timestamp)
            .finish()
    }
}

/// Depth raster: `width * height` raw 16-bit samples, row-major
#[derive(Clone)]
pub struct DepthFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u16>,
    pub device_timestamp: Duration,
}

impl DepthFrame {
    /// Build a frame, rejecting data that doesn't match the dimensions
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u16>,
        device_timestamp: Duration,
    ) -> BackendResult<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(CameraError::InvalidFrame(format!(
                "depth frame {}x{} needs {} samples, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            device_timestamp,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Debug for DepthFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("samples", &self.data.len())
            .field("device_timestamp", &self.device_timestamp)
            .finish()
    }
}

/// One synchronized acquisition
///
/// Owns whichever frames the device delivered. Dropping the capture
/// releases them; the recording loop drops it at the end of every
/// iteration.
#[derive(Debug, Default)]
pub struct Capture {
    pub color: Option<ColorFrame>,
    pub depth: Option<DepthFrame>,
}

impl Capture {
    pub fn new(color: Option<ColorFrame>, depth: Option<DepthFrame>) -> Self {
        Self { color, depth }
    }
}

/// Describes a device a source can open
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Human readable name (V4L2 card)
    pub name: String,
    /// Driver name
    pub driver: String,
    /// Bus the device sits on (pairs color and depth nodes)
    pub bus: String,
    /// Color device path (e.g., /dev/video4)
    pub color_path: String,
    /// Depth device path (e.g., /dev/video5)
    pub depth_path: String,
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] color={} depth={}",
            self.name, self.bus, self.color_path, self.depth_path
        )
    }
}
