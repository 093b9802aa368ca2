// SPDX-License-Identifier: GPL-3.0-only

//! Color frame encoding
//!
//! Drops the alpha channel into a reusable RGB buffer, encodes it as JPEG
//! (with quality control) or PNG, and writes the result in one call.

use crate::backends::ColorFrame;
use crate::errors::StorageError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Supported encoding formats
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    #[serde(rename = "jpg")]
    #[value(name = "jpg")]
    Jpeg,
    /// PNG format (lossless compression)
    #[serde(rename = "png")]
    #[value(name = "png")]
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }
}

/// Encodes color frames to image files
///
/// The RGB and encoded buffers live as long as the writer, so steady-state
/// recording does not allocate per frame.
pub struct ColorImageWriter {
    format: EncodingFormat,
    jpeg_quality: u8,
    rgb: Vec<u8>,
    encoded: Vec<u8>,
}

impl ColorImageWriter {
    pub fn new(format: EncodingFormat, jpeg_quality: u8) -> Self {
        Self {
            format,
            jpeg_quality: jpeg_quality.clamp(1, 100),
            rgb: Vec::new(),
            encoded: Vec::new(),
        }
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    /// Encode `frame` and write it to `path`, returning the file size
    pub fn write(&mut self, frame: &ColorFrame, path: &Path) -> Result<usize, StorageError> {
        to_rgb(frame, &mut self.rgb);

        self.encoded.clear();
        let result = match self.format {
            EncodingFormat::Jpeg => {
                JpegEncoder::new_with_quality(&mut self.encoded, self.jpeg_quality).write_image(
                    &self.rgb,
                    frame.width,
                    frame.height,
                    ExtendedColorType::Rgb8,
                )
            }
            EncodingFormat::Png => PngEncoder::new(&mut self.encoded).write_image(
                &self.rgb,
                frame.width,
                frame.height,
                ExtendedColorType::Rgb8,
            ),
        };
        result.map_err(|e| StorageError::encode(path, e))?;

        std::fs::write(path, &self.encoded).map_err(|e| StorageError::write(path, e))?;
        debug!(
            path = %path.display(),
            bytes = self.encoded.len(),
            format = ?self.format,
            "Color frame written"
        );
        Ok(self.encoded.len())
    }
}

/// Copy the color channels of a 4-byte raster into `rgb`
pub fn to_rgb(frame: &ColorFrame, rgb: &mut Vec<u8>) {
    let [r, g, b] = frame.layout.rgb_offsets();
    rgb.clear();
    rgb.reserve(frame.pixel_count() * 3);
    for px in frame.data.chunks_exact(4) {
        rgb.extend_from_slice(&[px[r], px[g], px[b]]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::PixelLayout;
    use std::time::Duration;

    fn frame(layout: PixelLayout) -> ColorFrame {
        // One pixel: bytes 10 20 30 255
        ColorFrame::new(1, 1, layout, vec![10, 20, 30, 255], Duration::ZERO).unwrap()
    }

    #[test]
    fn test_bgra_swaps_channels() {
        let mut rgb = Vec::new();
        to_rgb(&frame(PixelLayout::Bgra), &mut rgb);
        assert_eq!(rgb, vec![30, 20, 10]);
    }

    #[test]
    fn test_rgba_keeps_channels() {
        let mut rgb = Vec::new();
        to_rgb(&frame(PixelLayout::Rgba), &mut rgb);
        assert_eq!(rgb, vec![10, 20, 30]);
    }

    #[test]
    fn test_png_round_trip() {
        let path = std::env::temp_dir().join(format!("color-{}.png", uuid::Uuid::new_v4()));
        let data = (0..4 * 3 * 4).map(|i| (i * 5) as u8).collect();
        let frame = ColorFrame::new(4, 3, PixelLayout::Rgba, data, Duration::ZERO).unwrap();

        let mut writer = ColorImageWriter::new(EncodingFormat::Png, 90);
        writer.write(&frame, &path).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(1, 0).0, [20, 25, 30]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_jpeg_writes_file() {
        let path = std::env::temp_dir().join(format!("color-{}.jpg", uuid::Uuid::new_v4()));
        let frame =
            ColorFrame::new(8, 8, PixelLayout::Bgra, vec![128; 8 * 8 * 4], Duration::ZERO).unwrap();

        let mut writer = ColorImageWriter::new(EncodingFormat::Jpeg, 92);
        let size = writer.write(&frame, &path).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, size);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_directory_is_a_write_error() {
        let path = std::env::temp_dir()
            .join(format!("absent-{}", uuid::Uuid::new_v4()))
            .join("image_1_0.png");
        let mut writer = ColorImageWriter::new(EncodingFormat::Png, 90);
        let result = writer.write(&frame(PixelLayout::Bgra), &path);
        assert!(matches!(result, Err(StorageError::Write { .. })));
    }
}
