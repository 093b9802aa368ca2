// SPDX-License-Identifier: GPL-3.0-only

//! Depth raster to point cloud
//!
//! Each depth pixel `(x, y)` with sample `d` becomes the point `(x, y, d)`.
//! This is a grid projection, not a back-projection through camera
//! intrinsics, and invalid samples are kept as `z = 0` so point `i` always
//! maps to pixel `(i % width, i / width)`.
//!
//! Files are a flat little-endian `f32` dump, XYZ interleaved, row-major,
//! with no header. Readers must know the width out of band.

use crate::backends::DepthFrame;
use crate::errors::StorageError;
use std::path::Path;
use tracing::debug;

/// Floats per point
pub const COMPONENTS: usize = 3;

/// Projected depth raster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub width: u32,
    pub height: u32,
    /// `3 * width * height` floats, XYZ interleaved
    pub points: Vec<f32>,
}

impl PointCloud {
    /// Rebuild a cloud from a flat buffer and its raster width
    ///
    /// Fails when the buffer is not a whole number of rows.
    pub fn from_raw(width: u32, points: Vec<f32>) -> Result<Self, String> {
        let row = width as usize * COMPONENTS;
        if row == 0 || points.len() % row != 0 {
            return Err(format!(
                "{} floats is not a whole number of {}-pixel rows",
                points.len(),
                width
            ));
        }
        Ok(Self {
            width,
            height: (points.len() / row) as u32,
            points,
        })
    }

    pub fn point_count(&self) -> usize {
        self.points.len() / COMPONENTS
    }

    /// Point `index` as `[x, y, z]`
    pub fn point(&self, index: usize) -> Option<[f32; 3]> {
        let start = index.checked_mul(COMPONENTS)?;
        let end = start.checked_add(COMPONENTS)?;
        let p = self.points.get(start..end)?;
        Some([p[0], p[1], p[2]])
    }

    /// Points with a zero depth sample
    pub fn zero_depth_count(&self) -> usize {
        self.points
            .chunks_exact(COMPONENTS)
            .filter(|p| p[2] == 0.0)
            .count()
    }

    /// Smallest and largest depth among non-zero samples
    pub fn depth_range(&self) -> Option<(f32, f32)> {
        self.points
            .chunks_exact(COMPONENTS)
            .map(|p| p[2])
            .filter(|z| *z != 0.0)
            .fold(None, |range, z| match range {
                None => Some((z, z)),
                Some((lo, hi)) => Some((lo.min(z), hi.max(z))),
            })
    }
}

/// Project a depth frame into a new point cloud
pub fn project(depth: &DepthFrame) -> PointCloud {
    let mut cloud = PointCloud::default();
    project_into(depth, &mut cloud);
    cloud
}

/// Project into an existing cloud, reusing its allocation
pub fn project_into(depth: &DepthFrame, cloud: &mut PointCloud) {
    cloud.width = depth.width;
    cloud.height = depth.height;
    cloud.points.clear();
    cloud.points.reserve(depth.pixel_count() * COMPONENTS);

    let width = depth.width.max(1) as usize;
    for (i, &d) in depth.data.iter().enumerate() {
        cloud.points.push((i % width) as f32);
        cloud.points.push((i / width) as f32);
        cloud.points.push(d as f32);
    }
}

/// Write the cloud as raw little-endian `f32`
///
/// Returns the number of bytes written.
pub fn write_point_cloud(path: &Path, cloud: &PointCloud) -> Result<usize, StorageError> {
    let bytes = le_bytes(&cloud.points);
    std::fs::write(path, &bytes).map_err(|e| StorageError::write(path, e))?;
    debug!(path = %path.display(), points = cloud.point_count(), "Point cloud written");
    Ok(bytes.len())
}

/// Read a raw little-endian `f32` file
pub fn read_point_cloud(path: &Path) -> Result<Vec<f32>, StorageError> {
    let bytes = std::fs::read(path).map_err(|e| StorageError::read(path, e))?;
    if bytes.len() % std::mem::size_of::<f32>() != 0 {
        return Err(StorageError::read(
            path,
            format!("{} bytes is not a whole number of f32 values", bytes.len()),
        ));
    }
    Ok(from_le_bytes(&bytes))
}

#[cfg(target_endian = "little")]
fn le_bytes(points: &[f32]) -> std::borrow::Cow<'_, [u8]> {
    std::borrow::Cow::Borrowed(bytemuck::cast_slice(points))
}

#[cfg(target_endian = "big")]
fn le_bytes(points: &[f32]) -> std::borrow::Cow<'_, [u8]> {
    std::borrow::Cow::Owned(points.iter().flat_map(|v| v.to_le_bytes()).collect())
}

#[cfg(target_endian = "little")]
fn from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytemuck::pod_collect_to_vec(bytes)
}

#[cfg(target_endian = "big")]
fn from_le_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn frame(width: u32, height: u32) -> DepthFrame {
        let data = (0..width * height).map(|i| (i * 7 % 2048) as u16).collect();
        DepthFrame::new(width, height, data, Duration::ZERO).unwrap()
    }

    #[test]
    fn test_projection_maps_every_pixel() {
        for (w, h) in [(1, 1), (5, 3), (640, 2), (3, 7)] {
            let depth = frame(w, h);
            let cloud = project(&depth);
            assert_eq!(cloud.points.len(), 3 * (w * h) as usize);
            for i in 0..(w * h) as usize {
                assert_eq!(cloud.points[3 * i], (i % w as usize) as f32);
                assert_eq!(cloud.points[3 * i + 1], (i / w as usize) as f32);
                assert_eq!(cloud.points[3 * i + 2], depth.data[i] as f32);
            }
        }
    }

    #[test]
    fn test_point_lookup_out_of_range() {
        let cloud = project(&DepthFrame::new(2, 2, vec![5; 4], Duration::ZERO).unwrap());
        assert_eq!(cloud.point(3), Some([1.0, 1.0, 5.0]));
        assert_eq!(cloud.point(4), None);
        // Largest index whose offset still fits in usize
        assert_eq!(cloud.point(usize::MAX / COMPONENTS), None);
        assert_eq!(cloud.point(usize::MAX), None);
    }

    #[test]
    fn test_zero_depth_is_kept() {
        let depth = DepthFrame::new(2, 1, vec![0, 800], Duration::ZERO).unwrap();
        let cloud = project(&depth);
        assert_eq!(cloud.point(0), Some([0.0, 0.0, 0.0]));
        assert_eq!(cloud.point(1), Some([1.0, 0.0, 800.0]));
        assert_eq!(cloud.zero_depth_count(), 1);
        assert_eq!(cloud.depth_range(), Some((800.0, 800.0)));
    }

    #[test]
    fn test_project_into_reuses_buffer() {
        let mut cloud = project(&frame(8, 8));
        let capacity = cloud.points.capacity();
        project_into(&frame(4, 4), &mut cloud);
        assert_eq!(cloud.point_count(), 16);
        assert_eq!((cloud.width, cloud.height), (4, 4));
        assert_eq!(cloud.points.capacity(), capacity);
    }

    #[test]
    fn test_from_raw_rejects_partial_rows() {
        assert!(PointCloud::from_raw(2, vec![0.0; 9]).is_err());
        assert!(PointCloud::from_raw(0, vec![]).is_err());
        let cloud = PointCloud::from_raw(2, vec![0.0; 12]).unwrap();
        assert_eq!(cloud.height, 2);
    }

    #[test]
    fn test_file_is_little_endian_without_header() {
        let path = std::env::temp_dir().join(format!("cloud-{}.npy", uuid::Uuid::new_v4()));
        let cloud = PointCloud {
            width: 1,
            height: 1,
            points: vec![1.0, 2.0, 3.5],
        };
        assert_eq!(write_point_cloud(&path, &cloud).unwrap(), 12);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[8..12], &3.5f32.to_le_bytes());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_truncated_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("cloud-{}.npy", uuid::Uuid::new_v4()));
        std::fs::write(&path, [0u8; 10]).unwrap();
        assert!(matches!(
            read_point_cloud(&path),
            Err(StorageError::Read { .. })
        ));
        std::fs::remove_file(&path).unwrap();
    }
}
