// SPDX-License-Identifier: GPL-3.0-only

//! Output tree layout
//!
//! ```text
//! <base>/recordings/
//! ├── rgb_images/
//! │   ├── image_1_1718000000123.jpg
//! │   └── ...
//! └── point_cloud/
//!     ├── pointcloud_1_1718000000131.npy
//!     └── ...
//! ```
//!
//! The number after the prefix is the session sequence number, the second is
//! wall-clock milliseconds at write time.

pub mod sequence;
pub mod space;

use crate::constants::layout;
use crate::errors::StorageError;
use crate::pipelines::color::EncodingFormat;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directories of one recordings tree
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    color_dir: PathBuf,
    point_cloud_dir: PathBuf,
}

impl OutputLayout {
    /// Describe the layout under `root` without touching the filesystem
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            color_dir: root.join(layout::COLOR_DIR),
            point_cloud_dir: root.join(layout::POINT_CLOUD_DIR),
        }
    }

    /// Describe the layout and create both subdirectories
    pub fn create(root: &Path) -> Result<Self, StorageError> {
        let output = Self::new(root);
        for dir in [&output.color_dir, &output.point_cloud_dir] {
            std::fs::create_dir_all(dir).map_err(|e| StorageError::create_dir(dir, e))?;
        }
        debug!(root = %root.display(), "Output directories ready");
        Ok(output)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn color_dir(&self) -> &Path {
        &self.color_dir
    }

    pub fn point_cloud_dir(&self) -> &Path {
        &self.point_cloud_dir
    }

    /// `rgb_images/image_<seq>_<millis>.<ext>`
    pub fn color_path(&self, sequence: u64, millis: i64, format: EncodingFormat) -> PathBuf {
        self.color_dir.join(format!(
            "{}{}_{}.{}",
            layout::COLOR_PREFIX,
            sequence,
            millis,
            format.extension()
        ))
    }

    /// `point_cloud/pointcloud_<seq>_<millis>.npy`
    pub fn point_cloud_path(&self, sequence: u64, millis: i64) -> PathBuf {
        self.point_cloud_dir.join(format!(
            "{}{}_{}.{}",
            layout::POINT_CLOUD_PREFIX,
            sequence,
            millis,
            layout::POINT_CLOUD_EXTENSION
        ))
    }
}

/// Wall-clock milliseconds since the Unix epoch, for file names only
pub fn wall_clock_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let output = OutputLayout::new(Path::new("/data/recordings"));
        assert_eq!(
            output.color_path(7, 1718000000123, EncodingFormat::Jpeg),
            PathBuf::from("/data/recordings/rgb_images/image_7_1718000000123.jpg")
        );
        assert_eq!(
            output.point_cloud_path(7, 1718000000131),
            PathBuf::from("/data/recordings/point_cloud/pointcloud_7_1718000000131.npy")
        );
    }

    #[test]
    fn test_create_makes_both_directories() {
        let root = std::env::temp_dir().join(format!("layout-test-{}", uuid::Uuid::new_v4()));
        let output = OutputLayout::create(&root).unwrap();
        assert!(output.color_dir().is_dir());
        assert!(output.point_cloud_dir().is_dir());
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_wall_clock_is_after_2020() {
        assert!(wall_clock_millis() > 1_577_836_800_000);
    }
}
