// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the recorder

use std::fmt;
use std::path::{Path, PathBuf};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera/frame source errors
    Camera(CameraError),
    /// Storage/filesystem errors
    Storage(StorageError),
    /// Invalid or unreadable configuration
    Config(String),
    /// Generic error with message
    Other(String),
}

/// Frame source errors
///
/// `NoCameraFound`, `OpenFailed` and `StartFailed` are fatal at startup.
#[derive(Debug, Clone)]
pub enum CameraError {
    /// No depth camera devices found
    NoCameraFound,
    /// Device could not be opened
    OpenFailed(String),
    /// Streams could not be started
    StartFailed(String),
    /// Device went away while streaming
    Disconnected,
    /// Frame data does not match its declared shape
    InvalidFrame(String),
}

/// Storage errors, each carrying the path involved
#[derive(Debug, Clone)]
pub enum StorageError {
    /// Output directory could not be created
    CreateDir { path: PathBuf, message: String },
    /// Directory size could not be measured
    Measure { path: PathBuf, message: String },
    /// File could not be written
    Write { path: PathBuf, message: String },
    /// File could not be read
    Read { path: PathBuf, message: String },
    /// Image encoding failed
    Encode { path: PathBuf, message: String },
}

impl StorageError {
    pub fn create_dir(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::CreateDir {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn measure(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::Measure {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn write(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::Write {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn read(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::Read {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn encode(path: &Path, err: impl fmt::Display) -> Self {
        StorageError::Encode {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Path the failed operation was working on
    pub fn path(&self) -> &Path {
        match self {
            StorageError::CreateDir { path, .. }
            | StorageError::Measure { path, .. }
            | StorageError::Write { path, .. }
            | StorageError::Read { path, .. }
            | StorageError::Encode { path, .. } => path,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Storage(e) => write!(f, "Storage error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::NoCameraFound => write!(f, "No depth camera devices found"),
            CameraError::OpenFailed(msg) => write!(f, "Failed to open device: {}", msg),
            CameraError::StartFailed(msg) => write!(f, "Failed to start cameras: {}", msg),
            CameraError::Disconnected => write!(f, "Camera disconnected"),
            CameraError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::CreateDir { path, message } => {
                write!(f, "Failed to create {}: {}", path.display(), message)
            }
            StorageError::Measure { path, message } => {
                write!(f, "Failed to measure {}: {}", path.display(), message)
            }
            StorageError::Write { path, message } => {
                write!(f, "Failed to write {}: {}", path.display(), message)
            }
            StorageError::Read { path, message } => {
                write!(f, "Failed to read {}: {}", path.display(), message)
            }
            StorageError::Encode { path, message } => {
                write!(f, "Failed to encode {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for StorageError {}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}
