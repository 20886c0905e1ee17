// Copyright 2024 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::hash::{Hash, Hasher};
use std::io;

pub type Error = DiskError;
pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum DiskError {
    #[error("corrupted format")]
    CorruptedFormat,

    #[error("unformatted disk error")]
    UnformattedDisk,

    #[error("inconsistent drive found")]
    InconsistentDisk,

    #[error("drive does not support O_DIRECT")]
    UnsupportedDisk,

    #[error("disk not a dir")]
    DiskNotDir,

    #[error("disk not found")]
    DiskNotFound,

    #[error("file not found")]
    FileNotFound,

    #[error("volume already exists")]
    VolumeExists,

    #[error("volume not found")]
    VolumeNotFound,

    #[error("volume access denied")]
    VolumeAccessDenied,

    #[error("disk access denied")]
    FileAccessDenied,

    #[error("invalid path")]
    InvalidPath,

    #[error("erasure write quorum")]
    ErasureWriteQuorum,

    #[error("io error {0}")]
    Io(io::Error),
}

impl DiskError {
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DiskError::Io(io::Error::other(error))
    }

    pub fn to_u32(&self) -> u32 {
        match self {
            DiskError::CorruptedFormat => 0x01,
            DiskError::UnformattedDisk => 0x02,
            DiskError::InconsistentDisk => 0x03,
            DiskError::UnsupportedDisk => 0x04,
            DiskError::DiskNotDir => 0x05,
            DiskError::DiskNotFound => 0x06,
            DiskError::FileNotFound => 0x09,
            DiskError::VolumeExists => 0x0A,
            DiskError::VolumeNotFound => 0x0B,
            DiskError::VolumeAccessDenied => 0x0C,
            DiskError::FileAccessDenied => 0x0D,
            DiskError::InvalidPath => 0x0F,
            DiskError::ErasureWriteQuorum => 0x10,
            DiskError::Io(_) => 0x12,
        }
    }
}

/// Maps an io error raised while touching a file.
pub fn to_file_error(err: io::Error) -> DiskError {
    match err.kind() {
        io::ErrorKind::NotFound => DiskError::FileNotFound,
        io::ErrorKind::PermissionDenied => DiskError::FileAccessDenied,
        _ => DiskError::Io(err),
    }
}

/// Maps an io error raised while touching a volume directory.
pub fn to_volume_error(err: io::Error) -> DiskError {
    match err.kind() {
        io::ErrorKind::NotFound => DiskError::VolumeNotFound,
        io::ErrorKind::PermissionDenied => DiskError::VolumeAccessDenied,
        io::ErrorKind::AlreadyExists => DiskError::VolumeExists,
        _ => DiskError::Io(err),
    }
}

impl From<io::Error> for DiskError {
    fn from(e: io::Error) -> Self {
        e.downcast::<DiskError>().unwrap_or_else(DiskError::Io)
    }
}

impl From<DiskError> for io::Error {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::Io(io_error) => io_error,
            e => io::Error::other(e),
        }
    }
}

impl From<serde_json::Error> for DiskError {
    fn from(e: serde_json::Error) -> Self {
        DiskError::other(e)
    }
}

impl From<tokio::task::JoinError> for DiskError {
    fn from(e: tokio::task::JoinError) -> Self {
        DiskError::other(e)
    }
}

impl Clone for DiskError {
    fn clone(&self) -> Self {
        match self {
            DiskError::Io(io_error) => DiskError::Io(io::Error::new(io_error.kind(), io_error.to_string())),
            DiskError::CorruptedFormat => DiskError::CorruptedFormat,
            DiskError::UnformattedDisk => DiskError::UnformattedDisk,
            DiskError::InconsistentDisk => DiskError::InconsistentDisk,
            DiskError::UnsupportedDisk => DiskError::UnsupportedDisk,
            DiskError::DiskNotDir => DiskError::DiskNotDir,
            DiskError::DiskNotFound => DiskError::DiskNotFound,
            DiskError::FileNotFound => DiskError::FileNotFound,
            DiskError::VolumeExists => DiskError::VolumeExists,
            DiskError::VolumeNotFound => DiskError::VolumeNotFound,
            DiskError::VolumeAccessDenied => DiskError::VolumeAccessDenied,
            DiskError::FileAccessDenied => DiskError::FileAccessDenied,
            DiskError::InvalidPath => DiskError::InvalidPath,
            DiskError::ErasureWriteQuorum => DiskError::ErasureWriteQuorum,
        }
    }
}

impl PartialEq for DiskError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DiskError::Io(e1), DiskError::Io(e2)) => e1.kind() == e2.kind() && e1.to_string() == e2.to_string(),
            _ => self.to_u32() == other.to_u32(),
        }
    }
}

impl Eq for DiskError {}

impl Hash for DiskError {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            DiskError::Io(e) => e.to_string().hash(state),
            e => e.to_u32().hash(state),
        }
    }
}
