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

use crate::disk::error::DiskError;

pub type Error = StorageError;
pub type Result<T> = core::result::Result<T, Error>;

/// Every way bootstrap can fail.
///
/// Argument and topology variants carry the offending literal or count so the
/// diagnostic printed on exit names what the operator has to fix.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid Argument: no disk locations supplied")]
    NoEndpoints,

    #[error("Invalid Argument: empty disk location")]
    EmptyEndpoint,

    #[error("Invalid Argument {arg}: {reason}")]
    InvalidEndpoint { arg: String, reason: String },

    #[error("Invalid scheme: {scheme} ({arg})")]
    InvalidScheme { scheme: String, arg: String },

    #[error("Empty or root path is not allowed: {path} ({arg})")]
    EmptyOrRootPath { path: String, arg: String },

    #[error("Invalid Argument {0}, port configurable using --address :<port>")]
    PortNotConfigurable(String),

    #[error("Invalid Argument {0}, port mandatory when --address <host>:<port> is used")]
    PortMandatory(String),

    #[error("Duplicate entries in {args}: {endpoint}")]
    DuplicateEndpoint { endpoint: String, args: String },

    #[error("Unable to parse address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("Port cannot be empty or '0', please use `--address` to pick a specific port")]
    EmptyPort,

    #[error("{0}, FS setup expects a filesystem path")]
    SingleDiskNotPath(String),

    #[error("Invalid number of disks supplied: {count} is more than the maximum of {max}")]
    TooManyDisks { count: usize, max: usize },

    #[error("Invalid number of disks supplied: {count} is less than the minimum of {min}")]
    TooFewDisks { count: usize, min: usize },

    #[error("Invalid number of disks supplied: {0} is odd, an even number of disks is required")]
    OddDiskCount(usize),

    #[error("None of the disks passed as command line args are local to this server")]
    NoLocalEndpoint,

    #[error("{addr} is not available in {args}")]
    BindAddressNotFound { addr: String, args: String },

    #[error("{addr} matches {count} entries in {args}")]
    BindAddressAmbiguous { addr: String, count: usize, args: String },

    #[error("Certificates not provided for secure configuration")]
    CertificatesRequired,

    #[error("Port {port} is not available: {reason}")]
    PortUnavailable { port: u16, reason: String },

    #[error("Unable to resolve host {host}: {reason}")]
    HostResolution { host: String, reason: String },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Unable to initialize disk {endpoint}: {source}")]
    DiskInit { endpoint: String, source: DiskError },

    #[error("Disks disagree on format: {0}")]
    FormatMismatch(String),

    #[error("not first disk")]
    NotFirstDisk,

    #[error("first disk wait")]
    FirstDiskWait,

    #[error("erasure read quorum")]
    ErasureReadQuorum,

    #[error("Unable to initialize distributed locking: {0}")]
    LockCoordinator(String),

    #[error("object layer already published")]
    AlreadyPublished,

    #[error("shutdown requested")]
    ShutdownRequested,

    #[error(transparent)]
    Disk(#[from] DiskError),

    #[error("io error {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        StorageError::Io(std::io::Error::other(error))
    }

    /// Format consensus has not been reached yet but may be on a later
    /// attempt, usually because peers are still booting.
    pub fn is_pending(&self) -> bool {
        match self {
            StorageError::NotFirstDisk | StorageError::FirstDiskWait | StorageError::ErasureReadQuorum => true,
            StorageError::Disk(err) => matches!(
                err,
                DiskError::UnformattedDisk
                    | DiskError::DiskNotFound
                    | DiskError::ErasureWriteQuorum
            ),
            _ => false,
        }
    }
}
