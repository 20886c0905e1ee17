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

pub mod endpoint;
pub mod error;
pub mod error_reduce;
pub mod format;
pub mod local;

pub use erasurefs_config::{
    ERASUREFS_META_BUCKET, ERASUREFS_META_BUCKETS_BUCKET, ERASUREFS_META_MULTIPART_BUCKET, ERASUREFS_META_TMP_BUCKET,
    FORMAT_CONFIG_FILE,
};

use crate::rpc::RemoteDisk;
use bytes::Bytes;
use endpoint::Endpoint;
use error::Result;
use local::LocalDisk;
use std::{fmt::Debug, path::PathBuf, sync::Arc};
use uuid::Uuid;

pub type DiskStore = Arc<Disk>;

#[derive(Debug)]
pub enum Disk {
    Local(Box<LocalDisk>),
    Remote(Box<RemoteDisk>),
}

#[async_trait::async_trait]
impl DiskAPI for Disk {
    #[tracing::instrument(skip(self))]
    fn to_string(&self) -> String {
        match self {
            Disk::Local(local_disk) => local_disk.to_string(),
            Disk::Remote(remote_disk) => remote_disk.to_string(),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn is_online(&self) -> bool {
        match self {
            Disk::Local(local_disk) => local_disk.is_online().await,
            Disk::Remote(remote_disk) => remote_disk.is_online().await,
        }
    }

    #[tracing::instrument(skip(self))]
    fn is_local(&self) -> bool {
        match self {
            Disk::Local(local_disk) => local_disk.is_local(),
            Disk::Remote(remote_disk) => remote_disk.is_local(),
        }
    }

    #[tracing::instrument(skip(self))]
    fn host_name(&self) -> String {
        match self {
            Disk::Local(local_disk) => local_disk.host_name(),
            Disk::Remote(remote_disk) => remote_disk.host_name(),
        }
    }

    #[tracing::instrument(skip(self))]
    fn endpoint(&self) -> Endpoint {
        match self {
            Disk::Local(local_disk) => local_disk.endpoint(),
            Disk::Remote(remote_disk) => remote_disk.endpoint(),
        }
    }

    #[tracing::instrument(skip(self))]
    fn path(&self) -> PathBuf {
        match self {
            Disk::Local(local_disk) => local_disk.path(),
            Disk::Remote(remote_disk) => remote_disk.path(),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn close(&self) -> Result<()> {
        match self {
            Disk::Local(local_disk) => local_disk.close().await,
            Disk::Remote(remote_disk) => remote_disk.close().await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get_disk_id(&self) -> Result<Option<Uuid>> {
        match self {
            Disk::Local(local_disk) => local_disk.get_disk_id().await,
            Disk::Remote(remote_disk) => remote_disk.get_disk_id().await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn set_disk_id(&self, id: Option<Uuid>) -> Result<()> {
        match self {
            Disk::Local(local_disk) => local_disk.set_disk_id(id).await,
            Disk::Remote(remote_disk) => remote_disk.set_disk_id(id).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn make_volume(&self, volume: &str) -> Result<()> {
        match self {
            Disk::Local(local_disk) => local_disk.make_volume(volume).await,
            Disk::Remote(remote_disk) => remote_disk.make_volume(volume).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn make_volumes(&self, volumes: Vec<&str>) -> Result<()> {
        match self {
            Disk::Local(local_disk) => local_disk.make_volumes(volumes).await,
            Disk::Remote(remote_disk) => remote_disk.make_volumes(volumes).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn read_all(&self, volume: &str, path: &str) -> Result<Bytes> {
        match self {
            Disk::Local(local_disk) => local_disk.read_all(volume, path).await,
            Disk::Remote(remote_disk) => remote_disk.read_all(volume, path).await,
        }
    }

    #[tracing::instrument(skip(self, data))]
    async fn write_all(&self, volume: &str, path: &str, data: Bytes) -> Result<()> {
        match self {
            Disk::Local(local_disk) => local_disk.write_all(volume, path, data).await,
            Disk::Remote(remote_disk) => remote_disk.write_all(volume, path, data).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn rename_file(&self, src_volume: &str, src_path: &str, dst_volume: &str, dst_path: &str) -> Result<()> {
        match self {
            Disk::Local(local_disk) => local_disk.rename_file(src_volume, src_path, dst_volume, dst_path).await,
            Disk::Remote(remote_disk) => remote_disk.rename_file(src_volume, src_path, dst_volume, dst_path).await,
        }
    }

    #[tracing::instrument(skip(self))]
    async fn delete_volume_contents(&self, volume: &str) -> Result<()> {
        match self {
            Disk::Local(local_disk) => local_disk.delete_volume_contents(volume).await,
            Disk::Remote(remote_disk) => remote_disk.delete_volume_contents(volume).await,
        }
    }
}

/// Opens the disk behind `ep`: a [`LocalDisk`] when the endpoint was tagged
/// local, a [`RemoteDisk`] handle otherwise.
pub async fn new_disk(ep: &Endpoint) -> Result<DiskStore> {
    if ep.is_local {
        let s = LocalDisk::new(ep).await?;
        Ok(Arc::new(Disk::Local(Box::new(s))))
    } else {
        let remote_disk = RemoteDisk::new(ep).await?;
        Ok(Arc::new(Disk::Remote(Box::new(remote_disk))))
    }
}

#[async_trait::async_trait]
pub trait DiskAPI: Debug + Send + Sync + 'static {
    fn to_string(&self) -> String;
    async fn is_online(&self) -> bool;
    fn is_local(&self) -> bool;
    fn host_name(&self) -> String;
    fn endpoint(&self) -> Endpoint;
    fn path(&self) -> PathBuf;
    async fn close(&self) -> Result<()>;
    async fn get_disk_id(&self) -> Result<Option<Uuid>>;
    async fn set_disk_id(&self, id: Option<Uuid>) -> Result<()>;

    async fn make_volume(&self, volume: &str) -> Result<()>;
    async fn make_volumes(&self, volumes: Vec<&str>) -> Result<()>;

    async fn read_all(&self, volume: &str, path: &str) -> Result<Bytes>;
    async fn write_all(&self, volume: &str, path: &str, data: Bytes) -> Result<()>;
    async fn rename_file(&self, src_volume: &str, src_path: &str, dst_volume: &str, dst_path: &str) -> Result<()>;

    /// Removes everything inside `volume`, keeping the volume itself.
    async fn delete_volume_contents(&self, volume: &str) -> Result<()>;
}

/// Opens the storage behind an endpoint.
///
/// The bootstrap only talks to disks through this trait so that tests and
/// alternative backends can stand in for the filesystem.
#[async_trait::async_trait]
pub trait StorageDriver: Send + Sync {
    async fn init(&self, endpoint: &Endpoint) -> Result<DiskStore>;
}

/// Filesystem disks for local endpoints, offline handles for remote ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStorageDriver;

#[async_trait::async_trait]
impl StorageDriver for DefaultStorageDriver {
    async fn init(&self, endpoint: &Endpoint) -> Result<DiskStore> {
        new_disk(endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::endpoint::PosixPaths;
    use super::error::DiskError;
    use super::*;
    use tempfile::TempDir;

    fn local_endpoint(dir: &TempDir, idx: usize) -> Endpoint {
        Endpoint::parse_with(dir.path().to_str().unwrap(), &PosixPaths)
            .unwrap()
            .with_local(true)
            .with_index(idx)
    }

    #[tokio::test]
    async fn test_new_disk_local() {
        let dir = TempDir::new().unwrap();
        let ep = local_endpoint(&dir, 0);

        let disk = DefaultStorageDriver.init(&ep).await.unwrap();
        assert!(disk.is_local());
        assert!(disk.is_online().await);
        assert_eq!(disk.path(), dir.path().canonicalize().unwrap());
        assert_eq!(disk.endpoint(), ep);
        assert!(dir.path().join(ERASUREFS_META_TMP_BUCKET).is_dir());
        assert!(dir.path().join(ERASUREFS_META_MULTIPART_BUCKET).is_dir());
    }

    #[tokio::test]
    async fn test_new_disk_local_missing_dir() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let ep = Endpoint::parse_with(missing.to_str().unwrap(), &PosixPaths)
            .unwrap()
            .with_local(true);

        let err = new_disk(&ep).await.unwrap_err();
        assert_eq!(err, DiskError::VolumeNotFound);
    }

    #[tokio::test]
    async fn test_new_disk_remote() {
        let ep = Endpoint::parse_with("http://node9:9000/export", &PosixPaths)
            .unwrap()
            .with_index(1);

        let disk = new_disk(&ep).await.unwrap();
        assert!(!disk.is_local());
        assert!(!disk.is_online().await);
        assert_eq!(disk.host_name(), "node9:9000");
        assert_eq!(disk.read_all(ERASUREFS_META_BUCKET, FORMAT_CONFIG_FILE).await, Err(DiskError::DiskNotFound));
    }
}
