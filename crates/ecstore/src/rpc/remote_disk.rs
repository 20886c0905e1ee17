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

use crate::disk::endpoint::Endpoint;
use crate::disk::error::{DiskError, Result};
use crate::disk::DiskAPI;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Handle on a disk owned by another node.
///
/// No peer transport is wired in yet, so the handle stays offline and every
/// I/O call reports [`DiskError::DiskNotFound`]. Format consensus treats such
/// disks as missing and keeps waiting for them.
#[derive(Debug)]
pub struct RemoteDisk {
    pub id: Mutex<Option<Uuid>>,
    pub addr: String,
    endpoint: Endpoint,
    cancel_token: CancellationToken,
}

impl RemoteDisk {
    pub async fn new(ep: &Endpoint) -> Result<Self> {
        let addr = format!("{}://{}", ep.scheme, ep.host_port());
        debug!("remote disk {} for {}", addr, ep);

        Ok(Self {
            id: Mutex::new(None),
            addr,
            endpoint: ep.clone(),
            cancel_token: CancellationToken::new(),
        })
    }
}

#[async_trait::async_trait]
impl DiskAPI for RemoteDisk {
    fn to_string(&self) -> String {
        self.endpoint.to_string()
    }

    async fn is_online(&self) -> bool {
        false
    }

    fn is_local(&self) -> bool {
        false
    }

    fn host_name(&self) -> String {
        self.endpoint.host_port()
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    fn path(&self) -> PathBuf {
        PathBuf::from(self.endpoint.get_file_path())
    }

    async fn close(&self) -> Result<()> {
        self.cancel_token.cancel();
        Ok(())
    }

    async fn get_disk_id(&self) -> Result<Option<Uuid>> {
        Ok(*self.id.lock().await)
    }

    async fn set_disk_id(&self, id: Option<Uuid>) -> Result<()> {
        let mut lock = self.id.lock().await;
        *lock = id;
        Ok(())
    }

    async fn make_volume(&self, _volume: &str) -> Result<()> {
        Err(DiskError::DiskNotFound)
    }

    async fn make_volumes(&self, _volumes: Vec<&str>) -> Result<()> {
        Err(DiskError::DiskNotFound)
    }

    async fn read_all(&self, _volume: &str, _path: &str) -> Result<Bytes> {
        Err(DiskError::DiskNotFound)
    }

    async fn write_all(&self, _volume: &str, _path: &str, _data: Bytes) -> Result<()> {
        Err(DiskError::DiskNotFound)
    }

    async fn rename_file(&self, _src_volume: &str, _src_path: &str, _dst_volume: &str, _dst_path: &str) -> Result<()> {
        Err(DiskError::DiskNotFound)
    }

    async fn delete_volume_contents(&self, _volume: &str) -> Result<()> {
        Err(DiskError::DiskNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::endpoint::PosixPaths;

    #[tokio::test]
    async fn test_remote_disk_is_offline() {
        let ep = Endpoint::parse_with("https://[2001:db8::5]:9000/data", &PosixPaths).unwrap();
        let disk = RemoteDisk::new(&ep).await.unwrap();

        assert_eq!(disk.addr, "https://[2001:db8::5]:9000");
        assert_eq!(disk.path(), PathBuf::from("/data"));
        assert!(!disk.is_online().await);
        assert_eq!(disk.make_volume("vol").await, Err(DiskError::DiskNotFound));

        let id = Uuid::new_v4();
        disk.set_disk_id(Some(id)).await.unwrap();
        assert_eq!(disk.get_disk_id().await.unwrap(), Some(id));

        disk.close().await.unwrap();
        assert!(disk.cancel_token.is_cancelled());
    }
}
