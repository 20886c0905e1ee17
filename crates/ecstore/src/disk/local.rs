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

use super::endpoint::Endpoint;
use super::error::{DiskError, Error, Result, to_file_error, to_volume_error};
use super::format::FormatV3;
use super::{
    DiskAPI, ERASUREFS_META_BUCKET, ERASUREFS_META_BUCKETS_BUCKET, ERASUREFS_META_MULTIPART_BUCKET, ERASUREFS_META_TMP_BUCKET,
    FORMAT_CONFIG_FILE,
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct FormatInfo {
    id: Option<Uuid>,
    data: Bytes,
}

/// A disk backed by a directory of this machine.
#[derive(Debug)]
pub struct LocalDisk {
    root: PathBuf,
    endpoint: Endpoint,
    format_path: PathBuf,
    format_info: RwLock<FormatInfo>,
}

impl std::fmt::Display for LocalDisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root.display())
    }
}

impl LocalDisk {
    /// Opens the directory behind `ep` and creates the metadata volumes.
    ///
    /// When the directory already carries a `format.json`, the disk id it
    /// records must sit at the endpoint's position in the layout, otherwise
    /// the disk was moved and [`DiskError::InconsistentDisk`] is returned.
    pub async fn new(ep: &Endpoint) -> Result<Self> {
        debug!("Creating local disk");
        let root = match fs::canonicalize(ep.get_file_path()).await {
            Ok(path) => path,
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    return Err(DiskError::VolumeNotFound);
                }
                return Err(to_file_error(e));
            }
        };

        let meta = fs::metadata(&root).await.map_err(to_file_error)?;
        if !meta.is_dir() {
            return Err(DiskError::DiskNotDir);
        }

        let format_path = root.join(ERASUREFS_META_BUCKET).join(FORMAT_CONFIG_FILE);
        debug!("format_path: {:?}", format_path);
        let format_data = read_file_exists(&format_path).await?;

        let mut id = None;
        if !format_data.is_empty() {
            let fm = FormatV3::try_from(format_data.as_ref()).map_err(|e| {
                warn!("decode {:?} err {:?}", format_path, e);
                DiskError::CorruptedFormat
            })?;
            let disk_idx = fm.find_disk_index_by_disk_id(fm.erasure.this)?;

            if ep.disk_idx >= 0 && disk_idx as i32 != ep.disk_idx {
                return Err(DiskError::InconsistentDisk);
            }

            id = Some(fm.erasure.this);
        }

        let disk = Self {
            root,
            endpoint: ep.clone(),
            format_path,
            format_info: RwLock::new(FormatInfo { id, data: format_data }),
        };

        disk.make_meta_volumes().await?;

        debug!("LocalDisk created: {:?}", disk);
        Ok(disk)
    }

    async fn make_meta_volumes(&self) -> Result<()> {
        self.make_volumes(vec![
            ERASUREFS_META_BUCKET,
            ERASUREFS_META_TMP_BUCKET,
            ERASUREFS_META_BUCKETS_BUCKET,
            ERASUREFS_META_MULTIPART_BUCKET,
        ])
        .await
    }

    fn get_bucket_path(&self, volume: &str) -> Result<PathBuf> {
        check_relative(volume)?;
        Ok(self.root.join(volume))
    }

    fn get_object_path(&self, volume: &str, path: &str) -> Result<PathBuf> {
        check_relative(path)?;
        Ok(self.get_bucket_path(volume)?.join(path))
    }

    async fn check_volume(&self, volume: &str) -> Result<PathBuf> {
        let dir = self.get_bucket_path(volume)?;
        fs::metadata(&dir).await.map_err(to_volume_error)?;
        Ok(dir)
    }

    fn is_format_file(volume: &str, path: &str) -> bool {
        volume == ERASUREFS_META_BUCKET && path == FORMAT_CONFIG_FILE
    }

    async fn invalidate_format_cache(&self) {
        let mut format_info = self.format_info.write().await;
        format_info.id = None;
        format_info.data = Bytes::new();
    }
}

fn check_relative(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DiskError::InvalidPath);
    }
    let escapes = Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(DiskError::InvalidPath);
    }
    Ok(())
}

async fn read_file_exists(path: impl AsRef<Path>) -> Result<Bytes> {
    match fs::read(path.as_ref()).await {
        Ok(data) => Ok(data.into()),
        Err(e) => match to_file_error(e) {
            DiskError::FileNotFound => Ok(Bytes::new()),
            err => Err(err),
        },
    }
}

#[async_trait::async_trait]
impl DiskAPI for LocalDisk {
    fn to_string(&self) -> String {
        format!("{self}")
    }

    async fn is_online(&self) -> bool {
        fs::metadata(&self.root).await.is_ok_and(|m| m.is_dir())
    }

    fn is_local(&self) -> bool {
        true
    }

    fn host_name(&self) -> String {
        self.endpoint.host_port()
    }

    fn endpoint(&self) -> Endpoint {
        self.endpoint.clone()
    }

    fn path(&self) -> PathBuf {
        self.root.clone()
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn get_disk_id(&self) -> Result<Option<Uuid>> {
        let b = match fs::read(&self.format_path).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.invalidate_format_cache().await;
                return Err(DiskError::UnformattedDisk);
            }
            Err(e) => return Err(to_file_error(e)),
        };

        let fm = FormatV3::try_from(b.as_slice()).map_err(|e| {
            warn!("decode format.json err {:?}", e);
            DiskError::CorruptedFormat
        })?;

        let disk_idx = fm.find_disk_index_by_disk_id(fm.erasure.this)?;
        if self.endpoint.disk_idx >= 0 && disk_idx as i32 != self.endpoint.disk_idx {
            return Err(DiskError::InconsistentDisk);
        }

        let mut format_info = self.format_info.write().await;
        format_info.id = Some(fm.erasure.this);
        format_info.data = b.into();

        Ok(Some(fm.erasure.this))
    }

    async fn set_disk_id(&self, id: Option<Uuid>) -> Result<()> {
        self.format_info.write().await.id = id;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn make_volume(&self, volume: &str) -> Result<()> {
        let volume_dir = self.get_bucket_path(volume)?;

        if let Err(e) = fs::metadata(&volume_dir).await {
            if e.kind() == ErrorKind::NotFound {
                fs::create_dir_all(&volume_dir).await.map_err(to_volume_error)?;
                return Ok(());
            }
            error!("local disk make volume failed: {e}");
            return Err(to_volume_error(e));
        }

        Err(DiskError::VolumeExists)
    }

    async fn make_volumes(&self, volumes: Vec<&str>) -> Result<()> {
        for vol in volumes {
            if let Err(e) = self.make_volume(vol).await
                && e != DiskError::VolumeExists
            {
                error!("local disk make volumes failed: {e}");
                return Err(e);
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn read_all(&self, volume: &str, path: &str) -> Result<Bytes> {
        if Self::is_format_file(volume, path) {
            let format_info = self.format_info.read().await;
            if !format_info.data.is_empty() {
                return Ok(format_info.data.clone());
            }
        }

        self.check_volume(volume).await?;
        let p = self.get_object_path(volume, path)?;
        let data = fs::read(&p).await.map_err(to_file_error)?;

        Ok(data.into())
    }

    #[tracing::instrument(level = "debug", skip(self, data))]
    async fn write_all(&self, volume: &str, path: &str, data: Bytes) -> Result<()> {
        let volume_dir = self.check_volume(volume).await?;
        let p = self.get_object_path(volume, path)?;

        if let Some(parent) = p.parent()
            && parent != volume_dir
        {
            fs::create_dir_all(parent).await.map_err(to_file_error)?;
        }

        fs::write(&p, &data).await.map_err(to_file_error)?;

        if Self::is_format_file(volume, path) {
            self.invalidate_format_cache().await;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn rename_file(&self, src_volume: &str, src_path: &str, dst_volume: &str, dst_path: &str) -> Result<()> {
        self.check_volume(src_volume).await?;
        let dst_volume_dir = self.check_volume(dst_volume).await?;

        let src_file_path = self.get_object_path(src_volume, src_path)?;
        let dst_file_path = self.get_object_path(dst_volume, dst_path)?;

        if let Some(parent) = dst_file_path.parent()
            && parent != dst_volume_dir
        {
            fs::create_dir_all(parent).await.map_err(to_file_error)?;
        }

        fs::rename(&src_file_path, &dst_file_path).await.map_err(to_file_error)?;

        if Self::is_format_file(dst_volume, dst_path) {
            self.invalidate_format_cache().await;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_volume_contents(&self, volume: &str) -> Result<()> {
        let dir = self.get_bucket_path(volume)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(to_volume_error(e)),
        };

        while let Some(entry) = entries.next_entry().await.map_err(Error::from)? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(Error::from)?;

            let removed = if file_type.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            };

            if let Err(e) = removed
                && e.kind() != ErrorKind::NotFound
            {
                return Err(to_file_error(e));
            }
        }

        Ok(())
    }
}
