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

use crate::disk::error_reduce::{count_errs, reduce_write_quorum_errs};
use crate::disk::{self, DiskAPI, StorageDriver};
use crate::error::{Error, Result};
use crate::{
    disk::{
        DiskStore, ERASUREFS_META_BUCKET, ERASUREFS_META_TMP_BUCKET, FORMAT_CONFIG_FILE,
        error::DiskError,
        format::{FormatErasureVersion, FormatMetaVersion, FormatV3},
    },
    endpoints::Endpoints,
};
use erasurefs_config::FORMAT_RETRY_MAX_INTERVAL_SECS;
use futures::future::join_all;
use std::time::Duration;
use tokio::select;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Opens every endpoint concurrently. Slot `i` of both vectors belongs to
/// endpoint `i`.
pub async fn init_disks(eps: &Endpoints, driver: &dyn StorageDriver) -> (Vec<Option<DiskStore>>, Vec<Option<DiskError>>) {
    let futures = eps.iter().map(|ep| driver.init(ep));

    let mut res = Vec::with_capacity(eps.len());
    let mut errors = Vec::with_capacity(eps.len());

    let results = join_all(futures).await;
    for result in results {
        match result {
            Ok(s) => {
                res.push(Some(s));
                errors.push(None);
            }
            Err(e) => {
                res.push(None);
                errors.push(Some(e));
            }
        }
    }

    (res, errors)
}

/// Empties the tmp meta volume of every local disk. Leftovers there come
/// from writes interrupted by an unclean shutdown.
pub async fn house_keeping(disks: &[Option<DiskStore>]) -> Result<()> {
    let futures = disks.iter().flatten().filter(|d| d.is_local()).map(|disk| async move {
        disk.delete_volume_contents(ERASUREFS_META_TMP_BUCKET)
            .await
            .map_err(|e| Error::DiskInit {
                endpoint: disk.endpoint().to_string(),
                source: e,
            })
    });

    for result in join_all(futures).await {
        result?;
    }

    Ok(())
}

/// One attempt at agreeing on a format.
///
/// On a fresh cluster the first disk's node writes a new layout once every
/// disk answers as unformatted. Otherwise the format carried by a majority
/// of disks wins. Pending outcomes ([`Error::NotFirstDisk`],
/// [`Error::FirstDiskWait`], [`Error::ErasureReadQuorum`]) mean "try again".
pub async fn connect_load_init_formats(
    first_disk: bool,
    disks: &[Option<DiskStore>],
    set_count: usize,
    set_drive_count: usize,
    deployment_id: Option<Uuid>,
) -> Result<FormatV3> {
    let (formats, errs) = load_format_erasure_all(disks).await;

    check_disk_fatal_errs(&errs)?;

    check_format_erasure_values(&formats, set_drive_count)?;

    if first_disk && should_init_erasure_disks(&errs) {
        info!("formatting {} disks in {} sets", disks.len(), set_count);
        let fm = init_format_erasure(disks, set_count, set_drive_count, deployment_id).await?;

        return Ok(fm);
    }

    let unformatted = quorum_unformatted_disks(&errs);
    info!(
        "first_disk: {}, unformatted in quorum: {}, offline: {}",
        first_disk,
        unformatted,
        count_errs(&errs, &DiskError::DiskNotFound)
    );

    if unformatted && !first_disk {
        return Err(Error::NotFirstDisk);
    }

    if unformatted && first_disk {
        return Err(Error::FirstDiskWait);
    }

    get_format_erasure_in_quorum(&formats)
}

pub fn quorum_unformatted_disks(errs: &[Option<DiskError>]) -> bool {
    count_errs(errs, &DiskError::UnformattedDisk) > (errs.len() / 2)
}

pub fn should_init_erasure_disks(errs: &[Option<DiskError>]) -> bool {
    count_errs(errs, &DiskError::UnformattedDisk) == errs.len()
}

pub fn check_disk_fatal_errs(errs: &[Option<DiskError>]) -> disk::error::Result<()> {
    for fatal in [
        DiskError::UnsupportedDisk,
        DiskError::FileAccessDenied,
        DiskError::DiskNotDir,
        DiskError::CorruptedFormat,
    ] {
        if !errs.is_empty() && count_errs(errs, &fatal) == errs.len() {
            return Err(fatal);
        }
    }

    Ok(())
}

async fn init_format_erasure(
    disks: &[Option<DiskStore>],
    set_count: usize,
    set_drive_count: usize,
    deployment_id: Option<Uuid>,
) -> Result<FormatV3> {
    let mut fm = FormatV3::new(set_count, set_drive_count);
    if let Some(id) = deployment_id {
        fm.id = id;
    }

    let mut fms = Vec::with_capacity(disks.len());
    for i in 0..set_count {
        for j in 0..set_drive_count {
            fms.push(Some(fm.for_disk(i, j)?));
        }
    }

    save_format_file_all(disks, &fms).await?;

    get_format_erasure_in_quorum(&fms)
}

/// The layout shared by more than half of the disks, with `this` cleared.
pub fn get_format_erasure_in_quorum(formats: &[Option<FormatV3>]) -> Result<FormatV3> {
    let mut groups: Vec<(&FormatV3, usize)> = Vec::new();

    for f in formats.iter().flatten() {
        match groups.iter_mut().find(|(seen, _)| seen.same_layout(f)) {
            Some((_, count)) => *count += 1,
            None => groups.push((f, 1)),
        }
    }

    if groups.len() > 1 {
        let ids: Vec<String> = groups.iter().map(|(f, c)| format!("{} ({c} disks)", f.id)).collect();
        return Err(Error::FormatMismatch(format!("found {} different layouts: {}", groups.len(), ids.join(", "))));
    }

    let Some((format, count)) = groups.into_iter().next() else {
        warn!("get_format_erasure_in_quorum: no disk carries a format");
        return Err(Error::ErasureReadQuorum);
    };

    if count <= formats.len() / 2 {
        warn!("get_format_erasure_in_quorum: {} of {} disks formatted", count, formats.len());
        return Err(Error::ErasureReadQuorum);
    }

    let mut format = format.clone();
    format.erasure.this = Uuid::nil();

    Ok(format)
}

pub fn check_format_erasure_values(formats: &[Option<FormatV3>], set_drive_count: usize) -> Result<()> {
    for f in formats.iter().flatten() {
        check_format_erasure_value(f)?;

        if formats.len() != f.drives() {
            return Err(Error::FormatMismatch(format!(
                "format describes {} disks, {} were supplied",
                f.drives(),
                formats.len()
            )));
        }

        if f.erasure.sets.first().map(Vec::len) != Some(set_drive_count) {
            return Err(Error::FormatMismatch(format!(
                "erasure set length does not match {set_drive_count} disks per set"
            )));
        }
    }
    Ok(())
}

fn check_format_erasure_value(format: &FormatV3) -> Result<()> {
    if format.version != FormatMetaVersion::V1 {
        return Err(Error::FormatMismatch("invalid format version".to_string()));
    }

    if format.erasure.version != FormatErasureVersion::V3 {
        return Err(Error::FormatMismatch("invalid erasure format version".to_string()));
    }
    Ok(())
}

/// Reads `format.json` from all disks concurrently.
pub async fn load_format_erasure_all(disks: &[Option<DiskStore>]) -> (Vec<Option<FormatV3>>, Vec<Option<DiskError>>) {
    let futures = disks.iter().map(|disk| async move {
        match disk {
            Some(disk) => load_format_erasure(disk).await,
            None => Err(DiskError::DiskNotFound),
        }
    });

    let mut datas = Vec::with_capacity(disks.len());
    let mut errors = Vec::with_capacity(disks.len());

    let results = join_all(futures).await;
    for (disk, result) in disks.iter().zip(results) {
        match result {
            Ok(s) => {
                if let Some(disk) = disk
                    && let Err(e) = disk.set_disk_id(Some(s.erasure.this)).await
                {
                    warn!("load_format_erasure_all: set disk id on {} failed: {}", disk.endpoint(), e);
                }

                datas.push(Some(s));
                errors.push(None);
            }
            Err(e) => {
                datas.push(None);
                errors.push(Some(e));
            }
        }
    }

    (datas, errors)
}

/// A missing file means the disk is unformatted. An offline disk keeps
/// its [`DiskError::DiskNotFound`] so a fresh layout is never written
/// while part of the cluster is unreachable.
pub async fn load_format_erasure(disk: &DiskStore) -> disk::error::Result<FormatV3> {
    let data = disk
        .read_all(ERASUREFS_META_BUCKET, FORMAT_CONFIG_FILE)
        .await
        .map_err(|e| match e {
            DiskError::FileNotFound => DiskError::UnformattedDisk,
            _ => {
                warn!("load_format_erasure err: {:?} {:?}", disk.to_string(), e);
                e
            }
        })?;

    FormatV3::try_from(data.as_ref()).map_err(|e| {
        warn!("load_format_erasure decode {:?}: {:?}", disk.to_string(), e);
        DiskError::CorruptedFormat
    })
}

async fn save_format_file_all(disks: &[Option<DiskStore>], formats: &[Option<FormatV3>]) -> disk::error::Result<()> {
    let futures = disks.iter().zip(formats.iter()).map(|(disk, format)| save_format_file(disk, format));

    let errors: Vec<Option<DiskError>> = join_all(futures).await.into_iter().map(|r| r.err()).collect();

    if let Some(e) = reduce_write_quorum_errs(&errors, &[], disks.len()) {
        return Err(e);
    }

    Ok(())
}

/// Writes `format` through a tmp file and a rename, so a disk never holds
/// half a `format.json`.
pub async fn save_format_file(disk: &Option<DiskStore>, format: &Option<FormatV3>) -> disk::error::Result<()> {
    let Some(disk) = disk else {
        return Err(DiskError::DiskNotFound);
    };

    let Some(format) = format else {
        return Err(DiskError::other("format is none"));
    };

    let json_data = format.to_json()?;

    let tmpfile = Uuid::new_v4().to_string();

    disk.write_all(ERASUREFS_META_TMP_BUCKET, tmpfile.as_str(), json_data.into_bytes().into())
        .await?;

    disk.rename_file(ERASUREFS_META_TMP_BUCKET, tmpfile.as_str(), ERASUREFS_META_BUCKET, FORMAT_CONFIG_FILE)
        .await?;

    disk.set_disk_id(Some(format.erasure.this)).await?;

    Ok(())
}

/// Retries [`connect_load_init_formats`] until the disks agree.
///
/// Waits 1s after the first miss and doubles up to
/// `FORMAT_RETRY_MAX_INTERVAL_SECS`. Non-pending errors end the wait at
/// once; `cancel` ends it with [`Error::ShutdownRequested`].
pub async fn wait_for_format_disks(
    first_disk: bool,
    disks: &[Option<DiskStore>],
    set_count: usize,
    set_drive_count: usize,
    cancel: &CancellationToken,
) -> Result<FormatV3> {
    let mut interval = 1;
    loop {
        match connect_load_init_formats(first_disk, disks, set_count, set_drive_count, None).await {
            Ok(fm) => return Ok(fm),
            Err(e) if e.is_pending() => {
                warn!("waiting for all disks to be formatted: {e}, retrying in {interval}s");
            }
            Err(e) => return Err(e),
        }

        select! {
            _ = cancel.cancelled() => {
                info!("format wait interrupted by shutdown");
                return Err(Error::ShutdownRequested);
            }
            _ = sleep(Duration::from_secs(interval)) => {}
        }

        interval = (interval * 2).min(FORMAT_RETRY_MAX_INTERVAL_SECS);
    }
}
