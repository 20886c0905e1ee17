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

use crate::disk::format::FormatV3;
use crate::disk::{DiskAPI, DiskStore};
use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

/// The object layer over a set of formatted disks.
///
/// Disk slots keep their endpoint order; offline disks stay as `None`.
#[derive(Debug)]
pub struct ErasureStore {
    format: FormatV3,
    disks: Vec<Option<DiskStore>>,
}

impl ErasureStore {
    pub fn deployment_id(&self) -> Uuid {
        self.format.id
    }

    pub fn format(&self) -> &FormatV3 {
        &self.format
    }

    pub fn disks(&self) -> &[Option<DiskStore>] {
        &self.disks
    }

    pub fn set_count(&self) -> usize {
        self.format.erasure.sets.len()
    }

    pub fn set_drive_count(&self) -> usize {
        self.format.erasure.sets.first().map(Vec::len).unwrap_or_default()
    }

    pub fn local_disks(&self) -> Vec<DiskStore> {
        self.disks.iter().flatten().filter(|d| d.is_local()).cloned().collect()
    }

    pub async fn online_disks(&self) -> usize {
        let mut online = 0;
        for disk in self.disks.iter().flatten() {
            if disk.is_online().await {
                online += 1;
            }
        }
        online
    }
}

/// Builds the object layer once the disks agree on a format.
#[async_trait::async_trait]
pub trait ObjectLayerFactory: Send + Sync {
    async fn activate(&self, disks: &[Option<DiskStore>], format: FormatV3) -> Result<Arc<ErasureStore>>;
}

/// Checks that the layout covers exactly the given disks and wraps them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultObjectLayerFactory;

#[async_trait::async_trait]
impl ObjectLayerFactory for DefaultObjectLayerFactory {
    #[instrument(level = "debug", skip(self, disks, format))]
    async fn activate(&self, disks: &[Option<DiskStore>], format: FormatV3) -> Result<Arc<ErasureStore>> {
        if format.drives() != disks.len() {
            return Err(Error::FormatMismatch(format!(
                "format describes {} disks, {} were initialized",
                format.drives(),
                disks.len()
            )));
        }

        let store = ErasureStore {
            format,
            disks: disks.to_vec(),
        };
        info!(
            "object layer ready: deployment {}, {} sets of {} disks, {} local",
            store.deployment_id(),
            store.set_count(),
            store.set_drive_count(),
            store.local_disks().len()
        );

        Ok(Arc::new(store))
    }
}

/// Holds the object layer once it exists.
///
/// Starts empty; [`ObjectLayerCell::publish`] fills it exactly once.
/// Request handlers read it to decide whether the node can serve yet.
#[derive(Debug, Default)]
pub struct ObjectLayerCell {
    inner: RwLock<Option<Arc<ErasureStore>>>,
}

impl ObjectLayerCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `layer` unless one was already published.
    pub async fn publish(&self, layer: Arc<ErasureStore>) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.is_some() {
            return Err(Error::AlreadyPublished);
        }
        *inner = Some(layer);
        Ok(())
    }

    pub async fn get(&self) -> Option<Arc<ErasureStore>> {
        self.inner.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.read().await.is_some()
    }
}
