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

use crate::disk::error::{DiskError, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum FormatMetaVersion {
    #[serde(rename = "1")]
    V1,

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum FormatBackend {
    #[serde(rename = "xl")]
    Erasure,
    #[serde(rename = "xl-single")]
    ErasureSingle,

    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum FormatErasureVersion {
    #[serde(rename = "3")]
    V3,

    #[serde(other)]
    Unknown,
}

/// Layout of the disks of one deployment.
///
/// `sets` records the disk ids in the order the disks were handed to the
/// very first boot, one inner vector per erasure set. `this` is the id of
/// the disk the file was read from and differs on every disk.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FormatErasureV3 {
    pub version: FormatErasureVersion,

    pub this: Uuid,

    pub sets: Vec<Vec<Uuid>>,
}

/// Contents of `format.json` at the root of every formatted disk:
///
/// ```json
/// {
///   "version": "1",
///   "format": "xl",
///   "id": "XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX",
///   "xl": { "version": "3", "this": "...", "sets": [["...", "..."]] }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FormatV3 {
    pub version: FormatMetaVersion,

    pub format: FormatBackend,

    /// Deployment id, shared by all disks of the cluster.
    pub id: Uuid,

    #[serde(rename = "xl")]
    pub erasure: FormatErasureV3,
}

impl TryFrom<&[u8]> for FormatV3 {
    type Error = JsonError;

    fn try_from(data: &[u8]) -> std::result::Result<Self, Self::Error> {
        serde_json::from_slice(data)
    }
}

impl TryFrom<&str> for FormatV3 {
    type Error = JsonError;

    fn try_from(data: &str) -> std::result::Result<Self, Self::Error> {
        serde_json::from_str(data)
    }
}

impl FormatV3 {
    /// Fresh layout with random disk ids for `num_sets` sets of `set_len` disks.
    pub fn new(num_sets: usize, set_len: usize) -> Self {
        let format = if num_sets * set_len == 1 {
            FormatBackend::ErasureSingle
        } else {
            FormatBackend::Erasure
        };

        Self {
            version: FormatMetaVersion::V1,
            format,
            id: Uuid::new_v4(),
            erasure: FormatErasureV3 {
                version: FormatErasureVersion::V3,
                this: Uuid::nil(),
                sets: (0..num_sets)
                    .map(|_| (0..set_len).map(|_| Uuid::new_v4()).collect())
                    .collect(),
            },
        }
    }

    /// Total number of disks across all sets.
    pub fn drives(&self) -> usize {
        self.erasure.sets.iter().map(Vec::len).sum()
    }

    pub fn to_json(&self) -> std::result::Result<String, JsonError> {
        serde_json::to_string(self)
    }

    /// Copy of this layout as stored on the disk at `set`/`disk`.
    pub fn for_disk(&self, set: usize, disk: usize) -> Result<Self> {
        let this = self
            .erasure
            .sets
            .get(set)
            .and_then(|s| s.get(disk))
            .copied()
            .ok_or_else(|| Error::other(format!("no disk at position {set}:{disk}")))?;

        let mut fm = self.clone();
        fm.erasure.this = this;
        Ok(fm)
    }

    /// Flat position of `disk_id` in the layout, i.e. `set * set_len + disk`.
    pub fn find_disk_index_by_disk_id(&self, disk_id: Uuid) -> Result<usize> {
        if disk_id.is_nil() {
            return Err(DiskError::DiskNotFound);
        }

        let mut idx = 0;
        for set in self.erasure.sets.iter() {
            for d in set.iter() {
                if *d == disk_id {
                    return Ok(idx);
                }
                idx += 1;
            }
        }

        Err(DiskError::InconsistentDisk)
    }

    /// Checks that `other` describes the same deployment and layout and that
    /// its `this` id appears in it.
    pub fn check_other(&self, other: &FormatV3) -> Result<()> {
        if self.id != other.id {
            return Err(Error::other(format!("Deployment id mismatch, expected {}, got {}", self.id, other.id)));
        }

        if self.erasure.sets.len() != other.erasure.sets.len() {
            return Err(Error::other(format!(
                "Expected number of sets {}, got {}",
                self.erasure.sets.len(),
                other.erasure.sets.len()
            )));
        }

        for (i, (ours, theirs)) in self.erasure.sets.iter().zip(other.erasure.sets.iter()).enumerate() {
            if ours.len() != theirs.len() {
                return Err(Error::other(format!(
                    "Each set should be of same size, expected {}, got {}",
                    ours.len(),
                    theirs.len()
                )));
            }

            if let Some(j) = ours.iter().zip(theirs.iter()).position(|(a, b)| a != b) {
                return Err(Error::other(format!(
                    "UUID on positions {i}:{j} do not match, expected {} got {}",
                    ours[j], theirs[j]
                )));
            }
        }

        if other.erasure.sets.iter().flatten().any(|d| *d == other.erasure.this) {
            return Ok(());
        }

        Err(Error::other(format!("DriveID {} not found in any drive sets", other.erasure.this)))
    }

    /// Same deployment and layout, ignoring which disk the copy came from.
    pub fn same_layout(&self, other: &FormatV3) -> bool {
        self.id == other.id && self.format == other.format && self.erasure.sets == other.erasure.sets
    }
}
