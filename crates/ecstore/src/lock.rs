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
use crate::endpoints::Endpoints;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tracing::info;

/// Registers the nodes that take part in distributed locking.
#[async_trait::async_trait]
pub trait LockCoordinator: Send + Sync {
    async fn register_peers(&self, endpoints: &[Endpoint]) -> Result<()>;
}

/// Namespace lock for volume/path resources.
///
/// Locks are always taken in process. In distributed mode the lock also
/// records its peers, the other nodes of the cluster, and its quorum
/// becomes a majority of all nodes.
#[derive(Debug)]
pub struct NamespaceLock {
    distributed: bool,
    peers: RwLock<Vec<String>>,
    locks: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl NamespaceLock {
    pub fn new(distributed: bool) -> Self {
        Self {
            distributed,
            peers: RwLock::new(Vec::new()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_distributed(&self) -> bool {
        self.distributed
    }

    /// Other nodes taking part in locking, as `host:port`.
    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.clone()
    }

    /// Votes needed to grant a lock: 1 locally, a majority of nodes otherwise.
    pub async fn quorum(&self) -> usize {
        let nodes = self.peers.read().await.len() + 1;
        if nodes > 1 { nodes / 2 + 1 } else { 1 }
    }

    fn resource_key(volume: &str, path: &str) -> String {
        format!("{volume}/{path}")
    }

    async fn entry(&self, volume: &str, path: &str) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(Self::resource_key(volume, path)).or_default().clone()
    }

    /// Exclusive lock on `volume/path`, released when the guard drops.
    pub async fn lock(&self, volume: &str, path: &str) -> OwnedRwLockWriteGuard<()> {
        self.entry(volume, path).await.write_owned().await
    }

    /// Shared lock on `volume/path`, released when the guard drops.
    pub async fn rlock(&self, volume: &str, path: &str) -> OwnedRwLockReadGuard<()> {
        self.entry(volume, path).await.read_owned().await
    }
}

#[async_trait::async_trait]
impl LockCoordinator for NamespaceLock {
    async fn register_peers(&self, endpoints: &[Endpoint]) -> Result<()> {
        if !self.distributed {
            return Err(Error::LockCoordinator("namespace lock is running in local mode".to_string()));
        }

        let peers = Endpoints::from(endpoints.to_vec()).remote_peers();
        info!("distributed locking with {} peers: {:?}", peers.len(), peers);
        *self.peers.write().await = peers;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::endpoint::PosixPaths;
    use std::time::Duration;

    fn endpoint(s: &str, local: bool) -> Endpoint {
        Endpoint::parse_with(s, &PosixPaths).unwrap().with_local(local)
    }

    #[tokio::test]
    async fn test_register_peers() {
        let ns = NamespaceLock::new(true);
        let eps = vec![
            endpoint("http://192.0.2.1:9000/d1", true),
            endpoint("http://192.0.2.1:9000/d2", true),
            endpoint("http://192.0.2.2:9000/d1", false),
            endpoint("http://192.0.2.2:9000/d2", false),
            endpoint("http://192.0.2.3:9000/d1", false),
            endpoint("http://192.0.2.3:9000/d2", false),
        ];

        ns.register_peers(&eps).await.unwrap();
        assert_eq!(ns.peers().await, vec!["192.0.2.2:9000", "192.0.2.3:9000"]);
        assert_eq!(ns.quorum().await, 2);
    }

    #[tokio::test]
    async fn test_local_mode_refuses_peers() {
        let ns = NamespaceLock::new(false);
        assert!(!ns.is_distributed());
        assert_eq!(ns.quorum().await, 1);
        assert!(matches!(ns.register_peers(&[]).await, Err(Error::LockCoordinator(_))));
    }

    #[tokio::test]
    async fn test_lock_excludes_writers() {
        let ns = Arc::new(NamespaceLock::new(false));
        let guard = ns.lock("vol", "obj").await;

        let ns2 = ns.clone();
        let waiter = tokio::spawn(async move {
            let _g = ns2.lock("vol", "obj").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        // A different resource is independent.
        let _other = ns.rlock("vol", "other").await;

        drop(guard);
        waiter.await.unwrap();

        let _r1 = ns.rlock("vol", "obj").await;
        let _r2 = ns.rlock("vol", "obj").await;
    }
}
