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


//! Startup sequence of a node.
//!
//! Every step must succeed before the next one starts. The only step that
//! waits on other nodes is format consensus, which ends either with a
//! format all disks agree on or with a shutdown request.

use crate::config::ServerOpts;
use crate::server::{CertsDir, ProbeHandler, ServiceState, ServiceStateManager, start_http_server};
use erasurefs_ecstore::disk::{DefaultStorageDriver, DiskStore, StorageDriver};
use erasurefs_ecstore::error::{Error, Result};
use erasurefs_ecstore::lock::{LockCoordinator, NamespaceLock};
use erasurefs_ecstore::resolver::{Resolver, TlsProvider, check_any_local, check_tls};
use erasurefs_ecstore::store::{DefaultObjectLayerFactory, ObjectLayerFactory};
use erasurefs_ecstore::store_init::{house_keeping, init_disks, wait_for_format_disks};
use erasurefs_ecstore::topology::{check_duplicates, classify};
use erasurefs_ecstore::{BindAddress, Endpoints, ErasureStore, ObjectLayerCell, Topology};
use erasurefs_utils::{join_host_port, local_ips};
use std::collections::{BTreeSet, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// What validation settled. Never changes afterwards.
#[derive(Debug, Clone)]
pub struct ServerBootstrapConfig {
    pub bind: BindAddress,
    /// Ordered, locality-tagged endpoints.
    pub endpoints: Endpoints,
    pub topology: Topology,
    /// Certificates are loaded and the listener speaks TLS.
    pub tls: bool,
}

impl ServerBootstrapConfig {
    pub fn scheme(&self) -> &'static str {
        if self.tls { "https" } else { "http" }
    }

    /// All disks form one erasure set.
    pub fn set_layout(&self) -> (usize, usize) {
        (1, self.endpoints.len())
    }

    /// `host:port` of the first local networked endpoint, or the bind address.
    pub fn local_address(&self) -> String {
        self.endpoints
            .local_host_port()
            .unwrap_or_else(|| self.bind.host_port())
    }

    /// URLs clients can reach this node on. A wildcard bind lists every
    /// interface address plus loopback.
    pub fn api_endpoints(&self, local_ips: &HashSet<IpAddr>) -> Vec<String> {
        let scheme = self.scheme();
        let wildcard = !self.bind.has_host() || self.bind.host.parse::<IpAddr>().is_ok_and(|ip| ip.is_unspecified());
        if !wildcard {
            return vec![format!("{scheme}://{}", self.bind.host_port())];
        }

        let mut ips: BTreeSet<IpAddr> = local_ips.iter().copied().collect();
        ips.insert(IpAddr::V4(Ipv4Addr::LOCALHOST));
        ips.into_iter()
            .map(|ip| format!("{scheme}://{}", join_host_port(&ip.to_string(), self.bind.port)))
            .collect()
    }
}

/// Runs the startup steps against pluggable collaborators.
pub struct Bootstrap {
    certs: CertsDir,
    tls: Arc<dyn TlsProvider>,
    driver: Arc<dyn StorageDriver>,
    factory: Arc<dyn ObjectLayerFactory>,
    lock_coordinator: Option<Arc<dyn LockCoordinator>>,
    local_ips: Option<HashSet<IpAddr>>,
    cell: Arc<ObjectLayerCell>,
}

impl Bootstrap {
    pub(crate) fn new(certs: CertsDir) -> Self {
        Self {
            tls: Arc::new(certs.clone()),
            certs,
            driver: Arc::new(DefaultStorageDriver),
            factory: Arc::new(DefaultObjectLayerFactory),
            lock_coordinator: None,
            local_ips: None,
            cell: Arc::new(ObjectLayerCell::new()),
        }
    }

    fn resolver(&self, bind: BindAddress) -> Resolver {
        match &self.local_ips {
            Some(ips) => Resolver::with_local_ips(bind, ips.clone()),
            None => Resolver::new(bind),
        }
    }

    /// Fixes the bind address, then checks the disk arguments against it.
    #[instrument(level = "debug", skip(self, volumes))]
    pub async fn validate<T: AsRef<str>>(&self, address: &str, volumes: &[T]) -> Result<ServerBootstrapConfig> {
        let bind = BindAddress::resolve(address)?;
        info!(target: "erasurefs::bootstrap", "bind address {} resolved to port {}", bind, bind.port);

        let endpoints = Endpoints::parse(volumes, &bind)?;
        check_duplicates(&endpoints)?;

        let resolver = self.resolver(bind.clone());
        let endpoints = resolver.tag(endpoints)?;
        resolver.check_bind_present(&endpoints)?;
        check_any_local(&endpoints)?;

        let topology = classify(&endpoints)?;
        resolver.check_bind_address(&endpoints, topology)?;
        check_tls(&endpoints, self.tls.as_ref()).await?;

        let tls = self.tls.certificates_available().await;
        let endpoints = endpoints.sort();
        info!(
            target: "erasurefs::bootstrap",
            "validated {} endpoints, topology {}",
            endpoints.len(),
            topology
        );

        Ok(ServerBootstrapConfig {
            bind,
            endpoints,
            topology,
            tls,
        })
    }

    /// Opens every disk and clears leftovers from its tmp area.
    ///
    /// A remote disk that cannot be reached stays as an empty slot; its node
    /// may still be starting. A local one that fails is fatal.
    pub async fn init_storage(&self, config: &ServerBootstrapConfig) -> Result<Vec<Option<DiskStore>>> {
        let (disks, errs) = init_disks(&config.endpoints, self.driver.as_ref()).await;

        for (endpoint, err) in config.endpoints.iter().zip(errs) {
            let Some(err) = err else {
                continue;
            };
            if endpoint.is_local {
                error!(target: "erasurefs::bootstrap", "local disk {} failed to initialize: {}", endpoint, err);
                return Err(Error::DiskInit {
                    endpoint: endpoint.to_string(),
                    source: err,
                });
            }
            warn!(target: "erasurefs::bootstrap", "remote disk {} is offline: {}", endpoint, err);
        }

        house_keeping(&disks).await?;
        info!(
            target: "erasurefs::bootstrap",
            "initialized {} of {} disks",
            disks.iter().flatten().count(),
            disks.len()
        );

        Ok(disks)
    }

    /// The namespace lock always exists; only a distributed node registers peers.
    pub async fn init_namespace_lock(&self, config: &ServerBootstrapConfig) -> Result<Arc<NamespaceLock>> {
        let distributed = config.topology.is_distributed();
        let ns_lock = Arc::new(NamespaceLock::new(distributed));

        if distributed {
            let coordinator: Arc<dyn LockCoordinator> = match &self.lock_coordinator {
                Some(coordinator) => coordinator.clone(),
                None => ns_lock.clone(),
            };
            coordinator.register_peers(config.endpoints.as_slice()).await?;
        }

        debug!("namespace lock ready, distributed: {}", distributed);
        Ok(ns_lock)
    }

    /// Waits for format consensus, builds the object layer and publishes it.
    pub async fn activate(
        &self,
        config: &ServerBootstrapConfig,
        disks: &[Option<DiskStore>],
        shutdown: &CancellationToken,
    ) -> Result<Arc<ErasureStore>> {
        let (set_count, set_drive_count) = config.set_layout();
        let first_disk = config.endpoints.first_local();
        info!(
            target: "erasurefs::bootstrap",
            "waiting for format consensus on {} disks (first disk local: {})",
            disks.len(),
            first_disk
        );

        let format = wait_for_format_disks(first_disk, disks, set_count, set_drive_count, shutdown).await?;
        let store = self.factory.activate(disks, format).await?;
        self.cell.publish(store.clone()).await?;

        Ok(store)
    }

    /// Runs the whole sequence, then serves until `shutdown` fires.
    pub async fn run(&self, opts: &ServerOpts, shutdown: CancellationToken) -> Result<()> {
        let state = ServiceStateManager::new();
        state.update(ServiceState::Starting);

        if let Some(credentials) = opts.credentials()? {
            info!(target: "erasurefs::bootstrap", "using access key {}", credentials.access_key);
        }
        self.certs.create_certs_dir().await?;

        let config = Arc::new(self.validate(&opts.address, &opts.volumes).await?);
        let disks = self.init_storage(&config).await?;
        let handler = ProbeHandler::new(config.clone(), self.cell.clone());
        let ns_lock = self.init_namespace_lock(&config).await?;

        let tls_acceptor = if config.tls { self.certs.tls_acceptor().await? } else { None };
        let server = start_http_server(&config.bind, handler, self.cell.clone(), tls_acceptor, state.clone()).await?;
        info!(
            target: "erasurefs::bootstrap",
            "listener started on {} (tls: {})",
            server.local_addr(),
            server.is_tls()
        );

        let store = match self.activate(&config, &disks, &shutdown).await {
            Ok(store) => store,
            Err(e) => {
                server.shutdown().await;
                return Err(e);
            }
        };
        state.update(ServiceState::Ready);

        print_banner(&config, &store, ns_lock.quorum().await);

        shutdown.cancelled().await;
        info!(target: "erasurefs::bootstrap", "shutting down");
        server.shutdown().await;

        Ok(())
    }
}

/// Collaborator overrides.
#[cfg(test)]
impl Bootstrap {
    pub fn with_tls_provider(mut self, tls: Arc<dyn TlsProvider>) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_driver(mut self, driver: Arc<dyn StorageDriver>) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn ObjectLayerFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Peers are handed to `coordinator` instead of the namespace lock.
    pub fn with_lock_coordinator(mut self, coordinator: Arc<dyn LockCoordinator>) -> Self {
        self.lock_coordinator = Some(coordinator);
        self
    }

    /// Treats `ips` as this machine's addresses instead of asking the interfaces.
    pub fn with_local_ips(mut self, ips: HashSet<IpAddr>) -> Self {
        self.local_ips = Some(ips);
        self
    }

    pub fn cell(&self) -> Arc<ObjectLayerCell> {
        self.cell.clone()
    }
}

fn print_banner(config: &ServerBootstrapConfig, store: &ErasureStore, lock_quorum: usize) {
    let api_endpoints = config.api_endpoints(local_ips()).join("  ");
    let now_time = jiff::Zoned::now().strftime("%Y-%m-%d %H:%M:%S").to_string();

    info!(target: "erasurefs::main::startup", "ErasureFS API: {api_endpoints}");
    info!(
        target: "erasurefs::main::startup",
        "topology: {}, local address: {}, deployment: {}, {} disks ({} local), lock quorum: {}",
        config.topology,
        config.local_address(),
        store.deployment_id(),
        store.disks().len(),
        store.local_disks().len(),
        lock_quorum
    );
    println!("ErasureFS Http API: {api_endpoints}");
    println!("ErasureFS Start Time: {now_time}");
    println!("ErasureFS Topology: {} ({} disks)", config.topology, config.endpoints.len());
}
