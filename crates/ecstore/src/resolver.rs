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

use crate::disk::endpoint::{Endpoint, EndpointType};
use crate::endpoints::{BindAddress, Endpoints};
use crate::error::{Error, Result};
use crate::topology::Topology;
use erasurefs_utils::{is_local_host, local_ips, parse_host};
use std::collections::HashSet;
use std::net::IpAddr;
use tracing::debug;

/// Tells whether TLS material is loaded for this process.
#[async_trait::async_trait]
pub trait TlsProvider: Send + Sync {
    async fn certificates_available(&self) -> bool;
}

/// Decides which endpoints belong to this process.
#[derive(Debug, Clone)]
pub struct Resolver {
    bind: BindAddress,
    local_ips: HashSet<IpAddr>,
}

impl Resolver {
    /// Resolver using the addresses of this machine's interfaces.
    pub fn new(bind: BindAddress) -> Self {
        Self::with_local_ips(bind, local_ips().clone())
    }

    pub fn with_local_ips(bind: BindAddress, local_ips: HashSet<IpAddr>) -> Self {
        Self { bind, local_ips }
    }

    pub fn bind(&self) -> &BindAddress {
        &self.bind
    }

    /// Local paths are always local. With a bind host, a networked endpoint
    /// is local only when its `host:port` is the bind address. Without one,
    /// its host is resolved and compared to the interface addresses.
    pub fn is_local(&self, endpoint: &Endpoint) -> Result<bool> {
        if endpoint.get_type() == EndpointType::Path {
            return Ok(true);
        }

        if self.bind.has_host() {
            return Ok(endpoint.host_port() == self.bind.host_port());
        }

        is_local_host(parse_host(&endpoint.host), &self.local_ips).map_err(|e| Error::HostResolution {
            host: endpoint.host.clone(),
            reason: e.to_string(),
        })
    }

    /// Returns the endpoints with their locality filled in.
    pub fn tag(&self, endpoints: Endpoints) -> Result<Endpoints> {
        let mut tagged = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints.into_inner() {
            let is_local = self.is_local(&endpoint)?;
            debug!("endpoint {} is {}", endpoint, if is_local { "local" } else { "remote" });
            tagged.push(endpoint.with_local(is_local));
        }
        Ok(tagged.into())
    }

    /// With a bind host, an argument list where nothing is local means the
    /// bind address names none of the networked endpoints. That is reported
    /// as the mismatch rather than as a missing local disk.
    pub fn check_bind_present(&self, endpoints: &Endpoints) -> Result<()> {
        if !self.bind.has_host() || endpoints.iter().any(|ep| ep.is_local) {
            return Ok(());
        }
        Err(Error::BindAddressNotFound {
            addr: self.bind.host_port(),
            args: endpoints.to_string(),
        })
    }

    /// With a bind host in a distributed setup, exactly one endpoint must
    /// name the bind address: one process serves one disk.
    pub fn check_bind_address(&self, endpoints: &Endpoints, topology: Topology) -> Result<()> {
        if !topology.is_distributed() || !self.bind.has_host() {
            return Ok(());
        }

        let addr = self.bind.host_port();
        let found = endpoints
            .iter()
            .filter(|ep| ep.get_type() == EndpointType::Url && ep.host_port() == addr)
            .count();

        match found {
            1 => Ok(()),
            0 => Err(Error::BindAddressNotFound {
                addr,
                args: endpoints.to_string(),
            }),
            count => Err(Error::BindAddressAmbiguous {
                addr,
                count,
                args: endpoints.to_string(),
            }),
        }
    }
}

/// Fails unless at least one endpoint is local to this process.
pub fn check_any_local(endpoints: &Endpoints) -> Result<()> {
    if endpoints.iter().any(|ep| ep.is_local) {
        return Ok(());
    }
    Err(Error::NoLocalEndpoint)
}

/// `https` endpoints need certificates.
pub async fn check_tls(endpoints: &Endpoints, tls: &dyn TlsProvider) -> Result<()> {
    if endpoints.iter().any(Endpoint::is_https) && !tls.certificates_available().await {
        return Err(Error::CertificatesRequired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::endpoint::PosixPaths;
    use crate::topology::classify;

    struct StaticTls(bool);

    #[async_trait::async_trait]
    impl TlsProvider for StaticTls {
        async fn certificates_available(&self) -> bool {
            self.0
        }
    }

    fn resolver(addr: &str) -> Resolver {
        Resolver::with_local_ips(BindAddress::parse(addr).unwrap(), HashSet::new())
    }

    fn endpoints(args: &[&str], r: &Resolver) -> Endpoints {
        Endpoints::parse_with(args, r.bind(), &PosixPaths).unwrap().sort()
    }

    #[test]
    fn test_locality_without_bind_host() {
        let r = resolver(":9000");
        let ip = "192.0.2.7".parse::<IpAddr>().unwrap();
        let with_ip = Resolver::with_local_ips(r.bind().clone(), HashSet::from([ip]));

        let eps = endpoints(&["/data", "http://127.0.0.1/d1", "http://192.0.2.7/d2", "http://[::1]/d3"], &r);
        let tagged = r.tag(eps.clone()).unwrap();
        let flags: Vec<bool> = tagged.iter().map(|ep| ep.is_local).collect();
        assert_eq!(flags, vec![true, true, false, true]);

        let tagged = with_ip.tag(eps).unwrap();
        assert!(tagged.iter().all(|ep| ep.is_local));
    }

    #[test]
    fn test_locality_with_bind_host_is_textual() {
        let r = resolver("127.0.0.1:9001");
        let eps = endpoints(&["http://127.0.0.1:9001/d1", "http://127.0.0.1:9002/d2", "/data"], &r);
        let tagged = r.tag(eps).unwrap();
        let locals: Vec<String> = tagged.iter().filter(|ep| ep.is_local).map(Endpoint::to_string).collect();
        assert_eq!(locals, vec!["/data", "http://127.0.0.1:9001/d1"]);
    }

    #[test]
    fn test_no_local_endpoint() {
        let r = resolver(":9000");
        let tagged = r.tag(endpoints(&["http://192.0.2.1/d1", "http://192.0.2.2/d2"], &r)).unwrap();
        let err = check_any_local(&tagged).unwrap_err();
        assert_eq!(
            err.to_string(),
            "None of the disks passed as command line args are local to this server"
        );
    }

    #[test]
    fn test_bind_host_case_insensitive() {
        let r = resolver("NODE1:9001");
        let args = [
            "http://NODE1:9001/d1",
            "http://node2:9001/d2",
            "http://node3:9001/d3",
            "http://node4:9001/d4",
        ];
        let tagged = r.tag(endpoints(&args, &r)).unwrap();
        let locals: Vec<String> = tagged.iter().filter(|ep| ep.is_local).map(Endpoint::to_string).collect();
        assert_eq!(locals, vec!["http://node1:9001/d1"]);

        check_any_local(&tagged).unwrap();
        r.check_bind_address(&tagged, classify(&tagged).unwrap()).unwrap();
    }

    #[test]
    fn test_bind_present_with_only_urls() {
        let r = resolver("192.0.2.9:9001");
        let args = [
            "http://192.0.2.1:9001/d1",
            "http://192.0.2.2:9001/d2",
            "http://192.0.2.3:9001/d3",
            "http://192.0.2.4:9001/d4",
        ];
        let tagged = r.tag(endpoints(&args, &r)).unwrap();
        match r.check_bind_present(&tagged) {
            Err(Error::BindAddressNotFound { addr, args }) => {
                assert_eq!(addr, "192.0.2.9:9001");
                assert!(args.contains("http://192.0.2.1:9001/d1"), "{args}");
            }
            res => panic!("expected bind address not found, got {res:?}"),
        }

        // Without a bind host the generic locality error still applies.
        let any = resolver(":9001");
        let tagged = any.tag(endpoints(&args, &any)).unwrap();
        any.check_bind_present(&tagged).unwrap();

        let matched = resolver("192.0.2.1:9001");
        let tagged = matched.tag(endpoints(&args, &matched)).unwrap();
        matched.check_bind_present(&tagged).unwrap();
    }

    #[test]
    fn test_bind_address_match() {
        let r = resolver("192.0.2.1:9001");
        let args = [
            "http://192.0.2.1:9001/d1",
            "http://192.0.2.1:9002/d2",
            "http://192.0.2.2:9001/d3",
            "http://192.0.2.2:9002/d4",
        ];
        let tagged = r.tag(endpoints(&args, &r)).unwrap();
        let topology = classify(&tagged).unwrap();
        assert_eq!(topology, Topology::DistErasure);
        r.check_bind_address(&tagged, topology).unwrap();

        let other = resolver("192.0.2.9:9001");
        let tagged = other.tag(endpoints(&args, &other)).unwrap();
        match other.check_bind_address(&tagged, Topology::DistErasure) {
            Err(Error::BindAddressNotFound { addr, .. }) => assert_eq!(addr, "192.0.2.9:9001"),
            res => panic!("expected bind address not found, got {res:?}"),
        }

        let twice = [
            "http://192.0.2.1:9001/d1",
            "http://192.0.2.1:9001/d2",
            "http://192.0.2.2:9001/d3",
            "http://192.0.2.2:9002/d4",
        ];
        let tagged = r.tag(endpoints(&twice, &r)).unwrap();
        match r.check_bind_address(&tagged, Topology::DistErasure) {
            Err(Error::BindAddressAmbiguous { count, .. }) => assert_eq!(count, 2),
            res => panic!("expected ambiguous bind address, got {res:?}"),
        }

        // Only distributed setups are bound to a single disk.
        let single = endpoints(&["/home/shared"], &r);
        r.check_bind_address(&single, Topology::Single).unwrap();
    }

    #[tokio::test]
    async fn test_tls_required_for_https() {
        let r = resolver(":9000");
        let secure = r.tag(endpoints(&["https://127.0.0.1/d1"], &r)).unwrap();
        let plain = r.tag(endpoints(&["http://127.0.0.1/d1"], &r)).unwrap();

        assert!(matches!(check_tls(&secure, &StaticTls(false)).await, Err(Error::CertificatesRequired)));
        check_tls(&secure, &StaticTls(true)).await.unwrap();
        check_tls(&plain, &StaticTls(false)).await.unwrap();
    }
}
