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

use crate::disk::endpoint::{Endpoint, EndpointType, NativePaths, PathNormalizer};
use crate::error::{Error, Result};
use erasurefs_utils::{check_port_available, join_host_port, split_host_port};
use std::collections::BTreeSet;
use std::fmt::Display;
use tracing::{debug, instrument};

/// The host and port this process listens on, as given by `--address`.
///
/// Built once during startup and read-only afterwards. An empty `host`
/// means the process listens on every interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddress {
    pub host: String,
    pub port: u16,
    pub raw: String,
}

impl Display for BindAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl BindAddress {
    /// Splits `addr` into host and port without touching the network.
    pub fn parse(addr: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidAddress {
            addr: addr.to_string(),
            reason,
        };

        if !addr.contains(':') {
            return Err(invalid("missing port in address".to_string()));
        }

        let (host, port) = split_host_port(addr).map_err(|e| invalid(e.to_string()))?;
        let port = match port.as_deref() {
            None | Some("0") => return Err(Error::EmptyPort),
            Some(p) => p.parse::<u16>().map_err(|e| invalid(format!("invalid port {p}: {e}")))?,
        };
        if port == 0 {
            return Err(Error::EmptyPort);
        }

        Ok(Self {
            host: normalize_host(host),
            port,
            raw: addr.to_string(),
        })
    }

    /// Parses `addr` and makes sure its port can still be bound.
    pub fn resolve(addr: &str) -> Result<Self> {
        let bind = Self::parse(addr)?;
        check_port_available(bind.port).map_err(|e| Error::PortUnavailable {
            port: bind.port,
            reason: e.to_string(),
        })?;
        Ok(bind)
    }

    pub fn has_host(&self) -> bool {
        !self.host.is_empty()
    }

    /// `host:port` with IPv6 hosts bracketed, `:port` without a host.
    pub fn host_port(&self) -> String {
        if self.host.is_empty() {
            format!(":{}", self.port)
        } else {
            join_host_port(&self.host, self.port)
        }
    }
}

/// Renders `host` the way endpoint URLs render theirs: domains lowercased,
/// IPv6 compressed. Hosts the url crate rejects are kept as typed.
fn normalize_host(host: String) -> String {
    if host.is_empty() {
        return host;
    }
    let candidate = if host.contains(':') { format!("[{host}]") } else { host.clone() };
    match url::Host::parse(&candidate) {
        Ok(url::Host::Ipv6(ip)) => ip.to_string(),
        Ok(parsed) => parsed.to_string(),
        Err(_) => host,
    }
}

/// list of same type of endpoint.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Endpoints(Vec<Endpoint>);

impl AsRef<Vec<Endpoint>> for Endpoints {
    fn as_ref(&self) -> &Vec<Endpoint> {
        &self.0
    }
}

impl From<Vec<Endpoint>> for Endpoints {
    fn from(v: Vec<Endpoint>) -> Self {
        Self(v)
    }
}

impl Display for Endpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let args: Vec<String> = self.0.iter().map(Endpoint::to_string).collect();
        write!(f, "{}", args.join(" "))
    }
}

impl Endpoints {
    /// Parses every argument with the platform's path rules.
    pub fn parse<T: AsRef<str>>(args: &[T], bind: &BindAddress) -> Result<Self> {
        Self::parse_with(args, bind, &NativePaths::default())
    }

    /// Parses every argument, failing on the first bad one.
    ///
    /// Networked endpoints follow the port rule of the bind address: when
    /// it has no host, endpoints must not name a port and inherit the bind
    /// port; when it has one, every endpoint must name its port.
    pub fn parse_with<T: AsRef<str>>(args: &[T], bind: &BindAddress, paths: &impl PathNormalizer) -> Result<Self> {
        if args.is_empty() {
            return Err(Error::NoEndpoints);
        }

        let mut endpoints = Vec::with_capacity(args.len());
        for arg in args {
            let arg = arg.as_ref();
            if arg.trim().is_empty() {
                return Err(Error::EmptyEndpoint);
            }

            let endpoint = Endpoint::parse_with(arg, paths)?;
            endpoints.push(apply_port_rule(endpoint, bind)?);
        }

        Ok(Endpoints(endpoints))
    }

    /// Orders the endpoints by host then path and stamps each with its
    /// position. Every node applies the same order, so disk indices agree
    /// across the cluster.
    #[instrument(skip(self))]
    pub fn sort(self) -> Self {
        let mut endpoints = self.0;
        endpoints.sort_by(|a, b| a.host_port().cmp(&b.host_port()).then_with(|| a.path.cmp(&b.path)));

        let endpoints: Vec<Endpoint> = endpoints
            .into_iter()
            .enumerate()
            .map(|(i, ep)| ep.with_index(i))
            .collect();
        debug!("ordered endpoints: {:?}", endpoints.iter().map(Endpoint::to_string).collect::<Vec<_>>());

        Endpoints(endpoints)
    }

    /// Converts `self` into its inner `Vec<Endpoint>`.
    pub fn into_inner(self) -> Vec<Endpoint> {
        self.0
    }

    pub fn as_slice(&self) -> &[Endpoint] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Endpoint> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // returns endpoint string of i-th endpoint (0-based),
    // and empty string for invalid indexes.
    pub fn get_string(&self, i: usize) -> String {
        self.0.get(i).map(Endpoint::to_string).unwrap_or_default()
    }

    /// returns true if the first endpoint is local.
    pub fn first_local(&self) -> bool {
        self.0.first().is_some_and(|v| v.is_local)
    }

    /// `host:port` of the first local networked endpoint, if any.
    pub fn local_host_port(&self) -> Option<String> {
        self.0
            .iter()
            .find(|ep| ep.is_local && ep.get_type() == EndpointType::Url)
            .map(Endpoint::host_port)
    }

    /// All distinct `host:port` values in sorted order, and the one that
    /// belongs to this node (empty when none does).
    pub fn peers(&self) -> (Vec<String>, String) {
        let mut local = None;
        let mut set = BTreeSet::new();
        for endpoint in self.0.iter() {
            if endpoint.get_type() != EndpointType::Url {
                continue;
            }
            let host = endpoint.host_port();
            if endpoint.is_local && local.is_none() {
                local = Some(host.clone());
            }

            set.insert(host);
        }

        (set.into_iter().collect(), local.unwrap_or_default())
    }

    /// Distinct `host:port` values of the other nodes.
    pub fn remote_peers(&self) -> Vec<String> {
        let (peers, local) = self.peers();
        let local_hosts: BTreeSet<String> = self
            .0
            .iter()
            .filter(|ep| ep.is_local && ep.get_type() == EndpointType::Url)
            .map(Endpoint::host_port)
            .collect();

        peers
            .into_iter()
            .filter(|p| *p != local && !local_hosts.contains(p))
            .collect()
    }
}

fn apply_port_rule(endpoint: Endpoint, bind: &BindAddress) -> Result<Endpoint> {
    if endpoint.get_type() != EndpointType::Url {
        return Ok(endpoint);
    }

    if !bind.has_host() {
        // For ex.: erasurefs server host1:port1 host2:port2...
        // the port is configurable only using "--address :port"
        if endpoint.port.is_some() {
            return Err(Error::PortNotConfigurable(endpoint.host_port()));
        }
        let port = bind.port;
        return Ok(endpoint.with_port(port));
    }

    // For ex.: erasurefs server --address host:port host1:port1 host2:port2...
    // the port is mandatory on every endpoint.
    if endpoint.port.is_none() {
        return Err(Error::PortMandatory(endpoint.host_port()));
    }

    Ok(endpoint)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::disk::endpoint::PosixPaths;

    fn bind(addr: &str) -> BindAddress {
        BindAddress::parse(addr).unwrap()
    }

    fn parse(args: &[&str], addr: &str) -> Result<Endpoints> {
        Endpoints::parse_with(args, &bind(addr), &PosixPaths)
    }

    #[test]
    fn test_bind_address_parse() {
        struct TestCase<'a> {
            addr: &'a str,
            host: &'a str,
            port: u16,
            err: Option<&'a str>,
        }

        let cases = [
            TestCase {
                addr: ":9000",
                host: "",
                port: 9000,
                err: None,
            },
            TestCase {
                addr: "192.0.2.10:9001",
                host: "192.0.2.10",
                port: 9001,
                err: None,
            },
            TestCase {
                addr: "[::1]:9000",
                host: "::1",
                port: 9000,
                err: None,
            },
            TestCase {
                addr: "NODE1.Example.com:9001",
                host: "node1.example.com",
                port: 9001,
                err: None,
            },
            TestCase {
                addr: "[2001:DB8:0:0::1]:9000",
                host: "2001:db8::1",
                port: 9000,
                err: None,
            },
            TestCase {
                addr: ":",
                host: "",
                port: 0,
                err: Some("Port cannot be empty or '0', please use `--address` to pick a specific port"),
            },
            TestCase {
                addr: ":0",
                host: "",
                port: 0,
                err: Some("Port cannot be empty or '0', please use `--address` to pick a specific port"),
            },
            TestCase {
                addr: "localhost",
                host: "",
                port: 0,
                err: Some("Unable to parse address localhost: missing port in address"),
            },
            TestCase {
                addr: ":http",
                host: "",
                port: 0,
                err: Some("Unable to parse address :http: invalid port http: invalid digit found in string"),
            },
        ];

        for case in cases {
            match (BindAddress::parse(case.addr), case.err) {
                (Ok(b), None) => {
                    assert_eq!(b.host, case.host, "{}", case.addr);
                    assert_eq!(b.port, case.port, "{}", case.addr);
                    assert_eq!(b.raw, case.addr, "{}", case.addr);
                }
                (Err(e), Some(expected)) => assert_eq!(e.to_string(), expected, "{}", case.addr),
                (Ok(b), Some(expected)) => panic!("{}: expected error {expected}, got {b:?}", case.addr),
                (Err(e), None) => panic!("{}: unexpected error {e}", case.addr),
            }
        }
    }

    #[test]
    fn test_bind_address_resolve_busy_port() {
        let listener = std::net::TcpListener::bind(("0.0.0.0", 0)).unwrap();
        let port = listener.local_addr().unwrap().port();

        match BindAddress::resolve(&format!(":{port}")) {
            Err(Error::PortUnavailable { port: p, .. }) => assert_eq!(p, port),
            other => panic!("expected port unavailable, got {other:?}"),
        }
    }

    #[test]
    fn test_port_rule_without_bind_host() {
        let eps = parse(&["http://192.0.2.1/d1", "http://192.0.2.2/d2"], ":9000").unwrap();
        assert!(eps.iter().all(|ep| ep.port == Some(9000)));
        assert_eq!(eps.get_string(0), "http://192.0.2.1:9000/d1");

        let err = parse(&["http://192.0.2.1:9001/d1"], ":9000").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Argument 192.0.2.1:9001, port configurable using --address :<port>"
        );
    }

    #[test]
    fn test_port_rule_with_bind_host() {
        let eps = parse(&["http://192.0.2.1:9001/d1", "/local/d2"], "192.0.2.1:9001").unwrap();
        assert_eq!(eps.as_slice()[0].port, Some(9001));
        assert_eq!(eps.as_slice()[1].port, None);

        let err = parse(&["http://192.0.2.1/d1"], "192.0.2.1:9001").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid Argument 192.0.2.1, port mandatory when --address <host>:<port> is used"
        );
    }

    #[test]
    fn test_parse_rejects_whole_batch() {
        assert!(matches!(parse(&[], ":9000"), Err(Error::NoEndpoints)));
        assert!(matches!(parse(&["/d1", ""], ":9000"), Err(Error::EmptyEndpoint)));
        assert!(matches!(parse(&["/d1", "/"], ":9000"), Err(Error::EmptyOrRootPath { .. })));
        assert!(matches!(parse(&["/d1", "ftp://h/d"], ":9000"), Err(Error::InvalidScheme { .. })));
    }

    #[test]
    fn test_sort_is_order_independent() {
        let a = [
            "http://192.0.2.2/d2",
            "http://192.0.2.1/d2",
            "http://192.0.2.2/d1",
            "http://192.0.2.1/d1",
        ];
        let b = [
            "http://192.0.2.1/d1",
            "http://192.0.2.2/d1",
            "http://192.0.2.1/d2",
            "http://192.0.2.2/d2",
        ];

        let first = parse(&a, ":9000").unwrap().sort();
        let second = parse(&b, ":9000").unwrap().sort();
        assert_eq!(first, second);
        assert_eq!(first.to_string(), second.to_string());

        let rendered: Vec<String> = first.iter().map(Endpoint::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "http://192.0.2.1:9000/d1",
                "http://192.0.2.1:9000/d2",
                "http://192.0.2.2:9000/d1",
                "http://192.0.2.2:9000/d2",
            ]
        );
        for (i, ep) in first.iter().enumerate() {
            assert_eq!(ep.disk_idx, i as i32);
        }
    }

    #[test]
    fn test_sort_local_paths_before_hosts() {
        let eps = parse(&["/mnt/d8", "/mnt/d3", "/mnt/d1", "/mnt/d7", "/mnt/d2", "/mnt/d6", "/mnt/d4", "/mnt/d5"], ":9000")
            .unwrap()
            .sort();
        let paths: Vec<&str> = eps.iter().map(|ep| ep.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["/mnt/d1", "/mnt/d2", "/mnt/d3", "/mnt/d4", "/mnt/d5", "/mnt/d6", "/mnt/d7", "/mnt/d8"]
        );

        let mixed = parse(&["http://192.0.2.1:9001/b", "/z"], "192.0.2.1:9001").unwrap().sort();
        assert_eq!(mixed.get_string(0), "/z");
        assert_eq!(mixed.get_string(5), "");
    }

    #[test]
    fn test_peers() {
        let eps = parse(
            &[
                "http://192.0.2.1/d1",
                "http://192.0.2.1/d2",
                "http://192.0.2.2/d1",
                "http://192.0.2.3/d1",
            ],
            ":9000",
        )
        .unwrap()
        .sort();

        let tagged: Endpoints = eps
            .into_inner()
            .into_iter()
            .map(|ep| {
                let local = ep.host == "192.0.2.2";
                ep.with_local(local)
            })
            .collect::<Vec<_>>()
            .into();

        let (peers, local) = tagged.peers();
        assert_eq!(peers, vec!["192.0.2.1:9000", "192.0.2.2:9000", "192.0.2.3:9000"]);
        assert_eq!(local, "192.0.2.2:9000");
        assert_eq!(tagged.remote_peers(), vec!["192.0.2.1:9000", "192.0.2.3:9000"]);
        assert_eq!(tagged.local_host_port().as_deref(), Some("192.0.2.2:9000"));
        assert!(!tagged.first_local());
    }
}
