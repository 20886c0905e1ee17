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

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::LazyLock;
use tracing::warn;
use url::Host;

static LOCAL_IPS: LazyLock<HashSet<IpAddr>> = LazyLock::new(|| match must_get_local_ips() {
    Ok(ips) => ips.into_iter().collect(),
    Err(err) => {
        warn!("{err}, only loopback addresses will be treated as local");
        HashSet::new()
    }
});

/// helper for validating if the provided arg is an ip address.
pub fn is_socket_addr(addr: &str) -> bool {
    addr.parse::<SocketAddr>().is_ok() || addr.parse::<IpAddr>().is_ok()
}

/// Splits `host:port`, `[v6]:port`, `host` or `:port`.
///
/// A missing or empty port yields `None`; callers decide whether that is
/// acceptable. Malformed input such as unbalanced brackets or a bare IPv6
/// address without brackets is an error.
pub fn split_host_port(addr: &str) -> io::Result<(String, Option<String>)> {
    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("missing ']' in address {addr}"),
            ));
        };
        let host = &rest[..end];
        let tail = &rest[end + 1..];
        let port = match tail.strip_prefix(':') {
            Some(port) => Some(port),
            None if tail.is_empty() => None,
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unexpected characters after ']' in address {addr}"),
                ));
            }
        };
        (host, port)
    } else {
        match addr.matches(':').count() {
            0 => (addr, None),
            1 => match addr.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (addr, None),
            },
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("too many colons in address {addr}"),
                ));
            }
        }
    };

    if host.contains(['[', ']']) {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("unexpected bracket in address {addr}")));
    }

    Ok((host.to_string(), port.filter(|p| !p.is_empty()).map(str::to_string)))
}

/// Joins a host and port, bracketing IPv6 literals.
pub fn join_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Classifies a host string as an IP literal or a domain name.
pub fn parse_host(host: &str) -> Host<&str> {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    match bare.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Host::Ipv4(ip),
        Ok(IpAddr::V6(ip)) => Host::Ipv6(ip),
        Err(_) => Host::Domain(host),
    }
}

/// returns IP address of given host.
pub fn get_host_ip(host: Host<&str>) -> io::Result<HashSet<IpAddr>> {
    match host {
        Host::Domain(domain) => match (domain, 0)
            .to_socket_addrs()
            .map(|v| v.map(|v| v.ip()).collect::<HashSet<_>>())
        {
            Ok(ips) => Ok(ips),
            Err(err) => Err(io::Error::other(err)),
        },
        Host::Ipv4(ip) => Ok(HashSet::from([IpAddr::V4(ip)])),
        Host::Ipv6(ip) => Ok(HashSet::from([IpAddr::V6(ip)])),
    }
}

/// checks if the given host resolves to a loopback address or to one of
/// `local_ips`.
pub fn is_local_host(host: Host<&str>, local_ips: &HashSet<IpAddr>) -> io::Result<bool> {
    let ips = get_host_ip(host)?;
    Ok(ips.iter().any(|ip| ip.is_loopback() || local_ips.contains(ip)))
}

/// IPs bound to the interfaces of this machine, resolved once.
pub fn local_ips() -> &'static HashSet<IpAddr> {
    &LOCAL_IPS
}

/// returns IPs of local interface
pub fn must_get_local_ips() -> io::Result<Vec<IpAddr>> {
    match netif::up() {
        Ok(up) => Ok(up.map(|x| x.address().to_owned()).collect()),
        Err(err) => Err(io::Error::other(format!("Unable to get IP addresses of this host: {err}"))),
    }
}

/// Fails when `port` is already bound on any interface.
pub fn check_port_available(port: u16) -> io::Result<()> {
    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))?;
    drop(listener);
    Ok(())
}

/// Asks the OS for a free port.
pub fn get_available_port() -> io::Result<u16> {
    Ok(TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))?.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn test_split_host_port() {
        struct TestCase<'a> {
            addr: &'a str,
            host: &'a str,
            port: Option<&'a str>,
            ok: bool,
        }

        let cases = [
            TestCase { addr: ":9000", host: "", port: Some("9000"), ok: true },
            TestCase { addr: "localhost:9000", host: "localhost", port: Some("9000"), ok: true },
            TestCase { addr: "192.0.2.1", host: "192.0.2.1", port: None, ok: true },
            TestCase { addr: "server:", host: "server", port: None, ok: true },
            TestCase { addr: "[::1]:9000", host: "::1", port: Some("9000"), ok: true },
            TestCase { addr: "[::1]", host: "::1", port: None, ok: true },
            TestCase { addr: "::1:9000", host: "", port: None, ok: false },
            TestCase { addr: "[::1:9000", host: "", port: None, ok: false },
            TestCase { addr: "[::1]x", host: "", port: None, ok: false },
        ];

        for case in cases {
            match split_host_port(case.addr) {
                Ok((host, port)) => {
                    assert!(case.ok, "{}: expected error, got ({host}, {port:?})", case.addr);
                    assert_eq!(host, case.host, "{}: host", case.addr);
                    assert_eq!(port.as_deref(), case.port, "{}: port", case.addr);
                }
                Err(err) => assert!(!case.ok, "{}: unexpected error {err}", case.addr),
            }
        }
    }

    #[test]
    fn test_join_host_port() {
        assert_eq!(join_host_port("192.0.2.1", 9000), "192.0.2.1:9000");
        assert_eq!(join_host_port("::1", 9000), "[::1]:9000");
        assert_eq!(join_host_port("", 9000), ":9000");
    }

    #[test]
    fn test_parse_host() {
        assert_eq!(parse_host("192.0.2.1"), Host::<&str>::Ipv4(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(parse_host("::1"), Host::<&str>::Ipv6(Ipv6Addr::LOCALHOST));
        assert_eq!(parse_host("[::1]"), Host::<&str>::Ipv6(Ipv6Addr::LOCALHOST));
        assert_eq!(parse_host("node1"), Host::Domain("node1"));
    }

    #[test]
    fn test_is_local_host() {
        let local: HashSet<IpAddr> = HashSet::from([IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))]);

        assert!(is_local_host(Host::Ipv4(Ipv4Addr::LOCALHOST), &local).unwrap());
        assert!(is_local_host(Host::Ipv6(Ipv6Addr::LOCALHOST), &local).unwrap());
        assert!(is_local_host(Host::Ipv4(Ipv4Addr::new(198, 51, 100, 7)), &local).unwrap());
        assert!(!is_local_host(Host::Ipv4(Ipv4Addr::new(192, 0, 2, 1)), &local).unwrap());
        assert!(is_local_host(Host::Domain("localhost"), &local).unwrap());
    }

    #[test]
    fn test_check_port_available() {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(check_port_available(port).is_err());
        drop(listener);

        let free = get_available_port().unwrap();
        assert!(free > 0);
    }

    #[test]
    fn test_is_socket_addr() {
        assert!(is_socket_addr("192.0.2.1"));
        assert!(is_socket_addr("192.0.2.1:9000"));
        assert!(!is_socket_addr("node1:9000"));
    }
}
