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

use crate::error::{Error, Result};
use erasurefs_utils::path::{clean, is_empty_or_root};
use erasurefs_utils::{is_socket_addr, join_host_port, split_host_port};
use path_absolutize::Absolutize;
use std::borrow::Cow;
use std::fmt::Display;
use std::path::Path;
use tracing::debug;
use url::{ParseError, Url};

/// enum for endpoint type.
#[derive(PartialEq, Eq, Debug)]
pub enum EndpointType {
    /// path style endpoint type enum.
    Path,

    /// URL style endpoint type enum.
    Url,
}

/// Turns the path part of a disk location into its canonical form.
///
/// Two implementations exist: [`PosixPaths`] and [`DrivePaths`]. The one
/// matching the build target is exported as [`NativePaths`], so parsing
/// never branches on the platform at the call site.
pub trait PathNormalizer {
    /// Reports whether a URL scheme is really a drive letter.
    fn is_drive_scheme(&self, scheme: &str) -> bool;

    /// Normalizes a bare local path, rejecting empty and root paths.
    fn local_path(&self, arg: &str) -> Result<String>;

    /// Normalizes the path component of a networked endpoint.
    fn url_path(&self, arg: &str, path: &str) -> Result<String>;
}

/// `/`-separated paths, no drive letters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixPaths;

/// Paths that may start with a drive letter such as `C:`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrivePaths;

#[cfg(not(windows))]
pub type NativePaths = PosixPaths;

#[cfg(windows)]
pub type NativePaths = DrivePaths;

fn decode_path(path: &str) -> Cow<'_, str> {
    match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("Failed to decode path '{}': {}, using original path", path, e);
            Cow::Borrowed(path)
        }
    }
}

fn check_not_root(cleaned: &str, arg: &str) -> Result<()> {
    if is_empty_or_root(cleaned) {
        return Err(Error::EmptyOrRootPath {
            path: cleaned.to_string(),
            arg: arg.to_string(),
        });
    }
    Ok(())
}

fn absolutize(cleaned: &str, arg: &str) -> Result<String> {
    let abs = Path::new(cleaned).absolutize().map_err(|e| Error::InvalidEndpoint {
        arg: arg.to_string(),
        reason: format!("absolute path failed: {e}"),
    })?;

    if abs.parent().is_none() {
        return Err(Error::EmptyOrRootPath {
            path: abs.display().to_string(),
            arg: arg.to_string(),
        });
    }

    abs.to_str().map(str::to_string).ok_or_else(|| Error::InvalidEndpoint {
        arg: arg.to_string(),
        reason: "path is not valid UTF-8".to_string(),
    })
}

impl PathNormalizer for PosixPaths {
    fn is_drive_scheme(&self, _scheme: &str) -> bool {
        false
    }

    fn local_path(&self, arg: &str) -> Result<String> {
        let cleaned = clean(arg);
        check_not_root(&cleaned, arg)?;
        absolutize(&cleaned, arg)
    }

    fn url_path(&self, arg: &str, path: &str) -> Result<String> {
        let cleaned = clean(&decode_path(path));
        check_not_root(&cleaned, arg)?;
        Ok(cleaned)
    }
}

impl DrivePaths {
    fn split_drive(path: &str) -> Option<(char, &str)> {
        let mut chars = path.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => Some((letter.to_ascii_uppercase(), &path[2..])),
            _ => None,
        }
    }

    fn normalize(&self, arg: &str, path: &str) -> Result<String> {
        let slashed = path.replace('\\', "/");
        match Self::split_drive(&slashed) {
            Some((drive, rest)) => {
                let cleaned = clean(rest);
                check_not_root(&cleaned, arg)?;
                Ok(format!("{drive}:{cleaned}"))
            }
            None => {
                let cleaned = clean(&slashed);
                check_not_root(&cleaned, arg)?;
                Ok(cleaned)
            }
        }
    }
}

impl PathNormalizer for DrivePaths {
    fn is_drive_scheme(&self, scheme: &str) -> bool {
        scheme.len() == 1 && scheme.chars().all(|c| c.is_ascii_alphabetic())
    }

    fn local_path(&self, arg: &str) -> Result<String> {
        let normalized = self.normalize(arg, arg)?;
        if Self::split_drive(&normalized).is_some() {
            return Ok(normalized);
        }
        absolutize(&normalized, arg)
    }

    fn url_path(&self, arg: &str, path: &str) -> Result<String> {
        let decoded = decode_path(path);
        // "/C:/export" in a URL names the drive path "C:/export".
        let trimmed = match decoded.strip_prefix('/') {
            Some(rest) if Self::split_drive(rest).is_some() => rest,
            _ => decoded.as_ref(),
        };
        self.normalize(arg, trimmed)
    }
}

/// One disk location as given on the command line.
///
/// Parsed once and never mutated afterwards: locality and position are
/// attached by [`Endpoint::with_local`] and [`Endpoint::with_index`], which
/// consume the value and hand back a new one.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct Endpoint {
    /// Empty for local paths, `http`/`https` for networked disks, or a drive letter.
    pub scheme: String,
    /// Empty for local paths. IPv6 literals are kept without brackets.
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub is_local: bool,
    pub disk_idx: i32,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.get_type() {
            EndpointType::Path => write!(f, "{}", self.path),
            EndpointType::Url => write!(f, "{}://{}{}", self.scheme, self.host_port(), self.path),
        }
    }
}

impl TryFrom<&str> for Endpoint {
    type Error = Error;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Endpoint::parse_with(value, &NativePaths::default())
    }
}

impl Endpoint {
    /// Parses one location using `paths` to normalize its path part.
    pub fn parse_with(value: &str, paths: &impl PathNormalizer) -> Result<Self> {
        if value.is_empty() {
            return Err(Error::EmptyEndpoint);
        }

        let invalid = |reason: &str| Error::InvalidEndpoint {
            arg: value.to_string(),
            reason: reason.to_string(),
        };

        match Url::parse(value) {
            Ok(url) if url.has_host() => {
                // Valid URL style endpoint is
                // - Scheme field must contain "http" or "https"
                // - All field should be empty except Host and Path.
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(Error::InvalidScheme {
                        scheme: url.scheme().to_string(),
                        arg: value.to_string(),
                    });
                }
                if !url.username().is_empty() || url.password().is_some() || url.query().is_some() || url.fragment().is_some()
                {
                    return Err(invalid("invalid URL endpoint format"));
                }

                let host = url
                    .host_str()
                    .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
                    .unwrap_or_default();

                // The url crate drops ports equal to the scheme default, so the
                // explicit port is read from the raw authority instead.
                let authority = value
                    .split_once("://")
                    .map(|(_, rest)| rest.split(['/', '?', '#']).next().unwrap_or_default())
                    .unwrap_or_default();
                let (_, port) = split_host_port(authority).map_err(|e| invalid(&e.to_string()))?;
                let port = match port {
                    Some(p) => Some(
                        p.parse::<u16>()
                            .map_err(|_| invalid("invalid URL endpoint format: port number must be between 1 to 65535"))?,
                    ),
                    None => None,
                };

                let path = paths.url_path(value, url.path())?;
                debug!("endpoint try_from: host={}, port={:?}, path={}", host, port, path);

                Ok(Endpoint {
                    scheme: url.scheme().to_string(),
                    host,
                    port,
                    path,
                    is_local: false,
                    disk_idx: -1,
                })
            }
            Ok(url) => {
                // like d:/foo
                if !paths.is_drive_scheme(url.scheme()) {
                    return Err(Error::InvalidScheme {
                        scheme: url.scheme().to_string(),
                        arg: value.to_string(),
                    });
                }
                Ok(Endpoint::local(url.scheme().to_string(), paths.local_path(value)?))
            }
            Err(ParseError::RelativeUrlWithoutBase) => {
                // localhost, example.com, any FQDN cannot be disambiguated from a regular
                // file path such as /mnt/export1, only bare ip addresses are refused.
                let first = value.split('/').next().unwrap_or_default();
                if is_socket_addr(first) {
                    return Err(invalid("invalid URL endpoint format: missing scheme http or https"));
                }
                Ok(Endpoint::local(String::new(), paths.local_path(value)?))
            }
            Err(ParseError::InvalidPort) => Err(invalid("invalid URL endpoint format: port number must be between 1 to 65535")),
            Err(ParseError::EmptyHost) => Err(invalid("invalid URL endpoint format: empty host name")),
            Err(e) => Err(invalid(&format!("invalid URL endpoint format: {e}"))),
        }
    }

    fn local(scheme: String, path: String) -> Self {
        Endpoint {
            scheme,
            host: String::new(),
            port: None,
            path,
            is_local: false,
            disk_idx: -1,
        }
    }

    /// returns type of endpoint.
    pub fn get_type(&self) -> EndpointType {
        if self.host.is_empty() {
            EndpointType::Path
        } else {
            EndpointType::Url
        }
    }

    pub fn is_url(&self) -> bool {
        self.get_type() == EndpointType::Url
    }

    pub fn is_https(&self) -> bool {
        self.scheme == "https"
    }

    /// `host:port` for networked endpoints, the bare host when no port is
    /// known, empty for local paths.
    pub fn host_port(&self) -> String {
        match self.port {
            Some(port) if !self.host.is_empty() => join_host_port(&self.host, port),
            _ if self.host.contains(':') => format!("[{}]", self.host),
            _ => self.host.clone(),
        }
    }

    /// Filesystem path backing this endpoint.
    pub fn get_file_path(&self) -> &str {
        &self.path
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_local(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }

    pub fn with_index(mut self, idx: usize) -> Self {
        self.disk_idx = idx as i32;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn cwd_join(p: &str) -> String {
        std::env::current_dir().unwrap().join(p).to_str().unwrap().to_string()
    }

    #[test]
    fn test_new_endpoint() {
        struct TestCase<'a> {
            arg: &'a str,
            expected_endpoint: Option<Endpoint>,
            expected_type: Option<EndpointType>,
            expected_err: Option<&'a str>,
        }

        let url_ep = |scheme: &str, host: &str, port: Option<u16>, path: &str| Endpoint {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
            is_local: false,
            disk_idx: -1,
        };

        let test_cases = [
            TestCase {
                arg: "/foo",
                expected_endpoint: Some(url_ep("", "", None, "/foo")),
                expected_type: Some(EndpointType::Path),
                expected_err: None,
            },
            TestCase {
                arg: "/foo//bar/./",
                expected_endpoint: Some(url_ep("", "", None, "/foo/bar")),
                expected_type: Some(EndpointType::Path),
                expected_err: None,
            },
            TestCase {
                arg: "https://example.org/path",
                expected_endpoint: Some(url_ep("https", "example.org", None, "/path")),
                expected_type: Some(EndpointType::Url),
                expected_err: None,
            },
            TestCase {
                arg: "http://192.0.2.200:9000/path/",
                expected_endpoint: Some(url_ep("http", "192.0.2.200", Some(9000), "/path")),
                expected_type: Some(EndpointType::Url),
                expected_err: None,
            },
            TestCase {
                arg: "http://192.0.2.200:80/path",
                expected_endpoint: Some(url_ep("http", "192.0.2.200", Some(80), "/path")),
                expected_type: Some(EndpointType::Url),
                expected_err: None,
            },
            TestCase {
                arg: "http://[2001:db8::1]:9000/path",
                expected_endpoint: Some(url_ep("http", "2001:db8::1", Some(9000), "/path")),
                expected_type: Some(EndpointType::Url),
                expected_err: None,
            },
            TestCase {
                arg: "http://server:/path",
                expected_endpoint: Some(url_ep("http", "server", None, "/path")),
                expected_type: Some(EndpointType::Url),
                expected_err: None,
            },
            TestCase {
                arg: "",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid Argument: empty disk location"),
            },
            TestCase {
                arg: "/",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Empty or root path is not allowed: / (/)"),
            },
            TestCase {
                arg: "\\",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Empty or root path is not allowed: \\ (\\)"),
            },
            TestCase {
                arg: ".",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Empty or root path is not allowed: . (.)"),
            },
            TestCase {
                arg: "/data/..",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Empty or root path is not allowed: / (/data/..)"),
            },
            TestCase {
                arg: "c://foo",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid scheme: c (c://foo)"),
            },
            TestCase {
                arg: "c:/foo",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid scheme: c (c:/foo)"),
            },
            TestCase {
                arg: "ftp://foo/bar",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid scheme: ftp (ftp://foo/bar)"),
            },
            TestCase {
                arg: "http://server/path?location",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid Argument http://server/path?location: invalid URL endpoint format"),
            },
            TestCase {
                arg: "http://user@server/path",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid Argument http://user@server/path: invalid URL endpoint format"),
            },
            TestCase {
                arg: "http://:8080/path",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid Argument http://:8080/path: invalid URL endpoint format: empty host name"),
            },
            TestCase {
                arg: "https://192.0.2.34:808080/path",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some(
                    "Invalid Argument https://192.0.2.34:808080/path: invalid URL endpoint format: port number must be between 1 to 65535",
                ),
            },
            TestCase {
                arg: "http://server:8080//",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Empty or root path is not allowed: / (http://server:8080//)"),
            },
            TestCase {
                arg: "http://server:8080",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Empty or root path is not allowed: / (http://server:8080)"),
            },
            TestCase {
                arg: "192.0.2.210:9000",
                expected_endpoint: None,
                expected_type: None,
                expected_err: Some("Invalid Argument 192.0.2.210:9000: invalid URL endpoint format: missing scheme http or https"),
            },
        ];

        for test_case in test_cases {
            let ret = Endpoint::parse_with(test_case.arg, &PosixPaths);
            match (test_case.expected_err, ret) {
                (None, Err(e)) => panic!("{}: error: expected = <nil>, got = {}", test_case.arg, e),
                (None, Ok(ep)) => {
                    if test_case.expected_type != Some(ep.get_type()) {
                        panic!(
                            "{}: type: expected = {:?}, got = {:?}",
                            test_case.arg,
                            test_case.expected_type,
                            ep.get_type()
                        );
                    }
                    assert_eq!(test_case.expected_endpoint, Some(ep), "{}: endpoint", test_case.arg);
                }
                (Some(e), Ok(_)) => panic!("{}: error: expected = {}, got = <nil>", test_case.arg, e),
                (Some(e), Err(e2)) => assert_eq!(e, e2.to_string(), "{}: error", test_case.arg),
            }
        }
    }

    #[test]
    fn test_relative_path_is_made_absolute() {
        let ep = Endpoint::parse_with("d1", &PosixPaths).unwrap();
        assert_eq!(ep.path, cwd_join("d1"));

        let ep2 = Endpoint::parse_with("./d1/", &PosixPaths).unwrap();
        assert_eq!(ep, ep2);
    }

    #[test]
    fn test_endpoint_display() {
        let file_endpoint = Endpoint::parse_with("/tmp/data", &PosixPaths).unwrap();
        assert_eq!(format!("{file_endpoint}"), "/tmp/data");

        let url_endpoint = Endpoint::parse_with("http://node1:9000/mnt/disk1", &PosixPaths).unwrap();
        assert_eq!(format!("{url_endpoint}"), "http://node1:9000/mnt/disk1");

        let v6 = Endpoint::parse_with("https://[::1]:9000/d", &PosixPaths).unwrap();
        assert_eq!(format!("{v6}"), "https://[::1]:9000/d");
    }

    #[test]
    fn test_render_then_parse_is_stable() {
        let inputs = [
            "/mnt/disk1",
            "/mnt/my disk",
            "http://node1:9000/mnt/disk1",
            "https://192.0.2.1:443/export",
            "http://[2001:db8::2]:9001/data",
            "http://node2/export",
        ];

        for input in inputs {
            let first = Endpoint::parse_with(input, &PosixPaths).unwrap();
            let rendered = first.to_string();
            let second = Endpoint::parse_with(&rendered, &PosixPaths).unwrap();
            assert_eq!(first, second, "{input} -> {rendered}");
        }
    }

    #[test]
    fn test_drive_paths() {
        let paths = DrivePaths;
        assert!(paths.is_drive_scheme("c"));
        assert!(!paths.is_drive_scheme("http"));

        let ep = Endpoint::parse_with("C:\\export\\disk1", &paths).unwrap();
        assert_eq!(ep.scheme, "c");
        assert_eq!(ep.path, "C:/export/disk1");
        assert_eq!(ep.get_type(), EndpointType::Path);

        let ep = Endpoint::parse_with("d:/foo/", &paths).unwrap();
        assert_eq!(ep.path, "D:/foo");

        for root in ["C:\\", "c:/", "C:"] {
            match Endpoint::parse_with(root, &paths) {
                Err(Error::EmptyOrRootPath { .. }) => {}
                other => panic!("{root}: expected empty or root path error, got {other:?}"),
            }
        }

        let ep = Endpoint::parse_with("http://node1:9000/C:/export", &paths).unwrap();
        assert_eq!(ep.path, "C:/export");
    }

    #[test]
    fn test_with_local_and_index_return_new_values() {
        let ep = Endpoint::parse_with("/data", &PosixPaths).unwrap();
        let tagged = ep.clone().with_local(true).with_index(3);
        assert!(!ep.is_local);
        assert_eq!(ep.disk_idx, -1);
        assert!(tagged.is_local);
        assert_eq!(tagged.disk_idx, 3);
    }
}
