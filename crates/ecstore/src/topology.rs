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

use crate::endpoints::Endpoints;
use crate::error::{Error, Result};
use erasurefs_config::{MAX_ERASURE_BLOCKS, MIN_ERASURE_BLOCKS};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Display;

/// How the disks of a deployment are spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// One local path, no erasure coding.
    Single,

    /// Several disks, all attached to this node.
    Erasure,

    /// Several disks, at least one of them on another node.
    DistErasure,
}

impl Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::Single => write!(f, "single"),
            Topology::Erasure => write!(f, "erasure"),
            Topology::DistErasure => write!(f, "dist-erasure"),
        }
    }
}

impl Topology {
    pub fn is_distributed(&self) -> bool {
        *self == Topology::DistErasure
    }
}

/// Fails when two endpoints render to the same text.
pub fn check_duplicates(endpoints: &Endpoints) -> Result<()> {
    let mut uniq_set = HashSet::with_capacity(endpoints.len());
    for endpoint in endpoints.iter() {
        let endpoint_str = endpoint.to_string();
        if !uniq_set.insert(endpoint_str.clone()) {
            return Err(Error::DuplicateEndpoint {
                endpoint: endpoint_str,
                args: endpoints.to_string(),
            });
        }
    }
    Ok(())
}

/// Checks the number of disks of an erasure group.
pub fn check_sufficient_disks(total: usize) -> Result<()> {
    if total > MAX_ERASURE_BLOCKS {
        return Err(Error::TooManyDisks {
            count: total,
            max: MAX_ERASURE_BLOCKS,
        });
    }
    if total < MIN_ERASURE_BLOCKS {
        return Err(Error::TooFewDisks {
            count: total,
            min: MIN_ERASURE_BLOCKS,
        });
    }
    // only combination of 4, 6, 8, 10, 12, 14, 16 are supported.
    if total % 2 != 0 {
        return Err(Error::OddDiskCount(total));
    }
    Ok(())
}

/// Classifies locality-tagged endpoints.
pub fn classify(endpoints: &Endpoints) -> Result<Topology> {
    match endpoints.as_slice() {
        [] => Err(Error::NoEndpoints),
        [only] => {
            if !only.host.is_empty() && !only.scheme.is_empty() {
                return Err(Error::SingleDiskNotPath(only.to_string()));
            }
            Ok(Topology::Single)
        }
        all => {
            check_sufficient_disks(all.len())?;
            if all.iter().any(|ep| !ep.is_local) {
                Ok(Topology::DistErasure)
            } else {
                Ok(Topology::Erasure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::endpoint::{Endpoint, PosixPaths};

    fn local(paths: &[String]) -> Endpoints {
        paths
            .iter()
            .map(|p| Endpoint::parse_with(p, &PosixPaths).unwrap().with_local(true))
            .collect::<Vec<_>>()
            .into()
    }

    fn disks(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("/mnt/disk{i}")).collect()
    }

    #[test]
    fn test_single() {
        let eps = local(&["/data".to_string()]);
        assert_eq!(classify(&eps).unwrap(), Topology::Single);

        let url: Endpoints = vec![Endpoint::parse_with("http://192.0.2.1:9000/data", &PosixPaths).unwrap()].into();
        assert_eq!(
            classify(&url).unwrap_err().to_string(),
            "http://192.0.2.1:9000/data, FS setup expects a filesystem path"
        );
    }

    #[test]
    fn test_erasure_even_counts() {
        for n in (MIN_ERASURE_BLOCKS..=MAX_ERASURE_BLOCKS).step_by(2) {
            let eps = local(&disks(n));
            assert_eq!(classify(&eps).unwrap(), Topology::Erasure, "{n} local disks");

            let mut mixed = eps.into_inner();
            let last = mixed.len() - 1;
            mixed[last] = mixed[last].clone().with_local(false);
            assert_eq!(classify(&Endpoints::from(mixed)).unwrap(), Topology::DistErasure, "{n} disks, one remote");
        }
    }

    #[test]
    fn test_cardinality_errors() {
        struct TestCase {
            count: usize,
            expected: &'static str,
        }

        let cases = [
            TestCase {
                count: 2,
                expected: "Invalid number of disks supplied: 2 is less than the minimum of 4",
            },
            TestCase {
                count: 3,
                expected: "Invalid number of disks supplied: 3 is less than the minimum of 4",
            },
            TestCase {
                count: 5,
                expected: "Invalid number of disks supplied: 5 is odd, an even number of disks is required",
            },
            TestCase {
                count: 9,
                expected: "Invalid number of disks supplied: 9 is odd, an even number of disks is required",
            },
            TestCase {
                count: 15,
                expected: "Invalid number of disks supplied: 15 is odd, an even number of disks is required",
            },
            TestCase {
                count: 18,
                expected: "Invalid number of disks supplied: 18 is more than the maximum of 16",
            },
        ];

        for case in cases {
            let err = classify(&local(&disks(case.count))).unwrap_err();
            assert_eq!(err.to_string(), case.expected, "{} disks", case.count);
        }

        assert!(matches!(classify(&local(&disks(9))), Err(Error::OddDiskCount(9))));
        assert!(matches!(classify(&local(&disks(17))), Err(Error::TooManyDisks { count: 17, .. })));
        assert!(matches!(classify(&local(&disks(2))), Err(Error::TooFewDisks { count: 2, .. })));
    }

    #[test]
    fn test_duplicates() {
        let eps = local(&["/data".to_string(), "/data/".to_string()]);
        assert_eq!(
            check_duplicates(&eps).unwrap_err().to_string(),
            "Duplicate entries in /data /data: /data"
        );

        check_duplicates(&local(&disks(4))).unwrap();
    }

    #[test]
    fn test_display() {
        assert_eq!(Topology::Single.to_string(), "single");
        assert_eq!(Topology::Erasure.to_string(), "erasure");
        assert_eq!(Topology::DistErasure.to_string(), "dist-erasure");
        assert_eq!(serde_json::to_string(&Topology::DistErasure).unwrap(), "\"dist-erasure\"");
        assert!(Topology::DistErasure.is_distributed());
    }
}
