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

use const_str::concat;

/// Application name
/// Default value: ErasureFS
pub const APP_NAME: &str = "ErasureFS";

/// Application version
/// Default value: 0.0.5
pub const VERSION: &str = "0.0.5";

/// Default port the server listens on.
/// Default value: 9000
/// Command line argument: --address
pub const DEFAULT_PORT: u16 = 9000;

/// Default bind address, host left empty so every interface is used.
/// Default value: :9000
/// Environment variable: ERASUREFS_ADDRESS
/// Example: --address 192.168.1.101:9000
pub const DEFAULT_ADDRESS: &str = concat!(":", DEFAULT_PORT);

/// Default log level when neither ERASUREFS_LOG_LEVEL nor RUST_LOG is set.
/// Default value: info
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log file name prefix used by the rolling file writer.
pub const DEFAULT_LOG_FILENAME: &str = "erasurefs.log";

/// Minimum number of disks in one erasure group.
pub const MIN_ERASURE_BLOCKS: usize = 4;

/// Maximum number of disks in one erasure group.
pub const MAX_ERASURE_BLOCKS: usize = 16;

/// Access key length bounds, inclusive.
pub const ACCESS_KEY_MIN_LEN: usize = 5;
pub const ACCESS_KEY_MAX_LEN: usize = 20;

/// Secret key length bounds, inclusive.
pub const SECRET_KEY_MIN_LEN: usize = 8;
pub const SECRET_KEY_MAX_LEN: usize = 40;

/// Meta volume holding format.json and scratch space on every disk.
pub const ERASUREFS_META_BUCKET: &str = ".erasurefs.sys";

/// Scratch area for in-flight writes, purged on every start.
pub const ERASUREFS_META_TMP_BUCKET: &str = concat!(ERASUREFS_META_BUCKET, "/tmp");

/// Buckets metadata area.
pub const ERASUREFS_META_BUCKETS_BUCKET: &str = concat!(ERASUREFS_META_BUCKET, "/buckets");

/// Multipart upload area.
pub const ERASUREFS_META_MULTIPART_BUCKET: &str = concat!(ERASUREFS_META_BUCKET, "/multipart");

/// Format descriptor shared by every disk of a deployment.
pub const FORMAT_CONFIG_FILE: &str = "format.json";

/// Seconds clients are told to wait while the object layer is not yet ready.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Upper bound, in seconds, of the back-off between format consensus attempts.
pub const FORMAT_RETRY_MAX_INTERVAL_SECS: u64 = 16;

/// Seconds to wait for in-flight connections on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
