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

/// Environment variable carrying the access key.
/// Must be 5 to 20 characters long.
pub const ENV_ACCESS_KEY: &str = "ERASUREFS_ACCESS_KEY";

/// Environment variable carrying the secret key.
/// Must be 8 to 40 characters long.
pub const ENV_SECRET_KEY: &str = "ERASUREFS_SECRET_KEY";

/// Environment variable overriding --address.
pub const ENV_ADDRESS: &str = "ERASUREFS_ADDRESS";

/// Environment variable overriding --certs-dir.
pub const ENV_CERTS_DIR: &str = "ERASUREFS_CERTS_DIR";

/// Log filter directive, same syntax as RUST_LOG.
/// Example: ERASUREFS_LOG_LEVEL=erasurefs=debug,info
pub const ENV_LOG_LEVEL: &str = "ERASUREFS_LOG_LEVEL";

/// Directory for daily rolling log files. Logs go to stdout only when unset.
pub const ENV_LOG_DIR: &str = "ERASUREFS_LOG_DIR";

/// Set to false to skip systemd readiness notifications.
pub const ENV_SYSTEMD_NOTIFY: &str = "ERASUREFS_SYSTEMD_NOTIFY";

/// Default value for ENV_SYSTEMD_NOTIFY.
pub const DEFAULT_SYSTEMD_NOTIFY: bool = true;
