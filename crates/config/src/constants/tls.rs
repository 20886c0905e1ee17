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

/// Public certificate file name inside the certificates directory.
/// Default value: public.crt
pub const ERASUREFS_PUBLIC_CERT: &str = "public.crt";

/// Private key file name inside the certificates directory.
/// Default value: private.key
pub const ERASUREFS_PRIVATE_KEY: &str = "private.key";

/// Certificates directory name, resolved under the user's home directory
/// when no --certs-dir is given.
pub const DEFAULT_CERTS_DIR_NAME: &str = ".erasurefs/certs";
