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


use clap::{Args, CommandFactory, Parser, Subcommand};
use const_str::concat;
use erasurefs_config::{
    ACCESS_KEY_MAX_LEN, ACCESS_KEY_MIN_LEN, APP_NAME, DEFAULT_ADDRESS, ENV_ACCESS_KEY, ENV_ADDRESS, ENV_CERTS_DIR,
    ENV_SECRET_KEY, SECRET_KEY_MAX_LEN, SECRET_KEY_MIN_LEN, VERSION,
};
use erasurefs_ecstore::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;

const SERVER_USAGE: &str = concat!(
    "ENVIRONMENT VARIABLES:\n",
    "  ACCESS:\n",
    "     ",
    ENV_ACCESS_KEY,
    ": Custom username or access key of minimum 5 characters in length.\n",
    "     ",
    ENV_SECRET_KEY,
    ": Custom password or secret key of minimum 8 characters in length.\n",
    "\n",
    "EXAMPLES:\n",
    "  1. Start erasurefs server on a single disk.\n",
    "     $ erasurefs server /home/shared\n",
    "\n",
    "  2. Start erasurefs server on eight disks of this node.\n",
    "     $ erasurefs server /mnt/export1/ /mnt/export2/ /mnt/export3/ /mnt/export4/ \\\n",
    "           /mnt/export5/ /mnt/export6/ /mnt/export7/ /mnt/export8/\n",
    "\n",
    "  3. Start a distributed erasurefs server on four nodes, run on every node.\n",
    "     $ export ERASUREFS_ACCESS_KEY=admin\n",
    "     $ export ERASUREFS_SECRET_KEY=erasurefs123\n",
    "     $ erasurefs server http://192.168.1.11/mnt/export/ http://192.168.1.12/mnt/export/ \\\n",
    "           http://192.168.1.13/mnt/export/ http://192.168.1.14/mnt/export/\n",
);

#[derive(Debug, Parser)]
#[command(name = "erasurefs", version = VERSION, about = concat!(APP_NAME, " erasure-coded object storage server"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start object storage server.
    Server(ServerOpts),
}

#[derive(Debug, Clone, Args)]
#[command(after_help = SERVER_USAGE)]
pub struct ServerOpts {
    /// Bind to a specific ADDRESS:PORT, ADDRESS can be an IP or hostname.
    #[arg(long, default_value_t = DEFAULT_ADDRESS.to_string(), env = ENV_ADDRESS)]
    pub address: String,

    /// Directory holding public.crt and private.key.
    #[arg(long, env = ENV_CERTS_DIR)]
    pub certs_dir: Option<PathBuf>,

    /// Access key of the bootstrap credentials.
    #[arg(long, env = ENV_ACCESS_KEY, hide_env_values = true)]
    pub access_key: Option<String>,

    /// Secret key of the bootstrap credentials.
    #[arg(long, env = ENV_SECRET_KEY, hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Disk locations: local paths, or http(s)://host[:port]/path for every disk of the cluster.
    pub volumes: Vec<String>,
}

impl ServerOpts {
    /// No disks, or `help` in place of the first one.
    pub fn wants_usage(&self) -> bool {
        self.volumes.first().is_none_or(|v| v == "help")
    }

    /// Checks the credentials, if any were given.
    ///
    /// Both keys must be set together and fall within their length bounds.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        match (&self.access_key, &self.secret_key) {
            (None, None) => Ok(None),
            (Some(access_key), Some(secret_key)) => Credentials::new(access_key, secret_key).map(Some),
            _ => Err(Error::InvalidCredentials(format!("{ENV_ACCESS_KEY} and {ENV_SECRET_KEY} must be set together"))),
        }
    }
}

/// Prints the `server` help, usage examples included.
pub fn print_server_usage() {
    let mut cmd = Cli::command();
    cmd.build();
    if let Some(server) = cmd.find_subcommand_mut("server") {
        let _ = server.print_long_help();
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"*")
            .finish()
    }
}

impl Credentials {
    pub fn new(access_key: &str, secret_key: &str) -> Result<Self> {
        let access_len = access_key.chars().count();
        if !(ACCESS_KEY_MIN_LEN..=ACCESS_KEY_MAX_LEN).contains(&access_len) {
            return Err(Error::InvalidCredentials(format!(
                "access key length should be between {ACCESS_KEY_MIN_LEN} and {ACCESS_KEY_MAX_LEN}"
            )));
        }

        let secret_len = secret_key.chars().count();
        if !(SECRET_KEY_MIN_LEN..=SECRET_KEY_MAX_LEN).contains(&secret_len) {
            return Err(Error::InvalidCredentials(format!(
                "secret key length should be between {SECRET_KEY_MIN_LEN} and {SECRET_KEY_MAX_LEN}"
            )));
        }

        Ok(Self {
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    #[allow(dead_code)]
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}
