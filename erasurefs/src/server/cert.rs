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


use erasurefs_config::{DEFAULT_CERTS_DIR_NAME, ERASUREFS_PRIVATE_KEY, ERASUREFS_PUBLIC_CERT};
use erasurefs_ecstore::resolver::TlsProvider;
use erasurefs_utils::{get_env_opt_str, load_cert_key_pair};
use rustls::ServerConfig;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, instrument};

/// Directory holding `public.crt` and `private.key`.
///
/// TLS is on exactly when both files are present.
#[derive(Debug, Clone, Default)]
pub(crate) struct CertsDir {
    dir: Option<PathBuf>,
}

impl CertsDir {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// `--certs-dir` if given, otherwise `~/.erasurefs/certs`.
    pub fn from_opts(dir: Option<PathBuf>) -> Self {
        let dir = dir.or_else(|| get_env_opt_str("HOME").map(|home| Path::new(&home).join(DEFAULT_CERTS_DIR_NAME)));
        Self::new(dir)
    }

    pub fn path(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn cert_file(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(ERASUREFS_PUBLIC_CERT))
    }

    fn key_file(&self) -> Option<PathBuf> {
        self.dir.as_ref().map(|d| d.join(ERASUREFS_PRIVATE_KEY))
    }

    /// Creates the directory if missing so operators know where to drop certificates.
    pub async fn create_certs_dir(&self) -> io::Result<()> {
        if let Some(dir) = &self.dir {
            tokio::fs::create_dir_all(dir).await?;
            debug!("certificates directory: {}", dir.display());
        }
        Ok(())
    }

    async fn has_key_pair(&self) -> bool {
        let (Some(cert), Some(key)) = (self.cert_file(), self.key_file()) else {
            return false;
        };
        let cert_exists = tokio::fs::try_exists(&cert).await.unwrap_or(false);
        let key_exists = tokio::fs::try_exists(&key).await.unwrap_or(false);
        cert_exists && key_exists
    }

    /// Acceptor for the listener, `None` when the key pair is absent.
    #[instrument(skip(self))]
    pub async fn tls_acceptor(&self) -> io::Result<Option<TlsAcceptor>> {
        if !self.has_key_pair().await {
            debug!("no certificates found, starting with HTTP");
            return Ok(None);
        }
        let (Some(cert_path), Some(key_path)) = (self.cert_file(), self.key_file()) else {
            return Ok(None);
        };

        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

        let (certs, key) = load_cert_key_pair(&cert_path, &key_path)?;
        let mut server_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| io::Error::other(format!("invalid certificate {}: {}", cert_path.display(), e)))?;
        server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec(), b"http/1.0".to_vec()];

        info!("loaded TLS certificate from {}", cert_path.display());
        Ok(Some(TlsAcceptor::from(Arc::new(server_config))))
    }
}

#[async_trait::async_trait]
impl TlsProvider for CertsDir {
    async fn certificates_available(&self) -> bool {
        self.has_key_pair().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_certs_dir() {
        let root = TempDir::new().unwrap();
        let certs = CertsDir::new(Some(root.path().join("nested").join("certs")));
        certs.create_certs_dir().await.unwrap();
        assert!(certs.path().unwrap().is_dir());
        assert!(!certs.certificates_available().await);
        assert!(certs.tls_acceptor().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_both_files_required() {
        let root = TempDir::new().unwrap();
        let certs = CertsDir::new(Some(root.path().to_path_buf()));

        tokio::fs::write(root.path().join(ERASUREFS_PUBLIC_CERT), b"cert").await.unwrap();
        assert!(!certs.certificates_available().await);

        tokio::fs::write(root.path().join(ERASUREFS_PRIVATE_KEY), b"key").await.unwrap();
        assert!(certs.certificates_available().await);

        // Present but not PEM.
        assert!(certs.tls_acceptor().await.is_err());
    }

    #[tokio::test]
    async fn test_no_dir_means_no_tls() {
        let certs = CertsDir::new(None);
        certs.create_certs_dir().await.unwrap();
        assert!(!certs.certificates_available().await);
    }

    #[test]
    fn test_default_dir_under_home() {
        temp_env::with_var("HOME", Some("/home/erasurefs"), || {
            let certs = CertsDir::from_opts(None);
            assert_eq!(certs.path(), Some(Path::new("/home/erasurefs/.erasurefs/certs")));

            let certs = CertsDir::from_opts(Some(PathBuf::from("/etc/certs")));
            assert_eq!(certs.path(), Some(Path::new("/etc/certs")));
        });
    }
}
