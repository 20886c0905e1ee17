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

use rustls_pemfile::{certs, private_key};
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::io::{self, Error};
use std::path::Path;
use std::{fs, io::BufReader};

/// Load public certificate from file.
pub fn load_certs(filename: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let cert_file =
        fs::File::open(filename).map_err(|e| certs_error(format!("failed to open {}: {}", filename.display(), e)))?;
    let mut reader = BufReader::new(cert_file);

    let certs = certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| certs_error(format!("certificate file {} format error:{:?}", filename.display(), e)))?;
    if certs.is_empty() {
        return Err(certs_error(format!(
            "No valid certificate was found in the certificate file {}",
            filename.display()
        )));
    }
    Ok(certs)
}

/// Load private key from file.
pub fn load_private_key(filename: &Path) -> io::Result<PrivateKeyDer<'static>> {
    let keyfile =
        fs::File::open(filename).map_err(|e| certs_error(format!("failed to open {}: {}", filename.display(), e)))?;
    let mut reader = BufReader::new(keyfile);

    private_key(&mut reader)?.ok_or_else(|| certs_error(format!("no private key found in {}", filename.display())))
}

/// Loads a certificate chain and its private key.
pub fn load_cert_key_pair(
    cert_path: &Path,
    key_path: &Path,
) -> io::Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;
    Ok((certs, key))
}

/// error function
pub fn certs_error(err: String) -> Error {
    Error::other(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_certs_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_certs(&dir.path().join("public.crt")).unwrap_err();
        assert!(err.to_string().contains("failed to open"), "{err}");
    }

    #[test]
    fn test_load_certs_without_pem_blocks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("public.crt");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "not a certificate").unwrap();

        let err = load_certs(&path).unwrap_err();
        assert!(err.to_string().contains("No valid certificate"), "{err}");
    }

    #[test]
    fn test_load_private_key_without_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("private.key");
        fs::write(&path, "").unwrap();

        let err = load_private_key(&path).unwrap_err();
        assert!(err.to_string().contains("no private key found"), "{err}");
    }
}
