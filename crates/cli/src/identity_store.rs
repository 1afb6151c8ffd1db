//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//

//! Loading RSA identity material, the CA trust anchor, and the CRL from
//! disk, plus a flat-directory username -> public key lookup for the
//! server. None of this is `safecloud-core`'s concern: the library only
//! ever sees already-parsed `PrivateIdentity`/`PublicIdentity`/certificates.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use safecloud_core::identity::{ParsedCertificate, PrivateIdentity, PublicIdentity, RevocationList};
use safecloud_types::validate_username;

/// A flat directory of `<username>.pem` files holding each registered
/// client's RSA public key, loaded once at startup.
pub struct UserDirectory {
    users: HashMap<String, PublicIdentity>,
}

impl UserDirectory {
    pub fn load(dir: &Path) -> Result<Self> {
        let mut users = HashMap::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("reading user directory {}", dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pem") {
                continue;
            }
            let username = path
                .file_stem()
                .and_then(|s| s.to_str())
                .with_context(|| format!("non-UTF8 file name in {}", dir.display()))?
                .to_string();
            if !validate_username(&username) {
                continue;
            }
            let pem = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let key = PublicIdentity::from_pkcs1_pem(&pem)
                .with_context(|| format!("parsing public key for user {username}"))?;
            users.insert(username, key);
        }
        Ok(Self { users })
    }
}

impl safecloud_core::stsm::UserDirectory for UserDirectory {
    fn lookup(&self, username: &str) -> Option<PublicIdentity> {
        self.users.get(username).cloned()
    }
}

/// Loads the server's own RSA private key and X.509 certificate.
pub fn load_server_identity(
    key_path: &Path,
    cert_path: &Path,
) -> Result<(PrivateIdentity, String)> {
    let key_pem = std::fs::read_to_string(key_path)
        .with_context(|| format!("reading server key {}", key_path.display()))?;
    let private_key =
        PrivateIdentity::from_pkcs1_pem(&key_pem).context("parsing server private key")?;
    let cert_pem = std::fs::read_to_string(cert_path)
        .with_context(|| format!("reading server certificate {}", cert_path.display()))?;
    Ok((private_key, cert_pem))
}

/// Loads the client's trust anchor (CA certificate) and, if present, its CRL.
pub fn load_trust_store(
    ca_cert_path: &Path,
    crl_path: Option<&Path>,
) -> Result<(ParsedCertificate, RevocationList)> {
    let ca_pem = std::fs::read_to_string(ca_cert_path)
        .with_context(|| format!("reading CA certificate {}", ca_cert_path.display()))?;
    let ca_cert = ParsedCertificate::from_pem(&ca_pem).context("parsing CA certificate")?;
    let crl = match crl_path {
        Some(path) => {
            let pem = std::fs::read_to_string(path)
                .with_context(|| format!("reading CRL {}", path.display()))?;
            RevocationList::from_pem(&pem).context("parsing CRL")?
        }
        None => RevocationList::empty(),
    };
    Ok((ca_cert, crl))
}

/// Loads the client's own RSA private key.
pub fn load_client_identity(key_path: &Path) -> Result<PrivateIdentity> {
    let key_pem = std::fs::read_to_string(key_path)
        .with_context(|| format!("reading client key {}", key_path.display()))?;
    PrivateIdentity::from_pkcs1_pem(&key_pem).context("parsing client private key")
}
