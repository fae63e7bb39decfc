//! Trust-on-first-use host key store
//!
//! Reads and appends an OpenSSH-compatible `known_hosts` file. Keys the
//! operator accepts without asking to remember them are trusted for the rest
//! of the process only.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::error::TrustStoreError;

/// Port that is written without the `[host]:port` form
pub const DEFAULT_SSH_PORT: u16 = 22;

/// SHA-256 of the key blob, base64 without padding
pub fn fingerprint(key_bytes: &[u8]) -> String {
    STANDARD_NO_PAD.encode(Sha256::digest(key_bytes))
}

/// A public key offered by a server during the handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedKey {
    /// Algorithm name, e.g. `ssh-ed25519`
    pub key_type: String,
    /// Wire-format public key blob
    pub key_bytes: Vec<u8>,
}

impl PresentedKey {
    pub fn new(key_type: impl Into<String>, key_bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            key_type: key_type.into(),
            key_bytes: key_bytes.into(),
        }
    }

    pub fn fingerprint(&self) -> String {
        fingerprint(&self.key_bytes)
    }

    /// Key blob as written in a known_hosts line
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.key_bytes)
    }
}

/// An accepted host key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub hostname: String,
    pub port: u16,
    pub key_type: String,
    pub key_base64: String,
    pub fingerprint: String,
}

impl HostIdentity {
    fn from_presented(hostname: &str, port: u16, key: &PresentedKey) -> Self {
        Self {
            hostname: hostname.to_string(),
            port,
            key_type: key.key_type.clone(),
            key_base64: key.to_base64(),
            fingerprint: key.fingerprint(),
        }
    }

    /// `host` on the default port, `[host]:port` otherwise
    pub fn host_pattern(&self) -> String {
        host_pattern(&self.hostname, self.port)
    }

    /// The line appended to the store, including the newline
    pub fn to_line(&self) -> String {
        format!(
            "{} {} {}\n",
            self.host_pattern(),
            self.key_type,
            self.key_base64
        )
    }

    fn is_for(&self, hostname: &str, port: u16, key_type: &str) -> bool {
        self.port == port
            && self.key_type == key_type
            && self.hostname.eq_ignore_ascii_case(hostname)
    }
}

fn host_pattern(hostname: &str, port: u16) -> String {
    if port == DEFAULT_SSH_PORT {
        hostname.to_string()
    } else {
        format!("[{}]:{}", hostname, port)
    }
}

/// Outcome of checking a presented key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustDecision {
    /// Same key already accepted for this host, port and key type
    Trusted,
    /// Never seen; the operator has to decide
    RequiresApproval { fingerprint: String },
    /// A different key of the same type is on record
    KeyChanged { expected: String, presented: String },
}

/// Host key store backed by a known_hosts file
#[derive(Debug, Default)]
pub struct TrustStore {
    path: Option<PathBuf>,
    persisted: Vec<HostIdentity>,
    session: Vec<HostIdentity>,
}

impl TrustStore {
    /// A store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load `path`; a missing file yields an empty store that will be
    /// created on the first remembered approval.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, TrustStoreError> {
        let path = path.into();
        let mut store = Self {
            path: Some(path.clone()),
            ..Default::default()
        };

        if !path.exists() {
            tracing::debug!("Known hosts file {:?} does not exist yet", path);
            return Ok(store);
        }

        let content = std::fs::read_to_string(&path).map_err(|source| TrustStoreError::Read {
            path: path.clone(),
            source,
        })?;

        for (line_num, line) in content.lines().enumerate() {
            store.persisted.extend(parse_line(line, line_num + 1, &path));
        }

        tracing::debug!(
            "Loaded {} known host keys from {:?}",
            store.persisted.len(),
            path
        );
        Ok(store)
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Every identity currently trusted, persisted first
    pub fn entries(&self) -> impl Iterator<Item = &HostIdentity> {
        self.persisted.iter().chain(self.session.iter())
    }

    /// Decide whether `key` is trusted for `hostname:port`
    pub fn verify(&self, hostname: &str, port: u16, key: &PresentedKey) -> TrustDecision {
        let presented = key.fingerprint();

        let known = self
            .entries()
            .filter(|id| id.is_for(hostname, port, &key.key_type))
            .collect::<Vec<_>>();

        if known.iter().any(|id| id.fingerprint == presented) {
            return TrustDecision::Trusted;
        }

        match known.first() {
            Some(id) => TrustDecision::KeyChanged {
                expected: id.fingerprint.clone(),
                presented,
            },
            None => TrustDecision::RequiresApproval {
                fingerprint: presented,
            },
        }
    }

    /// Trust `key` for this process and, if `remember` is set, append it to
    /// the backing file.
    ///
    /// The in-process trust is recorded even when writing the file fails.
    pub fn approve(
        &mut self,
        hostname: &str,
        port: u16,
        key: &PresentedKey,
        remember: bool,
    ) -> Result<(), TrustStoreError> {
        let identity = HostIdentity::from_presented(hostname, port, key);
        tracing::info!(
            "Trusting {} key SHA256:{} for {}",
            identity.key_type,
            identity.fingerprint,
            identity.host_pattern()
        );

        if !remember {
            self.session.push(identity);
            return Ok(());
        }

        let Some(path) = self.path.clone() else {
            self.session.push(identity);
            return Ok(());
        };

        let result = append_line(&path, &identity.to_line());
        match result {
            Ok(()) => {
                tracing::info!("Added {} to {:?}", identity.host_pattern(), path);
                self.persisted.push(identity);
                Ok(())
            }
            Err(e) => {
                self.session.push(identity);
                Err(e)
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> Result<(), TrustStoreError> {
    let write_err = |source| TrustStoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(write_err)?;
    file.write_all(line.as_bytes()).map_err(write_err)?;
    Ok(())
}

/// Parse one known_hosts line into zero or more identities
fn parse_line(line: &str, line_num: usize, path: &Path) -> Vec<HostIdentity> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
        return vec![];
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        tracing::warn!("Malformed known_hosts entry on line {} of {:?}", line_num, path);
        return vec![];
    }

    let (hosts, key_type, key_base64) = (parts[0], parts[1], parts[2]);
    if hosts.starts_with("|1|") {
        tracing::trace!("Skipping hashed known_hosts entry on line {}", line_num);
        return vec![];
    }

    let key_bytes = match STANDARD.decode(key_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                "Failed to decode key on line {} of {:?}: {}",
                line_num,
                path,
                e
            );
            return vec![];
        }
    };
    let fp = fingerprint(&key_bytes);

    hosts
        .split(',')
        .filter(|h| !h.is_empty() && !h.starts_with('!'))
        .map(|h| {
            let (hostname, port) = split_host_pattern(h);
            HostIdentity {
                hostname,
                port,
                key_type: key_type.to_string(),
                key_base64: key_base64.to_string(),
                fingerprint: fp.clone(),
            }
        })
        .collect()
}

/// `[host]:port` or a bare host on the default port
fn split_host_pattern(pattern: &str) -> (String, u16) {
    if let Some(rest) = pattern.strip_prefix('[') {
        if let Some((host, port)) = rest.split_once("]:") {
            if let Ok(port) = port.parse() {
                return (host.to_string(), port);
            }
        }
    }
    (pattern.to_string(), DEFAULT_SSH_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn test_key() -> PresentedKey {
        PresentedKey::new("ssh-ed25519", b"fixed test key material".to_vec())
    }

    #[test]
    fn test_fingerprint_is_unpadded_sha256() {
        let fp = test_key().fingerprint();
        // 32 bytes of digest encode to 43 chars without the trailing '='
        assert_eq!(fp.len(), 43);
        assert!(!fp.ends_with('='));
        assert_eq!(fp, fingerprint(b"fixed test key material"));

        let expected = STANDARD_NO_PAD.encode(Sha256::digest(b"fixed test key material"));
        assert_eq!(fp, expected);
    }

    #[test]
    fn test_unknown_key_requires_approval() {
        let store = TrustStore::in_memory();
        let decision = store.verify("srv01", 22, &test_key());
        assert_eq!(
            decision,
            TrustDecision::RequiresApproval {
                fingerprint: test_key().fingerprint()
            }
        );
    }

    #[test]
    fn test_session_approval_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("known_hosts");

        let mut store = TrustStore::load(&path).unwrap();
        store.approve("srv01", 22, &test_key(), false).unwrap();
        assert_eq!(store.verify("srv01", 22, &test_key()), TrustDecision::Trusted);
        assert!(!path.exists());

        let reloaded = TrustStore::load(&path).unwrap();
        assert!(matches!(
            reloaded.verify("srv01", 22, &test_key()),
            TrustDecision::RequiresApproval { .. }
        ));
    }

    #[test]
    fn test_remembered_key_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join(".ssh").join("known_hosts");

        let mut store = TrustStore::load(&path).unwrap();
        store.approve("srv01", 22, &test_key(), true).unwrap();
        store.approve("srv02", 2222, &test_key(), true).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let encoded = test_key().to_base64();
        assert_eq!(
            content,
            format!(
                "srv01 ssh-ed25519 {}\n[srv02]:2222 ssh-ed25519 {}\n",
                encoded, encoded
            )
        );

        let reloaded = TrustStore::load(&path).unwrap();
        assert_eq!(reloaded.verify("srv01", 22, &test_key()), TrustDecision::Trusted);
        assert_eq!(reloaded.verify("srv02", 2222, &test_key()), TrustDecision::Trusted);
        assert!(matches!(
            reloaded.verify("srv02", 22, &test_key()),
            TrustDecision::RequiresApproval { .. }
        ));

        let stored = reloaded.entries().next().unwrap();
        assert_eq!(stored.fingerprint, test_key().fingerprint());
    }

    #[test]
    fn test_changed_key_is_reported() {
        let mut store = TrustStore::in_memory();
        store.approve("srv01", 22, &test_key(), false).unwrap();

        let other = PresentedKey::new("ssh-ed25519", b"another key".to_vec());
        assert_eq!(
            store.verify("srv01", 22, &other),
            TrustDecision::KeyChanged {
                expected: test_key().fingerprint(),
                presented: other.fingerprint(),
            }
        );

        // A different algorithm is a separate identity
        let rsa = PresentedKey::new("ssh-rsa", b"another key".to_vec());
        assert!(matches!(
            store.verify("srv01", 22, &rsa),
            TrustDecision::RequiresApproval { .. }
        ));
    }

    #[test]
    fn test_load_skips_unusable_lines() {
        let encoded = test_key().to_base64();
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "@cert-authority *.example ssh-ed25519 {}", encoded).unwrap();
        writeln!(file, "|1|abc=|def= ssh-ed25519 {}", encoded).unwrap();
        writeln!(file, "badhost ssh-ed25519 !!!notbase64!!!").unwrap();
        writeln!(file, "short-line").unwrap();
        writeln!(file, "alpha,[beta]:2200 ssh-ed25519 {} user@box", encoded).unwrap();

        let store = TrustStore::load(file.path()).unwrap();
        let hosts: Vec<_> = store
            .entries()
            .map(|id| (id.hostname.as_str(), id.port))
            .collect();
        assert_eq!(hosts, vec![("alpha", 22), ("beta", 2200)]);
        assert_eq!(store.verify("ALPHA", 22, &test_key()), TrustDecision::Trusted);
    }
}
