use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use super::encryption::KdfParams;

/// Raw KDF salt bytes.
pub const SALT_FILE: &str = "salt.bin";
/// Data-encryption key wrapped under the password-derived master key.
pub const ENCRYPTED_KEY_FILE: &str = "encrypted_key.bin";
/// Non-secret description of the vault's cryptography.
pub const METADATA_FILE: &str = "metadata.yaml";
/// Ledger document encrypted under the data key.
pub const VAULT_FILE: &str = "vault.enc";
/// Session-only plaintext ledger (0600).
pub const UNLOCKED_FILE: &str = "vault.unlocked";
/// Session-only plaintext data key (0600).
pub const SESSION_KEY_FILE: &str = "session.key";

/// Current vault format version.
pub const CURRENT_VERSION: &str = "1.0";
pub const ALGORITHM: &str = "AES-256-GCM";
pub const KDF: &str = "Argon2id";

/// Paths of every file in a vault directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultLayout {
    root: PathBuf,
}

impl VaultLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn salt(&self) -> PathBuf {
        self.root.join(SALT_FILE)
    }

    pub fn encrypted_key(&self) -> PathBuf {
        self.root.join(ENCRYPTED_KEY_FILE)
    }

    pub fn metadata(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn vault(&self) -> PathBuf {
        self.root.join(VAULT_FILE)
    }

    pub fn unlocked(&self) -> PathBuf {
        self.root.join(UNLOCKED_FILE)
    }

    pub fn session_key(&self) -> PathBuf {
        self.root.join(SESSION_KEY_FILE)
    }
}

/// Contents of `metadata.yaml`.
///
/// ```yaml
/// version: '1.0'
/// algorithm: AES-256-GCM
/// kdf: Argon2id
/// kdf_params:
///   memory_cost: 65536
///   time_cost: 3
///   parallelism: 4
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMetadata {
    pub version: String,
    pub algorithm: String,
    pub kdf: String,

    /// Absent in vaults written before parameters were recorded; those use
    /// the defaults.
    #[serde(default)]
    pub kdf_params: KdfParams,
}

impl VaultMetadata {
    pub fn new(kdf_params: KdfParams) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            algorithm: ALGORITHM.to_string(),
            kdf: KDF.to_string(),
            kdf_params,
        }
    }

    pub fn to_yaml(&self) -> Result<String, CoreError> {
        serde_yaml::to_string(self)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize vault metadata: {e}")))
    }

    /// Parse and check that this build can open the described vault.
    pub fn from_yaml(raw: &str) -> Result<Self, CoreError> {
        let metadata: VaultMetadata = serde_yaml::from_str(raw)?;

        if metadata.version != CURRENT_VERSION {
            return Err(CoreError::UnsupportedVersion(metadata.version));
        }
        if metadata.algorithm != ALGORITHM || metadata.kdf != KDF {
            return Err(CoreError::InvalidFileFormat(format!(
                "Unsupported cryptography: {} with {} (expected {ALGORITHM} with {KDF})",
                metadata.algorithm, metadata.kdf
            )));
        }
        metadata.kdf_params.validate()?;

        Ok(metadata)
    }
}

/// Replace `path` by writing a sibling temp file and renaming it over the
/// target, so readers never observe a half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
