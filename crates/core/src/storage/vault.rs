use std::fmt;
use std::fs;
use std::path::Path;

use zeroize::Zeroizing;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;
use crate::Wallet;

use super::document::LedgerDocument;
use super::encryption::{self, KdfParams, SecretKey, SALT_LEN};
use super::format::{self, VaultLayout, VaultMetadata, VAULT_FILE};
use super::session::SessionCache;

/// Minimum password length accepted by [`Vault::create`] unless overridden.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 12;

/// Settings applied when a vault is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultOptions {
    pub kdf: KdfParams,
    pub min_password_len: usize,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            kdf: KdfParams::default(),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

/// The in-memory data-encryption key.
///
/// Can be cleared in place; the bytes are wiped when that happens. Anything
/// that needs the key after that fails with [`CoreError::State`].
pub struct DataKey(Option<SecretKey>);

impl DataKey {
    pub(crate) fn new(key: SecretKey) -> Self {
        Self(Some(key))
    }

    /// Wipe the key.
    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_cleared(&self) -> bool {
        self.0.is_none()
    }

    pub(crate) fn secret(&self) -> Result<&SecretKey, CoreError> {
        self.0.as_ref().ok_or_else(|| {
            CoreError::State("the data key has been cleared; unlock the vault again to save".to_string())
        })
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_cleared() {
            f.write_str("DataKey(<cleared>)")
        } else {
            f.write_str("DataKey(<redacted>)")
        }
    }
}

/// Vault-directory operations that do not depend on lock state.
///
/// A vault is a directory holding the KDF salt, the wrapped data key, the
/// non-secret metadata and the encrypted ledger (see [`VaultLayout`]). The
/// password only ever unwraps the data key; the ledger is encrypted under the
/// data key, so saves never rerun the KDF.
pub struct Vault;

impl Vault {
    /// Initialize a new vault in `dir` and return it unlocked with an empty
    /// ledger.
    pub fn create(dir: impl AsRef<Path>, password: &str, options: &VaultOptions) -> Result<UnlockedVault, CoreError> {
        let layout = VaultLayout::new(dir);
        if password.chars().count() < options.min_password_len {
            return Err(CoreError::Validation(format!(
                "Password must be at least {} characters",
                options.min_password_len
            )));
        }
        if Self::exists(layout.root()) {
            return Err(CoreError::State(format!(
                "a vault already exists at {}",
                layout.root().display()
            )));
        }
        options.kdf.validate()?;

        fs::create_dir_all(layout.root())?;

        let salt = encryption::generate_salt()?;
        let master = encryption::derive_key(password, &salt, &options.kdf)?;
        let data_key = encryption::generate_data_key()?;
        let wrapped = encryption::encrypt(&data_key[..], &master)?;
        let metadata = VaultMetadata::new(options.kdf);

        fs::write(layout.salt(), salt)?;
        format::write_atomic(&layout.encrypted_key(), &wrapped)?;
        fs::write(layout.metadata(), metadata.to_yaml()?)?;

        let key = DataKey::new(data_key);
        let ledger = Ledger::new();
        Self::save(layout.root(), &ledger, &key)?;

        log::info!("Created vault at {}", layout.root().display());

        Ok(UnlockedVault {
            layout,
            metadata,
            key,
            wallet: Wallet::from_ledger(ledger),
        })
    }

    /// `true` if `dir` holds an initialized vault.
    pub fn exists(dir: impl AsRef<Path>) -> bool {
        let layout = VaultLayout::new(dir);
        layout.salt().is_file() && layout.vault().is_file()
    }

    /// Read the metadata of an existing vault without unlocking it.
    pub fn open(dir: impl AsRef<Path>) -> Result<LockedVault, CoreError> {
        LockedVault::open(dir)
    }

    /// Serialize `ledger` canonically and overwrite the encrypted vault file.
    ///
    /// Fails with [`CoreError::State`] before touching the disk if `key` has
    /// been cleared.
    pub fn save(dir: impl AsRef<Path>, ledger: &Ledger, key: &DataKey) -> Result<(), CoreError> {
        let secret = key.secret()?;
        let layout = VaultLayout::new(dir);

        let plaintext = Zeroizing::new(LedgerDocument::from_ledger(ledger).to_bytes()?);
        let blob = encryption::encrypt(&plaintext, secret)?;
        format::write_atomic(&layout.vault(), &blob)?;

        log::info!(
            "Saved vault at {} ({} trades, {} distributions)",
            layout.root().display(),
            ledger.trade_count(),
            ledger.distribution_count()
        );
        Ok(())
    }

    /// Decrypt and rebuild the ledger with a key already known to be correct.
    ///
    /// A tag failure here means the vault file is damaged, so it is reported
    /// as [`CoreError::Integrity`].
    pub fn load(dir: impl AsRef<Path>, key: &DataKey) -> Result<Ledger, CoreError> {
        let secret = key.secret()?;
        let layout = VaultLayout::new(dir);

        let blob = fs::read(layout.vault())?;
        let plaintext = encryption::decrypt(&blob, secret).map_err(|e| match e {
            CoreError::Decryption => CoreError::Integrity(VAULT_FILE.to_string()),
            other => other,
        })?;
        let plaintext = Zeroizing::new(plaintext);

        LedgerDocument::from_bytes(&plaintext)?.into_ledger()
    }
}

/// A vault whose metadata has been read but whose key is not in memory.
#[derive(Debug, Clone)]
pub struct LockedVault {
    layout: VaultLayout,
    metadata: VaultMetadata,
}

impl LockedVault {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let layout = VaultLayout::new(dir);
        if !Vault::exists(layout.root()) {
            return Err(CoreError::NotFound(format!("vault at {}", layout.root().display())));
        }
        let raw = fs::read_to_string(layout.metadata())?;
        let metadata = VaultMetadata::from_yaml(&raw)?;
        Ok(Self { layout, metadata })
    }

    pub fn layout(&self) -> &VaultLayout {
        &self.layout
    }

    pub fn metadata(&self) -> &VaultMetadata {
        &self.metadata
    }

    /// Derive the master key from `password` and unwrap the data key.
    ///
    /// A tag failure on the wrapped key is reported as
    /// [`CoreError::Authentication`].
    pub fn unlock_key(&self, password: &str) -> Result<DataKey, CoreError> {
        let salt_bytes = fs::read(self.layout.salt())?;
        let salt: [u8; SALT_LEN] = salt_bytes.as_slice().try_into().map_err(|_| {
            CoreError::InvalidFileFormat(format!(
                "salt must be {SALT_LEN} bytes, found {}",
                salt_bytes.len()
            ))
        })?;

        let master = encryption::derive_key(password, &salt, &self.metadata.kdf_params)?;
        let wrapped = fs::read(self.layout.encrypted_key())?;
        let unwrapped = Zeroizing::new(encryption::decrypt(&wrapped, &master).map_err(|e| match e {
            CoreError::Decryption => CoreError::Authentication,
            other => other,
        })?);

        let key = encryption::key_from_slice(&unwrapped).ok_or_else(|| {
            CoreError::InvalidFileFormat(format!(
                "data key must be {} bytes, found {}",
                encryption::KEY_LEN,
                unwrapped.len()
            ))
        })?;
        Ok(DataKey::new(key))
    }

    /// Unlock with `password` and load the ledger.
    pub fn unlock(&self, password: &str) -> Result<UnlockedVault, CoreError> {
        let key = self.unlock_key(password)?;
        let ledger = Vault::load(self.layout.root(), &key)?;

        log::info!("Unlocked vault at {}", self.layout.root().display());

        Ok(UnlockedVault {
            layout: self.layout.clone(),
            metadata: self.metadata.clone(),
            key,
            wallet: Wallet::from_ledger(ledger),
        })
    }
}

/// A vault with its data key in memory and its ledger loaded.
///
/// Only this state can save; [`lock`](Self::lock) consumes it and hands back
/// a [`LockedVault`].
#[derive(Debug)]
pub struct UnlockedVault {
    layout: VaultLayout,
    metadata: VaultMetadata,
    key: DataKey,
    wallet: Wallet,
}

impl UnlockedVault {
    pub(crate) fn from_parts(layout: VaultLayout, metadata: VaultMetadata, key: DataKey, ledger: Ledger) -> Self {
        Self {
            layout,
            metadata,
            key,
            wallet: Wallet::from_ledger(ledger),
        }
    }

    pub fn layout(&self) -> &VaultLayout {
        &self.layout
    }

    pub fn metadata(&self) -> &VaultMetadata {
        &self.metadata
    }

    pub fn data_key(&self) -> &DataKey {
        &self.key
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn wallet_mut(&mut self) -> &mut Wallet {
        &mut self.wallet
    }

    /// Encrypt and write the ledger. Refreshes the session cache when one is
    /// active and clears the wallet's unsaved-changes flag.
    pub fn save(&mut self) -> Result<(), CoreError> {
        let root = self.layout.root();
        Vault::save(root, self.wallet.ledger(), &self.key)?;
        if SessionCache::exists(root) {
            SessionCache::write(root, self.wallet.ledger(), Some(&self.key))?;
        }
        self.wallet.mark_saved();
        Ok(())
    }

    /// Write the plaintext session cache so later invocations can resume
    /// without the password.
    pub fn cache_session(&self) -> Result<(), CoreError> {
        SessionCache::write(self.layout.root(), self.wallet.ledger(), Some(&self.key))
    }

    /// Wipe the data key and remove any session cache. Unsaved changes are
    /// dropped.
    pub fn lock(mut self) -> Result<LockedVault, CoreError> {
        if self.wallet.is_dirty() {
            log::warn!(
                "Locking vault at {} with unsaved changes; they are discarded",
                self.layout.root().display()
            );
        }
        self.key.clear();
        SessionCache::clear(self.layout.root())?;

        log::info!("Locked vault at {}", self.layout.root().display());

        Ok(LockedVault {
            layout: self.layout,
            metadata: self.metadata,
        })
    }
}
