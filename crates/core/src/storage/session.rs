use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use zeroize::Zeroizing;

use crate::errors::CoreError;
use crate::models::ledger::Ledger;

use super::document::LedgerDocument;
use super::encryption;
use super::format::VaultLayout;
use super::vault::{DataKey, LockedVault, UnlockedVault};

/// What an existing session cache resumes into.
#[derive(Debug)]
pub enum SessionResume {
    /// The cached key matched the vault.
    Unlocked(UnlockedVault),
    /// No key was cached. The snapshot can be read, but saving requires
    /// unlocking with the password.
    ReadOnly(Ledger),
}

/// Plaintext session cache: `vault.unlocked` plus `session.key`.
///
/// SECURITY: both files hold secrets in the clear. They are written
/// owner-only (0600) and exist only between unlock and lock. Nothing in the
/// encrypted path reads them; resuming is always an explicit call.
pub struct SessionCache;

impl SessionCache {
    /// Write the plaintext ledger and, if given, the data key.
    pub fn write(dir: impl AsRef<Path>, ledger: &Ledger, key: Option<&DataKey>) -> Result<(), CoreError> {
        let layout = VaultLayout::new(dir);
        let secret = key.map(DataKey::secret).transpose()?;
        let bytes = Zeroizing::new(LedgerDocument::from_ledger(ledger).to_bytes()?);
        write_private(&layout.unlocked(), &bytes)?;

        match secret {
            Some(secret) => write_private(&layout.session_key(), &secret[..])?,
            None => {
                log::warn!(
                    "Session cache at {} written without a key; saving will require the password",
                    layout.root().display()
                );
                remove_if_present(&layout.session_key())?;
            }
        }

        log::info!("Wrote session cache at {}", layout.root().display());
        Ok(())
    }

    pub fn exists(dir: impl AsRef<Path>) -> bool {
        VaultLayout::new(dir).unlocked().is_file()
    }

    /// Remove both session files. Missing files are not an error.
    pub fn clear(dir: impl AsRef<Path>) -> Result<(), CoreError> {
        let layout = VaultLayout::new(dir);
        remove_if_present(&layout.unlocked())?;
        remove_if_present(&layout.session_key())?;
        log::info!("Cleared session cache at {}", layout.root().display());
        Ok(())
    }

    /// Pick up a session left by an earlier process.
    ///
    /// Returns `Ok(None)` when there is no cache. A cached key that cannot
    /// decrypt the vault is a [`CoreError::State`] error: the cache belongs
    /// to a different vault or is stale, and should be cleared.
    pub fn resume(dir: impl AsRef<Path>) -> Result<Option<SessionResume>, CoreError> {
        let layout = VaultLayout::new(dir);
        if !layout.unlocked().is_file() {
            return Ok(None);
        }

        if !layout.session_key().is_file() {
            log::warn!(
                "Session cache at {} has no key; resuming read-only",
                layout.root().display()
            );
            let bytes = Zeroizing::new(fs::read(layout.unlocked())?);
            let ledger = LedgerDocument::from_bytes(&bytes)?.into_ledger()?;
            return Ok(Some(SessionResume::ReadOnly(ledger)));
        }

        let locked = LockedVault::open(layout.root())?;
        let raw_key = Zeroizing::new(fs::read(layout.session_key())?);
        let secret = encryption::key_from_slice(&raw_key).ok_or_else(|| {
            CoreError::InvalidFileFormat(format!(
                "session key must be {} bytes, found {}",
                encryption::KEY_LEN,
                raw_key.len()
            ))
        })?;

        let blob = fs::read(layout.vault())?;
        let plaintext = encryption::decrypt(&blob, &secret).map_err(|e| match e {
            CoreError::Decryption => CoreError::State(format!(
                "cached session key does not match the vault at {}",
                layout.root().display()
            )),
            other => other,
        })?;
        let plaintext = Zeroizing::new(plaintext);
        let ledger = LedgerDocument::from_bytes(&plaintext)?.into_ledger()?;

        log::info!("Resumed session at {}", layout.root().display());

        Ok(Some(SessionResume::Unlocked(UnlockedVault::from_parts(
            locked.layout().clone(),
            locked.metadata().clone(),
            DataKey::new(secret),
            ledger,
        ))))
    }
}

/// Create or truncate `path` with owner-only permissions.
fn write_private(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; tighten a pre-existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), CoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
