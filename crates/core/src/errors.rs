use thiserror::Error;

/// Unified error type for the entire ledger-vault-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Ledger ──────────────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient quantity of {ticker}: holding {held}, requested {requested}")]
    InsufficientQuantity {
        ticker: String,
        held: i64,
        requested: String,
    },

    // ── Vault state ─────────────────────────────────────────────────
    #[error("Incorrect password — the vault key could not be unlocked")]
    Authentication,

    #[error("Vault data failed integrity check — {0} is damaged")]
    Integrity(String),

    #[error("Invalid vault state: {0}")]
    State(String),

    // ── Storage / File ──────────────────────────────────────────────
    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Unsupported vault version: {0}")]
    UnsupportedVersion(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed — wrong password or corrupted data")]
    Decryption,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),
}

impl CoreError {
    /// `true` for errors a batch import counts as a skip rather than a failure.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, CoreError::Duplicate(_))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CoreError {
    fn from(e: serde_yaml::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<aes_gcm::Error> for CoreError {
    fn from(_: aes_gcm::Error) -> Self {
        CoreError::Decryption
    }
}
