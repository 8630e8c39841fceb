//! Error types for tradevault.
//!
//! Every failure a running session can hit is local and recoverable: it is
//! reported back to the transport layer as a message and the process keeps
//! serving other users. The single exception is configuration at startup,
//! which is allowed to abort before any user state is touched.

use rust_decimal::Decimal;

/// Top-level error type for the runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Configuration-related errors. The only fatal domain.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Vault codec errors.
///
/// `Decryption` covers every way a blob can fail to open: bad framing,
/// non-hex halves, truncation, or an AEAD tag mismatch. Callers must not
/// treat the affected record as valid, and must surface the failure
/// distinctly from "record absent".
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

/// Record store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Vault error for user {user_id}: {source}")]
    Vault {
        user_id: String,
        #[source]
        source: VaultError,
    },

    #[error("Persistence failed for user {user_id}: {reason}")]
    Persistence { user_id: String, reason: String },

    #[error("Record serialization failed for user {user_id}: {reason}")]
    Serialization { user_id: String, reason: String },
}

impl StoreError {
    /// Whether this is a decryption failure (corrupt blob or key mismatch)
    /// as opposed to an I/O or serialization fault.
    pub fn is_decryption(&self) -> bool {
        matches!(
            self,
            StoreError::Vault {
                source: VaultError::Decryption(_),
                ..
            }
        )
    }
}

/// Wallet reconstruction errors.
///
/// Never fatal to a record load: the store recovers by dropping the wallet
/// field so the rest of the user's ledger survives.
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Secret material is not valid base58: {0}")]
    InvalidEncoding(String),

    #[error("Secret material has wrong length: expected 64 bytes, got {got}")]
    InvalidLength { got: usize },

    #[error("Secret material does not match stored public key {expected}")]
    PublicKeyMismatch { expected: String },
}

/// User-input validation errors. Always recoverable: re-prompt, no stored
/// state is mutated.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("'{input}' is not a number")]
    NotNumeric { input: String },

    #[error("{field} out of range: {message}")]
    OutOfRange { field: &'static str, message: String },
}

/// Ledger-level trade rejections. No ledger mutation is performed.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Requested sell of {requested} exceeds net holdings of {available}")]
    InsufficientHoldings {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Amount {amount} is below the smallest representable unit {minimum}")]
    BelowMinimumUnit { amount: Decimal, minimum: Decimal },
}

/// Metadata/price gateway errors.
///
/// `NotFound` means the asset is unknown upstream; everything else is a
/// transient gateway fault. Consumers degrade to an explicit "unavailable"
/// result and never substitute a placeholder price.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Token {address} not found")]
    NotFound { address: String },

    #[error("Gateway request failed: {0}")]
    Gateway(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Swap execution errors reported by the trade executor. No ledger entry is
/// appended for a failed swap.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Swap failed: {reason}")]
    Swap { reason: String },
}

/// Result type alias for the runtime.
pub type Result<T> = std::result::Result<T, Error>;
