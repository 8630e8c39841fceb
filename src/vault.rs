//! Vault codec: symmetric encryption of serialized user records.
//!
//! Blob format is a single colon-delimited pair, nonce first:
//! `<nonceHex>:<cipherHex>`. Every `seal` draws a fresh random 96-bit nonce,
//! so sealing the same plaintext twice under the same key yields different
//! blobs while `open(seal(p)) == p` always holds. AES-256-GCM provides the
//! integrity check: a flipped byte anywhere in the blob fails to open
//! instead of yielding silently corrupted plaintext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;

use crate::error::VaultError;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// 256-bit master key for the record vault.
///
/// Constructed only from exactly 64 hexadecimal characters; there is no
/// derived-from-default fallback. A process that cannot obtain a valid key
/// refuses to start (see `config`).
#[derive(Clone)]
pub struct MasterKey([u8; 32]);

impl MasterKey {
    /// Parse a 64-character hex string into a key.
    pub fn from_hex(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.len() != 64 {
            return Err(format!(
                "expected 64 hexadecimal characters (256 bits), got {}",
                trimmed.len()
            ));
        }
        let bytes = hex::decode(trimmed).map_err(|e| format!("not valid hexadecimal: {e}"))?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// Key material must never leak through debug output.
impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

/// Encrypt `plaintext` into a `<nonceHex>:<cipherHex>` blob.
pub fn seal(plaintext: &[u8], key: &MasterKey) -> Result<String, VaultError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| VaultError::Encryption("AEAD encryption failed".to_string()))?;

    Ok(format!(
        "{}:{}",
        hex::encode(nonce_bytes),
        hex::encode(ciphertext)
    ))
}

/// Decrypt a `<nonceHex>:<cipherHex>` blob back into plaintext.
pub fn open(blob: &str, key: &MasterKey) -> Result<Vec<u8>, VaultError> {
    let (nonce_hex, cipher_hex) = blob
        .split_once(':')
        .ok_or_else(|| VaultError::Decryption("missing ':' delimiter".to_string()))?;

    let nonce_bytes = hex::decode(nonce_hex)
        .map_err(|e| VaultError::Decryption(format!("nonce is not valid hex: {e}")))?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(VaultError::Decryption(format!(
            "nonce has wrong length: expected {NONCE_LEN} bytes, got {}",
            nonce_bytes.len()
        )));
    }

    let ciphertext = hex::decode(cipher_hex)
        .map_err(|e| VaultError::Decryption(format!("ciphertext is not valid hex: {e}")))?;

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key.0));
    cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| VaultError::Decryption("integrity check failed".to_string()))
}
