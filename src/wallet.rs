//! Wallet keypairs: generation and reconstruction from durable material.
//!
//! The durable representation is the Solana convention: a base58-encoded
//! 64-byte keypair (32-byte seed followed by the 32-byte public key), plus
//! the base58 public key alongside it. The `SigningKey` itself is a derived
//! runtime-only value: recomputed on load, never serialized on save.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// A user's signing wallet.
///
/// Only `public_key` and `secret_material` are durable. `signing` is the
/// cached reconstruction; `signing == None` after deserialization until the
/// store calls [`Wallet::reconstruct`].
#[derive(Clone, Serialize, Deserialize)]
pub struct Wallet {
    /// Base58-encoded ed25519 public key.
    pub public_key: String,

    /// Base58-encoded 64-byte keypair material.
    #[serde(
        serialize_with = "serialize_secret",
        deserialize_with = "deserialize_secret"
    )]
    pub secret_material: SecretString,

    #[serde(skip)]
    signing: Option<SigningKey>,
}

fn serialize_secret<S>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    // Persisted only inside the sealed vault blob; never written in the clear.
    serializer.serialize_str(secret.expose_secret())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("public_key", &self.public_key)
            .field("secret_material", &"[REDACTED]")
            .field("reconstructed", &self.signing.is_some())
            .finish()
    }
}

impl Wallet {
    /// Generate a fresh wallet.
    pub fn generate() -> Self {
        let signing = SigningKey::generate(&mut OsRng);
        Self::from_signing_key(signing)
    }

    /// Import a wallet from user-supplied base58 secret material.
    ///
    /// Accepts the 64-byte keypair form (consistency-checked) or a bare
    /// 32-byte seed.
    pub fn import(secret_material: &str) -> Result<Self, WalletError> {
        let signing = decode_signing_key(secret_material)?;
        Ok(Self::from_signing_key(signing))
    }

    fn from_signing_key(signing: SigningKey) -> Self {
        let public_key = bs58::encode(signing.verifying_key().to_bytes()).into_string();
        let secret_material =
            SecretString::from(bs58::encode(signing.to_keypair_bytes()).into_string());
        Self {
            public_key,
            secret_material,
            signing: Some(signing),
        }
    }

    /// Rebuild the signing key from the durable material.
    ///
    /// Fails if the material no longer decodes or derives a different public
    /// key than the one stored next to it.
    pub fn reconstruct(&mut self) -> Result<(), WalletError> {
        let signing = decode_signing_key(self.secret_material.expose_secret())?;
        let derived = bs58::encode(signing.verifying_key().to_bytes()).into_string();
        if derived != self.public_key {
            return Err(WalletError::PublicKeyMismatch {
                expected: self.public_key.clone(),
            });
        }
        self.signing = Some(signing);
        Ok(())
    }

    /// The reconstructed signing key, if reconstruction has run.
    pub fn signing_key(&self) -> Option<&SigningKey> {
        self.signing.as_ref()
    }
}

fn decode_signing_key(raw: &str) -> Result<SigningKey, WalletError> {
    let bytes = bs58::decode(raw.trim())
        .into_vec()
        .map_err(|e| WalletError::InvalidEncoding(e.to_string()))?;

    match bytes.len() {
        64 => {
            let mut keypair = [0u8; 64];
            keypair.copy_from_slice(&bytes);
            SigningKey::from_keypair_bytes(&keypair)
                .map_err(|e| WalletError::InvalidEncoding(e.to_string()))
        }
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        got => Err(WalletError::InvalidLength { got }),
    }
}
