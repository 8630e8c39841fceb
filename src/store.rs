//! Record store: durable per-user load/save with an in-memory cache.
//!
//! The store exclusively owns the canonical on-disk representation: one
//! vault-sealed file per user identity under the data directory. The cache
//! is a read/write-through mirror scoped to process lifetime, rebuilt
//! lazily on first access per user and refreshed only by successful saves,
//! so the cache and the durable copy never diverge in the failure path.
//!
//! The store is an explicit object injected into everything that needs
//! persistence; there is no global table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::record::UserRecord;
use crate::vault::{self, MasterKey};

/// Per-user durable record storage.
pub struct RecordStore {
    data_dir: PathBuf,
    key: MasterKey,
    cache: RwLock<HashMap<String, UserRecord>>,
}

impl RecordStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub fn open(data_dir: impl Into<PathBuf>, key: MasterKey) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(|e| StoreError::Persistence {
            user_id: String::new(),
            reason: format!("cannot create data dir {}: {e}", data_dir.display()),
        })?;
        Ok(Self {
            data_dir,
            key,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Load a user's record.
    ///
    /// Cache hit returns the cached copy. On miss the persisted blob is
    /// opened and deserialized; if no blob exists a default record is
    /// synthesized and immediately persisted, so a first-time user is
    /// durable before their first action completes.
    pub async fn load(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        if let Some(record) = self.cache.read().await.get(user_id) {
            return Ok(record.clone());
        }

        match self.load_from_disk(user_id).await? {
            Some(record) => {
                self.cache
                    .write()
                    .await
                    .insert(user_id.to_string(), record.clone());
                Ok(record)
            }
            None => {
                tracing::debug!(user_id, "no persisted record, synthesizing default");
                let record = UserRecord::default();
                self.save(user_id, &record).await?;
                Ok(record)
            }
        }
    }

    /// Read and decrypt a record straight from disk, bypassing the cache.
    ///
    /// Returns `Ok(None)` when no blob exists — a new user, as opposed to a
    /// decryption failure, which is an error so operators can tell
    /// corruption apart from absence. A wallet whose stored material fails
    /// reconstruction is invalidated rather than failing the load: a broken
    /// wallet must not take the user's ledger down with it.
    pub async fn load_from_disk(&self, user_id: &str) -> Result<Option<UserRecord>, StoreError> {
        let path = self.record_path(user_id);
        let blob = match tokio::fs::read_to_string(&path).await {
            Ok(blob) => blob,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Persistence {
                    user_id: user_id.to_string(),
                    reason: format!("read {}: {e}", path.display()),
                });
            }
        };

        let plaintext = vault::open(blob.trim(), &self.key).map_err(|source| StoreError::Vault {
            user_id: user_id.to_string(),
            source,
        })?;

        let mut record: UserRecord =
            serde_json::from_slice(&plaintext).map_err(|e| StoreError::Serialization {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(wallet) = record.wallet.as_mut() {
            if let Err(e) = wallet.reconstruct() {
                tracing::warn!(
                    user_id,
                    error = %e,
                    "stored wallet material is unusable, dropping wallet; user must re-import"
                );
                record.wallet = None;
            }
        }

        Ok(Some(record))
    }

    /// Serialize, seal, and persist a record, then refresh the cache.
    ///
    /// The write is a tmp-file-plus-rename replace. The cache is updated
    /// only after the durable write succeeds; on failure the previous cache
    /// entry (and the previous file) remain authoritative.
    pub async fn save(&self, user_id: &str, record: &UserRecord) -> Result<(), StoreError> {
        let plaintext =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization {
                user_id: user_id.to_string(),
                reason: e.to_string(),
            })?;
        let blob = vault::seal(&plaintext, &self.key).map_err(|source| StoreError::Vault {
            user_id: user_id.to_string(),
            source,
        })?;

        let path = self.record_path(user_id);
        let tmp = path.with_extension("vault.tmp");
        let write_result = async {
            tokio::fs::write(&tmp, blob.as_bytes()).await?;
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Persistence {
                user_id: user_id.to_string(),
                reason: format!("write {}: {e}", path.display()),
            });
        }

        self.cache
            .write()
            .await
            .insert(user_id.to_string(), record.clone());
        Ok(())
    }

    fn record_path(&self, user_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.vault", file_stem(user_id)))
    }

    #[cfg(test)]
    pub(crate) fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Filesystem-safe stem for a user identity.
///
/// Identities are opaque strings from the transport; anything outside a
/// conservative character set is hex-encoded so no identity can escape the
/// data directory.
fn file_stem(user_id: &str) -> String {
    let safe = user_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if safe && !user_id.is_empty() {
        user_id.to_string()
    } else {
        format!("x{}", hex::encode(user_id.as_bytes()))
    }
}
