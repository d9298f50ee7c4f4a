// SPDX-License-Identifier: MIT

//! Persistence of identity storage records, one JSON file per provider
//! user id, overwritten in full on every successful exchange.

use std::path::PathBuf;

use crate::error::{AppError, Result};
use crate::models::StorageRecord;

/// Store for provider token/profile snapshots.
#[derive(Clone)]
pub struct UserVault {
    root: PathBuf,
}

impl UserVault {
    /// Open (and create if needed) the vault under `root`.
    pub fn new(root: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn record_path(&self, user_id: u64) -> PathBuf {
        self.root.join(format!("{}.json", user_id))
    }

    /// Overwrite the record for this user. No merge, no history.
    pub async fn write(&self, record: &StorageRecord) -> Result<()> {
        let pretty = serde_json::to_vec_pretty(record)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        tokio::fs::write(self.record_path(record.profile.id), pretty)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Read the record for this user, if one exists.
    pub async fn read(&self, user_id: u64) -> Result<Option<StorageRecord>> {
        let bytes = match tokio::fs::read(self.record_path(user_id)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };
        let record =
            serde_json::from_slice(&bytes).map_err(|e| AppError::Storage(e.to_string()))?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IdentityProfile, TokenPair};

    fn record(id: u64, refresh_token: &str) -> StorageRecord {
        StorageRecord {
            token: TokenPair {
                access_token: "at".into(),
                token_type: "Bearer".into(),
                expires_in: 604800,
                refresh_token: refresh_token.into(),
                scope: "identify".into(),
            },
            profile: IdentityProfile {
                id,
                username: "kilroy".into(),
                global_name: None,
                avatar: None,
            },
        }
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = UserVault::new(dir.path().join("users")).unwrap();

        vault.write(&record(42, "r1")).await.unwrap();
        let back = vault.read(42).await.unwrap().expect("record present");
        assert_eq!(back.profile.id, 42);
        assert_eq!(back.token.refresh_token, "r1");
    }

    #[tokio::test]
    async fn test_overwrite_supersedes() {
        let dir = tempfile::tempdir().unwrap();
        let vault = UserVault::new(dir.path().join("users")).unwrap();

        vault.write(&record(42, "old")).await.unwrap();
        vault.write(&record(42, "new")).await.unwrap();

        let back = vault.read(42).await.unwrap().unwrap();
        assert_eq!(back.token.refresh_token, "new");
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let vault = UserVault::new(dir.path().join("users")).unwrap();
        assert!(vault.read(7).await.unwrap().is_none());
    }
}
