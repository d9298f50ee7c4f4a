// SPDX-License-Identifier: MIT

//! Session lifecycle: authorization-code exchange, credential minting, and
//! the refresh policy.
//!
//! The storage record is persisted before the credential is minted, so a
//! later silent refresh is possible even if the caller discards the token.

use chrono::Utc;

use crate::auth::{Claims, CredentialCodec};
use crate::error::{AppError, Result};
use crate::models::StorageRecord;
use crate::services::provider::{GrantKind, ProviderClient};
use crate::store::UserVault;

/// Remaining validity above which refresh returns the token unchanged.
const REFRESH_THRESHOLD_SECS: i64 = 24 * 60 * 60;

/// Orchestrates provider exchanges and credential issuance.
#[derive(Clone)]
pub struct IdentityService {
    provider: ProviderClient,
    vault: UserVault,
    codec: CredentialCodec,
    admins: Vec<u64>,
}

impl IdentityService {
    pub fn new(
        provider: ProviderClient,
        vault: UserVault,
        codec: CredentialCodec,
        admins: Vec<u64>,
    ) -> Self {
        Self {
            provider,
            vault,
            codec,
            admins,
        }
    }

    /// Trade an authorization code or refresh token for a signed session
    /// credential.
    pub async fn exchange(&self, token: &str, grant: GrantKind) -> Result<String> {
        let token_pair = self.provider.token_request(token, grant).await?;

        if !token_pair.has_identify_scope() {
            tracing::warn!("Provider grant missing identify scope");
            return Err(AppError::Unauthorized);
        }

        let profile = self.provider.fetch_profile(&token_pair).await?;

        // Persist before minting so refresh works even if the caller never
        // uses the credential.
        let record = StorageRecord {
            token: token_pair,
            profile,
        };
        self.vault.write(&record).await?;

        let now = Utc::now().timestamp();
        let claims = Claims::mint(&record.profile, &self.admins, now, record.token.expires_in);

        tracing::info!(user_id = claims.id, "Session credential issued");
        self.codec.encode(&claims)
    }

    /// Refresh policy: a credential with more than a day of validity left is
    /// returned unchanged; otherwise the stored refresh token is re-exchanged.
    pub async fn refresh(&self, bearer: &str) -> Result<String> {
        let claims = self.codec.decode_allow_expired(bearer)?;

        if claims.exp - Utc::now().timestamp() > REFRESH_THRESHOLD_SECS {
            return Ok(bearer.to_string());
        }

        // Failure anywhere below (missing record included) collapses to
        // Unauthorized: the client has to re-authenticate.
        let record = self
            .vault
            .read(claims.id)
            .await
            .map_err(|_| AppError::Unauthorized)?
            .ok_or(AppError::Unauthorized)?;

        self.exchange(&record.token.refresh_token, GrantKind::RefreshToken)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IdentityProfile;

    fn service(dir: &std::path::Path) -> IdentityService {
        let provider = ProviderClient::new(
            "client".into(),
            "secret".into(),
            "http://localhost/callback".into(),
        );
        let vault = UserVault::new(dir.join("users")).unwrap();
        let codec = CredentialCodec::new(b"test_signing_key_for_unit_tests!!");
        IdentityService::new(provider, vault, codec, vec![1])
    }

    fn fresh_token(codec: &CredentialCodec, expires_in: i64) -> String {
        let profile = IdentityProfile {
            id: 42,
            username: "kilroy".into(),
            global_name: None,
            avatar: None,
        };
        let claims = Claims::mint(&profile, &[], Utc::now().timestamp(), expires_in);
        codec.encode(&claims).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_fast_path_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let codec = CredentialCodec::new(b"test_signing_key_for_unit_tests!!");

        // Two days of validity left: refresh must not re-sign or re-exchange
        let token = fresh_token(&codec, 2 * 24 * 60 * 60);
        let first = service.refresh(&token).await.unwrap();
        let second = service.refresh(&first).await.unwrap();
        assert_eq!(first, token);
        assert_eq!(second, token);
    }

    #[tokio::test]
    async fn test_refresh_without_storage_record_is_unauthorized() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let codec = CredentialCodec::new(b"test_signing_key_for_unit_tests!!");

        // Aging credential forces the re-exchange path; no record on disk
        let token = fresh_token(&codec, 60);
        assert!(matches!(
            service.refresh(&token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_forged_token() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let other = CredentialCodec::new(b"a_completely_different_key_here!");

        let forged = fresh_token(&other, 3600);
        assert!(matches!(
            service.refresh(&forged).await,
            Err(AppError::Unauthorized)
        ));
    }
}
