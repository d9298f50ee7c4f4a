// SPDX-License-Identifier: MIT

//! Session credential codec.
//!
//! Single fixed scheme (HS256) with a server-wide secret; no algorithm
//! negotiation. Both `exp` and `iat` must be present for a credential to
//! decode at all, and every failure mode collapses to `Unauthorized`.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::IdentityProfile;

/// Claims embedded in a session credential.
///
/// Profile fields are composed in explicitly alongside the derived display
/// fields; the whole struct is superseded on every exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Provider user id
    pub id: u64,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub is_admin: bool,
    pub display_name: String,
    pub display_avatar: String,
    /// Issued at (Unix timestamp) — required
    pub iat: i64,
    /// Expiration (Unix timestamp) — required
    pub exp: i64,
}

impl Claims {
    /// Mint claims for a freshly fetched profile.
    pub fn mint(profile: &IdentityProfile, admins: &[u64], now: i64, expires_in: i64) -> Self {
        Self {
            id: profile.id,
            username: profile.username.clone(),
            global_name: profile.global_name.clone(),
            avatar: profile.avatar.clone(),
            is_admin: admins.contains(&profile.id),
            display_name: profile.display_name(),
            display_avatar: profile.display_avatar(),
            iat: now,
            exp: now + expires_in,
        }
    }
}

/// Encoder/verifier for session credentials, built once from the server key.
#[derive(Clone)]
pub struct CredentialCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl CredentialCodec {
    pub fn new(key: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
        }
    }

    /// Sign claims into an opaque token.
    pub fn encode(&self, claims: &Claims) -> Result<String> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Credential signing failed: {e}")))
    }

    /// Verify and decode a token, enforcing expiry.
    pub fn decode(&self, token: &str) -> Result<Claims> {
        self.decode_with(token, true)
    }

    /// Decode without enforcing expiry. Signature and claim presence are
    /// still checked; used only by the refresh path to read an
    /// expired-but-authentic credential.
    pub fn decode_allow_expired(&self, token: &str) -> Result<Claims> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = validate_exp;
        validation.leeway = 0;
        // Presence of exp/iat is enforced by the non-optional Claims fields;
        // a token missing either fails deserialization.
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile() -> IdentityProfile {
        IdentityProfile {
            id: 42,
            username: "kilroy".to_string(),
            global_name: Some("Kilroy".to_string()),
            avatar: None,
        }
    }

    fn codec() -> CredentialCodec {
        CredentialCodec::new(b"test_signing_key_for_unit_tests!!")
    }

    #[test]
    fn test_roundtrip() {
        let now = Utc::now().timestamp();
        let claims = Claims::mint(&profile(), &[42], now, 604800);
        let token = codec().encode(&claims).unwrap();

        let decoded = codec().decode(&token).unwrap();
        assert_eq!(decoded.id, 42);
        assert!(decoded.is_admin);
        assert_eq!(decoded.display_name, "Kilroy");
        assert_eq!(decoded.iat, now);
        assert_eq!(decoded.exp, now + 604800);
    }

    #[test]
    fn test_expired_token_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims::mint(&profile(), &[], now - 7200, 3600);
        let token = codec().encode(&claims).unwrap();

        assert!(matches!(
            codec().decode(&token),
            Err(AppError::Unauthorized)
        ));
        // The refresh path still reads it
        let decoded = codec().decode_allow_expired(&token).unwrap();
        assert_eq!(decoded.id, 42);
        assert!(!decoded.is_admin);
    }

    #[test]
    fn test_wrong_key_rejected() {
        let now = Utc::now().timestamp();
        let claims = Claims::mint(&profile(), &[], now, 3600);
        let token = codec().encode(&claims).unwrap();

        let other = CredentialCodec::new(b"a_completely_different_key_here!");
        assert!(other.decode(&token).is_err());
        assert!(other.decode_allow_expired(&token).is_err());
    }

    #[test]
    fn test_missing_timestamp_claims_rejected() {
        // Hand-build a token whose payload lacks exp/iat
        #[derive(Serialize)]
        struct Partial {
            id: u64,
            username: String,
            global_name: Option<String>,
            avatar: Option<String>,
            is_admin: bool,
            display_name: String,
            display_avatar: String,
        }
        let partial = Partial {
            id: 42,
            username: "kilroy".into(),
            global_name: None,
            avatar: None,
            is_admin: false,
            display_name: "kilroy".into(),
            display_avatar: "x".into(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &partial,
            &EncodingKey::from_secret(b"test_signing_key_for_unit_tests!!"),
        )
        .unwrap();

        // Even the permissive decode requires both timestamps
        assert!(codec().decode(&token).is_err());
        assert!(codec().decode_allow_expired(&token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(codec().decode("not-a-jwt").is_err());
        assert!(codec().decode("").is_err());
    }
}
