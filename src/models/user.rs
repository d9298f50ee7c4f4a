// SPDX-License-Identifier: MIT

//! Identity models: provider profile, token pair, and the persisted record.

use serde::{Deserialize, Serialize};

const AVATAR_CDN: &str = "https://cdn.discordapp.com/avatars";
const DEFAULT_AVATAR: &str = "https://cdn.discordapp.com/embed/avatars/0.png";

/// Profile returned by the provider's `/users/@me` endpoint.
///
/// Immutable once fetched; superseded wholesale on every re-exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// Provider user id
    pub id: u64,
    pub username: String,
    pub global_name: Option<String>,
    /// Avatar hash, if the user has one
    pub avatar: Option<String>,
}

impl IdentityProfile {
    /// Preferred display name, falling back to the username.
    pub fn display_name(&self) -> String {
        self.global_name
            .clone()
            .unwrap_or_else(|| self.username.clone())
    }

    /// CDN URL for the user's avatar, or the provider default.
    pub fn display_avatar(&self) -> String {
        match &self.avatar {
            Some(hash) => format!("{}/{}/{}.png", AVATAR_CDN, self.id, hash),
            None => DEFAULT_AVATAR.to_string(),
        }
    }
}

/// Token pair returned by the provider's token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub refresh_token: String,
    /// Space-separated granted scopes; must include `identify`
    pub scope: String,
}

impl TokenPair {
    /// Whether the `identify` scope was granted.
    pub fn has_identify_scope(&self) -> bool {
        self.scope.split_whitespace().any(|s| s == "identify")
    }
}

/// Persisted unit, one JSON file per provider user id.
///
/// Overwritten in full on every successful exchange; the refresh token is
/// the only field read back later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageRecord {
    pub token: TokenPair,
    pub profile: IdentityProfile,
}

/// Profile enriched with derived display fields, as served by the user API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayUser {
    pub id: u64,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
    pub is_admin: bool,
    pub display_name: String,
    pub display_avatar: String,
}

impl DisplayUser {
    /// Build the display view of a profile.
    pub fn from_profile(profile: IdentityProfile, is_admin: bool) -> Self {
        let display_name = profile.display_name();
        let display_avatar = profile.display_avatar();
        Self {
            id: profile.id,
            username: profile.username,
            global_name: profile.global_name,
            avatar: profile.avatar,
            is_admin,
            display_name,
            display_avatar,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(global_name: Option<&str>, avatar: Option<&str>) -> IdentityProfile {
        IdentityProfile {
            id: 42,
            username: "kilroy".to_string(),
            global_name: global_name.map(String::from),
            avatar: avatar.map(String::from),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(profile(None, None).display_name(), "kilroy");
        assert_eq!(profile(Some("Kilroy"), None).display_name(), "Kilroy");
    }

    #[test]
    fn test_display_avatar_derivation() {
        assert_eq!(
            profile(None, Some("abc123")).display_avatar(),
            "https://cdn.discordapp.com/avatars/42/abc123.png"
        );
        assert_eq!(
            profile(None, None).display_avatar(),
            "https://cdn.discordapp.com/embed/avatars/0.png"
        );
    }

    #[test]
    fn test_identify_scope_check() {
        let mut token = TokenPair {
            access_token: "a".into(),
            token_type: "Bearer".into(),
            expires_in: 604800,
            refresh_token: "r".into(),
            scope: "identify guilds".into(),
        };
        assert!(token.has_identify_scope());

        token.scope = "guilds".into();
        assert!(!token.has_identify_scope());

        // Substring of another scope must not count
        token.scope = "identify.read".into();
        assert!(!token.has_identify_scope());
    }
}
