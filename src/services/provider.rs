// SPDX-License-Identifier: MIT

//! Discord API client for the OAuth token and profile endpoints.
//!
//! Every transport or protocol failure collapses to `Unauthorized`: the
//! exchange fails closed and never leaks provider detail to callers.

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{IdentityProfile, TokenPair};

const DISCORD_API: &str = "https://discord.com/api/v10";

/// Which OAuth grant to request from the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantKind {
    AuthorizationCode,
    RefreshToken,
}

/// Client for the provider's token and profile endpoints.
#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl ProviderClient {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DISCORD_API.to_string(),
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Exchange an authorization code or refresh token for a token pair.
    pub async fn token_request(&self, token: &str, grant: GrantKind) -> Result<TokenPair> {
        let url = format!("{}/oauth2/token", self.base_url);

        let mut form: Vec<(&str, &str)> = match grant {
            GrantKind::AuthorizationCode => vec![
                ("grant_type", "authorization_code"),
                ("code", token),
                ("redirect_uri", self.redirect_uri.as_str()),
            ],
            GrantKind::RefreshToken => vec![
                ("grant_type", "refresh_token"),
                ("refresh_token", token),
            ],
        };
        form.push(("client_id", self.client_id.as_str()));
        form.push(("client_secret", self.client_secret.as_str()));

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Provider token exchange failed");
            return Err(AppError::Unauthorized);
        }

        response
            .json::<TokenPair>()
            .await
            .map_err(|_| AppError::Unauthorized)
    }

    /// Fetch the profile of the user the access token belongs to.
    pub async fn fetch_profile(&self, token: &TokenPair) -> Result<IdentityProfile> {
        let url = format!("{}/users/@me", self.base_url);

        let response = self
            .http
            .get(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("{} {}", token.token_type, token.access_token),
            )
            .send()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Provider profile fetch failed");
            return Err(AppError::Unauthorized);
        }

        // Discord serializes the id as a string
        #[derive(Deserialize)]
        struct RawProfile {
            id: String,
            username: String,
            global_name: Option<String>,
            avatar: Option<String>,
        }

        let raw: RawProfile = response.json().await.map_err(|_| AppError::Unauthorized)?;
        let id = raw.id.parse::<u64>().map_err(|_| AppError::Unauthorized)?;

        Ok(IdentityProfile {
            id,
            username: raw.username,
            global_name: raw.global_name,
            avatar: raw.avatar,
        })
    }
}
