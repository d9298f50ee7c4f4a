// SPDX-License-Identifier: MIT

//! OAuth exchange and refresh routes.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::services::GrantKind;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/oauth", post(exchange_code).put(refresh))
}

#[derive(Deserialize)]
pub struct OAuthRequest {
    pub code: String,
}

/// Session credential response.
#[derive(Serialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            token_type: "Bearer".to_string(),
            access_token,
        }
    }
}

/// Exchange a provider authorization code for a session credential.
async fn exchange_code(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OAuthRequest>,
) -> Result<Json<TokenResponse>> {
    let token = state
        .identity
        .exchange(&body.code, GrantKind::AuthorizationCode)
        .await?;
    Ok(Json(TokenResponse::bearer(token)))
}

/// Refresh a session credential presented as a bearer token.
///
/// Accepts expired-but-authentic credentials; a token with more than a day
/// of validity left is returned unchanged.
async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let token = state.identity.refresh(bearer).await?;
    Ok(Json(TokenResponse::bearer(token)))
}
