// SPDX-License-Identifier: MIT

use std::sync::Arc;

use ticketbox::auth::{Claims, CredentialCodec};
use ticketbox::config::Config;
use ticketbox::models::IdentityProfile;
use ticketbox::routes::create_router;
use ticketbox::services::{IdentityService, ProviderClient};
use ticketbox::store::{TicketStore, UserVault};
use ticketbox::AppState;

pub const TEST_KEY: &[u8] = b"test_signing_key_for_unit_tests!!";

/// Build an app backed by a temp directory. The TempDir must be kept alive
/// for the duration of the test.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::test_default();

    let users = UserVault::new(dir.path().join("users")).expect("user vault");
    let tickets =
        TicketStore::new(dir.path().join("tickets"), config.key.clone()).expect("ticket store");

    let codec = CredentialCodec::new(config.key.as_bytes());
    let provider = ProviderClient::new(
        config.client_id.clone(),
        config.client_secret.clone(),
        config.redirect_uri.clone(),
    );
    let identity = IdentityService::new(
        provider,
        users.clone(),
        codec.clone(),
        config.admins.clone(),
    );

    let state = Arc::new(AppState {
        config,
        codec,
        identity,
        users,
        tickets,
    });

    (create_router(state.clone()), state, dir)
}

/// Mint a session credential signed with the test key.
///
/// `Config::test_default` marks user id 1 as admin; pass `is_admin` to match.
#[allow(dead_code)]
pub fn mint_token(user_id: u64, is_admin: bool, expires_in: i64) -> String {
    let profile = IdentityProfile {
        id: user_id,
        username: format!("user{}", user_id),
        global_name: None,
        avatar: None,
    };
    let admins: &[u64] = if is_admin { &[user_id] } else { &[] };
    let claims = Claims::mint(&profile, admins, chrono::Utc::now().timestamp(), expires_in);
    CredentialCodec::new(TEST_KEY)
        .encode(&claims)
        .expect("token")
}

/// Build a multipart/form-data body with the given file parts and an
/// optional `public` text field.
#[allow(dead_code)]
pub fn multipart_body(
    boundary: &str,
    files: &[(&str, &[u8])],
    public: Option<&str>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(value) = public {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"public\"\r\n\r\n");
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}
