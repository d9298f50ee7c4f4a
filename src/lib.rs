// SPDX-License-Identifier: MIT

//! Ticketbox: a small backend that trades provider OAuth codes for session
//! credentials and stores user-owned "ticket" file bundles with per-ticket
//! visibility.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use auth::CredentialCodec;
use config::Config;
use services::IdentityService;
use store::{TicketStore, UserVault};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub codec: CredentialCodec,
    pub identity: IdentityService,
    pub users: UserVault,
    pub tickets: TicketStore,
}
