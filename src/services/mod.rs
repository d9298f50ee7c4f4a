// SPDX-License-Identifier: MIT

//! External-facing services.

pub mod identity;
pub mod provider;

pub use identity::IdentityService;
pub use provider::{GrantKind, ProviderClient};
