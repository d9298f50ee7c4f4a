// SPDX-License-Identifier: MIT

//! Session credential handling: codec and request authentication.

pub mod codec;
pub mod middleware;

pub use codec::{Claims, CredentialCodec};
pub use middleware::require_auth;
