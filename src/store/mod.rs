// SPDX-License-Identifier: MIT

//! Filesystem-backed storage. The directory tree is the database:
//! `users/{id}.json` for identity records, `tickets/{owner}/{ticket}/…`
//! for ticket bundles.

pub mod tickets;
pub mod users;

pub use tickets::{TicketStore, UploadFile};
pub use users::UserVault;
