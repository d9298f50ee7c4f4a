// SPDX-License-Identifier: MIT

//! Data models shared across storage and the API.

pub mod ticket;
pub mod user;

pub use ticket::{Ticket, TicketUpdate};
pub use user::{DisplayUser, IdentityProfile, StorageRecord, TokenPair};
