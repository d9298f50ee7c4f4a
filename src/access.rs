// SPDX-License-Identifier: MIT

//! Authorization predicates applied before every cross-ownership operation.
//!
//! These are pure functions; the admin flag is already baked into the
//! session credential at mint time, so no configuration is consulted here.

use crate::models::Ticket;

/// May `requester` read this ticket's manifest or contents?
pub fn can_read(requester_id: u64, is_admin: bool, ticket: &Ticket) -> bool {
    requester_id == ticket.author_id || is_admin || ticket.public
}

/// May `requester` list (or write into) `owner`'s ticket directory?
pub fn can_list(requester_id: u64, is_admin: bool, owner_id: u64) -> bool {
    requester_id == owner_id || is_admin
}
