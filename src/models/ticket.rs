// SPDX-License-Identifier: MIT

//! Ticket manifest model.

use serde::{Deserialize, Serialize};

/// On-disk manifest describing a ticket.
///
/// The manifest is the single source of truth: a payload file the manifest
/// doesn't reference is invisible to every read operation, even if it exists
/// under `data/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub ticket_id: String,
    /// Provider user id of the owner
    pub author_id: u64,
    /// Creation time, seconds since the Unix epoch
    pub create_utc_timestamp: f64,
    /// Relative paths of the files actually persisted (deduplicated)
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub public: bool,
}

impl Ticket {
    /// Fresh manifest with no files yet.
    pub fn new(ticket_id: String, author_id: u64, public: bool) -> Self {
        Self {
            ticket_id,
            author_id,
            create_utc_timestamp: chrono::Utc::now().timestamp_micros() as f64 / 1e6,
            files: Vec::new(),
            public,
        }
    }
}

/// Partial update accepted by the ticket modification endpoint.
/// Only the visibility flag is mutable after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketUpdate {
    pub public: Option<bool>,
}
