// SPDX-License-Identifier: MIT

//! Ticket routes: upload, listing, manifest access, visibility updates,
//! single-file reads, and archive download.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::access::{can_list, can_read};
use crate::auth::Claims;
use crate::error::{AppError, Result};
use crate::models::{Ticket, TicketUpdate};
use crate::store::UploadFile;
use crate::AppState;

/// Request body ceiling for uploads; the 16 MiB content cap is enforced in
/// the store, this just leaves headroom for multipart framing.
const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

const CACHE_HINT: &str = "max-age=600";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/ticket",
            get(list_own)
                .post(create_ticket)
                .put(modify_ticket)
                .delete(delete_ticket),
        )
        .route("/ticket/{user_id}", get(list_user))
        .route("/ticket/{user_id}/{ticket_id}", get(get_ticket))
        .route("/ticket/{user_id}/{ticket_id}/file", get(get_file))
        .route("/ticket/{user_id}/{ticket_id}/download", get(download))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// Resolve a `{user_id}` path segment; `@me` refers to the requester.
fn resolve_owner(raw: &str, me: u64) -> Result<u64> {
    if raw == "@me" {
        return Ok(me);
    }
    raw.parse()
        .map_err(|_| AppError::NotFound("User not found".to_string()))
}

/// List the requester's own tickets.
async fn list_own(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
) -> Result<Json<Vec<String>>> {
    Ok(Json(state.tickets.list(user.id).await?))
}

/// Create a ticket from a multipart upload: repeated file parts plus an
/// optional `public` text field.
async fn create_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<String>)> {
    let mut public = false;
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Multipart error: {e}")))?
    {
        if let Some(name) = field.file_name().map(str::to_string) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Multipart read error: {e}")))?;
            files.push(UploadFile {
                name,
                bytes: bytes.to_vec(),
            });
        } else if field.name() == Some("public") {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Multipart read error: {e}")))?;
            public = matches!(value.trim(), "true" | "1" | "on");
        }
    }

    let ticket_id = state.tickets.create(user.id, files, public).await?;
    Ok((StatusCode::CREATED, Json(ticket_id)))
}

#[derive(Deserialize)]
pub struct TicketQuery {
    pub ticket_id: String,
}

/// Modify one of the requester's own tickets (visibility only).
async fn modify_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
    Query(query): Query<TicketQuery>,
    Json(update): Json<TicketUpdate>,
) -> Result<Json<Ticket>> {
    let ticket = state
        .tickets
        .update_visibility(user.id, &query.ticket_id, update)
        .await?;
    Ok(Json(ticket))
}

/// Delete one of the requester's own tickets.
async fn delete_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
    Query(query): Query<TicketQuery>,
) -> Result<StatusCode> {
    state.tickets.delete(user.id, &query.ticket_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List another user's tickets (owner or admin only).
///
/// A nonexistent user and a user with zero tickets both produce an empty
/// list; the two are deliberately not distinguished.
async fn list_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
    Path(raw_owner): Path<String>,
) -> Result<Json<Vec<String>>> {
    let owner_id = resolve_owner(&raw_owner, user.id)?;
    if !can_list(user.id, user.is_admin, owner_id) {
        return Err(AppError::Forbidden);
    }
    Ok(Json(state.tickets.list(owner_id).await?))
}

/// Read a ticket's manifest, subject to the access policy.
async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
    Path((raw_owner, ticket_id)): Path<(String, String)>,
) -> Result<Json<Ticket>> {
    let owner_id = resolve_owner(&raw_owner, user.id)?;
    // Absent tickets are NotFound before any policy check
    let ticket = state.tickets.read_manifest(owner_id, &ticket_id).await?;
    if !can_read(user.id, user.is_admin, &ticket) {
        return Err(AppError::Forbidden);
    }
    Ok(Json(ticket))
}

#[derive(Deserialize)]
pub struct FileQuery {
    pub filename: String,
}

/// Read a single manifest-listed file as text.
async fn get_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
    Path((raw_owner, ticket_id)): Path<(String, String)>,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse> {
    let owner_id = resolve_owner(&raw_owner, user.id)?;
    let ticket = state.tickets.read_manifest(owner_id, &ticket_id).await?;
    if !can_read(user.id, user.is_admin, &ticket) {
        return Err(AppError::Forbidden);
    }

    let content = state
        .tickets
        .read_file(owner_id, &ticket_id, &query.filename)
        .await?;
    Ok(([(header::CACHE_CONTROL, CACHE_HINT)], content))
}

/// Download a ticket's payload subtree as a zip archive.
async fn download(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<Claims>,
    Path((raw_owner, ticket_id)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let owner_id = resolve_owner(&raw_owner, user.id)?;
    let ticket = state.tickets.read_manifest(owner_id, &ticket_id).await?;
    if !can_read(user.id, user.is_admin, &ticket) {
        return Err(AppError::Forbidden);
    }

    let bytes = state.tickets.export_archive(owner_id, &ticket_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (header::CACHE_CONTROL, CACHE_HINT),
        ],
        bytes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_owner() {
        assert_eq!(resolve_owner("@me", 7).unwrap(), 7);
        assert_eq!(resolve_owner("42", 7).unwrap(), 42);
        assert!(matches!(
            resolve_owner("not-a-number", 7),
            Err(AppError::NotFound(_))
        ));
    }
}
