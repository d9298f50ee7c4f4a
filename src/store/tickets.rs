// SPDX-License-Identifier: MIT

//! Hierarchical ticket store rooted at `tickets/`.
//!
//! Layout per ticket: `{owner_id}/{ticket_id}/data.json` (manifest) and
//! `{owner_id}/{ticket_id}/data/…` (payload files). The manifest is written
//! last and lists exactly the files that were actually persisted; anything
//! else under `data/` is invisible.

use std::collections::HashSet;
use std::io::{Seek, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::join_all;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{AppError, Result};
use crate::models::{Ticket, TicketUpdate};

const MANIFEST_FILE: &str = "data.json";
const DATA_DIR: &str = "data";
/// Summed size cap for one upload batch.
const MAX_TICKET_BYTES: usize = 16 * 1024 * 1024;
/// Characters never accepted in an uploaded filename.
const HOSTILE_CHARS: &str = ":*?\"<>|~";

/// One named file from an upload request.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Content-root-scoped ticket storage.
#[derive(Clone)]
pub struct TicketStore {
    root: PathBuf,
    /// Server secret mixed into generated ticket ids
    id_secret: String,
    rng: SystemRandom,
    /// Serializes manifest read-modify-write per (owner, ticket)
    manifest_locks: Arc<DashMap<(u64, String), Arc<Mutex<()>>>>,
}

impl TicketStore {
    /// Open (and create if needed) the store under `root`.
    pub fn new(root: PathBuf, id_secret: String) -> std::io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            id_secret,
            rng: SystemRandom::new(),
            manifest_locks: Arc::new(DashMap::new()),
        })
    }

    /// Generate a fresh ticket id: ISO timestamp + `H` + digest of the
    /// server secret, the owner id, and 16 random bytes. Colons are
    /// replaced so the id is filesystem-safe everywhere.
    pub fn generate_ticket_id(&self, owner_id: u64) -> Result<String> {
        let mut random = [0u8; 16];
        self.rng
            .fill(&mut random)
            .map_err(|_| AppError::Storage("system RNG unavailable".to_string()))?;

        let mut hasher = Sha256::new();
        hasher.update(self.id_secret.as_bytes());
        hasher.update(owner_id.to_string().as_bytes());
        hasher.update(random);
        let digest = hex::encode(hasher.finalize());

        let iso = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f");
        Ok(format!("{}H{}", iso, digest).replace(':', "_"))
    }

    /// List the ticket ids an owner has. An owner without a directory has
    /// zero tickets, not an error.
    pub async fn list(&self, owner_id: u64) -> Result<Vec<String>> {
        let dir = self.root.join(owner_id.to_string());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                ids.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Create a ticket from an upload batch.
    ///
    /// Hostile filenames are filtered, path-escaping names are dropped, and
    /// an individual write failure excludes just that file: partial success
    /// is the designed behavior. The manifest is persisted only after all
    /// writes settle and lists exactly the survivors.
    pub async fn create(
        &self,
        owner_id: u64,
        files: Vec<UploadFile>,
        public: bool,
    ) -> Result<String> {
        let accepted: Vec<UploadFile> = files
            .into_iter()
            .filter(|f| acceptable_filename(&f.name))
            .collect();

        let total: usize = accepted.iter().map(|f| f.bytes.len()).sum();
        if total > MAX_TICKET_BYTES {
            return Err(AppError::PayloadTooLarge);
        }

        let ticket_id = self.generate_ticket_id(owner_id)?;
        let ticket_dir = self.root.join(owner_id.to_string()).join(&ticket_id);
        let data_root = ticket_dir.join(DATA_DIR);

        // Re-validate containment after normalization; escapees are dropped,
        // not an error for the whole request.
        let mut planned: Vec<(String, PathBuf, Vec<u8>)> = Vec::new();
        for file in accepted {
            let name = file.name.replace('\\', "/");
            match resolve_within(&data_root, &name) {
                Some(target) => planned.push((name, target, file.bytes)),
                None => {
                    tracing::warn!(owner_id, name = %file.name, "Dropping path-escaping filename");
                }
            }
        }
        if planned.is_empty() {
            return Err(AppError::EmptyTicket);
        }

        // Each surviving file targets a disjoint path; write them in parallel
        let writes = planned.into_iter().map(|(name, target, bytes)| async move {
            if let Some(parent) = target.parent() {
                if let Err(err) = tokio::fs::create_dir_all(parent).await {
                    tracing::warn!(name = %name, error = %err, "Directory creation failed, excluding file");
                    return None;
                }
            }
            match tokio::fs::write(&target, &bytes).await {
                Ok(()) => Some(name),
                Err(err) => {
                    tracing::warn!(name = %name, error = %err, "File write failed, excluding from manifest");
                    None
                }
            }
        });
        let written: Vec<String> = join_all(writes).await.into_iter().flatten().collect();

        if written.is_empty() {
            // Nothing survived; don't leave an empty ticket behind
            let _ = tokio::fs::remove_dir_all(&ticket_dir).await;
            return Err(AppError::EmptyTicket);
        }

        let mut ticket = Ticket::new(ticket_id.clone(), owner_id, public);
        let mut seen = HashSet::new();
        ticket.files = written
            .into_iter()
            .filter(|name| seen.insert(name.clone()))
            .collect();

        self.write_manifest(&ticket_dir, &ticket).await?;

        tracing::info!(
            owner_id,
            ticket_id = %ticket_id,
            files = ticket.files.len(),
            "Ticket created"
        );
        Ok(ticket_id)
    }

    /// Read a ticket's manifest.
    pub async fn read_manifest(&self, owner_id: u64, ticket_id: &str) -> Result<Ticket> {
        let dir = self.ticket_dir(owner_id, ticket_id)?;
        let bytes = match tokio::fs::read(dir.join(MANIFEST_FILE)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("Ticket not found".to_string()))
            }
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };
        serde_json::from_slice(&bytes).map_err(|e| AppError::Storage(e.to_string()))
    }

    /// Apply a partial update to the manifest (only the visibility flag is
    /// mutable). Serialized per ticket so concurrent toggles can't lose
    /// updates.
    pub async fn update_visibility(
        &self,
        owner_id: u64,
        ticket_id: &str,
        update: TicketUpdate,
    ) -> Result<Ticket> {
        let lock = self
            .manifest_locks
            .entry((owner_id, ticket_id.to_string()))
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        let dir = self.ticket_dir(owner_id, ticket_id)?;
        let mut ticket = self.read_manifest(owner_id, ticket_id).await?;
        if let Some(public) = update.public {
            ticket.public = public;
        }
        self.write_manifest(&dir, &ticket).await?;
        Ok(ticket)
    }

    /// Remove a ticket's entire subtree.
    pub async fn delete(&self, owner_id: u64, ticket_id: &str) -> Result<()> {
        let dir = self.ticket_dir(owner_id, ticket_id)?;
        if tokio::fs::metadata(&dir).await.is_err() {
            return Err(AppError::NotFound("Ticket not found".to_string()));
        }
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        // The ticket is gone; drop its manifest lock so the map doesn't
        // grow for the life of the process
        self.manifest_locks
            .remove(&(owner_id, ticket_id.to_string()));
        tracing::info!(owner_id, ticket_id = %ticket_id, "Ticket deleted");
        Ok(())
    }

    /// Read one manifest-listed file as text.
    ///
    /// A name the manifest doesn't reference is `NotFound` regardless of
    /// what exists on disk; undecodable content is `NotText`, never
    /// silently truncated.
    pub async fn read_file(
        &self,
        owner_id: u64,
        ticket_id: &str,
        filename: &str,
    ) -> Result<String> {
        let ticket = self.read_manifest(owner_id, ticket_id).await?;
        if !ticket.files.iter().any(|f| f == filename) {
            return Err(AppError::NotFound("File not found".to_string()));
        }

        let dir = self.ticket_dir(owner_id, ticket_id)?;
        let path = dir.join(DATA_DIR).join(filename);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound("File not found".to_string()))
            }
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };
        String::from_utf8(bytes).map_err(|_| AppError::NotText)
    }

    /// Build a zip of the ticket's payload subtree on demand.
    ///
    /// Archive construction is blocking I/O and runs on the blocking pool;
    /// the temporary archive file is removed after it is read back. Nothing
    /// is cached.
    pub async fn export_archive(&self, owner_id: u64, ticket_id: &str) -> Result<Vec<u8>> {
        // Also yields NotFound for unknown tickets before any work happens
        self.read_manifest(owner_id, ticket_id).await?;

        let data_root = self.ticket_dir(owner_id, ticket_id)?.join(DATA_DIR);
        let short_id: String = ticket_id.chars().take(6).collect();
        let temp_path = std::env::temp_dir().join(format!(
            "ticketbox-{}-{}-{}.zip",
            owner_id,
            short_id,
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        let bytes = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<u8>> {
            let result = build_zip(&data_root, &temp_path)
                .and_then(|_| std::fs::read(&temp_path).map_err(Into::into));
            // Remove the temp archive whether or not the read succeeded
            let _ = std::fs::remove_file(&temp_path);
            result
        })
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?
        .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(bytes)
    }

    /// Resolve a ticket directory, refusing ids that could leave the store.
    fn ticket_dir(&self, owner_id: u64, ticket_id: &str) -> Result<PathBuf> {
        if ticket_id.is_empty()
            || ticket_id.contains('/')
            || ticket_id.contains('\\')
            || ticket_id.contains("..")
        {
            return Err(AppError::NotFound("Ticket not found".to_string()));
        }
        Ok(self.root.join(owner_id.to_string()).join(ticket_id))
    }

    async fn write_manifest(&self, ticket_dir: &Path, ticket: &Ticket) -> Result<()> {
        let pretty =
            serde_json::to_vec_pretty(ticket).map_err(|e| AppError::Storage(e.to_string()))?;
        tokio::fs::write(ticket_dir.join(MANIFEST_FILE), pretty)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}

/// A filename survives filtering if it is non-empty and free of
/// filesystem-hostile characters.
fn acceptable_filename(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| HOSTILE_CHARS.contains(c))
}

/// Lexically resolve `name` under `root`, rejecting anything that would
/// escape it (absolute paths, `..` past the root) or names with no normal
/// component at all.
fn resolve_within(root: &Path, name: &str) -> Option<PathBuf> {
    let rel = Path::new(name);
    if rel.is_absolute() {
        return None;
    }

    let mut out = root.to_path_buf();
    let mut depth = 0usize;
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if depth == 0 {
        None
    } else {
        Some(out)
    }
}

fn build_zip(data_root: &Path, dest: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(dest)?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);
    add_dir_entries(&mut writer, data_root, data_root, options)?;
    writer.finish()?;
    Ok(())
}

fn add_dir_entries<W: Write + Seek>(
    writer: &mut ZipWriter<W>,
    root: &Path,
    dir: &Path,
    options: SimpleFileOptions,
) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            add_dir_entries(writer, root, &path, options)?;
        } else {
            let name = path
                .strip_prefix(root)?
                .to_string_lossy()
                .replace('\\', "/");
            writer.start_file(name, options)?;
            let mut file = std::fs::File::open(&path)?;
            std::io::copy(&mut file, writer)?;
        }
    }
    Ok(())
}
