// SPDX-License-Identifier: MIT

//! Application configuration loaded from a JSON file at startup.
//!
//! On first run (or when the file is unreadable) a default configuration
//! with a freshly generated signing key is written out so the operator can
//! fill in the provider credentials.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Application configuration, loaded once at startup and passed by value
/// into the credential codec and access policy. No ambient globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Session credential signing key (hex of 16 random bytes by default)
    #[serde(default = "generate_key")]
    pub key: String,
    /// OAuth redirect URI registered with the provider
    #[serde(default)]
    pub redirect_uri: String,
    /// Provider OAuth client ID
    #[serde(default)]
    pub client_id: String,
    /// Provider OAuth client secret
    #[serde(default)]
    pub client_secret: String,
    /// Provider user ids granted the admin flag
    #[serde(default)]
    pub admins: Vec<u64>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Generate a random signing key, hex-encoded.
fn generate_key() -> String {
    let mut bytes = [0u8; 16];
    // SystemRandom failure is unrecoverable at startup
    SystemRandom::new()
        .fill(&mut bytes)
        .expect("system RNG unavailable");
    hex::encode(bytes)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            key: generate_key(),
            redirect_uri: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            admins: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or initialize it.
    ///
    /// An unreadable or unparsable file is replaced by a persisted default
    /// (with a new random key), matching first-run behavior.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(config) => Ok(config),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Config unparsable, rewriting defaults");
                    Self::init(path)
                }
            },
            Err(_) => Self::init(path),
        }
    }

    fn init(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::default();
        let pretty = serde_json::to_vec_pretty(&config).map_err(ConfigError::Serialize)?;
        std::fs::write(path, pretty).map_err(ConfigError::Write)?;
        tracing::info!(path = %path.display(), "Wrote fresh default config");
        Ok(config)
    }

    /// Path of the config file, overridable via `TICKETBOX_CONFIG`.
    pub fn config_path() -> PathBuf {
        env::var("TICKETBOX_CONFIG")
            .unwrap_or_else(|_| "config.json".to_string())
            .into()
    }

    /// Root directory for user records and tickets, overridable via
    /// `TICKETBOX_DATA_DIR`.
    pub fn data_dir() -> PathBuf {
        env::var("TICKETBOX_DATA_DIR")
            .unwrap_or_else(|_| "data".to_string())
            .into()
    }

    /// Signing key bytes for the credential codec.
    pub fn key_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            key: "test_signing_key_for_unit_tests!!".to_string(),
            redirect_uri: "http://localhost:5173/callback".to_string(),
            client_id: "test_client_id".to_string(),
            client_secret: "test_client_secret".to_string(),
            admins: vec![1],
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to serialize default config: {0}")]
    Serialize(serde_json::Error),

    #[error("Failed to persist default config: {0}")]
    Write(std::io::Error),
}
