use std::env;
use std::path::PathBuf;

use crate::auth::SESSION_TTL_SECS;

/// Runtime configuration, read from the environment with workable
/// defaults for local development.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Directory of the BOM book (products, recipes, password sheet).
    pub bom_book_dir: PathBuf,
    /// Directory of the storage book (people, lots, output log).
    pub storage_book_dir: PathBuf,
    /// Password used when the password sheet cannot be read.
    pub fallback_password: String,
    /// Key for signing session tokens.
    pub session_key: [u8; 32],
    /// Session lifetime in seconds.
    pub session_ttl_secs: u64,
}

impl Config {
    /// Build a configuration from the environment.
    ///
    /// `FACTORY_LOG_BIND`, `BOM_BOOK_DIR`, `STORAGE_BOOK_DIR`,
    /// `FACTORY_LOG_PASSWORD` and `SESSION_TTL_SECS` override the
    /// defaults. `SESSION_KEY` takes 64 hex characters; without it a
    /// random key is generated, which means sessions do not survive a
    /// restart.
    pub fn from_env() -> Self {
        Config {
            bind_addr: env::var("FACTORY_LOG_BIND").unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            bom_book_dir: env::var("BOM_BOOK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/bom")),
            storage_book_dir: env::var("STORAGE_BOOK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/storage")),
            fallback_password: env::var("FACTORY_LOG_PASSWORD")
                .unwrap_or_else(|_| "bom2024!".to_string()),
            session_key: session_key_from_env(),
            session_ttl_secs: env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(SESSION_TTL_SECS),
        }
    }
}

fn session_key_from_env() -> [u8; 32] {
    let mut key = [0u8; 32];

    if let Ok(raw) = env::var("SESSION_KEY") {
        match hex::decode(raw.trim()) {
            Ok(bytes) if bytes.len() == 32 => {
                key.copy_from_slice(&bytes);
                return key;
            }
            _ => log::warn!("SESSION_KEY is not 64 hex characters, generating a random key"),
        }
    } else {
        log::info!("SESSION_KEY not set, generating a random key; sessions reset on restart");
    }

    if let Err(e) = getrandom::getrandom(&mut key) {
        log::error!("failed to generate a session key: {}", e);
    }
    key
}
