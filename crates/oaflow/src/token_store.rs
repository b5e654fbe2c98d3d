// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared slot for the OA application token.
//!
//! One app identity serves every impersonated user, so all sessions read and
//! write the same slot. There is no TTL: a token is replaced only after the
//! vendor rejects it. Concurrent writers race and the last one wins.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Single-slot token cache shared across sessions.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
}

/// In-process token slot.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slot: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store.
    pub fn global() -> Arc<MemoryTokenStore> {
        static GLOBAL: OnceLock<Arc<MemoryTokenStore>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(MemoryTokenStore::new())))
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.slot.read().clone()
    }

    fn set(&self, token: &str) {
        *self.slot.write() = Some(token.to_owned());
    }
}

/// On-disk token layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedToken {
    token: String,
}

/// Token slot persisted to a JSON file so it survives restarts.
///
/// Reads go to the in-memory copy; the file is read once on open and
/// rewritten on every `set`.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cached: RwLock<Option<String>>,
}

impl FileTokenStore {
    /// Open a store backed by `path`. A missing or unreadable file means no token.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = match load(&path) {
            Ok(persisted) => Some(persisted.token),
            Err(e) => {
                if path.exists() {
                    tracing::warn!(path = %path.display(), err = %e, "ignoring unreadable token file");
                }
                None
            }
        };
        Self { path, cached: RwLock::new(cached) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        self.cached.read().clone()
    }

    fn set(&self, token: &str) {
        *self.cached.write() = Some(token.to_owned());
        let persisted = PersistedToken { token: token.to_owned() };
        if let Err(e) = save(&self.path, &persisted) {
            tracing::warn!(path = %self.path.display(), err = %e, "failed to persist app token");
        }
    }
}

fn load(path: &Path) -> anyhow::Result<PersistedToken> {
    let contents = std::fs::read_to_string(path)?;
    let persisted: PersistedToken = serde_json::from_str(&contents)?;
    Ok(persisted)
}

/// Write tmp + rename. The temp name carries PID and a counter so concurrent
/// writers never share a temp file.
fn save(path: &Path, persisted: &PersistedToken) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let json = serde_json::to_string(persisted)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "token_store_tests.rs"]
mod tests;
