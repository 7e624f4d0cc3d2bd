//! Token cache file backing the authenticator.
//!
//! The file holds a JSON list of `{"scopes": [..], "token": {..}}` entries,
//! the layout yup-oauth2 uses for its own disk storage, so either can read
//! the other's file. It is written atomically and readable by the owner only.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use yup_oauth2::storage::{TokenInfo, TokenStorage};

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

#[derive(Clone, Serialize, Deserialize)]
struct CachedToken {
    scopes: Vec<String>,
    token: TokenInfo,
}

impl CachedToken {
    fn covers(&self, scopes: &[&str]) -> bool {
        scopes.iter().all(|s| self.scopes.iter().any(|have| have == s))
    }
}

pub struct TokenCache {
    path: PathBuf,
    /// `None` until the file has been read.
    entries: Mutex<Option<Vec<CachedToken>>>,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    async fn loaded<'a>(
        &self,
        slot: &'a mut Option<Vec<CachedToken>>,
    ) -> &'a mut Vec<CachedToken> {
        if slot.is_none() {
            *slot = Some(read_entries(&self.path).await);
        }
        slot.get_or_insert_with(Vec::new)
    }
}

#[async_trait]
impl TokenStorage for TokenCache {
    async fn set(&self, scopes: &[&str], token: TokenInfo) -> anyhow::Result<()> {
        let mut slot = self.entries.lock().await;
        let entries = self.loaded(&mut slot).await;

        let scopes: Vec<String> = scopes.iter().map(|s| s.to_string()).collect();
        match entries.iter_mut().find(|e| e.scopes == scopes) {
            Some(entry) => entry.token = token,
            None => entries.push(CachedToken { scopes, token }),
        }

        // A failed write leaves the token usable from memory until restart
        match write_entries(&self.path, entries).await {
            Ok(()) => tracing::debug!("Token cache written to {}", self.path.display()),
            Err(e) => tracing::error!(
                "Failed to persist token cache {}: {}",
                self.path.display(),
                e
            ),
        }
        Ok(())
    }

    async fn get(&self, scopes: &[&str]) -> Option<TokenInfo> {
        let mut slot = self.entries.lock().await;
        self.loaded(&mut slot)
            .await
            .iter()
            .find(|e| e.covers(scopes))
            .map(|e| e.token.clone())
    }
}

/// Read the cache file. Missing or unreadable files yield no entries, which
/// sends the authenticator to the consent flow.
async fn read_entries(path: &Path) -> Vec<CachedToken> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("No cached token at {}", path.display());
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!("Ignoring unreadable token cache {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(entries) => {
            tracing::debug!("Loaded cached token from {}", path.display());
            entries
        }
        Err(e) => {
            tracing::warn!("Ignoring corrupt token cache {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

async fn write_entries(path: &Path, entries: &[CachedToken]) -> std::io::Result<()> {
    let contents = serde_json::to_string_pretty(entries)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = temp_path(path);
    tokio::fs::write(&tmp, contents).await?;

    // Owner-only, the file grants access to the calendar account
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }

    tokio::fs::rename(&tmp, path).await
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}
