//! Flat JSON file backend: one ordered array of [`PostedToken`] records.

use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{info, warn};

use super::{dedupe_addresses, into_map, merge_entries, prune_expired, PostedToken, PostedTokens, TokenStore};

pub struct JsonFileStore {
    path: PathBuf,
    retention: Duration,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>, retention: Duration) -> Self {
        Self {
            path: path.into(),
            retention,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file does not exist yet.
    async fn read_bytes(&self) -> io::Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn parse(&self, bytes: &[u8]) -> Option<Vec<PostedToken>> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Some(Vec::new());
        }
        match serde_json::from_slice::<Vec<PostedToken>>(bytes) {
            Ok(mut entries) => {
                dedupe_addresses(&mut entries);
                Some(entries)
            }
            Err(e) => {
                warn!("⚠️ [STORE] {:?} is malformed, starting from an empty list: {}", self.path, e);
                None
            }
        }
    }

    async fn persist(&self, entries: &[PostedToken]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating store directory {:?}", parent))?;
        }
        let json = serde_json::to_vec_pretty(entries)?;

        // write-then-rename so a crash never leaves half a file behind
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing store to {:?}", tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replacing store file {:?}", self.path))?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for JsonFileStore {
    async fn load(&self) -> PostedTokens {
        let mut entries = match self.read_bytes().await {
            Ok(Some(bytes)) => self.parse(&bytes).unwrap_or_default(),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("⚠️ [STORE] Could not read {:?}, treating as empty: {}", self.path, e);
                return PostedTokens::new();
            }
        };

        let pruned = prune_expired(&mut entries, Utc::now(), self.retention);
        if pruned > 0 {
            info!("🧹 [STORE] Pruned {} expired entries", pruned);
            if let Err(e) = self.persist(&entries).await {
                warn!("⚠️ [STORE] Failed to write pruned store: {:#}", e);
            }
        }

        into_map(entries)
    }

    async fn save(&self, entries: &PostedTokens) -> Result<()> {
        let bytes = self
            .read_bytes()
            .await
            .with_context(|| format!("reading store {:?}", self.path))?;
        let mut existing = bytes
            .and_then(|b| self.parse(&b))
            .unwrap_or_default();

        merge_entries(&mut existing, entries);
        prune_expired(&mut existing, Utc::now(), self.retention);
        self.persist(&existing).await?;

        info!("💾 [STORE] Saved {} entries to {:?}", existing.len(), self.path);
        Ok(())
    }
}
