//! In-process backend with the same merge and retention rules as the file
//! store. Nothing survives the process; the engine tests run against it.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;

use super::{into_map, merge_entries, prune_expired, PostedToken, PostedTokens, TokenStore};

pub struct MemoryStore {
    entries: Mutex<Vec<PostedToken>>,
    retention: Duration,
}

impl MemoryStore {
    pub fn new(retention: Duration) -> Self {
        Self::with_entries(Vec::new(), retention)
    }

    pub fn with_entries(entries: Vec<PostedToken>, retention: Duration) -> Self {
        Self {
            entries: Mutex::new(entries),
            retention,
        }
    }

    /// Copy of the persisted list in storage order.
    pub async fn snapshot(&self) -> Vec<PostedToken> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load(&self) -> PostedTokens {
        let mut entries = self.entries.lock().await;
        prune_expired(&mut entries, Utc::now(), self.retention);
        into_map(entries.clone())
    }

    async fn save(&self, incoming: &PostedTokens) -> Result<()> {
        let mut entries = self.entries.lock().await;
        merge_entries(&mut entries, incoming);
        prune_expired(&mut entries, Utc::now(), self.retention);
        Ok(())
    }
}
