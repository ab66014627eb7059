//! Posted-token bookkeeping.
//!
//! Every token announced to the channel gets one [`PostedToken`] keyed by
//! its address. The record holds the baseline market cap used for
//! follow-ups and is dropped once it falls outside the retention window.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

pub type PostedTokens = HashMap<String, PostedToken>;

fn default_multiplier() -> u32 {
    1
}

/* --------------------------------------------------------------------- */
/*  A single posted token                                                */
/* --------------------------------------------------------------------- */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedToken {
    pub address: String,
    pub timestamp: DateTime<Utc>,
    pub initial_mcap: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_message_id: Option<i64>,
    #[serde(default = "default_multiplier")]
    pub max_multiplier: u32,
    #[serde(default)]
    pub crossposted: bool,
}

impl PostedToken {
    pub fn new(address: impl Into<String>, initial_mcap: f64, message_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            timestamp: now,
            initial_mcap,
            telegram_message_id: Some(message_id),
            max_multiplier: default_multiplier(),
            crossposted: false,
        }
    }

    /// A cutoff before the earliest representable instant keeps everything.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        match now.checked_sub_signed(retention) {
            Some(cutoff) => self.timestamp < cutoff,
            None => false,
        }
    }

    /// Fold a newer in-memory view of the same address into the
    /// persisted record without touching its creation data.
    pub fn absorb(&mut self, newer: &PostedToken) {
        self.max_multiplier = self.max_multiplier.max(newer.max_multiplier);
        self.crossposted |= newer.crossposted;
        if self.telegram_message_id.is_none() {
            self.telegram_message_id = newer.telegram_message_id;
        }
    }
}

/* --------------------------------------------------------------------- */
/*  Storage backends                                                     */
/* --------------------------------------------------------------------- */
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Current non-expired entries. Never fails: unreadable state is
    /// logged and treated as empty.
    async fn load(&self) -> PostedTokens;

    /// Merge `entries` into the persisted state.
    async fn save(&self, entries: &PostedTokens) -> Result<()>;
}

/// Drop every entry older than the retention window, returning how many
/// were removed.
pub fn prune_expired(entries: &mut Vec<PostedToken>, now: DateTime<Utc>, retention: Duration) -> usize {
    let before = entries.len();
    entries.retain(|entry| !entry.is_expired(now, retention));
    before - entries.len()
}

/// Merge an in-memory map into an ordered persisted list. Existing records
/// keep their position, timestamp and baseline; unseen addresses are
/// appended oldest first.
pub fn merge_entries(existing: &mut Vec<PostedToken>, entries: &PostedTokens) {
    for record in existing.iter_mut() {
        if let Some(newer) = entries.get(&record.address) {
            record.absorb(newer);
        }
    }

    let mut fresh: Vec<&PostedToken> = entries
        .values()
        .filter(|entry| !existing.iter().any(|e| e.address == entry.address))
        .collect();
    fresh.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.address.cmp(&b.address)));
    existing.extend(fresh.into_iter().cloned());
}

/// Collapse duplicate addresses in a persisted list, first one wins.
pub(crate) fn dedupe_addresses(entries: &mut Vec<PostedToken>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|entry| seen.insert(entry.address.clone()));
}

pub(crate) fn into_map(entries: Vec<PostedToken>) -> PostedTokens {
    entries
        .into_iter()
        .map(|entry| (entry.address.clone(), entry))
        .collect()
}
