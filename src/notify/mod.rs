//! Outbound announcements.

use anyhow::Result;
use async_trait::async_trait;

use crate::market::MarketSnapshot;

pub mod format;
pub mod telegram;
pub mod webhook;

pub use telegram::TelegramNotifier;
pub use webhook::WebhookCrossPoster;

/// Extra context for a milestone reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowUp {
    pub multiplier: u32,
    /// Baseline the multiple is measured against.
    pub initial_mcap: f64,
    /// Channel message to thread the reply under.
    pub reply_to: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostReceipt {
    pub initial_mcap: f64,
    pub message_id: i64,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce `snapshot`. Delivery problems are logged and reported as
    /// `None`; nothing is raised past this call.
    async fn post(&self, snapshot: &MarketSnapshot, follow_up: Option<FollowUp>) -> Option<PostReceipt>;
}

#[async_trait]
pub trait CrossPoster: Send + Sync {
    async fn crosspost(&self, snapshot: &MarketSnapshot) -> Result<()>;
}
