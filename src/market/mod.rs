//! Market data for a single token.

use async_trait::async_trait;

pub mod dexscreener;

pub use dexscreener::DexScreener;

/// What the channel post and the filters need to know about a token.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MarketSnapshot {
    pub address: String,
    pub image_url: Option<String>,
    pub symbol: String,
    pub name: String,
    /// Fully diluted valuation in USD.
    pub mcap: f64,
    /// Website URLs first, then social URLs.
    pub social_links: Vec<String>,
}

#[async_trait]
pub trait MarketData: Send + Sync {
    /// `None` when the token has no pair yet or the lookup failed.
    async fn fetch_market_data(&self, address: &str) -> Option<MarketSnapshot>;
}
