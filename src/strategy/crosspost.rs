//! Ordering for the secondary-channel announcement.

use std::cmp::Ordering;

use crate::{market::MarketSnapshot, store::PostedToken};

/// A stored token paired with its freshly fetched market data.
#[derive(Debug, Clone)]
pub struct CrosspostCandidate {
    pub entry: PostedToken,
    pub snapshot: MarketSnapshot,
}

impl CrosspostCandidate {
    /// Still worth showing off: priced and with somewhere to click.
    pub fn is_presentable(&self) -> bool {
        self.snapshot.mcap > 0.0 && !self.snapshot.social_links.is_empty()
    }
}

fn compare(a: &CrosspostCandidate, b: &CrosspostCandidate) -> Ordering {
    a.entry
        .crossposted
        .cmp(&b.entry.crossposted)
        .then_with(|| b.snapshot.mcap.total_cmp(&a.snapshot.mcap))
        .then_with(|| a.entry.address.cmp(&b.entry.address))
}

/// Not-yet-crossposted first, then current mcap descending, then address
/// ascending. Unpresentable candidates are dropped.
pub fn rank_crosspost_candidates(mut candidates: Vec<CrosspostCandidate>) -> Vec<CrosspostCandidate> {
    candidates.retain(CrosspostCandidate::is_presentable);
    candidates.sort_by(compare);
    candidates
}
