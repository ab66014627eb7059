use crate::{config::McapBounds, market::MarketSnapshot};

/// A new token qualifies when its mcap sits inside `bounds` (inclusive)
/// and it advertises at least one website or social link.
pub fn is_eligible(snapshot: &MarketSnapshot, bounds: &McapBounds) -> bool {
    let above_min = snapshot.mcap >= bounds.min;
    let below_max = bounds.max.map_or(true, |max| snapshot.mcap <= max);
    above_min && below_max && !snapshot.social_links.is_empty()
}
