//! Pure decision rules: which tokens to post, when to follow up, and
//! which token to cross-post.

pub mod crosspost;
pub mod eligibility;
pub mod multiplier;

pub use crosspost::{rank_crosspost_candidates, CrosspostCandidate};
pub use eligibility::is_eligible;
pub use multiplier::{compute_multiplier, should_follow_up};
