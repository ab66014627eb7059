//! Discovery of freshly graduated tokens.

use async_trait::async_trait;

pub mod graduated;

pub use graduated::GraduatedFeed;

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Candidate addresses, newest first. Upstream failures yield an
    /// empty list.
    async fn fetch_candidates(&self) -> Vec<String>;
}
