//! Graduated-token channel bot: discovers freshly graduated tokens, posts
//! the ones worth a look to a Telegram channel and replies under each post
//! when its market cap multiplies.

pub mod config;
pub mod engine;
pub mod market;
pub mod notify;
pub mod source;
pub mod store;
pub mod strategy;
pub mod utils;

pub use engine::{Engine, RunSummary};
