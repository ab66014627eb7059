use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex,
    },
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Duration;

use super::*;
use crate::{
    market::MarketSnapshot,
    notify::PostReceipt,
    store::MemoryStore,
};

/* ------------------------------ fakes -------------------------------- */

struct FakeSource(Vec<String>);

#[async_trait]
impl TokenSource for FakeSource {
    async fn fetch_candidates(&self) -> Vec<String> {
        self.0.clone()
    }
}

#[derive(Default)]
struct FakeMarket {
    snapshots: Mutex<HashMap<String, MarketSnapshot>>,
    lookups: Mutex<Vec<String>>,
}

impl FakeMarket {
    fn set(&self, address: &str, mcap: f64, links: usize) {
        let snapshot = MarketSnapshot {
            address: address.to_string(),
            image_url: Some(format!("https://cdn.example/{address}.png")),
            symbol: address.to_uppercase(),
            name: format!("{address} token"),
            mcap,
            social_links: (0..links).map(|i| format!("https://x.com/{address}{i}")).collect(),
        };
        self.snapshots.lock().unwrap().insert(address.to_string(), snapshot);
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn fetch_market_data(&self, address: &str) -> Option<MarketSnapshot> {
        self.lookups.lock().unwrap().push(address.to_string());
        self.snapshots.lock().unwrap().get(address).cloned()
    }
}

struct RecordingNotifier {
    posts: Mutex<Vec<(String, Option<FollowUp>)>>,
    failing: HashSet<String>,
    next_id: AtomicI64,
}

impl RecordingNotifier {
    fn new() -> Self {
        Self::failing_for(&[])
    }

    fn failing_for(addresses: &[&str]) -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            failing: addresses.iter().map(|a| a.to_string()).collect(),
            next_id: AtomicI64::new(100),
        }
    }

    fn posts(&self) -> Vec<(String, Option<FollowUp>)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn post(&self, snapshot: &MarketSnapshot, follow_up: Option<FollowUp>) -> Option<PostReceipt> {
        if self.failing.contains(&snapshot.address) {
            return None;
        }
        self.posts
            .lock()
            .unwrap()
            .push((snapshot.address.clone(), follow_up));
        Some(PostReceipt {
            initial_mcap: snapshot.mcap,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }
}

#[derive(Default)]
struct RecordingCrossPoster {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl CrossPoster for RecordingCrossPoster {
    async fn crosspost(&self, snapshot: &MarketSnapshot) -> Result<()> {
        if self.fail {
            return Err(anyhow!("webhook down"));
        }
        self.sent.lock().unwrap().push(snapshot.address.clone());
        Ok(())
    }
}

/// Store whose writes always fail.
struct ReadOnlyStore(PostedTokens);

#[async_trait]
impl TokenStore for ReadOnlyStore {
    async fn load(&self) -> PostedTokens {
        self.0.clone()
    }

    async fn save(&self, _entries: &PostedTokens) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}

/* ------------------------------ harness ------------------------------ */

struct Harness {
    store: Arc<MemoryStore>,
    market: Arc<FakeMarket>,
    notifier: Arc<RecordingNotifier>,
    engine: Engine,
}

fn harness(stored: Vec<PostedToken>, candidates: &[&str], notifier: RecordingNotifier) -> Harness {
    let store = Arc::new(MemoryStore::with_entries(stored, Duration::days(7)));
    let market = Arc::new(FakeMarket::default());
    let notifier = Arc::new(notifier);
    let source = Arc::new(FakeSource(candidates.iter().map(|c| c.to_string()).collect()));
    let engine = Engine::new(
        McapBounds::default(),
        store.clone(),
        source,
        market.clone(),
        notifier.clone(),
    );
    Harness {
        store,
        market,
        notifier,
        engine,
    }
}

fn stored(address: &str, initial_mcap: f64, max_multiplier: u32, message_id: Option<i64>) -> PostedToken {
    let mut entry = PostedToken::new(address, initial_mcap, 1, Utc::now() - Duration::hours(2));
    entry.max_multiplier = max_multiplier;
    entry.telegram_message_id = message_id;
    entry
}

async fn entry(h: &Harness, address: &str) -> PostedToken {
    h.store
        .snapshot()
        .await
        .into_iter()
        .find(|e| e.address == address)
        .expect("entry present")
}

/* ------------------------------ new posts ---------------------------- */

#[tokio::test]
async fn test_first_eligible_token_is_posted_and_stored() {
    let h = harness(vec![], &["A"], RecordingNotifier::new());
    h.market.set("A", 100_000.0, 1);

    let summary = h.engine.run_once().await.unwrap();
    assert_eq!(summary.posted.as_deref(), Some("A"));
    assert_eq!(h.notifier.posts(), vec![("A".to_string(), None)]);

    let saved = entry(&h, "A").await;
    assert_eq!(saved.initial_mcap, 100_000.0);
    assert_eq!(saved.max_multiplier, 1);
    assert_eq!(saved.telegram_message_id, Some(100));
}

#[tokio::test]
async fn test_at_most_one_new_post_per_run() {
    let h = harness(vec![], &["A", "B"], RecordingNotifier::new());
    h.market.set("A", 100_000.0, 1);
    h.market.set("B", 200_000.0, 2);

    let summary = h.engine.run_once().await.unwrap();
    assert_eq!(summary.posted.as_deref(), Some("A"));
    assert_eq!(h.store.snapshot().await.len(), 1);
    assert!(!h.market.lookups.lock().unwrap().contains(&"B".to_string()));
}

#[tokio::test]
async fn test_already_posted_token_is_not_posted_again() {
    let h = harness(vec![stored("A", 100_000.0, 1, Some(5))], &["A", "B"], RecordingNotifier::new());
    h.market.set("A", 100_000.0, 1);
    h.market.set("B", 60_000.0, 1);

    let summary = h.engine.run_once().await.unwrap();
    assert_eq!(summary.posted.as_deref(), Some("B"));
    let new_posts: Vec<String> = h
        .notifier
        .posts()
        .into_iter()
        .filter(|(_, f)| f.is_none())
        .map(|(a, _)| a)
        .collect();
    assert_eq!(new_posts, vec!["B".to_string()]);
}

#[tokio::test]
async fn test_ineligible_candidates_are_skipped() {
    let h = harness(vec![], &["cheap", "pricey", "silent", "unknown", "good"], RecordingNotifier::new());
    h.market.set("cheap", 10_000.0, 1);
    h.market.set("pricey", 900_000.0, 1);
    h.market.set("silent", 100_000.0, 0);
    h.market.set("good", 300_000.0, 1);

    let summary = h.engine.run_once().await.unwrap();
    assert_eq!(summary.posted.as_deref(), Some("good"));
    assert_eq!(h.store.snapshot().await.len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_is_not_recorded() {
    let h = harness(vec![], &["A", "B"], RecordingNotifier::failing_for(&["A"]));
    h.market.set("A", 100_000.0, 1);
    h.market.set("B", 100_000.0, 1);

    let summary = h.engine.run_once().await.unwrap();
    assert_eq!(summary.posted.as_deref(), Some("B"));
    let addresses: Vec<String> = h.store.snapshot().await.into_iter().map(|e| e.address).collect();
    assert_eq!(addresses, vec!["B".to_string()]);
}

#[tokio::test]
async fn test_no_candidates_is_a_clean_noop() {
    let h = harness(vec![], &[], RecordingNotifier::new());
    let summary = h.engine.run_once().await.unwrap();
    assert_eq!(summary, RunSummary::default());
    assert!(h.notifier.posts().is_empty());
}

/* ------------------------------ follow-ups --------------------------- */

#[tokio::test]
async fn test_doubling_triggers_threaded_reply() {
    let h = harness(vec![stored("A", 50_000.0, 1, Some(42))], &[], RecordingNotifier::new());
    h.market.set("A", 120_000.0, 1);

    let summary = h.engine.run_once().await.unwrap();
    assert_eq!(summary.follow_ups, vec![("A".to_string(), 2)]);

    let posts = h.notifier.posts();
    assert_eq!(posts.len(), 1);
    let follow_up = posts[0].1.expect("follow-up");
    assert_eq!(follow_up.multiplier, 2);
    assert_eq!(follow_up.reply_to, Some(42));
    assert_eq!(follow_up.initial_mcap, 50_000.0);

    let saved = entry(&h, "A").await;
    assert_eq!(saved.max_multiplier, 2);
    assert_eq!(saved.initial_mcap, 50_000.0);
    assert_eq!(saved.telegram_message_id, Some(42));
}

#[tokio::test]
async fn test_only_new_highs_are_announced() {
    let h = harness(
        vec![stored("two", 50_000.0, 2, Some(1)), stored("three", 50_000.0, 3, Some(2))],
        &[],
        RecordingNotifier::new(),
    );
    h.market.set("two", 150_000.0, 1);
    h.market.set("three", 150_000.0, 1);

    let summary = h.engine.run_followup_check().await.unwrap();
    assert_eq!(summary.follow_ups, vec![("two".to_string(), 3)]);
    assert_eq!(entry(&h, "three").await.max_multiplier, 3);
}

#[tokio::test]
async fn test_multiplier_never_decreases_and_baseline_is_kept() {
    let h = harness(vec![stored("A", 50_000.0, 1, Some(9))], &[], RecordingNotifier::new());

    for (mcap, expected) in [(200_000.0, 4), (60_000.0, 4), (110_000.0, 4), (260_000.0, 5)] {
        h.market.set("A", mcap, 1);
        h.engine.run_followup_check().await.unwrap();
        let saved = entry(&h, "A").await;
        assert_eq!(saved.max_multiplier, expected);
        assert_eq!(saved.initial_mcap, 50_000.0);
    }
    assert_eq!(h.notifier.posts().len(), 2);
}

#[tokio::test]
async fn test_entries_without_message_id_are_skipped() {
    let h = harness(vec![stored("A", 50_000.0, 1, None)], &[], RecordingNotifier::new());
    h.market.set("A", 500_000.0, 1);

    let summary = h.engine.run_followup_check().await.unwrap();
    assert!(summary.follow_ups.is_empty());
    assert!(h.market.lookups.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_follow_up_leaves_multiplier() {
    let h = harness(vec![stored("A", 50_000.0, 1, Some(3))], &[], RecordingNotifier::failing_for(&["A"]));
    h.market.set("A", 200_000.0, 1);

    let summary = h.engine.run_followup_check().await.unwrap();
    assert!(summary.follow_ups.is_empty());
    assert_eq!(entry(&h, "A").await.max_multiplier, 1);
}

#[tokio::test]
async fn test_missing_market_data_skips_token() {
    let h = harness(vec![stored("A", 50_000.0, 1, Some(3))], &[], RecordingNotifier::new());
    let summary = h.engine.run_followup_check().await.unwrap();
    assert!(summary.follow_ups.is_empty());
    assert_eq!(entry(&h, "A").await.max_multiplier, 1);
}

/* ------------------------------ store failures ----------------------- */

#[tokio::test]
async fn test_store_write_failure_is_fatal() {
    let market = Arc::new(FakeMarket::default());
    market.set("A", 100_000.0, 1);
    let engine = Engine::new(
        McapBounds::default(),
        Arc::new(ReadOnlyStore(PostedTokens::new())),
        Arc::new(FakeSource(vec!["A".to_string()])),
        market,
        Arc::new(RecordingNotifier::new()),
    );
    assert!(engine.run_once().await.is_err());
}

/* ------------------------------ cross-posting ------------------------ */

#[tokio::test]
async fn test_crosspost_prefers_unposted_then_mcap() {
    let mut already = stored("big", 50_000.0, 1, Some(1));
    already.crossposted = true;
    let h = harness(
        vec![already, stored("mid", 50_000.0, 1, Some(2)), stored("low", 50_000.0, 1, Some(3))],
        &[],
        RecordingNotifier::new(),
    );
    h.market.set("big", 5_000_000.0, 1);
    h.market.set("mid", 400_000.0, 1);
    h.market.set("low", 90_000.0, 1);

    let crossposter = Arc::new(RecordingCrossPoster::default());
    let engine = Engine::new(
        McapBounds::default(),
        h.store.clone(),
        Arc::new(FakeSource(vec![])),
        h.market.clone(),
        h.notifier.clone(),
    )
    .with_crossposter(crossposter.clone());

    let summary = engine.run_crosspost().await.unwrap();
    assert_eq!(summary.crossposted.as_deref(), Some("mid"));
    assert_eq!(*crossposter.sent.lock().unwrap(), vec!["mid".to_string()]);
    assert!(entry(&h, "mid").await.crossposted);
    assert!(!entry(&h, "low").await.crossposted);

    // next pass moves on to the remaining unposted token
    let summary = engine.run_crosspost().await.unwrap();
    assert_eq!(summary.crossposted.as_deref(), Some("low"));
}

#[tokio::test]
async fn test_crosspost_failure_changes_nothing() {
    let h = harness(vec![stored("A", 50_000.0, 1, Some(1))], &[], RecordingNotifier::new());
    h.market.set("A", 100_000.0, 1);
    let engine = Engine::new(
        McapBounds::default(),
        h.store.clone(),
        Arc::new(FakeSource(vec![])),
        h.market.clone(),
        h.notifier.clone(),
    )
    .with_crossposter(Arc::new(RecordingCrossPoster {
        fail: true,
        ..Default::default()
    }));

    let summary = engine.run_crosspost().await.unwrap();
    assert_eq!(summary.crossposted, None);
    assert!(!entry(&h, "A").await.crossposted);
}

#[tokio::test]
async fn test_crosspost_without_webhook_is_noop() {
    let h = harness(vec![stored("A", 50_000.0, 1, Some(1))], &[], RecordingNotifier::new());
    h.market.set("A", 100_000.0, 1);
    let summary = h.engine.run_crosspost().await.unwrap();
    assert_eq!(summary, RunSummary::default());
    assert!(h.market.lookups.lock().unwrap().is_empty());
}
