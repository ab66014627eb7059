//! The run loop proper: one pass per external trigger.
//!
//! * [`Engine::run_once`] posts at most one new token, then checks every
//!   stored token for a milestone.
//! * [`Engine::run_followup_check`] only does the milestone pass.
//! * [`Engine::run_crosspost`] announces the best stored token to the
//!   secondary channel.
//!
//! Upstream and delivery failures never abort a pass; a failing store
//! write does.

use std::{collections::HashSet, sync::Arc};

use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info};

use crate::{
    config::{McapBounds, Settings},
    market::{DexScreener, MarketData},
    notify::{CrossPoster, FollowUp, Notifier, TelegramNotifier, WebhookCrossPoster},
    source::{GraduatedFeed, TokenSource},
    store::{JsonFileStore, PostedToken, PostedTokens, TokenStore},
    strategy::{
        compute_multiplier, crosspost::CrosspostCandidate, is_eligible, rank_crosspost_candidates,
        should_follow_up,
    },
    utils::http::build_client,
};

/// What a pass did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub posted: Option<String>,
    /// `(address, multiplier)` for every milestone reply sent.
    pub follow_ups: Vec<(String, u32)>,
    pub crossposted: Option<String>,
}

pub struct Engine {
    bounds: McapBounds,
    store: Arc<dyn TokenStore>,
    source: Arc<dyn TokenSource>,
    market: Arc<dyn MarketData>,
    notifier: Arc<dyn Notifier>,
    crossposter: Option<Arc<dyn CrossPoster>>,
}

impl Engine {
    pub fn new(
        bounds: McapBounds,
        store: Arc<dyn TokenStore>,
        source: Arc<dyn TokenSource>,
        market: Arc<dyn MarketData>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            bounds,
            store,
            source,
            market,
            notifier,
            crossposter: None,
        }
    }

    pub fn with_crossposter(mut self, crossposter: Arc<dyn CrossPoster>) -> Self {
        self.crossposter = Some(crossposter);
        self
    }

    /// Wire the production components from configuration.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = build_client(settings.http_timeout)?;

        let store = Arc::new(JsonFileStore::new(settings.store_path.clone(), settings.retention));
        let source = Arc::new(GraduatedFeed::new(
            client.clone(),
            settings.discovery_url.clone(),
            settings.discovery_api_key.clone(),
            settings.recent_window,
        ));
        let market = Arc::new(DexScreener::new(client.clone(), settings.market_data_url.clone()));
        let notifier = Arc::new(TelegramNotifier::new(client.clone(), settings));

        let engine = Self::new(settings.bounds, store, source, market, notifier);
        Ok(match &settings.crosspost_webhook_url {
            Some(url) => engine.with_crossposter(Arc::new(WebhookCrossPoster::new(client, url.clone()))),
            None => engine,
        })
    }

    /* ------------------------------ entry points --------------------- */

    pub async fn run_once(&self) -> Result<RunSummary> {
        let mut posted = self.store.load().await;
        info!("🏁 [RUN] Starting run with {} tracked tokens", posted.len());

        let new_post = self.post_first_eligible(&mut posted).await?;
        let follow_ups = self.check_multipliers(&mut posted).await?;

        info!(
            "✅ [RUN] Done: new post {}, {} follow-ups",
            new_post.as_deref().unwrap_or("none"),
            follow_ups.len()
        );
        Ok(RunSummary {
            posted: new_post,
            follow_ups,
            crossposted: None,
        })
    }

    pub async fn run_followup_check(&self) -> Result<RunSummary> {
        let mut posted = self.store.load().await;
        let follow_ups = self.check_multipliers(&mut posted).await?;
        info!("✅ [FOLLOWUP] {} follow-ups sent", follow_ups.len());
        Ok(RunSummary {
            follow_ups,
            ..Default::default()
        })
    }

    pub async fn run_crosspost(&self) -> Result<RunSummary> {
        let Some(crossposter) = &self.crossposter else {
            info!("ℹ️ [CROSSPOST] No webhook configured, nothing to do");
            return Ok(RunSummary::default());
        };

        let mut posted = self.store.load().await;
        let mut candidates = Vec::new();
        for address in sorted_addresses(&posted) {
            if let Some(snapshot) = self.market.fetch_market_data(&address).await {
                candidates.push(CrosspostCandidate {
                    entry: posted[&address].clone(),
                    snapshot,
                });
            }
        }

        let Some(best) = rank_crosspost_candidates(candidates).into_iter().next() else {
            info!("ℹ️ [CROSSPOST] No presentable token to cross-post");
            return Ok(RunSummary::default());
        };

        if let Err(e) = crossposter.crosspost(&best.snapshot).await {
            error!("❌ [CROSSPOST] Failed to cross-post {}: {:#}", best.entry.address, e);
            return Ok(RunSummary::default());
        }

        if let Some(entry) = posted.get_mut(&best.entry.address) {
            entry.crossposted = true;
        }
        self.store.save(&posted).await?;

        Ok(RunSummary {
            crossposted: Some(best.entry.address),
            ..Default::default()
        })
    }

    /* ------------------------------ steps ---------------------------- */

    /// Walk the candidates newest first and announce the first unseen one
    /// that passes the filter.
    async fn post_first_eligible(&self, posted: &mut PostedTokens) -> Result<Option<String>> {
        let candidates = self.source.fetch_candidates().await;
        let mut seen = HashSet::new();

        for address in candidates {
            if !seen.insert(address.clone()) {
                continue;
            }
            if posted.contains_key(&address) {
                debug!("⏭️ [RUN] {} already posted", address);
                continue;
            }

            let Some(snapshot) = self.market.fetch_market_data(&address).await else {
                continue;
            };
            if !is_eligible(&snapshot, &self.bounds) {
                debug!(
                    "🚫 [RUN] {} not eligible (mcap {:.0}, {} links)",
                    address,
                    snapshot.mcap,
                    snapshot.social_links.len()
                );
                continue;
            }

            let Some(receipt) = self.notifier.post(&snapshot, None).await else {
                continue;
            };

            posted.insert(
                address.clone(),
                PostedToken::new(address.clone(), receipt.initial_mcap, receipt.message_id, Utc::now()),
            );
            self.store.save(posted).await?;
            info!("🆕 [RUN] Posted {} at mcap {:.0}", address, receipt.initial_mcap);
            return Ok(Some(address));
        }

        Ok(None)
    }

    /// Reply under the original post whenever a token reaches a new
    /// whole multiple (2x or more) of its baseline.
    async fn check_multipliers(&self, posted: &mut PostedTokens) -> Result<Vec<(String, u32)>> {
        let mut sent = Vec::new();

        for address in sorted_addresses(posted) {
            let entry = &posted[&address];
            let Some(reply_to) = entry.telegram_message_id else {
                continue;
            };
            let (initial_mcap, max_multiplier) = (entry.initial_mcap, entry.max_multiplier);

            let Some(snapshot) = self.market.fetch_market_data(&address).await else {
                continue;
            };
            let multiplier = compute_multiplier(initial_mcap, snapshot.mcap);
            if !should_follow_up(multiplier, max_multiplier) {
                continue;
            }

            let follow_up = FollowUp {
                multiplier,
                initial_mcap,
                reply_to: Some(reply_to),
            };
            if self.notifier.post(&snapshot, Some(follow_up)).await.is_none() {
                continue;
            }

            if let Some(entry) = posted.get_mut(&address) {
                entry.max_multiplier = multiplier;
            }
            self.store.save(posted).await?;
            info!("🚀 [FOLLOWUP] {} reached {}x", address, multiplier);
            sent.push((address, multiplier));
        }

        Ok(sent)
    }
}

fn sorted_addresses(posted: &PostedTokens) -> Vec<String> {
    let mut addresses: Vec<String> = posted.keys().cloned().collect();
    addresses.sort();
    addresses
}

#[cfg(test)]
mod tests;
