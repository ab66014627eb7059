//! Graduated-token feed (Moralis pump.fun `graduated` endpoint shape).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use log::{error, info};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::source::TokenSource;

#[derive(Debug, Default, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    result: Vec<Value>,
}

/// One record of the feed. Both field spellings show up upstream.
#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    address: Option<String>,
    #[serde(default, rename = "tokenAddress")]
    token_address: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default, rename = "graduatedAt")]
    graduated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub address: String,
    pub timestamp: DateTime<Utc>,
}

impl RawRecord {
    fn into_candidate(self) -> Option<Candidate> {
        let address = self
            .address
            .filter(|a| !a.trim().is_empty())
            .or(self.token_address)
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())?;
        let timestamp = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.graduated_at.as_deref().and_then(parse_timestamp))?;
        Some(Candidate { address, timestamp })
    }
}

/// RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS[.fff]` read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Turn a feed body into candidates: malformed records dropped, newest
/// first, optionally limited to `window` before `now`.
pub fn parse_candidates(body: &Value, now: DateTime<Utc>, window: Option<Duration>) -> Vec<Candidate> {
    let response: FeedResponse = match serde_json::from_value(body.clone()) {
        Ok(r) => r,
        Err(_) => return Vec::new(),
    };

    let mut candidates: Vec<Candidate> = response
        .result
        .into_iter()
        .filter_map(|record| serde_json::from_value::<RawRecord>(record).ok())
        .filter_map(RawRecord::into_candidate)
        .collect();

    if let Some(cutoff) = window.and_then(|w| now.checked_sub_signed(w)) {
        candidates.retain(|c| c.timestamp >= cutoff);
    }

    // stable sort keeps response order for equal timestamps
    candidates.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    candidates
}

#[derive(Clone)]
pub struct GraduatedFeed {
    client: Client,
    url: String,
    api_key: String,
    window: Option<Duration>,
}

impl GraduatedFeed {
    pub fn new(client: Client, url: String, api_key: String, window: Option<Duration>) -> Self {
        Self {
            client,
            url,
            api_key,
            window,
        }
    }

    async fn fetch(&self) -> Result<Value> {
        let res = self
            .client
            .get(&self.url)
            .header("accept", "application/json")
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(anyhow!("discovery HTTP {}: {}", status, err_text));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl TokenSource for GraduatedFeed {
    async fn fetch_candidates(&self) -> Vec<String> {
        match self.fetch().await {
            Ok(body) => {
                let candidates = parse_candidates(&body, Utc::now(), self.window);
                info!("📡 [SOURCE] {} candidate tokens", candidates.len());
                candidates.into_iter().map(|c| c.address).collect()
            }
            Err(e) => {
                error!("❌ [SOURCE] Failed to fetch graduated tokens: {:#}", e);
                Vec::new()
            }
        }
    }
}
