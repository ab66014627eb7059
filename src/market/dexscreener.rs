//! DexScreener `latest/dex/tokens/<address>` client.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::market::{MarketData, MarketSnapshot};

#[derive(Debug, Default, Deserialize)]
struct PairsResponse {
    #[serde(default)]
    pairs: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPair {
    #[serde(default)]
    fdv: Value,
    #[serde(default)]
    base_token: Option<RawBaseToken>,
    #[serde(default)]
    info: Option<RawInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct RawBaseToken {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawInfo {
    #[serde(default, rename = "imageUrl")]
    image_url: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    websites: Option<Vec<Value>>,
    #[serde(default)]
    socials: Option<Vec<Value>>,
}

/// Numbers or numeric strings; anything else, negative or non-finite is 0.
fn parse_mcap(raw: &Value) -> f64 {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(0.0)
}

/// A link entry is either a bare string or `{ "url": ... }`.
fn link_url(raw: &Value) -> Option<String> {
    let url = match raw {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("url")?.as_str()?,
        _ => return None,
    };
    let url = url.trim();
    (!url.is_empty()).then(|| url.to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Build a snapshot from the first pair of a response body.
pub fn parse_snapshot(address: &str, body: &Value) -> Option<MarketSnapshot> {
    let response: PairsResponse = serde_json::from_value(body.clone()).ok()?;
    let first = response.pairs?.into_iter().next()?;
    let pair: RawPair = serde_json::from_value(first).ok()?;
    let base = pair.base_token.unwrap_or_default();
    let info = pair.info.unwrap_or_default();

    let image_url = non_empty(info.image_url)
        .or_else(|| non_empty(info.image))
        .or_else(|| non_empty(base.image));
    let social_links = info
        .websites
        .unwrap_or_default()
        .iter()
        .chain(info.socials.unwrap_or_default().iter())
        .filter_map(link_url)
        .collect();

    Some(MarketSnapshot {
        address: address.to_string(),
        image_url,
        symbol: base.symbol.unwrap_or_default(),
        name: base.name.unwrap_or_default(),
        mcap: parse_mcap(&pair.fdv),
        social_links,
    })
}

#[derive(Clone)]
pub struct DexScreener {
    client: Client,
    base_url: String,
}

impl DexScreener {
    pub fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, address: &str) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, address);
        let res = self.client.get(&url).send().await?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(anyhow!("market data HTTP {}: {}", status, err_text));
        }
        Ok(res.json().await?)
    }
}

#[async_trait]
impl MarketData for DexScreener {
    async fn fetch_market_data(&self, address: &str) -> Option<MarketSnapshot> {
        let address = address.trim();
        if address.is_empty() {
            error!("❌ [MARKET] Refusing lookup without an address");
            return None;
        }

        match self.fetch(address).await {
            Ok(body) => {
                let snapshot = parse_snapshot(address, &body);
                if snapshot.is_none() {
                    debug!("🔍 [MARKET] No pair data for {}", address);
                }
                snapshot
            }
            Err(e) => {
                error!("❌ [MARKET] Lookup failed for {}: {:#}", address, e);
                None
            }
        }
    }
}
