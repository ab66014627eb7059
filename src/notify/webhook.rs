//! Secondary-channel announcements through a Discord-compatible webhook.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde_json::{json, Value};

use crate::{
    market::MarketSnapshot,
    notify::{format, CrossPoster},
};

#[derive(Clone)]
pub struct WebhookCrossPoster {
    client: Client,
    url: String,
}

impl WebhookCrossPoster {
    pub fn new(client: Client, url: String) -> Self {
        Self { client, url }
    }

    pub fn build_payload(snapshot: &MarketSnapshot) -> Value {
        json!({ "content": format::render_plain(snapshot) })
    }
}

#[async_trait]
impl CrossPoster for WebhookCrossPoster {
    async fn crosspost(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let res = self
            .client
            .post(&self.url)
            .json(&Self::build_payload(snapshot))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(anyhow!("webhook HTTP {}: {}", status, err_text));
        }

        info!("📤 [CROSSPOST] Sent {} to webhook", snapshot.address);
        Ok(())
    }
}
