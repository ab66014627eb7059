//! Telegram Bot API channel poster (`sendMessage` / `sendPhoto`).

use std::fmt;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{error, info, warn};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use crate::{
    config::{ImagePolicy, Settings, UpdateStyle},
    market::MarketSnapshot,
    notify::{format, FollowUp, Notifier, PostReceipt},
};

#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
    update_style: UpdateStyle,
    image_policy: ImagePolicy,
}

/// Outcome of a Bot API call that did not yield a message id.
#[derive(Debug)]
pub enum SendError {
    /// Telegram answered `ok: false`; nothing was published.
    Rejected {
        method: String,
        status: StatusCode,
        description: String,
    },
    /// No definitive answer (transport failure, timeout, unreadable reply).
    /// The message may or may not exist.
    Unconfirmed(anyhow::Error),
}

impl SendError {
    /// Only a 4xx rejection (other than rate limiting) points at the photo.
    fn allows_text_fallback(&self) -> bool {
        matches!(
            self,
            SendError::Rejected { status, .. }
                if status.is_client_error() && *status != StatusCode::TOO_MANY_REQUESTS
        )
    }
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Rejected {
                method,
                status,
                description,
            } => write!(f, "telegram {} HTTP {}: {}", method, status, description),
            SendError::Unconfirmed(e) => write!(f, "{:#}", e),
        }
    }
}

impl std::error::Error for SendError {}

/// Pull `result.message_id` out of a Bot API reply.
pub fn parse_message_id(body: &Value) -> Result<i64> {
    if !body["ok"].as_bool().unwrap_or(false) {
        let description = body["description"].as_str().unwrap_or("no description");
        return Err(anyhow!("telegram rejected message: {}", description));
    }
    body["result"]["message_id"]
        .as_i64()
        .ok_or_else(|| anyhow!("missing message_id in response: {}", body))
}

impl TelegramNotifier {
    pub fn new(client: Client, settings: &Settings) -> Self {
        Self {
            client,
            api_url: settings.telegram_api_url.trim_end_matches('/').to_string(),
            bot_token: settings.telegram_bot_token.clone(),
            chat_id: settings.telegram_chat_id.clone(),
            update_style: settings.update_style,
            image_policy: settings.image_policy,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }

    /// Photo to attach, if the policy allows one for this kind of post.
    pub fn image_for<'a>(&self, snapshot: &'a MarketSnapshot, follow_up: Option<&FollowUp>) -> Option<&'a str> {
        let allowed = match (follow_up, self.image_policy) {
            (None, _) => true,
            (Some(_), ImagePolicy::Always) => true,
            (Some(_), ImagePolicy::InitialOnly) => false,
        };
        if allowed {
            snapshot.image_url.as_deref()
        } else {
            None
        }
    }

    pub fn render(&self, snapshot: &MarketSnapshot, follow_up: Option<&FollowUp>) -> String {
        match follow_up {
            Some(f) => format::render_update(snapshot, f, self.update_style),
            None => format::render_initial(snapshot),
        }
    }

    /// Request body for `sendPhoto` when `photo` is set, `sendMessage` otherwise.
    pub fn build_payload(
        &self,
        address: &str,
        body: &str,
        photo: Option<&str>,
        reply_to: Option<i64>,
    ) -> (&'static str, Value) {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "parse_mode": "HTML",
            "reply_markup": { "inline_keyboard": format::action_buttons(address) },
        });

        let method = match photo {
            Some(url) => {
                payload["photo"] = json!(url);
                payload["caption"] = json!(body);
                "sendPhoto"
            }
            None => {
                payload["text"] = json!(body);
                payload["link_preview_options"] = json!({ "is_disabled": true });
                "sendMessage"
            }
        };

        if let Some(message_id) = reply_to {
            payload["reply_parameters"] = json!({
                "message_id": message_id,
                "allow_sending_without_reply": true,
            });
        }

        (method, payload)
    }

    async fn call(&self, method: &str, payload: &Value) -> Result<i64, SendError> {
        let res = self
            .client
            .post(self.endpoint(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| SendError::Unconfirmed(anyhow!("telegram {}: {}", method, e)))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| SendError::Unconfirmed(anyhow!("telegram {} HTTP {}: {}", method, status, e)))?;
        let body: Value = serde_json::from_str(&text).map_err(|_| {
            SendError::Unconfirmed(anyhow!("telegram {} HTTP {}: {}", method, status, text))
        })?;

        if body["ok"].as_bool() == Some(false) {
            return Err(SendError::Rejected {
                method: method.to_string(),
                status,
                description: body["description"].as_str().unwrap_or("no description").to_string(),
            });
        }
        parse_message_id(&body)
            .map_err(|e| SendError::Unconfirmed(anyhow!("telegram {} HTTP {}: {}", method, status, e)))
    }

    async fn deliver(&self, snapshot: &MarketSnapshot, follow_up: Option<&FollowUp>) -> Result<i64> {
        let body = self.render(snapshot, follow_up);
        let reply_to = follow_up.and_then(|f| f.reply_to);
        let photo = self.image_for(snapshot, follow_up);

        let (method, payload) = self.build_payload(&snapshot.address, &body, photo, reply_to);
        match self.call(method, &payload).await {
            Ok(id) => Ok(id),
            Err(e) if photo.is_some() && e.allows_text_fallback() => {
                // broken image links are common, resend once as text
                warn!("⚠️ [TELEGRAM] Photo rejected, falling back to text: {}", e);
                let (method, payload) = self.build_payload(&snapshot.address, &body, None, reply_to);
                Ok(self.call(method, &payload).await?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn post(&self, snapshot: &MarketSnapshot, follow_up: Option<FollowUp>) -> Option<PostReceipt> {
        match self.deliver(snapshot, follow_up.as_ref()).await {
            Ok(message_id) => {
                match follow_up {
                    Some(f) => info!(
                        "📣 [TELEGRAM] {}x update for {} sent as message {}",
                        f.multiplier, snapshot.address, message_id
                    ),
                    None => info!("📣 [TELEGRAM] Posted {} as message {}", snapshot.address, message_id),
                }
                Some(PostReceipt {
                    initial_mcap: snapshot.mcap,
                    message_id,
                })
            }
            Err(e) => {
                error!("❌ [TELEGRAM] Failed to post {}: {:#}", snapshot.address, e);
                None
            }
        }
    }
}
