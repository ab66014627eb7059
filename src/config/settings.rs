//! Runtime configuration loader and common helpers.

use std::{fmt, fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Context, Result};

pub const DEFAULT_DISCOVERY_URL: &str =
    "https://solana-gateway.moralis.io/token/mainnet/exchange/pumpfun/graduated?limit=100";
pub const DEFAULT_MARKET_DATA_URL: &str = "https://api.dexscreener.com/latest/dex/tokens";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_STORE_PATH: &str = "posted_tokens.json";

/// ------------------------------------------------------------------
/// Formatting policies
/// ------------------------------------------------------------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum UpdateStyle {
    /// Full token card with a multiplier line appended.
    #[default]
    Annotated,
    /// Short "before → after" line.
    Condensed,
}

impl UpdateStyle {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "annotated" => Ok(Self::Annotated),
            "condensed" => Ok(Self::Condensed),
            other => Err(anyhow!("unknown update style `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// Photo only on the first post of a token.
    #[default]
    InitialOnly,
    /// Milestone replies reuse the token image as well.
    Always,
}

impl ImagePolicy {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "initial_only" | "initial" => Ok(Self::InitialOnly),
            "always" => Ok(Self::Always),
            other => Err(anyhow!("unknown image policy `{other}`")),
        }
    }
}

/// Market-cap window a new token has to sit in, in USD.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct McapBounds {
    pub min: f64,
    /// `None` means no upper limit.
    pub max: Option<f64>,
}

impl Default for McapBounds {
    fn default() -> Self {
        Self {
            min: 50_000.0,
            max: Some(350_000.0),
        }
    }
}

/// ------------------------------------------------------------------
/// Main Settings object, built once and shared read-only
/// ------------------------------------------------------------------
#[derive(Clone)]
pub struct Settings {
    /* -------- telegram ------------------------------ */
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub telegram_api_url: String,

    /* -------- upstream APIs ------------------------- */
    pub discovery_api_key: String,
    pub discovery_url: String,
    pub market_data_url: String,
    pub http_timeout: Duration,

    /* -------- selection ----------------------------- */
    pub bounds: McapBounds,
    pub recent_window: Option<chrono::Duration>,

    /* -------- persistence --------------------------- */
    pub store_path: PathBuf,
    pub retention: chrono::Duration,

    /* -------- formatting ---------------------------- */
    pub update_style: UpdateStyle,
    pub image_policy: ImagePolicy,

    /* -------- cross-posting ------------------------- */
    pub crosspost_webhook_url: Option<String>,
}

impl Settings {
    /// --------------------------------------------------------------
    /// Read configuration from the process environment.
    /// --------------------------------------------------------------
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// --------------------------------------------------------------
    /// Build settings from any key → value source using the
    /// upper-case environment names.
    /// --------------------------------------------------------------
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| anyhow!("missing required setting {key}"));

        let telegram_bot_token = require("TELEGRAM_BOT_TOKEN")?;
        let telegram_chat_id = require("TELEGRAM_CHANNEL_ID")?;
        let discovery_api_key = require("MORALIS_API_KEY")?;

        let min_mcap = match get("MIN_MCAP") {
            Some(raw) => parse_number("MIN_MCAP", &raw)?,
            None => McapBounds::default().min,
        };
        let max_mcap = match get("MAX_MCAP") {
            Some(raw) => parse_max_mcap(&raw)?,
            None => McapBounds::default().max,
        };
        let retention_days = match get("RETENTION_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .with_context(|| format!("parsing RETENTION_DAYS `{raw}`"))?,
            None => 7,
        };
        let recent_window_minutes = get("RECENT_WINDOW_MINUTES")
            .map(|raw| {
                raw.parse::<i64>()
                    .with_context(|| format!("parsing RECENT_WINDOW_MINUTES `{raw}`"))
            })
            .transpose()?;
        let http_timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("parsing HTTP_TIMEOUT_SECS `{raw}`"))?,
            None => 20,
        };
        let update_style = get("UPDATE_STYLE")
            .map(|raw| UpdateStyle::parse(&raw))
            .transpose()?
            .unwrap_or_default();
        let image_policy = get("MILESTONE_IMAGES")
            .map(|raw| ImagePolicy::parse(&raw))
            .transpose()?
            .unwrap_or_default();

        let settings = Self {
            telegram_bot_token,
            telegram_chat_id,
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            discovery_api_key,
            discovery_url: get("DISCOVERY_URL").unwrap_or_else(|| DEFAULT_DISCOVERY_URL.to_string()),
            market_data_url: get("MARKET_DATA_URL")
                .unwrap_or_else(|| DEFAULT_MARKET_DATA_URL.to_string()),
            http_timeout: Duration::from_secs(http_timeout_secs),
            bounds: McapBounds {
                min: min_mcap,
                max: max_mcap,
            },
            recent_window: recent_window_minutes
                .map(|m| minutes("RECENT_WINDOW_MINUTES", m))
                .transpose()?,
            store_path: get("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            retention: days("RETENTION_DAYS", retention_days)?,
            update_style,
            image_policy,
            crosspost_webhook_url: get("CROSSPOST_WEBHOOK_URL"),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// --------------------------------------------------------------
    /// Read a `settings.json` file from disk. Keys are the snake_case
    /// versions of the environment names.
    /// --------------------------------------------------------------
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("reading settings file {:?}", path.as_ref()))?;
        let json: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing settings file {:?}", path.as_ref()))?;

        /* -------- plain strings ---------------------------------- */
        let text = |key: &str| {
            json[key]
                .as_str()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        let telegram_bot_token = text("telegram_bot_token").unwrap_or_default();
        // channel ids are commonly written as numbers
        let telegram_chat_id = json["telegram_channel_id"]
            .as_i64()
            .map(|id| id.to_string())
            .or_else(|| text("telegram_channel_id"))
            .unwrap_or_default();
        let discovery_api_key = text("moralis_api_key").unwrap_or_default();

        /* -------- numeric parameters ----------------------------- */
        let defaults = McapBounds::default();
        let min_mcap = json["min_mcap"].as_f64().unwrap_or(defaults.min);
        let max_mcap = match &json["max_mcap"] {
            serde_json::Value::Null => defaults.max,
            serde_json::Value::String(raw) => parse_max_mcap(raw)?,
            other => Some(
                other
                    .as_f64()
                    .ok_or_else(|| anyhow!("max_mcap must be a number or \"none\""))?,
            ),
        };
        let retention_days = json["retention_days"].as_i64().unwrap_or(7);
        let recent_window = json["recent_window_minutes"]
            .as_i64()
            .map(|m| minutes("recent_window_minutes", m))
            .transpose()?;
        let http_timeout = Duration::from_secs(json["http_timeout_secs"].as_u64().unwrap_or(20));

        /* -------- policies --------------------------------------- */
        let update_style = text("update_style")
            .map(|raw| UpdateStyle::parse(&raw))
            .transpose()?
            .unwrap_or_default();
        let image_policy = text("milestone_images")
            .map(|raw| ImagePolicy::parse(&raw))
            .transpose()?
            .unwrap_or_default();

        let settings = Self {
            telegram_bot_token,
            telegram_chat_id,
            telegram_api_url: text("telegram_api_url")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            discovery_api_key,
            discovery_url: text("discovery_url").unwrap_or_else(|| DEFAULT_DISCOVERY_URL.to_string()),
            market_data_url: text("market_data_url")
                .unwrap_or_else(|| DEFAULT_MARKET_DATA_URL.to_string()),
            http_timeout,
            bounds: McapBounds {
                min: min_mcap,
                max: max_mcap,
            },
            recent_window,
            store_path: text("store_path")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH)),
            retention: days("retention_days", retention_days)?,
            update_style,
            image_policy,
            crosspost_webhook_url: text("crosspost_webhook_url"),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.telegram_bot_token.is_empty() {
            bail!("telegram bot token is required");
        }
        if self.telegram_chat_id.is_empty() {
            bail!("telegram channel id is required");
        }
        if self.discovery_api_key.is_empty() {
            bail!("discovery API key is required");
        }
        if !self.bounds.min.is_finite() || self.bounds.min < 0.0 {
            bail!("min mcap must be a non-negative number, got {}", self.bounds.min);
        }
        if let Some(max) = self.bounds.max {
            if !(max >= self.bounds.min) {
                bail!("max mcap {} is below min mcap {}", max, self.bounds.min);
            }
        }
        if self.http_timeout.is_zero() {
            bail!("HTTP timeout must be at least one second");
        }
        let now = chrono::Utc::now();
        if self.retention <= chrono::Duration::zero() {
            bail!("retention window must be positive");
        }
        if now.checked_sub_signed(self.retention).is_none() {
            bail!("retention window {} is out of range", self.retention);
        }
        if let Some(window) = self.recent_window {
            if window <= chrono::Duration::zero() {
                bail!("recent window must be positive");
            }
            if now.checked_sub_signed(window).is_none() {
                bail!("recent window {} is out of range", window);
            }
        }
        Ok(())
    }
}

fn parse_number(key: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .with_context(|| format!("parsing {key} `{raw}`"))
}

fn days(key: &str, n: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_days(n).ok_or_else(|| anyhow!("{key} `{n}` is out of range"))
}

fn minutes(key: &str, n: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_minutes(n).ok_or_else(|| anyhow!("{key} `{n}` is out of range"))
}

fn parse_max_mcap(raw: &str) -> Result<Option<f64>> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "none" | "unbounded" | "inf" => Ok(None),
        other => parse_number("MAX_MCAP", other).map(Some),
    }
}

/* ------------------------------------------------------------------ */
/*  Manual Debug implementation (credentials stay out of the logs)     */
/* ------------------------------------------------------------------ */
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("discovery_url", &self.discovery_url)
            .field("market_data_url", &self.market_data_url)
            .field("bounds", &self.bounds)
            .field("recent_window", &self.recent_window)
            .field("store_path", &self.store_path)
            .field("retention", &self.retention)
            .field("update_style", &self.update_style)
            .field("image_policy", &self.image_policy)
            .field("crosspost", &self.crosspost_webhook_url.is_some())
            .finish_non_exhaustive()
    }
}
