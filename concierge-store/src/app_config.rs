use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
    pub quotes: QuotesConfig,
    pub insights: InsightsConfig,
    pub search: SearchConfig,
    pub analytics: AnalyticsConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { url: None, max_connections: 5 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RedisConfig {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true, ttl_hours: 24 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours as i64)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 600,
            timeout_ms: 30_000,
        }
    }
}

/// What the quote adapter does when the provider cannot answer
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Serve deterministic mock offers
    #[default]
    Fallback,
    /// Surface the provider failure to the caller
    Strict,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QuotesConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub country: String,
    pub timeout_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://partners.api.skyscanner.net/apiservices/browsequotes/v1.0".to_string(),
            country: "US".to_string(),
            timeout_ms: 10_000,
            failure_policy: FailurePolicy::Fallback,
        }
    }
}

/// Whether enrichment is awaited inside the search response or polled later
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum InsightMode {
    #[default]
    Deferred,
    Inline,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InsightsConfig {
    pub enabled: bool,
    pub mode: InsightMode,
    /// Results kept by the in-memory store when no database is configured
    pub memory_capacity: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self { enabled: true, mode: InsightMode::Deferred, memory_capacity: 1000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_currency: String,
    pub default_locale: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
            default_locale: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    /// Records kept by the in-memory sink when no database is configured
    pub memory_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self { enabled: true, memory_capacity: 1000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u64,
    pub window_seconds: u64,
    /// Peer addresses whose `X-Forwarded-For` header is believed
    pub trusted_proxies: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 100,
            window_seconds: 3600,
            trusted_proxies: Vec::new(),
        }
    }
}

const PLACEHOLDER_KEYS: &[&str] = &["your_openai_api_key_here", "your_skyscanner_api_key_here"];

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `CONCIERGE_LLM__API_KEY=sk-...` sets `llm.api_key`
            .add_source(
                config::Environment::with_prefix("CONCIERGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Config = s.try_deserialize()?;
        config.apply_legacy_env(|name| env::var(name).ok());
        Ok(config)
    }

    /// Fill unset credentials from the unprefixed variables older deployments use,
    /// then drop blank or placeholder values.
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fill(&mut self.llm.api_key, lookup("OPENAI_API_KEY"));
        fill(&mut self.quotes.api_key, lookup("SKYSCANNER_API_KEY"));
        fill(&mut self.database.url, lookup("DATABASE_URL"));
        fill(&mut self.redis.url, lookup("REDIS_URL"));

        scrub(&mut self.llm.api_key);
        scrub(&mut self.quotes.api_key);
        scrub(&mut self.database.url);
        scrub(&mut self.redis.url);
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn scrub(slot: &mut Option<String>) {
    let keep = match slot.as_deref().map(str::trim) {
        Some(v) => !v.is_empty() && !PLACEHOLDER_KEYS.contains(&v),
        None => false,
    };
    if !keep {
        *slot = None;
    }
}
