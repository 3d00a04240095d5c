//! Configuration management for PaperDesk services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Provider variables (OPENAI_API_KEY, OPENAI_BASE_URL, OPENAI_MODEL)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Redis configuration (tag cache falls back to memory when absent)
    #[serde(default)]
    pub redis: Option<RedisConfig>,

    /// Remote language-model configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Tag extraction tuning
    #[serde(default)]
    pub tagging: TaggingConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Stored file locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL
    pub url: String,

    /// Key prefix for namespacing
    #[serde(default = "default_redis_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    /// Bearer credential; tag extraction falls back to keywords without it
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Chat model
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_openai_timeout")]
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// The configured credential, treating blank values as absent
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Tuning constants for tag extraction
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TaggingConfig {
    /// Maximum tags kept from a remote response
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,

    /// Maximum keywords produced by the local fallback
    #[serde(default = "default_fallback_max_tags")]
    pub fallback_max_tags: usize,

    /// Remote candidates at or below this many characters are dropped
    #[serde(default = "default_min_tag_len")]
    pub min_tag_len: usize,

    /// Fallback keywords at or below this many characters are dropped
    #[serde(default = "default_min_keyword_len")]
    pub min_keyword_len: usize,

    /// How long a successful remote response stays cached
    #[serde(default = "default_tag_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Completion token budget
    #[serde(default = "default_tag_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_tag_temperature")]
    pub temperature: f32,

    /// Words never produced by the fallback
    #[serde(default = "default_stop_words")]
    pub stop_words: Vec<String>,
}

impl AuthConfig {
    /// The configured signing secret, treating blank values as absent
    pub fn secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

impl TaggingConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT secret for token signing. Required; there is no default.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// JWT expiration in seconds
    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for paper files
    #[serde(default = "default_public_root")]
    pub public_root: String,

    /// Root directory for export artifacts
    #[serde(default = "default_private_root")]
    pub private_root: String,

    /// Export rows older than this are pruned
    #[serde(default = "default_export_retention")]
    pub export_retention_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second (process wide)
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 60 }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_redis_prefix() -> String { "paperdesk".to_string() }
fn default_openai_base_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_openai_model() -> String { "gpt-3.5-turbo".to_string() }
fn default_openai_timeout() -> u64 { 30 }
fn default_max_tags() -> usize { 10 }
fn default_fallback_max_tags() -> usize { 8 }
fn default_min_tag_len() -> usize { 1 }
fn default_min_keyword_len() -> usize { 3 }
fn default_tag_cache_ttl() -> u64 { 3600 }
fn default_tag_max_tokens() -> u32 { 150 }
fn default_tag_temperature() -> f32 { 0.3 }
fn default_jwt_expiration() -> u64 { 8 * 3600 }
fn default_public_root() -> String { "storage/public".to_string() }
fn default_private_root() -> String { "storage/private".to_string() }
fn default_export_retention() -> u64 { 3600 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_rate_limit() -> u32 { 50 }
fn default_burst() -> u32 { 100 }
fn default_enabled() -> bool { true }

/// Function words dropped by the keyword fallback
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for",
    "of", "with", "by", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "could",
    "should", "may", "might", "can", "this", "that", "these", "those",
    "from", "into", "through", "during", "before", "after", "above",
    "below", "between", "among", "within", "without", "against", "toward",
    "towards", "upon", "about", "over", "under", "across", "behind",
    "beneath", "beside", "beyond", "inside", "outside", "underneath",
];

fn default_stop_words() -> Vec<String> {
    DEFAULT_STOP_WORDS.iter().map(|w| w.to_string()).collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            timeout_secs: default_openai_timeout(),
        }
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            max_tags: default_max_tags(),
            fallback_max_tags: default_fallback_max_tags(),
            min_tag_len: default_min_tag_len(),
            min_keyword_len: default_min_keyword_len(),
            cache_ttl_secs: default_tag_cache_ttl(),
            max_tokens: default_tag_max_tokens(),
            temperature: default_tag_temperature(),
            stop_words: default_stop_words(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_root: default_public_root(),
            private_root: default_private_root(),
            export_retention_secs: default_export_retention(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            // Provider variables win over everything else
            .set_override_option("openai.api_key", std::env::var("OPENAI_API_KEY").ok())?
            .set_override_option("openai.base_url", std::env::var("OPENAI_BASE_URL").ok())?
            .set_override_option("openai.model", std::env::var("OPENAI_MODEL").ok())?

            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "postgres://localhost/paperdesk".to_string(),
                max_connections: default_max_connections(),
                min_connections: default_min_connections(),
                connect_timeout_secs: default_connect_timeout(),
                idle_timeout_secs: default_idle_timeout(),
            },
            redis: None,
            openai: OpenAiConfig::default(),
            tagging: TaggingConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.openai.model, "gpt-3.5-turbo");
        assert_eq!(config.openai.base_url, "https://api.openai.com/v1");
        assert!(config.redis.is_none());
    }

    #[test]
    fn test_tagging_defaults() {
        let tagging = TaggingConfig::default();
        assert_eq!(tagging.max_tags, 10);
        assert_eq!(tagging.fallback_max_tags, 8);
        assert_eq!(tagging.cache_ttl(), Duration::from_secs(3600));
        assert!(tagging.stop_words.iter().any(|w| w == "between"));
    }

    #[test]
    fn test_jwt_secret_has_no_default() {
        let mut auth = AuthConfig::default();
        assert_eq!(auth.secret(), None);

        auth.jwt_secret = Some("  ".into());
        assert_eq!(auth.secret(), None);

        auth.jwt_secret = Some("a-long-random-secret".into());
        assert_eq!(auth.secret(), Some("a-long-random-secret"));
    }

    #[test]
    fn test_blank_credential_is_absent() {
        let mut openai = OpenAiConfig::default();
        assert_eq!(openai.credential(), None);

        openai.api_key = Some("   ".into());
        assert_eq!(openai.credential(), None);

        openai.api_key = Some("sk-test".into());
        assert_eq!(openai.credential(), Some("sk-test"));
    }
}
