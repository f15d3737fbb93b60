//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the notebook server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Signed session cookie settings.
    pub session: SessionConfig,

    /// One-shot flash/validation cookie settings.
    pub flash: FlashConfig,

    /// Locale resolution and message catalogs.
    pub i18n: I18nConfig,

    /// Response compression.
    pub compression: CompressionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub email: EmailConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Hard ceiling for a whole request/response exchange, in seconds.
    pub request_secs: u64,

    /// Deadline for a single handler invocation, in milliseconds.
    pub handler_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            handler_ms: 10_000,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session cookie.
    pub cookie_name: String,

    /// HMAC secret. Empty means "generate a random one at startup".
    pub secret: String,

    /// Lifetime of a persisted session in seconds, refreshed on every response.
    pub max_age_secs: u64,

    /// Mark cookies `Secure`.
    pub secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "NOTEBOOK_SESSION".to_string(),
            secret: String::new(),
            max_age_secs: 7 * 24 * 3600,
            secure: false,
        }
    }
}

/// Flash/validation cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FlashConfig {
    pub cookie_name: String,
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            cookie_name: "NOTEBOOK_FLASH".to_string(),
        }
    }
}

/// Locale resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct I18nConfig {
    /// Locale used when neither override nor header yields a supported one.
    pub default_locale: String,

    /// Supported locales, in server preference order.
    pub supported: Vec<String>,

    /// Cookie carrying an explicit locale override.
    pub cookie_name: String,

    /// Query parameter carrying an explicit locale override.
    pub query_param: String,

    /// Optional directory of `<locale>.toml` message files.
    pub messages_dir: Option<String>,
}

impl Default for I18nConfig {
    fn default() -> Self {
        Self {
            default_locale: "en-us".to_string(),
            supported: vec!["en-us".to_string(), "fr-fr".to_string()],
            cookie_name: "NOTEBOOK_LANG".to_string(),
            query_param: "lang".to_string(),
            messages_dir: None,
        }
    }
}

/// Response compression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Enable response compression.
    pub enabled: bool,

    /// Offered encodings in server preference order ("gzip", "deflate").
    pub encodings: Vec<String>,

    /// Bodies shorter than this are sent as-is.
    pub min_size: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            encodings: vec!["gzip".to_string(), "deflate".to_string()],
            min_size: 256,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Outbound email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Sender address.
    pub from: String,

    /// Recipient of suggestion notifications. Empty disables them.
    pub admin_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: "noreply@notebook.local".to_string(),
            admin_address: String::new(),
        }
    }
}

/// Account seed for the in-memory auth store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    pub user_id: String,
    pub email: String,
    /// Plain password, hashed when the store is built.
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub users: Vec<UserConfig>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // WARNING: Development account. Replace it in production.
            users: vec![UserConfig {
                user_id: "admin".to_string(),
                email: "admin".to_string(),
                password: "abc123".to_string(),
            }],
        }
    }
}
