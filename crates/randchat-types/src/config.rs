//! Global configuration types for randchat.
//!
//! `GlobalConfig` represents the top-level `config.toml` that tunes
//! matching, advertising, and referral links.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the randchat service.
///
/// Loaded from `~/.randchat/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// How many of a user's most recent partners are excluded from matching.
    #[serde(default = "default_recent_partners_limit")]
    pub recent_partners_limit: u32,

    /// Waiting time (minutes) after which the partner is told how long the
    /// seeker has been looking.
    #[serde(default = "default_long_waiting_minutes")]
    pub long_waiting_minutes: i64,

    /// Delay before a still-waiting user receives the advertising message.
    #[serde(default = "default_advertising_delay_secs")]
    pub advertising_delay_secs: u64,

    /// Pair users with no common language when nobody else is waiting.
    #[serde(default = "default_true")]
    pub language_fallback: bool,

    /// Prefix prepended to start arguments to build referral links.
    #[serde(default = "default_invite_link_prefix")]
    pub invite_link_prefix: String,

    /// Contact shown by the help command.
    #[serde(default = "default_help_contact")]
    pub help_contact: String,

    /// Address the HTTP/WebSocket surface binds to.
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_recent_partners_limit() -> u32 {
    3
}

fn default_long_waiting_minutes() -> i64 {
    10
}

fn default_advertising_delay_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_invite_link_prefix() -> String {
    "telegram.me/RandTalkBot?start=".to_string()
}

fn default_help_contact() -> String {
    "@randchat_admin".to_string()
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            recent_partners_limit: default_recent_partners_limit(),
            long_waiting_minutes: default_long_waiting_minutes(),
            advertising_delay_secs: default_advertising_delay_secs(),
            language_fallback: default_true(),
            invite_link_prefix: default_invite_link_prefix(),
            help_contact: default_help_contact(),
            server: ServerConfig::default(),
        }
    }
}

/// Bind address for `randchat serve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}
