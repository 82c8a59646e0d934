//! Configuration loading.
//!
//! The daemon reads a single TOML file with four sections: `[irc]`,
//! `[telegram]`, `[web_backend]` and `[bridge]`. Everything is plain
//! read-only data; components receive the slices they need at construction.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// IRC connection parameters.
    pub irc: IrcConfig,
    /// Telegram Bot API parameters.
    pub telegram: TelegramConfig,
    /// Media forwarding backend.
    pub web_backend: WebBackendConfig,
    /// Link set and feature toggles.
    pub bridge: BridgeConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// IRC server and identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IrcConfig {
    /// Server hostname.
    pub server: String,
    /// Server port.
    #[serde(default = "default_irc_port")]
    pub port: u16,
    /// Connect with TLS.
    #[serde(default)]
    pub ssl: bool,
    /// Validate the server certificate (only meaningful with `ssl`).
    #[serde(default = "default_true")]
    pub ssl_verify: bool,
    /// Prefer IPv6 when resolving the server.
    #[serde(default = "default_true")]
    pub ipv6: bool,
    /// Nickname to register with.
    pub nick: String,
    /// Username (ident); defaults to the nickname.
    pub username: Option<String>,
    /// Real name / GECOS.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Server password (PASS).
    pub password: Option<String>,
    /// NickServ password to identify with after registration.
    pub nickpassword: Option<String>,
    /// TCP keepalive probe interval in seconds.
    #[serde(default = "default_keepalive")]
    pub keepalive_interval: u64,
}

fn default_irc_port() -> u16 {
    6667
}

fn default_true() -> bool {
    true
}

fn default_realname() -> String {
    "tgbridged (IRC)".to_string()
}

fn default_keepalive() -> u64 {
    30
}

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: String,
}

/// Media forwarding backend configuration.
///
/// `external` writes downloaded files into a directory served by an external
/// web server; `stub` disables forwarding and yields placeholder links.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WebBackendConfig {
    /// Files land in `webpath` and are linked as `baseurl/<name>`.
    External {
        /// Directory served by the external web server.
        webpath: PathBuf,
        /// Public URL prefix for that directory.
        baseurl: String,
        /// Spread files over single-letter subdirectories.
        #[serde(default)]
        use_subdirs: bool,
    },
    /// No media forwarding.
    Stub,
}

/// Bridge link set and feature toggles.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Conversation pairings, unique on each side.
    pub links: Vec<LinkConfig>,
    /// Feature toggles.
    #[serde(default)]
    pub options: BridgeOptions,
    /// Telegram user ids whose messages are never forwarded.
    #[serde(default)]
    pub telegram_ignore_users: Vec<i64>,
}

/// One Telegram-chat / IRC-channel pairing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LinkConfig {
    /// Telegram chat id.
    pub telegram: i64,
    /// IRC channel name.
    pub irc: String,
}

/// Per-feature toggles for the bridge router.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BridgeOptions {
    /// Render IRC nicks in bold on Telegram.
    pub telegram_bold_nicks: bool,
    /// Forward IRC joins/parts to Telegram.
    pub telegram_show_joins: bool,
    /// IRC color codes used for Telegram nicks; an empty list disables
    /// coloring, absent uses the default palette.
    pub irc_nick_colors: Option<Vec<u8>>,
    /// Forward Telegram membership changes to IRC.
    pub irc_show_added_users: bool,
    /// Include sticker dimensions in media descriptions.
    pub forward_sticker_dimensions: bool,
    /// Include the sticker emoji in media descriptions.
    pub forward_sticker_emoji: bool,
    /// Include document mime types in media descriptions.
    pub forward_document_mime: bool,
    /// Include performer/title metadata for audio.
    pub forward_audio_description: bool,
    /// Convert IRC control codes to Telegram HTML.
    pub forward_text_formatting_irc: bool,
    /// Convert Telegram entities to IRC control codes.
    pub forward_text_formatting_telegram: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            telegram_bold_nicks: true,
            telegram_show_joins: false,
            irc_nick_colors: None,
            irc_show_added_users: true,
            forward_sticker_dimensions: false,
            forward_sticker_emoji: true,
            forward_document_mime: true,
            forward_audio_description: true,
            forward_text_formatting_irc: true,
            forward_text_formatting_telegram: true,
        }
    }
}
