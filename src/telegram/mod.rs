//! The Telegram side of the bridge: Bot API types, long-polling client and
//! the narrow messaging seam the router consumes.

pub mod api;
mod client;
mod media;

pub use client::{TelegramClient, TelegramError, TgEvent};
pub use media::{MediaContainer, MediaKind};

use async_trait::async_trait;

/// The narrow interface the bridge router uses to talk to the messaging
/// platform. Concrete clients stay behind this seam so the router never
/// depends on transport details.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Send a message to a conversation, optionally with rich formatting.
    async fn send_text(&self, chat: i64, text: String, formatted: bool)
        -> Result<(), TelegramError>;

    /// Send a message as a reply to another message in the conversation.
    async fn send_reply(&self, chat: i64, reply_to: i64, text: String)
        -> Result<(), TelegramError>;

    /// Resolve a media id to a downloadable URL.
    async fn fetch_media_url(&self, file_id: &str) -> Result<String, TelegramError>;

    /// Our own user id, once known.
    fn own_user_id(&self) -> Option<i64>;
}
