//! Telegram Bot API long-polling client.
//!
//! One task polls `getUpdates` for the lifetime of the process, classifies
//! each message into a [`TgEvent`] and routes it through the dispatcher.
//! Poll failures are logged and retried after a short pause; they never
//! propagate.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use super::api::{ApiResponse, ChatKind, File, Message, Update, User};
use super::media::MediaContainer;
use super::MessagingClient;
use crate::config::TelegramConfig;
use crate::dispatch::{Dispatcher, NamedEvent};

/// Long-poll timeout passed to `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 25;

/// Bot API failures.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with `ok: false`.
    #[error("api error: {0}")]
    Api(String),

    #[error("invalid configuration: {0}")]
    Config(&'static str),
}

/// Events the Telegram client surfaces.
#[derive(Clone, Debug)]
pub enum TgEvent {
    /// `/start` addressed to this bot.
    Start(Message),
    /// `/help` addressed to this bot.
    Help(Message),
    /// `/me <action text>`.
    Me(Message),
    /// Plain text message.
    Text(Message),
    /// A message carrying media.
    Media(Message, MediaContainer),
    Location(Message),
    Venue(Message),
    Contact(Message),
    Game(Message),
    Poll(Message),
    UsersJoined(Message),
    UserLeft(Message),
    TitleChanged(Message),
    /// Chat photo replaced; carries the largest resolution.
    PhotoChanged(Message, MediaContainer),
    PhotoDeleted(Message),
    PinnedChanged(Message),
}

impl TgEvent {
    /// Dispatch key for this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "cmd_start",
            Self::Help(_) => "cmd_help",
            Self::Me(_) => "cmd_me",
            Self::Text(_) => "text",
            Self::Media(..) => "media",
            Self::Location(_) => "location",
            Self::Venue(_) => "venue",
            Self::Contact(_) => "contact",
            Self::Game(_) => "game",
            Self::Poll(_) => "poll",
            Self::UsersJoined(_) => "users_joined",
            Self::UserLeft(_) => "user_left",
            Self::TitleChanged(_) => "ctitle_changed",
            Self::PhotoChanged(..) => "cphoto_changed",
            Self::PhotoDeleted(_) => "cphoto_deleted",
            Self::PinnedChanged(_) => "cpinned_changed",
        }
    }
}

impl NamedEvent for TgEvent {
    fn name(&self) -> &'static str {
        TgEvent::name(self)
    }
}

/// The Telegram network client.
pub struct TelegramClient {
    http: reqwest::Client,
    /// `https://api.telegram.org/bot<token>`.
    base: String,
    /// `https://api.telegram.org/file/bot<token>`.
    file_base: String,
    own_user: OnceLock<User>,
}

impl TelegramClient {
    /// Create a client from configuration. Nothing polls until
    /// [`TelegramClient::run`].
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        if config.token.is_empty() {
            return Err(TelegramError::Config("no telegram token specified"));
        }
        let http = reqwest::Client::builder()
            // Must comfortably outlast the long-poll timeout.
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 35))
            .build()?;
        Ok(Self {
            http,
            base: format!("https://api.telegram.org/bot{}", config.token),
            file_base: format!("https://api.telegram.org/file/bot{}", config.token),
            own_user: OnceLock::new(),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{}", self.base, method))
            .json(&params)
            .send()
            .await?
            .json()
            .await?;
        if response.ok {
            response
                .result
                .ok_or_else(|| TelegramError::Api("missing result".to_string()))
        } else {
            Err(TelegramError::Api(
                response.description.unwrap_or_else(|| "unknown".to_string()),
            ))
        }
    }

    /// Poll for updates forever, dispatching every recognized event.
    pub async fn run(self: Arc<Self>, dispatcher: Dispatcher<TgEvent>) {
        // Learn who we are first; command addressing needs our username.
        loop {
            match self.call::<User>("getMe", json!({})).await {
                Ok(user) => {
                    info!(id = user.id, username = ?user.username, "telegram bot identified");
                    let _ = self.own_user.set(user);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "getMe failed, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }

        info!("polling for Telegram events");
        let mut offset: i64 = 0;
        loop {
            let params = json!({ "offset": offset, "timeout": POLL_TIMEOUT_SECS });
            match self.call::<Vec<Update>>("getUpdates", params).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.message {
                            self.process(message, &dispatcher).await;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "telegram poll failed, retrying");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }

    /// Classify one message and dispatch the matching event.
    async fn process(&self, msg: Message, dispatcher: &Dispatcher<TgEvent>) {
        // Slash commands consume the message even when they end up ignored.
        if let Some(text) = msg.text.as_deref() {
            if let Some(rest) = text.strip_prefix('/') {
                let word = rest.split_whitespace().next().unwrap_or("");
                let (name, at_bot) = match word.split_once('@') {
                    Some((name, bot)) => (name, Some(bot)),
                    None => (word, None),
                };
                match name {
                    "start" => {
                        if self.addressed_to_us(&msg, at_bot) {
                            dispatcher.dispatch(TgEvent::Start(msg)).await;
                        }
                        return;
                    }
                    "help" => {
                        if self.addressed_to_us(&msg, at_bot) {
                            dispatcher.dispatch(TgEvent::Help(msg)).await;
                        }
                        return;
                    }
                    "me" => {
                        dispatcher.dispatch(TgEvent::Me(msg)).await;
                        return;
                    }
                    _ => {} // Unknown commands are forwarded as plain text.
                }
            }
        }

        if let Some(media) = MediaContainer::from_message(&msg) {
            dispatcher.dispatch(TgEvent::Media(msg, media)).await;
        } else if msg.text.is_some() {
            dispatcher.dispatch(TgEvent::Text(msg)).await;
        } else if msg.venue.is_some() {
            // Venue first: venue messages also carry a location field.
            dispatcher.dispatch(TgEvent::Venue(msg)).await;
        } else if msg.location.is_some() {
            dispatcher.dispatch(TgEvent::Location(msg)).await;
        } else if msg.contact.is_some() {
            dispatcher.dispatch(TgEvent::Contact(msg)).await;
        } else if msg.game.is_some() {
            dispatcher.dispatch(TgEvent::Game(msg)).await;
        } else if msg.poll.is_some() {
            dispatcher.dispatch(TgEvent::Poll(msg)).await;
        } else if msg.new_chat_members.is_some() {
            dispatcher.dispatch(TgEvent::UsersJoined(msg)).await;
        } else if msg.left_chat_member.is_some() {
            dispatcher.dispatch(TgEvent::UserLeft(msg)).await;
        } else if msg.new_chat_title.is_some() {
            dispatcher.dispatch(TgEvent::TitleChanged(msg)).await;
        } else if let Some(media) = msg
            .new_chat_photo
            .as_deref()
            .and_then(MediaContainer::from_photo_list)
        {
            dispatcher.dispatch(TgEvent::PhotoChanged(msg, media)).await;
        } else if msg.delete_chat_photo == Some(true) {
            dispatcher.dispatch(TgEvent::PhotoDeleted(msg)).await;
        } else if msg.pinned_message.is_some() {
            dispatcher.dispatch(TgEvent::PinnedChanged(msg)).await;
        }
    }

    /// Whether a command was meant for this bot: either sent privately or
    /// suffixed with our `@botname`.
    fn addressed_to_us(&self, msg: &Message, at_bot: Option<&str>) -> bool {
        match at_bot {
            Some(bot) => {
                self.own_user
                    .get()
                    .and_then(|u| u.username.as_deref())
                    == Some(bot)
            }
            None => msg.chat.kind == ChatKind::Private,
        }
    }
}

#[async_trait]
impl MessagingClient for TelegramClient {
    async fn send_text(
        &self,
        chat: i64,
        text: String,
        formatted: bool,
    ) -> Result<(), TelegramError> {
        let mut params = json!({ "chat_id": chat, "text": text });
        if formatted {
            params["parse_mode"] = json!("HTML");
        }
        self.call::<Message>("sendMessage", params).await?;
        Ok(())
    }

    async fn send_reply(
        &self,
        chat: i64,
        reply_to: i64,
        text: String,
    ) -> Result<(), TelegramError> {
        let params = json!({
            "chat_id": chat,
            "text": text,
            "reply_to_message_id": reply_to,
        });
        self.call::<Message>("sendMessage", params).await?;
        Ok(())
    }

    async fn fetch_media_url(&self, file_id: &str) -> Result<String, TelegramError> {
        let file: File = self
            .call("getFile", json!({ "file_id": file_id }))
            .await?;
        let path = file
            .file_path
            .ok_or_else(|| TelegramError::Api("file has no path".to_string()))?;
        Ok(format!("{}/{}", self.file_base, path))
    }

    fn own_user_id(&self) -> Option<i64> {
        self.own_user.get().map(|u| u.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TelegramClient {
        TelegramClient::new(&TelegramConfig {
            token: "123:abc".to_string(),
        })
        .unwrap()
    }

    fn group_message(text: &str) -> Message {
        serde_json::from_str(&format!(
            r#"{{"message_id": 1, "chat": {{"id": -1, "type": "group"}}, "text": "{text}"}}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_token() {
        let result = TelegramClient::new(&TelegramConfig {
            token: String::new(),
        });
        assert!(matches!(result, Err(TelegramError::Config(_))));
    }

    #[test]
    fn test_addressed_to_us() {
        let c = client();
        let _ = c.own_user.set(User {
            id: 99,
            username: Some("bridgebot".to_string()),
            first_name: "Bridge".to_string(),
            last_name: None,
        });

        let group = group_message("/help@bridgebot");
        assert!(c.addressed_to_us(&group, Some("bridgebot")));
        assert!(!c.addressed_to_us(&group, Some("otherbot")));
        // Bare command in a group is not ours; in private it is.
        assert!(!c.addressed_to_us(&group, None));
        let private: Message = serde_json::from_str(
            r#"{"message_id": 1, "chat": {"id": 5, "type": "private"}, "text": "/help"}"#,
        )
        .unwrap();
        assert!(c.addressed_to_us(&private, None));
    }

    #[test]
    fn test_file_url_shape() {
        let c = client();
        assert_eq!(c.file_base, "https://api.telegram.org/file/bot123:abc");
        assert_eq!(c.base, "https://api.telegram.org/bot123:abc");
    }

    #[test]
    fn test_event_names() {
        let msg = group_message("hi");
        assert_eq!(TgEvent::Text(msg.clone()).name(), "text");
        assert_eq!(TgEvent::Me(msg.clone()).name(), "cmd_me");
        assert_eq!(TgEvent::PinnedChanged(msg).name(), "cpinned_changed");
    }
}
