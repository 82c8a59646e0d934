//! Telegram Bot API wire types.
//!
//! Only the subset the bridge consumes; unknown fields are ignored by serde.
//! Entity offsets and lengths are in UTF-16 code units, exactly as the Bot
//! API delivers them.

use serde::Deserialize;

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// One long-poll update.
#[derive(Clone, Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

/// A Telegram user.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    /// Always present in the API; an empty string marks a deleted account.
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    /// Placeholder user carrying only a username, for `@mention` entities.
    pub fn from_username(name: &str) -> Self {
        Self {
            id: 0,
            username: Some(name.to_string()),
            first_name: String::new(),
            last_name: None,
        }
    }
}

/// Chat classification.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// A chat.
#[derive(Clone, Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
}

/// Rich-text annotation kinds.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// `@username` written in the text.
    Mention,
    Bold,
    Italic,
    Underline,
    Code,
    Pre,
    /// A mention of a user without a username; carries a `user` payload.
    TextMention,
    /// Clickable text; carries a `url` payload.
    TextLink,
    /// Anything this bridge renders as plain text.
    #[serde(other)]
    Other,
}

/// A rich-text annotation over a span of message text.
///
/// `offset` and `length` count UTF-16 code units: codepoints outside the
/// basic plane occupy two units.
#[derive(Clone, Debug, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

/// One resolution of a photo.
#[derive(Clone, Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Audio {
    pub file_id: String,
    pub duration: u64,
    #[serde(default)]
    pub performer: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Animation {
    pub file_id: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Sticker {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub is_animated: bool,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub duration: u64,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VideoNote {
    pub file_id: String,
    pub length: u32,
    pub duration: u64,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Voice {
    pub file_id: String,
    pub duration: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Venue {
    pub title: String,
    pub address: String,
    #[serde(default)]
    pub foursquare_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Contact {
    pub phone_number: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Game {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub voter_count: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Poll {
    pub question: String,
    pub options: Vec<PollOption>,
    pub total_voter_count: u64,
    pub is_closed: bool,
    pub is_anonymous: bool,
    /// "regular" or "quiz".
    #[serde(rename = "type")]
    pub kind: String,
    pub allows_multiple_answers: bool,
}

/// Handle for downloading a file.
#[derive(Clone, Debug, Deserialize)]
pub struct File {
    #[serde(default)]
    pub file_path: Option<String>,
}

/// A message, covering text, media, service events and their metadata.
#[derive(Clone, Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Option<Vec<MessageEntity>>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub caption_entities: Option<Vec<MessageEntity>>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,
    #[serde(default)]
    pub forward_from: Option<User>,
    #[serde(default)]
    pub forward_from_chat: Option<Chat>,
    #[serde(default)]
    pub forward_sender_name: Option<String>,
    #[serde(default)]
    pub via_bot: Option<User>,

    #[serde(default)]
    pub audio: Option<Audio>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub animation: Option<Animation>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub sticker: Option<Sticker>,
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default)]
    pub video_note: Option<VideoNote>,
    #[serde(default)]
    pub voice: Option<Voice>,

    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub game: Option<Game>,
    #[serde(default)]
    pub poll: Option<Poll>,

    #[serde(default)]
    pub new_chat_members: Option<Vec<User>>,
    #[serde(default)]
    pub left_chat_member: Option<User>,
    #[serde(default)]
    pub new_chat_title: Option<String>,
    #[serde(default)]
    pub new_chat_photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub delete_chat_photo: Option<bool>,
    #[serde(default)]
    pub pinned_message: Option<Box<Message>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_text_update() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 42,
                "message": {
                    "message_id": 7,
                    "from": {"id": 1, "first_name": "Alice", "username": "alice"},
                    "chat": {"id": -100123, "type": "supergroup", "title": "Chan"},
                    "text": "hello @bob",
                    "entities": [{"type": "mention", "offset": 6, "length": 4}]
                }
            }"#,
        )
        .unwrap();

        assert_eq!(update.update_id, 42);
        let message = update.message.unwrap();
        assert_eq!(message.chat.kind, ChatKind::Supergroup);
        assert_eq!(message.text.as_deref(), Some("hello @bob"));
        let entities = message.entities.unwrap();
        assert_eq!(entities[0].kind, EntityKind::Mention);
        assert_eq!(entities[0].offset, 6);
    }

    #[test]
    fn test_unknown_entity_kind_maps_to_other() {
        let entity: MessageEntity = serde_json::from_str(
            r#"{"type": "spoiler", "offset": 0, "length": 3}"#,
        )
        .unwrap();
        assert_eq!(entity.kind, EntityKind::Other);
    }

    #[test]
    fn test_deserialize_api_error() {
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok": false, "description": "Unauthorized"}"#,
        )
        .unwrap();
        assert!(!response.ok);
        assert_eq!(response.description.as_deref(), Some("Unauthorized"));
        assert!(response.result.is_none());
    }
}
