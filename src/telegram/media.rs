//! Media extraction: distills a message's media payload into one container.

use super::api::{Message, PhotoSize};

/// What kind of media a message carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Animation,
    Document,
    Photo,
    Sticker,
    Video,
    VideoNote,
    Voice,
}

/// A media payload reduced to the fields the bridge renders.
#[derive(Clone, Debug)]
pub struct MediaContainer {
    pub kind: MediaKind,
    pub file_id: String,
    pub file_size: Option<u64>,
    /// Width and height, where the kind has them.
    pub dimensions: Option<(u32, u32)>,
    /// Playback length in seconds.
    pub duration: Option<u64>,
    pub mime: Option<String>,
    /// Combined performer/title for audio.
    pub desc: Option<String>,
    pub emoji: Option<String>,
    pub animated: bool,
    pub filename: Option<String>,
}

impl MediaContainer {
    /// Extract the media payload of a message, if any.
    pub fn from_message(msg: &Message) -> Option<Self> {
        if let Some(ref audio) = msg.audio {
            let desc = match (audio.performer.as_deref(), audio.title.as_deref()) {
                (None, None) => None,
                (Some(performer), None) => Some(performer.to_string()),
                (None, Some(title)) => Some(title.to_string()),
                (Some(performer), Some(title)) => Some(format!("{performer} \u{2013} {title}")),
            };
            Some(Self {
                kind: MediaKind::Audio,
                file_id: audio.file_id.clone(),
                file_size: audio.file_size,
                dimensions: None,
                duration: Some(audio.duration),
                mime: audio.mime_type.clone(),
                desc,
                emoji: None,
                animated: false,
                filename: None,
            })
        } else if let Some(ref animation) = msg.animation {
            Some(Self {
                kind: MediaKind::Animation,
                file_id: animation.file_id.clone(),
                file_size: animation.file_size,
                dimensions: None,
                duration: None,
                mime: animation.mime_type.clone(),
                desc: None,
                emoji: None,
                animated: false,
                filename: None,
            })
        } else if let Some(ref document) = msg.document {
            Some(Self {
                kind: MediaKind::Document,
                file_id: document.file_id.clone(),
                file_size: document.file_size,
                dimensions: None,
                duration: None,
                mime: document.mime_type.clone(),
                desc: None,
                emoji: None,
                animated: false,
                filename: document.file_name.clone(),
            })
        } else if let Some(ref photos) = msg.photo {
            Self::from_photo_list(photos)
        } else if let Some(ref sticker) = msg.sticker {
            Some(Self {
                kind: MediaKind::Sticker,
                file_id: sticker.file_id.clone(),
                file_size: sticker.file_size,
                dimensions: Some((sticker.width, sticker.height)),
                duration: None,
                mime: None,
                desc: None,
                emoji: sticker.emoji.clone(),
                animated: sticker.is_animated,
                filename: None,
            })
        } else if let Some(ref video) = msg.video {
            Some(Self {
                kind: MediaKind::Video,
                file_id: video.file_id.clone(),
                file_size: video.file_size,
                dimensions: Some((video.width, video.height)),
                duration: Some(video.duration),
                mime: None,
                desc: None,
                emoji: None,
                animated: false,
                filename: None,
            })
        } else if let Some(ref note) = msg.video_note {
            Some(Self {
                kind: MediaKind::VideoNote,
                file_id: note.file_id.clone(),
                file_size: note.file_size,
                dimensions: Some((note.length, note.length)),
                duration: Some(note.duration),
                mime: None,
                desc: None,
                emoji: None,
                animated: false,
                filename: None,
            })
        } else if let Some(ref voice) = msg.voice {
            Some(Self {
                kind: MediaKind::Voice,
                file_id: voice.file_id.clone(),
                file_size: voice.file_size,
                dimensions: None,
                duration: Some(voice.duration),
                mime: voice.mime_type.clone(),
                desc: None,
                emoji: None,
                animated: false,
                filename: None,
            })
        } else {
            None
        }
    }

    /// Pick the largest resolution from a photo list.
    pub fn from_photo_list(photos: &[PhotoSize]) -> Option<Self> {
        let best = photos.iter().max_by_key(|p| p.width * p.height)?;
        Some(Self {
            kind: MediaKind::Photo,
            file_id: best.file_id.clone(),
            file_size: best.file_size,
            dimensions: Some((best.width, best.height)),
            duration: None,
            mime: None,
            desc: None,
            emoji: None,
            animated: false,
            filename: None,
        })
    }

    /// Preferred filename extension for the served copy.
    pub fn extension(&self) -> Option<&str> {
        match self.kind {
            MediaKind::Photo => Some("jpg"),
            MediaKind::Sticker => Some("webp"),
            MediaKind::Voice => Some("ogg"),
            MediaKind::Video | MediaKind::VideoNote => Some("mp4"),
            MediaKind::Animation => match self.mime.as_deref() {
                Some("image/gif") => Some("gif"),
                _ => Some("mp4"),
            },
            MediaKind::Audio => match self.mime.as_deref() {
                Some("audio/mpeg") => Some("mp3"),
                Some("audio/ogg") => Some("ogg"),
                Some("audio/flac") => Some("flac"),
                _ => None,
            },
            MediaKind::Document => self
                .filename
                .as_deref()
                .and_then(|name| name.rsplit_once('.'))
                .map(|(_, ext)| ext),
        }
    }
}
