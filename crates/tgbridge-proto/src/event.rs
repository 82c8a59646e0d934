//! Typed session event payloads.
//!
//! One record type per event kind, each carrying only the fields that kind
//! defines. The session machine produces these; the application's dispatcher
//! routes them by [`SessionEvent::name`].

/// The identity a line originated from: nickname plus `user@host` mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    /// Nickname part of the prefix.
    pub nick: String,
    /// The `user@host` mask, empty for server origins.
    pub mask: String,
}

impl Source {
    /// Parse a `nick!user@host` prefix. Server names (no `!`) yield an empty
    /// mask; an absent prefix yields an empty source.
    pub fn from_prefix(prefix: Option<&str>) -> Source {
        match prefix {
            Some(p) => match p.split_once('!') {
                Some((nick, mask)) => Source {
                    nick: nick.to_string(),
                    mask: mask.to_string(),
                },
                None => Source {
                    nick: p.to_string(),
                    mask: String::new(),
                },
            },
            None => Source {
                nick: String::new(),
                mask: String::new(),
            },
        }
    }
}

/// A channel or private message (also used for emotes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    /// Who sent it.
    pub source: Source,
    /// Channel name or our own nickname for private messages.
    pub target: String,
    /// Message text.
    pub text: String,
}

impl MessageEvent {
    /// The target, but only when it names a channel.
    pub fn channel(&self) -> Option<&str> {
        self.target.starts_with('#').then_some(self.target.as_str())
    }
}

/// Someone joined a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinEvent {
    /// Who joined.
    pub source: Source,
    /// The channel.
    pub channel: String,
}

/// Someone left a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartEvent {
    /// Who left.
    pub source: Source,
    /// The channel.
    pub channel: String,
    /// Optional part reason.
    pub reason: Option<String>,
}

/// Someone was kicked from a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KickEvent {
    /// Who did the kicking.
    pub source: Source,
    /// The channel.
    pub channel: String,
    /// The nick that was kicked.
    pub kicked: String,
    /// Optional kick reason.
    pub reason: Option<String>,
}

/// Events the session machine surfaces to the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Registration completed (welcome reply received).
    Connected,
    /// A PRIVMSG.
    Message(MessageEvent),
    /// A CTCP ACTION emote.
    Action(MessageEvent),
    /// A JOIN by someone else.
    Join(JoinEvent),
    /// A PART.
    Part(PartEvent),
    /// A KICK of someone else.
    Kick(KickEvent),
}

impl SessionEvent {
    /// Dispatch key for this event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Message(_) => "message",
            Self::Action(_) => "action",
            Self::Join(_) => "join",
            Self::Part(_) => "part",
            Self::Kick(_) => "kick",
        }
    }
}
