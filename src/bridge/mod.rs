//! The bridge router.
//!
//! Owns the link set and the feature toggles, registers handlers on both
//! dispatchers, and renders each platform's events into the other's idiom.
//! Events for unlinked conversations are dropped with a warning; private
//! conversations and ignored users are dropped silently.

mod format;

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{info, warn};

use tgbridge_proto::format::{BOLD, ITALIC};
use tgbridge_proto::{JoinEvent, KickEvent, MessageEvent, PartEvent, SessionEvent};

use crate::config::{BridgeConfig, BridgeOptions, LinkConfig};
use crate::dispatch::Dispatcher;
use crate::error::HandlerResult;
use crate::fmt::{EntityConverter, NickColorizer, StyleConverter};
use crate::irc::IrcSender;
use crate::telegram::api::{ChatKind, Message, User};
use crate::telegram::{MediaContainer, MediaKind, MessagingClient, TgEvent};
use crate::web::{WebBackend, WebError, NO_LINK};

use self::format::{format_duration, format_filesize, parse_own_prefix};

/// IRC event names the bridge consumes.
const IRC_EVENTS: &[&str] = &["connected", "message", "action", "join", "part", "kick"];

/// Telegram event names the bridge consumes.
const TG_EVENTS: &[&str] = &[
    "cmd_start",
    "cmd_help",
    "cmd_me",
    "text",
    "media",
    "location",
    "venue",
    "contact",
    "game",
    "poll",
    "users_joined",
    "user_left",
    "ctitle_changed",
    "cphoto_changed",
    "cphoto_deleted",
    "cpinned_changed",
];

/// The router between linked conversations.
pub struct Bridge {
    links: Vec<LinkConfig>,
    options: BridgeOptions,
    ignore_users: HashSet<i64>,
    colorizer: NickColorizer,
    irc_fmt: StyleConverter,
    tg_fmt: EntityConverter,
    irc: IrcSender,
    tg: Arc<dyn MessagingClient>,
    web: Arc<WebBackend>,
}

impl Bridge {
    /// Build the router from configuration and the client handles.
    pub fn new(
        config: BridgeConfig,
        irc: IrcSender,
        tg: Arc<dyn MessagingClient>,
        web: Arc<WebBackend>,
    ) -> Arc<Self> {
        info!(count = config.links.len(), "links configured");
        Arc::new(Self {
            links: config.links,
            colorizer: NickColorizer::new(config.options.irc_nick_colors.clone()),
            irc_fmt: StyleConverter::new(config.options.forward_text_formatting_irc),
            tg_fmt: EntityConverter::new(config.options.forward_text_formatting_telegram),
            options: config.options,
            ignore_users: config.telegram_ignore_users.into_iter().collect(),
            irc,
            tg,
            web,
        })
    }

    /// Register the IRC-side handlers.
    pub fn register_irc(self: &Arc<Self>, dispatcher: &mut Dispatcher<SessionEvent>) {
        for &name in IRC_EVENTS {
            let bridge = Arc::clone(self);
            dispatcher.on(name, move |event| {
                let bridge = Arc::clone(&bridge);
                async move { bridge.handle_irc(event).await }.boxed()
            });
        }
    }

    /// Register the Telegram-side handlers.
    pub fn register_tg(self: &Arc<Self>, dispatcher: &mut Dispatcher<TgEvent>) {
        for &name in TG_EVENTS {
            let bridge = Arc::clone(self);
            dispatcher.on(name, move |event| {
                let bridge = Arc::clone(&bridge);
                async move { bridge.handle_tg(event).await }.boxed()
            });
        }
    }

    // ------------------------------------------------------------------
    // IRC → Telegram
    // ------------------------------------------------------------------

    async fn handle_irc(&self, event: SessionEvent) -> HandlerResult {
        match event {
            SessionEvent::Connected => self.irc_connected().await,
            SessionEvent::Message(e) => self.irc_message(e).await,
            SessionEvent::Action(e) => self.irc_action(e).await,
            SessionEvent::Join(e) => self.irc_join(e).await,
            SessionEvent::Part(e) => self.irc_part(e).await,
            SessionEvent::Kick(e) => self.irc_kick(e).await,
        }
    }

    async fn irc_connected(&self) -> HandlerResult {
        for link in &self.links {
            self.irc.join(&link.irc).await;
        }
        Ok(())
    }

    fn link_for_channel(&self, channel: &str) -> Option<&LinkConfig> {
        match self.links.iter().find(|l| l.irc == channel) {
            Some(link) => Some(link),
            None => {
                warn!(channel, "IRC channel is not linked anywhere");
                None
            }
        }
    }

    async fn irc_message(&self, event: MessageEvent) -> HandlerResult {
        let Some(channel) = event.channel() else {
            return Ok(());
        };
        let Some(link) = self.link_for_channel(channel) else {
            return Ok(());
        };
        info!(nick = %event.source.nick, channel, text = %event.text, "IRC message");
        let rendered = self.irc_fmt.convert(&event.text);
        let message = if self.options.telegram_bold_nicks {
            format!("&lt;<b>{}</b>&gt; {}", event.source.nick, rendered)
        } else {
            format!("&lt;{}&gt; {}", event.source.nick, rendered)
        };
        self.tg.send_text(link.telegram, message, true).await?;
        Ok(())
    }

    async fn irc_action(&self, event: MessageEvent) -> HandlerResult {
        let Some(channel) = event.channel() else {
            return Ok(());
        };
        let Some(link) = self.link_for_channel(channel) else {
            return Ok(());
        };
        info!(nick = %event.source.nick, channel, text = %event.text, "IRC action");
        let rendered = self.irc_fmt.convert(&event.text);
        let message = if self.options.telegram_bold_nicks {
            format!("* <b>{}</b> {}", event.source.nick, rendered)
        } else {
            format!("* {} {}", event.source.nick, rendered)
        };
        self.tg.send_text(link.telegram, message, true).await?;
        Ok(())
    }

    async fn irc_join(&self, event: JoinEvent) -> HandlerResult {
        if !self.options.telegram_show_joins {
            return Ok(());
        }
        let Some(link) = self.link_for_channel(&event.channel) else {
            return Ok(());
        };
        info!(nick = %event.source.nick, channel = %event.channel, "IRC join");
        let message = if self.options.telegram_bold_nicks {
            format!("<b>{}</b> has joined", event.source.nick)
        } else {
            format!("{} has joined", event.source.nick)
        };
        self.tg.send_text(link.telegram, message, true).await?;
        Ok(())
    }

    async fn irc_part(&self, event: PartEvent) -> HandlerResult {
        if !self.options.telegram_show_joins {
            return Ok(());
        }
        let Some(link) = self.link_for_channel(&event.channel) else {
            return Ok(());
        };
        info!(nick = %event.source.nick, channel = %event.channel, "IRC part");
        let message = if self.options.telegram_bold_nicks {
            format!("<b>{}</b> has left", event.source.nick)
        } else {
            format!("{} has left", event.source.nick)
        };
        self.tg.send_text(link.telegram, message, true).await?;
        Ok(())
    }

    async fn irc_kick(&self, event: KickEvent) -> HandlerResult {
        let Some(link) = self.link_for_channel(&event.channel) else {
            return Ok(());
        };
        info!(
            kicker = %event.source.nick,
            kicked = %event.kicked,
            channel = %event.channel,
            "IRC kick"
        );
        let message = if self.options.telegram_bold_nicks {
            format!(
                "<b>{}</b> was kicked by <b>{}</b>",
                event.kicked, event.source.nick
            )
        } else {
            format!("{} was kicked by {}", event.kicked, event.source.nick)
        };
        self.tg.send_text(link.telegram, message, true).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Telegram → IRC
    // ------------------------------------------------------------------

    async fn handle_tg(&self, event: TgEvent) -> HandlerResult {
        match event {
            // /start and /help reply anywhere, even in unlinked chats.
            TgEvent::Start(msg) | TgEvent::Help(msg) => self.tg_help(msg).await,
            TgEvent::Me(msg) => self.tg_me(msg).await,
            TgEvent::Text(msg) => self.tg_text(msg).await,
            TgEvent::Media(msg, media) => self.tg_media(msg, media).await,
            TgEvent::Location(msg) => self.tg_location(msg).await,
            TgEvent::Venue(msg) => self.tg_venue(msg).await,
            TgEvent::Contact(msg) => self.tg_contact(msg).await,
            TgEvent::Game(msg) => self.tg_game(msg).await,
            TgEvent::Poll(msg) => self.tg_poll(msg).await,
            TgEvent::UsersJoined(msg) => self.tg_users_joined(msg).await,
            TgEvent::UserLeft(msg) => self.tg_user_left(msg).await,
            TgEvent::TitleChanged(msg) => self.tg_title_changed(msg).await,
            TgEvent::PhotoChanged(msg, media) => self.tg_photo_changed(msg, media).await,
            TgEvent::PhotoDeleted(msg) => self.tg_photo_deleted(msg).await,
            TgEvent::PinnedChanged(msg) => self.tg_pinned_changed(msg).await,
        }
    }

    /// Link lookup with the shared guards: private chats and broadcast
    /// channels are never bridged, ignored users are dropped silently.
    fn tg_link(&self, msg: &Message) -> Option<&LinkConfig> {
        if matches!(msg.chat.kind, ChatKind::Private | ChatKind::Channel) {
            return None;
        }
        if let Some(from) = &msg.from {
            if self.ignore_users.contains(&from.id) {
                return None;
            }
        }
        match self.links.iter().find(|l| l.telegram == msg.chat.id) {
            Some(link) => Some(link),
            None => {
                warn!(chat = msg.chat.id, "telegram chat is not linked anywhere");
                None
            }
        }
    }

    async fn tg_help(&self, msg: Message) -> HandlerResult {
        self.tg
            .send_reply(msg.chat.id, msg.message_id, "tgbridged (Telegram)".to_string())
            .await?;
        Ok(())
    }

    async fn tg_me(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let text = msg.text.as_deref().unwrap_or("");
        let Some(action_text) = text.split_once(' ').map(|(_, rest)| rest.trim()) else {
            return Ok(());
        };
        if action_text.is_empty() {
            return Ok(());
        }
        info!(text = action_text, "telegram /me action");
        let message = format!("{} {}", self.format_msg_prefix(&msg, true), action_text);
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_text(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        info!(text = ?msg.text, "telegram text");
        let message = self.format_msg(&msg);
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_media(&self, msg: Message, media: MediaContainer) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        info!(kind = ?media.kind, "telegram media");

        let mut desc = match media.kind {
            MediaKind::Audio => {
                let duration = format_duration(media.duration.unwrap_or(0));
                match media
                    .desc
                    .as_deref()
                    .filter(|_| self.options.forward_audio_description)
                {
                    Some(meta) => format!("(Audio, {duration}: {meta})"),
                    None => format!("(Audio, {duration})"),
                }
            }
            MediaKind::Animation => "(GIF)".to_string(),
            MediaKind::Document => {
                let size = format_filesize(media.file_size.unwrap_or(0));
                let mut desc = if self.options.forward_document_mime {
                    format!(
                        "(Document, {}, {size})",
                        media.mime.as_deref().unwrap_or("unknown")
                    )
                } else {
                    format!("(Document, {size})")
                };
                if let Some(name) = &media.filename {
                    desc.push_str(&format!(" \"{name}\""));
                }
                desc
            }
            MediaKind::Photo => {
                let (w, h) = media.dimensions.unwrap_or((0, 0));
                format!("(Photo, {w}x{h})")
            }
            MediaKind::Sticker => {
                let mut desc = if self.options.forward_sticker_dimensions {
                    let (w, h) = media.dimensions.unwrap_or((0, 0));
                    format!("(Sticker, {w}x{h})")
                } else {
                    "(Sticker)".to_string()
                };
                if self.options.forward_sticker_emoji {
                    if let Some(emoji) = &media.emoji {
                        desc.push(' ');
                        desc.push_str(emoji);
                    }
                }
                desc
            }
            MediaKind::Video => format!("(Video, {})", format_duration(media.duration.unwrap_or(0))),
            MediaKind::VideoNote => format!(
                "(Video Note, {})",
                format_duration(media.duration.unwrap_or(0))
            ),
            MediaKind::Voice => format!("(Voice, {})", format_duration(media.duration.unwrap_or(0))),
        };

        // Animated stickers have no useful still to serve; forward the
        // description alone.
        if media.kind == MediaKind::Sticker && media.animated {
            desc = format!("(Animated {}", &desc[1..]);
            let message = format!("{} {}", self.format_msg_prefix(&msg, false), desc);
            self.irc.privmsg(&link.irc, &message).await;
            return Ok(());
        }

        let mut parts: Vec<String> = vec![desc];
        if let Some(bot) = &msg.via_bot {
            parts.push(format!("via @{}", self.format_user(bot)));
        }

        // Documents may be too large for the Bot API to hand out; that is
        // an expected failure, not an error.
        let failure_allowed = media.kind == MediaKind::Document;
        let url = match self.tg.fetch_media_url(&media.file_id).await {
            Ok(remote) => match self.web.store(&remote, media.extension()).await {
                Ok(url) => url,
                Err(WebError::Disabled) => NO_LINK.to_string(),
                Err(e) => {
                    warn!(error = %e, "failed to store media file");
                    NO_LINK.to_string()
                }
            },
            Err(e) if failure_allowed => {
                info!(error = %e, "media url unavailable");
                String::new()
            }
            Err(e) => {
                warn!(error = %e, "failed to resolve media url");
                "<error>".to_string()
            }
        };
        if !url.is_empty() {
            parts.push(url);
        }

        if let Some(caption) = &msg.caption {
            let entities = msg.caption_entities.as_deref().unwrap_or(&[]);
            parts.push(
                self.tg_fmt
                    .convert(caption, entities, &|u| self.format_user(u)),
            );
        }

        let message = format!(
            "{} {}",
            self.format_msg_prefix(&msg, false),
            parts.join(" ")
        );
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_location(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(location) = msg.location else {
            return Ok(());
        };
        info!("telegram location");
        let message = format!(
            "{} (Location, lat: {:.4}, lon: {:.4})",
            self.format_msg_prefix(&msg, false),
            location.latitude,
            location.longitude,
        );
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_venue(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(venue) = msg.venue.clone() else {
            return Ok(());
        };
        info!("telegram venue");
        let foursquare = venue
            .foursquare_id
            .map(|id| format!(", http://foursquare.com/v/{id}"))
            .unwrap_or_default();
        let message = format!(
            "{} (Venue, {}: {}{})",
            self.format_msg_prefix(&msg, false),
            venue.title,
            venue.address,
            foursquare,
        );
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_contact(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(contact) = msg.contact.clone() else {
            return Ok(());
        };
        info!("telegram contact");
        let last = contact
            .last_name
            .map(|l| format!(" {l}"))
            .unwrap_or_default();
        let message = format!(
            "{} (Contact, Name: {}{}, Phone: {})",
            self.format_msg_prefix(&msg, false),
            contact.first_name,
            last,
            contact.phone_number,
        );
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_game(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(game) = msg.game.clone() else {
            return Ok(());
        };
        info!("telegram game");
        let mut desc = format!("\"{}\"", game.title);
        if let Some(description) = game.description {
            desc.push_str(": ");
            desc.push_str(&description);
        }
        let message = format!("{} (Game, {})", self.format_msg_prefix(&msg, false), desc);
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_poll(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(poll) = msg.poll.clone() else {
            return Ok(());
        };
        info!("telegram poll");

        let mut desc = String::new();
        if poll.is_anonymous {
            desc.push_str("Anonymous ");
        }
        desc.push_str(if poll.kind == "quiz" { "Quiz" } else { "Poll" });
        if poll.is_closed {
            desc.push_str(" closed");
        }
        let show_votes = poll.is_closed || poll.total_voter_count > 0;
        if show_votes {
            desc.push_str(&format!(" with {} votes", poll.total_voter_count));
        }
        if poll.allows_multiple_answers {
            desc.push_str(", multi-choice");
        }

        let bold = if self.colorizer.enabled() {
            BOLD.to_string()
        } else {
            String::new()
        };
        let mut detail = format!("\"{}\"", poll.question);
        for option in &poll.options {
            detail.push_str(&format!(" \u{2026} {}", option.text));
            if show_votes {
                detail.push_str(&format!(" {bold}({}){bold}", option.voter_count));
            }
        }

        let message = format!(
            "{} ({}) {}",
            self.format_msg_prefix(&msg, false),
            desc,
            detail
        );
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_users_joined(&self, msg: Message) -> HandlerResult {
        if !self.options.irc_show_added_users {
            return Ok(());
        }
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let members = msg.new_chat_members.clone().unwrap_or_default();
        for member in &members {
            info!(user = member.id, "telegram user joined");
            let message = if msg.from.as_ref().map(|u| u.id) == Some(member.id) {
                format!("{} has joined", self.format_user(member))
            } else {
                let actor = msg
                    .from
                    .as_ref()
                    .map(|u| self.format_user(u))
                    .unwrap_or_default();
                format!("{} was added by {}", self.format_user(member), actor)
            };
            self.irc.privmsg(&link.irc, &message).await;
        }
        Ok(())
    }

    async fn tg_user_left(&self, msg: Message) -> HandlerResult {
        if !self.options.irc_show_added_users {
            return Ok(());
        }
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(member) = msg.left_chat_member.clone() else {
            return Ok(());
        };
        info!(user = member.id, "telegram user left");
        let message = if msg.from.as_ref().map(|u| u.id) == Some(member.id) {
            format!("{} has left", self.format_user(&member))
        } else {
            let actor = msg
                .from
                .as_ref()
                .map(|u| self.format_user(u))
                .unwrap_or_default();
            format!("{} was removed by {}", self.format_user(&member), actor)
        };
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_title_changed(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(title) = msg.new_chat_title.clone() else {
            return Ok(());
        };
        info!(title = %title, "telegram chat title changed");
        let actor = msg
            .from
            .as_ref()
            .map(|u| self.format_user(u))
            .unwrap_or_default();
        let message = format!("{actor} set a new chat title: {title}");
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_photo_changed(&self, msg: Message, media: MediaContainer) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        info!("telegram chat photo changed");
        let url = match self.tg.fetch_media_url(&media.file_id).await {
            Ok(remote) => match self.web.store(&remote, media.extension()).await {
                Ok(url) => url,
                Err(WebError::Disabled) => NO_LINK.to_string(),
                Err(e) => {
                    warn!(error = %e, "failed to store chat photo");
                    NO_LINK.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "failed to resolve chat photo url");
                NO_LINK.to_string()
            }
        };
        let (w, h) = media.dimensions.unwrap_or((0, 0));
        let actor = msg
            .from
            .as_ref()
            .map(|u| self.format_user(u))
            .unwrap_or_default();
        let message = format!("{actor} set a new chat photo ({w}x{h}): {url}");
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_photo_deleted(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        info!("telegram chat photo deleted");
        let actor = msg
            .from
            .as_ref()
            .map(|u| self.format_user(u))
            .unwrap_or_default();
        let message = format!("{actor} deleted the chat photo");
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    async fn tg_pinned_changed(&self, msg: Message) -> HandlerResult {
        let Some(link) = self.tg_link(&msg) else {
            return Ok(());
        };
        let Some(pinned) = msg.pinned_message.clone() else {
            return Ok(());
        };
        info!("telegram pinned message changed");
        let actor = msg
            .from
            .as_ref()
            .map(|u| self.format_user(u))
            .unwrap_or_default();
        let message = format!("{actor} pinned message: {}", self.format_msg(&pinned));
        self.irc.privmsg(&link.irc, &message).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Rendering helpers
    // ------------------------------------------------------------------

    /// Display form of a Telegram user on IRC.
    fn format_user(&self, user: &User) -> String {
        if let Some(username) = &user.username {
            return self.colorizer.colorize(username);
        }
        if user.first_name.is_empty() {
            let italic = if self.colorizer.enabled() {
                ITALIC.to_string()
            } else {
                String::new()
            };
            return format!("{italic}Deleted Account{italic}");
        }
        let full = match &user.last_name {
            Some(last) => format!("{} {}", user.first_name, last),
            None => user.first_name.clone(),
        };
        self.colorizer.colorize(&full)
    }

    /// Sender prefix for a forwarded message: `<user>` or `* user`, plus
    /// reply and forward attribution.
    fn format_msg_prefix(&self, msg: &Message, action: bool) -> String {
        let sender = msg
            .from
            .as_ref()
            .map(|u| self.format_user(u))
            .unwrap_or_default();
        let mut prefix = if action {
            format!("* {sender}")
        } else {
            format!("<{sender}>")
        };

        if !action {
            if let Some(reply) = &msg.reply_to_message {
                let own = self.tg.own_user_id();
                if own.is_some() && reply.from.as_ref().map(|u| u.id) == own {
                    // Replying to one of our own bridged lines: dig the IRC
                    // nick back out of the rendered text.
                    match reply.text.as_deref().and_then(parse_own_prefix) {
                        Some(nick) => prefix.push_str(&format!(" {nick},")),
                        None => warn!(text = ?reply.text, "failed to parse our own message"),
                    }
                } else if let Some(reply_user) = reply.from.as_ref() {
                    prefix.push_str(&format!(" @{},", self.format_user(reply_user)));
                }
            }
        }

        if let Some(user) = &msg.forward_from {
            prefix.push_str(&format!(" Fwd from {}:", self.format_user(user)));
        } else if let Some(chat) = &msg.forward_from_chat {
            prefix.push_str(&format!(
                " Fwd from {}:",
                chat.title.as_deref().unwrap_or("?")
            ));
        } else if let Some(name) = &msg.forward_sender_name {
            prefix.push_str(&format!(" Fwd from {name}:"));
        }
        prefix
    }

    /// Full rendering of a text message (or a placeholder for media).
    fn format_msg(&self, msg: &Message) -> String {
        let prefix = self.format_msg_prefix(msg, false);
        match &msg.text {
            Some(text) => {
                let entities = msg.entities.as_deref().unwrap_or(&[]);
                format!(
                    "{prefix} {}",
                    self.tg_fmt.convert(text, entities, &|u| self.format_user(u))
                )
            }
            None => format!("{prefix} (Media message)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::config::IrcConfig;
    use crate::telegram::TelegramError;
    use crate::web::WebBackend;

    struct MockMessaging;

    #[async_trait]
    impl MessagingClient for MockMessaging {
        async fn send_text(&self, _: i64, _: String, _: bool) -> Result<(), TelegramError> {
            Ok(())
        }
        async fn send_reply(&self, _: i64, _: i64, _: String) -> Result<(), TelegramError> {
            Ok(())
        }
        async fn fetch_media_url(&self, _: &str) -> Result<String, TelegramError> {
            Err(TelegramError::Api("mock".to_string()))
        }
        fn own_user_id(&self) -> Option<i64> {
            Some(777)
        }
    }

    fn bridge(options: BridgeOptions) -> Arc<Bridge> {
        let irc = crate::irc::IrcClient::new(IrcConfig {
            server: "irc.example.net".to_string(),
            port: 6667,
            ssl: false,
            ssl_verify: true,
            ipv6: true,
            nick: "bridge".to_string(),
            username: None,
            realname: "bridge".to_string(),
            password: None,
            nickpassword: None,
            keepalive_interval: 30,
        });
        Bridge::new(
            BridgeConfig {
                links: vec![LinkConfig {
                    telegram: -100123,
                    irc: "#chan".to_string(),
                }],
                options,
                telegram_ignore_users: vec![],
            },
            irc.sender(),
            Arc::new(MockMessaging),
            Arc::new(WebBackend::new(crate::config::WebBackendConfig::Stub)),
        )
    }

    fn plain_options() -> BridgeOptions {
        BridgeOptions {
            irc_nick_colors: Some(vec![]),
            ..BridgeOptions::default()
        }
    }

    fn message(json: &str) -> Message {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_link_lookup() {
        let bridge = bridge(plain_options());
        assert!(bridge.link_for_channel("#chan").is_some());
        assert!(bridge.link_for_channel("#other").is_none());
    }

    #[test]
    fn test_tg_link_guards() {
        let bridge = bridge(plain_options());
        let linked = message(
            r#"{"message_id": 1, "chat": {"id": -100123, "type": "supergroup"}, "text": "x"}"#,
        );
        assert!(bridge.tg_link(&linked).is_some());

        let private =
            message(r#"{"message_id": 1, "chat": {"id": -100123, "type": "private"}, "text": "x"}"#);
        assert!(bridge.tg_link(&private).is_none());

        let unlinked =
            message(r#"{"message_id": 1, "chat": {"id": -9, "type": "group"}, "text": "x"}"#);
        assert!(bridge.tg_link(&unlinked).is_none());
    }

    #[test]
    fn test_format_user_plain() {
        let bridge = bridge(plain_options());
        let with_username = User {
            id: 1,
            username: Some("alice".to_string()),
            first_name: "Alice".to_string(),
            last_name: None,
        };
        assert_eq!(bridge.format_user(&with_username), "alice");

        let full_name = User {
            id: 2,
            username: None,
            first_name: "Bob".to_string(),
            last_name: Some("Jones".to_string()),
        };
        assert_eq!(bridge.format_user(&full_name), "Bob Jones");

        let deleted = User {
            id: 3,
            username: None,
            first_name: String::new(),
            last_name: None,
        };
        // Colors disabled, so no italic markers either.
        assert_eq!(bridge.format_user(&deleted), "Deleted Account");
    }

    #[test]
    fn test_format_user_colored() {
        let bridge = bridge(BridgeOptions::default());
        let user = User {
            id: 1,
            username: Some("alice".to_string()),
            first_name: "Alice".to_string(),
            last_name: None,
        };
        let out = bridge.format_user(&user);
        assert!(out.starts_with('\x03'));
        assert!(out.ends_with('\x0f'));
        assert!(out.contains("alice"));
    }

    #[test]
    fn test_format_msg_prefix_reply_to_own_message() {
        let bridge = bridge(plain_options());
        let msg = message(
            r#"{
                "message_id": 2,
                "from": {"id": 5, "first_name": "Carol"},
                "chat": {"id": -100123, "type": "group"},
                "text": "sure",
                "reply_to_message": {
                    "message_id": 1,
                    "from": {"id": 777, "first_name": "Bridge"},
                    "chat": {"id": -100123, "type": "group"},
                    "text": "<ircnick> original words"
                }
            }"#,
        );
        assert_eq!(bridge.format_msg_prefix(&msg, false), "<Carol> ircnick,");
    }

    #[test]
    fn test_format_msg_prefix_reply_to_other_user() {
        let bridge = bridge(plain_options());
        let msg = message(
            r#"{
                "message_id": 2,
                "from": {"id": 5, "first_name": "Carol"},
                "chat": {"id": -100123, "type": "group"},
                "text": "sure",
                "reply_to_message": {
                    "message_id": 1,
                    "from": {"id": 6, "first_name": "Dave"},
                    "chat": {"id": -100123, "type": "group"},
                    "text": "hello"
                }
            }"#,
        );
        assert_eq!(bridge.format_msg_prefix(&msg, false), "<Carol> @Dave,");
    }

    #[test]
    fn test_format_msg_prefix_forward() {
        let bridge = bridge(plain_options());
        let msg = message(
            r#"{
                "message_id": 2,
                "from": {"id": 5, "first_name": "Carol"},
                "chat": {"id": -100123, "type": "group"},
                "text": "fwd",
                "forward_sender_name": "Hidden Person"
            }"#,
        );
        assert_eq!(
            bridge.format_msg_prefix(&msg, false),
            "<Carol> Fwd from Hidden Person:"
        );
    }

    #[test]
    fn test_format_msg_prefix_action_skips_reply() {
        let bridge = bridge(plain_options());
        let msg = message(
            r#"{
                "message_id": 2,
                "from": {"id": 5, "first_name": "Carol"},
                "chat": {"id": -100123, "type": "group"},
                "text": "/me waves",
                "reply_to_message": {
                    "message_id": 1,
                    "from": {"id": 6, "first_name": "Dave"},
                    "chat": {"id": -100123, "type": "group"},
                    "text": "hello"
                }
            }"#,
        );
        assert_eq!(bridge.format_msg_prefix(&msg, true), "* Carol");
    }

    #[test]
    fn test_format_msg_with_entities() {
        let bridge = bridge(plain_options());
        let msg = message(
            r#"{
                "message_id": 2,
                "from": {"id": 5, "first_name": "Carol"},
                "chat": {"id": -100123, "type": "group"},
                "text": "big news",
                "entities": [{"type": "bold", "offset": 0, "length": 3}]
            }"#,
        );
        assert_eq!(bridge.format_msg(&msg), "<Carol> \x02big\x02 news");
    }

    #[test]
    fn test_format_msg_media_placeholder() {
        let bridge = bridge(plain_options());
        let msg = message(
            r#"{
                "message_id": 2,
                "from": {"id": 5, "first_name": "Carol"},
                "chat": {"id": -100123, "type": "group"}
            }"#,
        );
        assert_eq!(bridge.format_msg(&msg), "<Carol> (Media message)");
    }
}
