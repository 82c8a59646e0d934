//! Telegram rich-text entities to IRC control codes.
//!
//! Entity offsets and lengths count UTF-16 code units, so the text is
//! re-encoded into a 16-bit buffer and walked with a cursor in those units.
//! Indexing by `char` instead would misplace every span after a codepoint
//! outside the basic plane.
//!
//! Newlines are rendered as a visual separator since the target protocol is
//! line-oriented.

use tgbridge_proto::format::{BOLD, COLOR, ITALIC, RESET, UNDERLINE};

use crate::telegram::api::{EntityKind, MessageEntity, User};

/// Color used to set quoted code/pre spans apart.
const QUOTE_COLOR: u8 = 15;

/// Replacement for line breaks in forwarded text.
const NEWLINE_SEPARATOR: &str = " \u{2026} ";

/// Converter from entity-annotated text to control-code markup.
pub struct EntityConverter {
    enabled: bool,
}

impl EntityConverter {
    /// Create a converter. When disabled, entities are ignored and only the
    /// newline filtering applies.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Render `text` with its entity overlay.
    ///
    /// `user_fmt` renders mentioned users in their display form; the caller
    /// decides about coloring. Entities are expected in non-decreasing
    /// start-offset order; out-of-order or overlapping entries are tolerated
    /// by being skipped.
    pub fn convert(
        &self,
        text: &str,
        entities: &[MessageEntity],
        user_fmt: &dyn Fn(&User) -> String,
    ) -> String {
        if !self.enabled || entities.is_empty() {
            return filter_newlines(text);
        }

        let units: Vec<u16> = text.encode_utf16().collect();
        let mut pos = 0usize;
        let mut out = String::new();

        while pos < units.len() {
            // First supplied entity starting at or after the cursor.
            // Zero-length entries would pin the cursor in place.
            let next = entities
                .iter()
                .find(|e| e.length > 0 && e.offset >= pos);

            match next {
                Some(entity) if entity.offset == pos => {
                    let end = (pos + entity.length).min(units.len());
                    let etext = filter_newlines(&String::from_utf16_lossy(&units[pos..end]));
                    out.push_str(&self.render(entity, &etext, user_fmt));
                    pos = end;
                }
                Some(entity) => {
                    // Plain run up to the next entity.
                    let end = entity.offset.min(units.len());
                    out.push_str(&filter_newlines(&String::from_utf16_lossy(
                        &units[pos..end],
                    )));
                    pos = end;
                }
                None => {
                    out.push_str(&filter_newlines(&String::from_utf16_lossy(&units[pos..])));
                    pos = units.len();
                }
            }
        }
        out
    }

    fn render(
        &self,
        entity: &MessageEntity,
        etext: &str,
        user_fmt: &dyn Fn(&User) -> String,
    ) -> String {
        match entity.kind {
            EntityKind::Bold => format!("{BOLD}{etext}{BOLD}"),
            EntityKind::Italic => format!("{ITALIC}{etext}{ITALIC}"),
            EntityKind::Underline => format!("{UNDERLINE}{etext}{UNDERLINE}"),
            EntityKind::Code | EntityKind::Pre => {
                format!("{COLOR}{QUOTE_COLOR:02}{etext}{RESET}")
            }
            EntityKind::Mention => {
                // The span includes the leading '@'.
                let user = User::from_username(etext.trim_start_matches('@'));
                format!("@{}", user_fmt(&user))
            }
            EntityKind::TextMention => match entity.user {
                Some(ref user) => user_fmt(user),
                None => etext.to_string(),
            },
            EntityKind::TextLink => match entity.url {
                Some(ref url) => format!("{etext} <{url}>"),
                None => etext.to_string(),
            },
            EntityKind::Other => etext.to_string(),
        }
    }
}

fn filter_newlines(text: &str) -> String {
    text.replace('\n', NEWLINE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(kind: EntityKind, offset: usize, length: usize) -> MessageEntity {
        MessageEntity {
            kind,
            offset,
            length,
            url: None,
            user: None,
        }
    }

    fn plain_user(user: &User) -> String {
        user.username
            .clone()
            .unwrap_or_else(|| user.first_name.clone())
    }

    fn converter() -> EntityConverter {
        EntityConverter::new(true)
    }

    #[test]
    fn test_bold_span() {
        let out = converter().convert(
            "test message",
            &[entity(EntityKind::Bold, 0, 4)],
            &plain_user,
        );
        assert_eq!(out, "\x02test\x02 message");
    }

    #[test]
    fn test_middle_span() {
        let out = converter().convert(
            "say hello now",
            &[entity(EntityKind::Italic, 4, 5)],
            &plain_user,
        );
        assert_eq!(out, "say \x1dhello\x1d now");
    }

    #[test]
    fn test_offsets_are_utf16_units() {
        // The emoji is one codepoint but two 16-bit units; a char-indexed
        // implementation would wrap the space instead of the x.
        let out = converter().convert(
            "\u{1F389}x tail",
            &[entity(EntityKind::Bold, 2, 1)],
            &plain_user,
        );
        assert_eq!(out, "\u{1F389}\x02x\x02 tail");
    }

    #[test]
    fn test_code_gets_quote_color() {
        let out = converter().convert(
            "run ls now",
            &[entity(EntityKind::Code, 4, 2)],
            &plain_user,
        );
        assert_eq!(out, "run \x0315ls\x0f now");
    }

    #[test]
    fn test_mention_rendered_via_user_formatter() {
        let out = converter().convert(
            "hi @alice !",
            &[entity(EntityKind::Mention, 3, 6)],
            &plain_user,
        );
        assert_eq!(out, "hi @alice !");

        let shouting = converter().convert(
            "hi @alice !",
            &[entity(EntityKind::Mention, 3, 6)],
            &|u: &User| plain_user(u).to_uppercase(),
        );
        assert_eq!(shouting, "hi @ALICE !");
    }

    #[test]
    fn test_text_mention_uses_payload_user() {
        let mut e = entity(EntityKind::TextMention, 0, 5);
        e.user = Some(User {
            id: 7,
            username: None,
            first_name: "Alice".to_string(),
            last_name: None,
        });
        let out = converter().convert("Alice waves", &[e], &plain_user);
        assert_eq!(out, "Alice waves");
    }

    #[test]
    fn test_text_link_appends_url() {
        let mut e = entity(EntityKind::TextLink, 0, 4);
        e.url = Some("https://example.net".to_string());
        let out = converter().convert("here it is", &[e], &plain_user);
        assert_eq!(out, "here <https://example.net> it is");
    }

    #[test]
    fn test_unknown_kind_passes_through() {
        let out = converter().convert(
            "spoiler text",
            &[entity(EntityKind::Other, 0, 7)],
            &plain_user,
        );
        assert_eq!(out, "spoiler text");
    }

    #[test]
    fn test_newlines_become_separator() {
        let out = converter().convert("a\nb", &[], &plain_user);
        assert_eq!(out, "a \u{2026} b");
        // Inside entity spans too.
        let out = converter().convert("a\nb", &[entity(EntityKind::Bold, 0, 3)], &plain_user);
        assert_eq!(out, "\x02a \u{2026} b\x02");
    }

    #[test]
    fn test_disabled_only_filters_newlines() {
        let converter = EntityConverter::new(false);
        let out = converter.convert(
            "bold\nplain",
            &[entity(EntityKind::Bold, 0, 4)],
            &plain_user,
        );
        assert_eq!(out, "bold \u{2026} plain");
    }

    #[test]
    fn test_adjacent_entities() {
        let out = converter().convert(
            "oneTWO",
            &[
                entity(EntityKind::Bold, 0, 3),
                entity(EntityKind::Italic, 3, 3),
            ],
            &plain_user,
        );
        assert_eq!(out, "\x02one\x02\x1dTWO\x1d");
    }

    #[test]
    fn test_overlapping_entities_tolerated() {
        // The second entity starts before the cursor after the first ends;
        // it is skipped rather than reordered.
        let out = converter().convert(
            "abcdef",
            &[
                entity(EntityKind::Bold, 0, 4),
                entity(EntityKind::Italic, 2, 2),
            ],
            &plain_user,
        );
        assert_eq!(out, "\x02abcd\x02ef");
    }

    #[test]
    fn test_entity_past_end_is_clamped() {
        let out = converter().convert("abc", &[entity(EntityKind::Bold, 1, 99)], &plain_user);
        assert_eq!(out, "a\x02bc\x02");
    }

    #[test]
    fn test_strip_markup_reconstructs_text() {
        // "plain " is units 0..6, the emoji 6..8, "bold" 9..13, "link" 14..18.
        let text = "plain \u{1F389} bold link\nend";
        let mut link = entity(EntityKind::TextLink, 14, 4);
        link.url = None;
        let entities = [entity(EntityKind::Bold, 9, 4), link];
        let out = converter().convert(text, &entities, &plain_user);
        let stripped: String = out
            .chars()
            .filter(|c| !matches!(*c, BOLD | ITALIC | UNDERLINE))
            .collect();
        assert_eq!(stripped, filter_newlines(text));
    }
}
