//! CTCP (Client-to-Client Protocol) message handling.
//!
//! CTCP embeds typed sub-messages inside ordinary PRIVMSG/NOTICE text using
//! the `\x01` delimiter. This client cares about ACTION (emotes) and PING
//! (answered in kind); everything else parses as [`CtcpKind::Unknown`] and is
//! left to the caller to ignore.
//!
//! # Example
//!
//! ```
//! use tgbridge_proto::{Ctcp, CtcpKind};
//!
//! let ctcp = Ctcp::parse("\x01ACTION waves hello\x01").unwrap();
//! assert_eq!(ctcp.kind, CtcpKind::Action);
//! assert_eq!(ctcp.body.as_deref(), Some("waves hello"));
//! ```

use std::fmt;

use crate::format::CTCP_DELIM;

/// CTCP command types this client distinguishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CtcpKind {
    /// ACTION - an emote, commonly triggered by `/me`.
    Action,
    /// PING - round-trip latency probe, answered in kind.
    Ping,
    /// Any other CTCP command.
    Unknown(String),
}

impl CtcpKind {
    /// Parse a CTCP command name.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "ACTION" => Self::Action,
            "PING" => Self::Ping,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Canonical uppercase name of this command.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Action => "ACTION",
            Self::Ping => "PING",
            Self::Unknown(s) => s,
        }
    }
}

impl fmt::Display for CtcpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed CTCP message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp {
    /// The CTCP command type.
    pub kind: CtcpKind,
    /// Optional body following the command.
    pub body: Option<String>,
}

impl Ctcp {
    /// Parse a CTCP message from a PRIVMSG/NOTICE body.
    ///
    /// Returns `None` if the text is not CTCP. A missing trailing delimiter
    /// is tolerated; some clients omit it.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.strip_prefix(CTCP_DELIM)?;
        let text = text.strip_suffix(CTCP_DELIM).unwrap_or(text);
        if text.is_empty() {
            return None;
        }

        let (command, body) = match text.find(' ') {
            Some(pos) => {
                let body = &text[pos + 1..];
                (
                    &text[..pos],
                    if body.is_empty() { None } else { Some(body) },
                )
            }
            None => (text, None),
        };

        Some(Self {
            kind: CtcpKind::parse(command),
            body: body.map(|s| s.to_owned()),
        })
    }

    /// Check if a message body is CTCP-delimited.
    #[inline]
    pub fn is_ctcp(text: &str) -> bool {
        text.starts_with(CTCP_DELIM)
    }

    /// Create an ACTION message.
    pub fn action(text: impl Into<String>) -> Self {
        Self {
            kind: CtcpKind::Action,
            body: Some(text.into()),
        }
    }
}

impl fmt::Display for Ctcp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\x01{}", self.kind)?;
        if let Some(ref body) = self.body {
            write!(f, " {}", body)?;
        }
        write!(f, "\x01")
    }
}
