//! The IRC line grammar: parsing and serialization of protocol lines.
//!
//! A [`Line`] is the generic wire unit: an optional prefix naming the origin,
//! a command, ordered middle parameters, and an optional trailing parameter.
//! The trailing parameter is the only one permitted to contain spaces and is
//! introduced by a `:` marker.
//!
//! # Example
//!
//! ```
//! use tgbridge_proto::Line;
//!
//! let line = Line::parse(":nick!user@host PRIVMSG #chan :hello world").unwrap();
//! assert_eq!(line.prefix.as_deref(), Some("nick!user@host"));
//! assert_eq!(line.command, "PRIVMSG");
//! assert_eq!(line.params, vec!["#chan"]);
//! assert_eq!(line.trailing.as_deref(), Some("hello world"));
//! ```

use std::fmt;

/// A parsed IRC protocol line.
///
/// The command is stored verbatim; compare it with [`Line::command_is`],
/// which is ASCII case-insensitive as the protocol requires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    /// Origin of the line (`nick!user@host` or a server name), without the
    /// leading `:`.
    pub prefix: Option<String>,
    /// The command or numeric reply, stored verbatim.
    pub command: String,
    /// Middle parameters, in order. None of these contain spaces.
    pub params: Vec<String>,
    /// The trailing parameter, without the leading `:`.
    pub trailing: Option<String>,
}

impl Line {
    /// Create a line with just a command.
    pub fn cmd<C: Into<String>>(command: C) -> Self {
        Line {
            prefix: None,
            command: command.into(),
            params: Vec::new(),
            trailing: None,
        }
    }

    /// Append a middle parameter.
    #[must_use]
    pub fn param<P: Into<String>>(mut self, param: P) -> Self {
        self.params.push(param.into());
        self
    }

    /// Set the trailing parameter.
    #[must_use]
    pub fn with_trailing<T: Into<String>>(mut self, trailing: T) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// Create a NICK line.
    pub fn nick<N: Into<String>>(nickname: N) -> Self {
        Line::cmd("NICK").param(nickname)
    }

    /// Create a USER registration line.
    pub fn user<U, R>(username: U, realname: R) -> Self
    where
        U: Into<String>,
        R: Into<String>,
    {
        Line::cmd("USER")
            .param(username)
            .param("8")
            .param("*")
            .with_trailing(realname)
    }

    /// Create a PASS line.
    pub fn pass<P: Into<String>>(password: P) -> Self {
        Line::cmd("PASS").param(password)
    }

    /// Create a JOIN line.
    pub fn join<C: Into<String>>(channel: C) -> Self {
        Line::cmd("JOIN").param(channel)
    }

    /// Create a PRIVMSG line.
    pub fn privmsg<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Line::cmd("PRIVMSG").param(target).with_trailing(text)
    }

    /// Create a NOTICE line.
    pub fn notice<T, M>(target: T, text: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        Line::cmd("NOTICE").param(target).with_trailing(text)
    }

    /// Parse a raw protocol line.
    ///
    /// Lenient by design: there is no malformed-line error, only `None` for
    /// input that carries no command at all (empty lines, a bare prefix).
    /// Trailing CR/LF is stripped.
    pub fn parse(raw: &str) -> Option<Line> {
        let raw = raw.trim_end_matches(&['\r', '\n'][..]);

        let mut rest = raw;
        let mut prefix = None;
        // A token beginning with `:` is the prefix only when it is the first
        // token; anywhere else it introduces the trailing parameter.
        if let Some(after) = rest.strip_prefix(':') {
            let (p, remainder) = after.split_once(' ')?;
            prefix = Some(p.to_string());
            rest = remainder;
        }

        let mut params = Vec::new();
        let mut trailing = None;
        loop {
            if let Some(t) = rest.strip_prefix(':') {
                trailing = Some(t.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((word, remainder)) => {
                    if !word.is_empty() {
                        params.push(word.to_string());
                    }
                    rest = remainder;
                }
                None => {
                    if !rest.is_empty() {
                        params.push(rest.to_string());
                    }
                    break;
                }
            }
        }

        if params.is_empty() {
            return None;
        }
        let command = params.remove(0);
        Some(Line {
            prefix,
            command,
            params,
            trailing,
        })
    }

    /// Compare the command name, ASCII case-insensitively.
    #[inline]
    pub fn command_is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// A middle parameter, falling back to the trailing value when absent.
    ///
    /// Compatibility accessor for servers that deliver a required final
    /// argument only as a trailing value (InspIRCd does this for JOIN). Use
    /// only where the command is known to require the argument.
    pub fn param_or_trailing(&self, idx: usize) -> Option<&str> {
        self.params
            .get(idx)
            .map(String::as_str)
            .or(self.trailing.as_deref())
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(ref trailing) = self.trailing {
            write!(f, " :{}", trailing)?;
        }
        f.write_str("\r\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg() {
        let line = Line::parse(":nick!user@host PRIVMSG #chan :hello world").unwrap();
        assert_eq!(line.prefix.as_deref(), Some("nick!user@host"));
        assert_eq!(line.command, "PRIVMSG");
        assert_eq!(line.params, vec!["#chan"]);
        assert_eq!(line.trailing.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_parse_no_prefix() {
        let line = Line::parse("PING :irc.example.net").unwrap();
        assert!(line.prefix.is_none());
        assert_eq!(line.command, "PING");
        assert!(line.params.is_empty());
        assert_eq!(line.trailing.as_deref(), Some("irc.example.net"));
    }

    #[test]
    fn test_parse_no_trailing() {
        let line = Line::parse("PING token123").unwrap();
        assert_eq!(line.params, vec!["token123"]);
        assert!(line.trailing.is_none());
    }

    #[test]
    fn test_parse_numeric() {
        let line = Line::parse(":server 001 mynick :Welcome to IRC").unwrap();
        assert_eq!(line.command, "001");
        assert_eq!(line.params, vec!["mynick"]);
        assert_eq!(line.trailing.as_deref(), Some("Welcome to IRC"));
    }

    #[test]
    fn test_parse_strips_crlf() {
        let line = Line::parse("PING :test\r\n").unwrap();
        assert_eq!(line.trailing.as_deref(), Some("test"));
    }

    #[test]
    fn test_parse_empty_trailing() {
        let line = Line::parse("PRIVMSG #chan :").unwrap();
        assert_eq!(line.trailing.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_colon_inside_token_is_not_trailing() {
        let line = Line::parse("PRIVMSG #chan :see: this").unwrap();
        assert_eq!(line.trailing.as_deref(), Some("see: this"));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(Line::parse("").is_none());
        assert!(Line::parse("   ").is_none());
        assert!(Line::parse(":prefixonly").is_none());
    }

    #[test]
    fn test_parse_kick() {
        let line = Line::parse(":op!o@h KICK #chan victim :bye").unwrap();
        assert_eq!(line.params, vec!["#chan", "victim"]);
        assert_eq!(line.trailing.as_deref(), Some("bye"));
    }

    #[test]
    fn test_command_is_case_insensitive() {
        let line = Line::parse("privmsg #chan :hi").unwrap();
        assert!(line.command_is("PRIVMSG"));
        assert!(line.command_is("privmsg"));
        assert!(!line.command_is("NOTICE"));
        // Stored verbatim.
        assert_eq!(line.command, "privmsg");
    }

    #[test]
    fn test_param_or_trailing_join_compat() {
        // Standards-shaped JOIN.
        let line = Line::parse(":n!u@h JOIN #chan").unwrap();
        assert_eq!(line.param_or_trailing(0), Some("#chan"));
        // InspIRCd delivers the channel as a trailing value instead.
        let line = Line::parse(":n!u@h JOIN :#chan").unwrap();
        assert!(line.params.is_empty());
        assert_eq!(line.param_or_trailing(0), Some("#chan"));
    }

    #[test]
    fn test_serialize() {
        let line = Line::privmsg("#chan", "hello world");
        assert_eq!(line.to_string(), "PRIVMSG #chan :hello world\r\n");

        let line = Line::cmd("PONG").param("one").param("two");
        assert_eq!(line.to_string(), "PONG one two\r\n");
    }

    #[test]
    fn test_serialize_with_prefix() {
        let mut line = Line::privmsg("#chan", "hi");
        line.prefix = Some("me!u@h".to_string());
        assert_eq!(line.to_string(), ":me!u@h PRIVMSG #chan :hi\r\n");
    }

    #[test]
    fn test_user_constructor() {
        let line = Line::user("bridge", "tgbridged (IRC)");
        assert_eq!(line.to_string(), "USER bridge 8 * :tgbridged (IRC)\r\n");
    }

    #[test]
    fn test_round_trip() {
        let original = Line::parse(":nick!user@host PRIVMSG #chan :hello world").unwrap();
        let reparsed = Line::parse(&original.to_string()).unwrap();
        assert_eq!(original, reparsed);
    }
}
