//! Sans-IO session state machine for the client side of the protocol.
//!
//! The machine performs no I/O. It consumes parsed [`Line`]s and produces
//! [`Action`]s: lines to send and events to surface. The caller owns the
//! socket, feeds every inbound line through [`SessionMachine::feed`], and
//! applies the resulting actions in order. This keeps registration, keepalive
//! and CTCP behavior unit-testable without a network.
//!
//! # Example
//!
//! ```
//! use tgbridge_proto::{Action, Line, SessionConfig, SessionMachine, SessionState};
//!
//! let mut machine = SessionMachine::new(SessionConfig {
//!     nickname: "bridge".into(),
//!     username: "bridge".into(),
//!     realname: "bridge bot".into(),
//!     password: None,
//!     nickserv_password: None,
//! });
//!
//! // NICK + USER to send.
//! assert_eq!(machine.start().len(), 2);
//!
//! let welcome = Line::parse(":server 001 bridge :Welcome").unwrap();
//! let actions = machine.feed(&welcome);
//! assert_eq!(machine.state(), SessionState::Registered);
//! assert!(matches!(actions[0], Action::Emit(_)));
//! ```

use rand::Rng;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::ctcp::{Ctcp, CtcpKind};
use crate::event::{JoinEvent, KickEvent, MessageEvent, PartEvent, SessionEvent, Source};
use crate::line::Line;

/// Prefix for nicknames generated after a collision reply.
pub const GUEST_NICK_PREFIX: &str = "Guest";

/// Connection identity and credentials for registration.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident) for USER.
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Server password (PASS), if required.
    pub password: Option<String>,
    /// NickServ password to identify with after registration.
    pub nickserv_password: Option<String>,
}

/// Registration progress of the session.
///
/// The connect/disconnect phases live in the caller, which owns the socket;
/// the machine only exists while a connection does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Registration sent, waiting for the welcome reply.
    Registering,
    /// Welcome reply received; the session is fully established.
    Registered,
}

/// What the caller must do with a machine output.
#[derive(Clone, Debug)]
pub enum Action {
    /// Send this line to the server.
    Send(Line),
    /// Surface this event to the application.
    Emit(SessionEvent),
}

/// Action list for a single input; nearly always short.
pub type Actions = SmallVec<[Action; 4]>;

/// The client session state machine.
pub struct SessionMachine {
    config: SessionConfig,
    nick: String,
    state: SessionState,
}

impl SessionMachine {
    /// Create a machine for a fresh connection.
    pub fn new(config: SessionConfig) -> Self {
        let nick = config.nickname.clone();
        Self {
            config,
            nick,
            state: SessionState::Registering,
        }
    }

    /// The nickname currently in use (changes after collision replies).
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Current registration state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Registration lines for a newly opened connection: optional PASS, then
    /// NICK, then USER.
    pub fn start(&mut self) -> Actions {
        let mut out = Actions::new();
        if let Some(ref password) = self.config.password {
            out.push(Action::Send(Line::pass(password.clone())));
        }
        out.push(Action::Send(Line::nick(self.nick.clone())));
        out.push(Action::Send(Line::user(
            self.config.username.clone(),
            self.config.realname.clone(),
        )));
        out
    }

    /// Process one inbound line.
    pub fn feed(&mut self, line: &Line) -> Actions {
        let mut out = Actions::new();

        if line.command_is("PING") {
            // Echo the parameters back unchanged.
            let mut pong = Line::cmd("PONG");
            pong.params = line.params.clone();
            pong.trailing = line.trailing.clone();
            out.push(Action::Send(pong));
        } else if line.command_is("001") {
            self.state = SessionState::Registered;
            debug!(nick = %self.nick, "registration complete");
            if let Some(ref password) = self.config.nickserv_password {
                out.push(Action::Send(Line::privmsg(
                    "NickServ",
                    format!("IDENTIFY {}", password),
                )));
            }
            out.push(Action::Emit(SessionEvent::Connected));
        } else if line.command_is("432") || line.command_is("433") || line.command_is("436") {
            // Erroneous nick, nick in use, nick collision. Retry with a
            // guest nick, but only while registering; the self-loop ends
            // when a welcome reply arrives.
            if self.state == SessionState::Registering {
                let guest = guest_nick();
                warn!(
                    rejected = %self.nick,
                    retry = %guest,
                    code = %line.command,
                    "nickname rejected by server"
                );
                self.nick = guest.clone();
                out.push(Action::Send(Line::nick(guest)));
            }
        } else if line.command_is("JOIN") {
            if let Some(channel) = line.param_or_trailing(0) {
                let source = Source::from_prefix(line.prefix.as_deref());
                // Our own joins (including the rejoin after a kick) are not
                // application events.
                if source.nick != self.nick {
                    out.push(Action::Emit(SessionEvent::Join(JoinEvent {
                        source,
                        channel: channel.to_string(),
                    })));
                }
            }
        } else if line.command_is("PRIVMSG") {
            if let Some(target) = line.params.first() {
                let source = Source::from_prefix(line.prefix.as_deref());
                let text = line.trailing.clone().unwrap_or_default();
                if let Some(ctcp) = Ctcp::parse(&text) {
                    self.handle_ctcp(source, target.clone(), ctcp, &mut out);
                } else {
                    out.push(Action::Emit(SessionEvent::Message(MessageEvent {
                        source,
                        target: target.clone(),
                        text,
                    })));
                }
            }
        } else if line.command_is("PART") {
            if let Some(channel) = line.params.first() {
                out.push(Action::Emit(SessionEvent::Part(PartEvent {
                    source: Source::from_prefix(line.prefix.as_deref()),
                    channel: channel.clone(),
                    reason: line.trailing.clone(),
                })));
            }
        } else if line.command_is("KICK") {
            if let (Some(channel), Some(kicked)) = (line.params.first(), line.params.get(1)) {
                if *kicked == self.nick {
                    // Kicked ourselves: rejoin instead of surfacing an event.
                    warn!(channel = %channel, "kicked from channel, rejoining");
                    out.push(Action::Send(Line::join(channel.clone())));
                } else {
                    out.push(Action::Emit(SessionEvent::Kick(KickEvent {
                        source: Source::from_prefix(line.prefix.as_deref()),
                        channel: channel.clone(),
                        kicked: kicked.clone(),
                        reason: line.trailing.clone(),
                    })));
                }
            }
        }

        out
    }

    fn handle_ctcp(&self, source: Source, target: String, ctcp: Ctcp, out: &mut Actions) {
        match ctcp.kind {
            CtcpKind::Action => {
                out.push(Action::Emit(SessionEvent::Action(MessageEvent {
                    source,
                    target,
                    text: ctcp.body.unwrap_or_default(),
                })));
            }
            CtcpKind::Ping => {
                // Answered in kind, back to the sender.
                out.push(Action::Send(Line::notice(source.nick, ctcp.to_string())));
            }
            CtcpKind::Unknown(kind) => {
                debug!(kind = %kind, "ignoring CTCP");
            }
        }
    }
}

fn guest_nick() -> String {
    format!(
        "{}{}",
        GUEST_NICK_PREFIX,
        rand::thread_rng().gen_range(10_000..100_000)
    )
}
