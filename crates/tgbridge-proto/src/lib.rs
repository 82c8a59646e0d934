//! # tgbridge-proto
//!
//! The IRC client protocol engine behind the `tgbridged` daemon.
//!
//! This crate owns everything between the socket and the application:
//!
//! - Line grammar parsing and serialization ([`Line`])
//! - Byte framing with the 512-byte wire limit and a legacy-encoding
//!   fallback ([`LineCodec`])
//! - TCP/TLS transport with OS keepalive ([`Transport`])
//! - CTCP sub-message handling ([`Ctcp`])
//! - A sans-IO session state machine driving registration, keepalive and
//!   event extraction ([`SessionMachine`])
//!
//! The state machine performs no I/O; the caller owns the socket and applies
//! the actions the machine produces. See [`session`] for the driving
//! contract.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod codec;
pub mod ctcp;
pub mod error;
pub mod event;
pub mod format;
pub mod line;
pub mod session;
pub mod transport;

pub use self::codec::{LineCodec, MAX_LINE_LEN};
pub use self::ctcp::{Ctcp, CtcpKind};
pub use self::error::ProtocolError;
pub use self::event::{JoinEvent, KickEvent, MessageEvent, PartEvent, SessionEvent, Source};
pub use self::line::Line;
pub use self::session::{Action, SessionConfig, SessionMachine, SessionState};
pub use self::transport::{TlsMode, Transport, TransportConfig, TransportReader, TransportWriter};
