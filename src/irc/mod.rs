//! The IRC side of the bridge: connection lifecycle and outbound sends.

mod client;

pub use client::{IrcClient, IrcSender, RetryExhausted};
