//! Handler-layer error types.
//!
//! Event handlers report failures through [`HandlerError`]; the dispatcher
//! logs them and carries on. Network-layer faults never reach this type —
//! they stay inside the connection loops.

use thiserror::Error;

/// Failures an event handler can surface.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("telegram api error: {0}")]
    Telegram(#[from] crate::telegram::TelegramError),

    #[error("irc protocol error: {0}")]
    Irc(#[from] tgbridge_proto::ProtocolError),

    #[error("web backend error: {0}")]
    Web(#[from] crate::web::WebError),
}

/// Result type for event handlers.
pub type HandlerResult = Result<(), HandlerError>;
