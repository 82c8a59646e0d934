//! Line-based tokio codec for the IRC wire format.
//!
//! Frames the inbound byte stream into [`Line`] values and serializes
//! outbound lines, enforcing the 512-byte wire limit in both directions.
//! Inbound bytes are decoded as UTF-8 with a single-byte legacy fallback so
//! legacy-encoded peers never kill the connection.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProtocolError, Result};
use crate::line::Line;

/// Maximum line length in bytes, including the terminator.
pub const MAX_LINE_LEN: usize = 512;

/// Tokio codec that reads and writes newline-terminated IRC lines.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
}

impl LineCodec {
    /// Create a new codec.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Decode raw line bytes, falling back to a legacy single-byte encoding when
/// the peer is not sending UTF-8.
fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => encoding::WINDOWS_1252.decode(bytes).0.into_owned(),
    }
}

impl Decoder for LineCodec {
    type Item = Line;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Line>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let raw = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if raw.len() > MAX_LINE_LEN {
                return Err(ProtocolError::LineTooLong {
                    actual: raw.len(),
                    limit: MAX_LINE_LEN,
                });
            }

            let text = decode_bytes(&raw);
            match Line::parse(&text) {
                Some(line) => Ok(Some(line)),
                // Blank or bare-prefix lines carry nothing; keep scanning.
                None => self.decode(src),
            }
        } else {
            // No complete line yet; remember where the scan stopped.
            self.next_index = src.len();

            if src.len() > MAX_LINE_LEN {
                return Err(ProtocolError::LineTooLong {
                    actual: src.len(),
                    limit: MAX_LINE_LEN,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<Line> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: Line, dst: &mut BytesMut) -> Result<()> {
        let serialized = line.to_string();
        // Must be rejected before anything hits the wire.
        if serialized.len() > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong {
                actual: serialized.len(),
                limit: MAX_LINE_LEN,
            });
        }
        dst.extend_from_slice(serialized.as_bytes());
        Ok(())
    }
}
