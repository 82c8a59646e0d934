//! Text formatting converters between the two platforms.

pub mod entities;
pub mod irc;
pub mod nick;

pub use entities::EntityConverter;
pub use irc::StyleConverter;
pub use nick::NickColorizer;
