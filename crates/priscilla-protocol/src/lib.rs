pub mod actions;
pub mod envelope;
pub mod error;

pub use envelope::{Command, Envelope, EnvelopeKind, MatchInfo, Message, UserInfo};
pub use error::ProtocolError;
