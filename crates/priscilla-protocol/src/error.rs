use thiserror::Error;

use crate::envelope::EnvelopeKind;

/// Structural problems with an envelope that decoded as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("{kind:?} envelope is missing its payload")]
    MissingPayload { kind: EnvelopeKind },

    #[error("{kind:?} envelope carries both a message and a command")]
    ConflictingPayload { kind: EnvelopeKind },

    #[error("command has an empty action")]
    EmptyAction,

    #[error("first envelope must be an engage command")]
    NotEngage,
}

impl ProtocolError {
    pub fn code(&self) -> &'static str {
        match self {
            ProtocolError::MissingPayload { .. } => "MISSING_PAYLOAD",
            ProtocolError::ConflictingPayload { .. } => "CONFLICTING_PAYLOAD",
            ProtocolError::EmptyAction => "EMPTY_ACTION",
            ProtocolError::NotEngage => "NOT_ENGAGE",
        }
    }
}
