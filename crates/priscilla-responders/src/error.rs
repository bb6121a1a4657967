use thiserror::Error;

/// Errors raised while compiling responder config or handling a `register` command.
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid help command `{command}`: {source}")]
    InvalidHelpCommand {
        command: String,
        #[source]
        source: regex::Error,
    },

    #[error("passive responder `{name}` must specify at least one match")]
    MissingMatch { name: String },

    #[error("passive responder `{name}` must have a 'cmd' parameter")]
    MissingCmd { name: String },

    #[error("passive responder `{name}` is missing help or help-commands")]
    MissingHelp { name: String },

    #[error("register command missing field: {field}")]
    MissingField { field: &'static str },

    #[error("register command `array` must hold [help-command, help-text], got {len} element(s)")]
    BadHelpArray { len: usize },

    #[error("unknown responder classification: `{class}`")]
    UnknownClass { class: String },
}

impl ResponderError {
    pub fn code(&self) -> &'static str {
        match self {
            ResponderError::InvalidPattern { .. } => "INVALID_PATTERN",
            ResponderError::InvalidHelpCommand { .. } => "INVALID_HELP_COMMAND",
            ResponderError::MissingMatch { .. } => "MISSING_MATCH",
            ResponderError::MissingCmd { .. } => "MISSING_CMD",
            ResponderError::MissingHelp { .. } => "MISSING_HELP",
            ResponderError::MissingField { .. } => "MISSING_FIELD",
            ResponderError::BadHelpArray { .. } => "BAD_HELP_ARRAY",
            ResponderError::UnknownClass { .. } => "UNKNOWN_CLASS",
        }
    }
}

pub type Result<T> = std::result::Result<T, ResponderError>;
