use std::fmt;
use std::str::FromStr;

use priscilla_protocol::{actions, Command};
use regex::{Captures, Regex};

use crate::error::{ResponderError, Result};

/// Which inbound messages a registration is eligible to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponderClass {
    Prefix,
    NoPrefix,
    Mention,
    Unhandled,
}

impl FromStr for ResponderClass {
    type Err = ResponderError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            actions::CLASS_PREFIX => Ok(Self::Prefix),
            actions::CLASS_NOPREFIX => Ok(Self::NoPrefix),
            actions::CLASS_MENTION => Ok(Self::Mention),
            actions::CLASS_UNHANDLED => Ok(Self::Unhandled),
            other => Err(ResponderError::UnknownClass {
                class: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ResponderClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Prefix => actions::CLASS_PREFIX,
            Self::NoPrefix => actions::CLASS_NOPREFIX,
            Self::Mention => actions::CLASS_MENTION,
            Self::Unhandled => actions::CLASS_UNHANDLED,
        };
        f.write_str(s)
    }
}

/// A pattern registered at runtime by a connected responder.
#[derive(Debug, Clone)]
pub struct ActiveResponder {
    pattern: Regex,
    /// Connection id of the registering responder.
    pub source: String,
    /// Responder-assigned id, echoed back in `message.matched.id`.
    pub id: String,
    pub match_next: bool,
    pub help_cmd: String,
    pub help: String,
    pub class: ResponderClass,
}

impl ActiveResponder {
    /// Build a registration from a `register` command sent by `source`.
    ///
    /// Expects `data` = pattern, `id` = responder id, `type` = classification
    /// and `array` = `[help-command, help-text]`.
    pub fn from_register(source: &str, cmd: &Command) -> Result<Self> {
        if cmd.data.is_empty() {
            return Err(ResponderError::MissingField { field: "data" });
        }
        if cmd.id.is_empty() {
            return Err(ResponderError::MissingField { field: "id" });
        }
        if cmd.kind.is_empty() {
            return Err(ResponderError::MissingField { field: "type" });
        }
        let class: ResponderClass = cmd.kind.parse()?;

        let [help_cmd, help] = cmd.array.as_slice() else {
            return Err(ResponderError::BadHelpArray {
                len: cmd.array.len(),
            });
        };

        let pattern = Regex::new(&cmd.data).map_err(|source| ResponderError::InvalidPattern {
            pattern: cmd.data.clone(),
            source,
        })?;

        Ok(Self {
            pattern,
            source: source.to_string(),
            id: cmd.id.clone(),
            match_next: cmd.has_option(actions::OPTION_FALLTHROUGH),
            help_cmd: help_cmd.clone(),
            help: help.clone(),
            class,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.pattern.captures(text)
    }
}
