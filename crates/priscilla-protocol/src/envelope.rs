use priscilla_core::config::SERVER_ID;
use serde::{Deserialize, Serialize};

use crate::actions;
use crate::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeKind {
    Message,
    Command,
}

/// Unit exchanged over every connection and through the dispatcher channel.
/// Wire: `{ "type": "command", "source": "abc", "to": "server", "command": {...} }`
///
/// `source` is overwritten with the engaged id before an envelope reaches the
/// dispatcher, so whatever a client puts there after the handshake is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
}

/// Chat payload.
/// Wire: `{ "text": "pris ping", "room": "lobby", "from": "alice", "mentioned": false }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub room: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    /// Set by adapters when the bot was @-mentioned; `text` no longer contains the mention.
    #[serde(default, skip_serializing_if = "is_false")]
    pub mentioned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    /// Filled by the broker when the message is forwarded to an active responder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<MatchInfo>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mention: String,
}

/// Which active registration matched, and the capture groups it produced
/// (`groups[0]` is the whole match; unmatched optional groups are empty).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchInfo {
    pub id: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Command payload.
/// Wire: `{ "action": "register", "id": "weather", "type": "prefix", "data": "^weather (\\w+)",
///          "array": ["weather", "weather <city>"], "options": ["fallthrough"] }`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub action: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    /// Unix seconds; signed into the engagement credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Command {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = data.into();
        self
    }

    pub fn has_option(&self, flag: &str) -> bool {
        self.options.iter().any(|o| o == flag)
    }
}

impl Envelope {
    pub fn command(source: impl Into<String>, to: impl Into<String>, command: Command) -> Self {
        Self {
            kind: EnvelopeKind::Command,
            source: source.into(),
            to: to.into(),
            message: None,
            command: Some(command),
        }
    }

    pub fn message(source: impl Into<String>, to: impl Into<String>, message: Message) -> Self {
        Self {
            kind: EnvelopeKind::Message,
            source: source.into(),
            to: to.into(),
            message: Some(message),
            command: None,
        }
    }

    /// Server → client: engagement accepted, `data` carries the assigned id.
    pub fn proceed(id: &str) -> Self {
        Self::command(SERVER_ID, id, Command::new(actions::PROCEED).with_data(id))
    }

    /// Server → client: engagement refused, `data` carries the reason.
    pub fn terminate(to: &str, reason: &str) -> Self {
        Self::command(SERVER_ID, to, Command::new(actions::TERMINATE).with_data(reason))
    }

    /// Synthetic request injected when a connection's stream ends.
    pub fn disengage(source: &str) -> Self {
        Self::command(source, "", Command::new(actions::DISENGAGE))
    }

    /// Check the envelope carries exactly the payload its `type` names.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let kind = self.kind;
        match kind {
            EnvelopeKind::Message => {
                if self.command.is_some() {
                    return Err(ProtocolError::ConflictingPayload { kind });
                }
                if self.message.is_none() {
                    return Err(ProtocolError::MissingPayload { kind });
                }
            }
            EnvelopeKind::Command => {
                if self.message.is_some() {
                    return Err(ProtocolError::ConflictingPayload { kind });
                }
                match &self.command {
                    None => return Err(ProtocolError::MissingPayload { kind }),
                    Some(cmd) if cmd.action.is_empty() => return Err(ProtocolError::EmptyAction),
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Check this is a well-formed engage command (the only acceptable first envelope).
    pub fn check_engagement(&self) -> Result<(), ProtocolError> {
        self.validate()?;
        if self.action() == Some(actions::ENGAGE) {
            Ok(())
        } else {
            Err(ProtocolError::NotEngage)
        }
    }

    /// The command action, if this is a command envelope.
    pub fn action(&self) -> Option<&str> {
        self.command.as_ref().map(|c| c.action.as_str())
    }

    pub fn is_action(&self, action: &str) -> bool {
        self.kind == EnvelopeKind::Command && self.action() == Some(action)
    }

    /// True when the envelope names a concrete connection rather than the broker.
    pub fn has_destination(&self) -> bool {
        !self.to.is_empty() && self.to != SERVER_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_with_command_is_conflicting() {
        let mut env = Envelope::message("a", "b", Message::default());
        env.command = Some(Command::new("info"));
        assert_eq!(
            env.validate(),
            Err(ProtocolError::ConflictingPayload {
                kind: EnvelopeKind::Message
            })
        );
    }

    #[test]
    fn command_without_payload_is_missing() {
        let mut env = Envelope::command("a", "server", Command::new("info"));
        env.command = None;
        assert_eq!(
            env.validate().unwrap_err().code(),
            "MISSING_PAYLOAD"
        );
    }

    #[test]
    fn empty_action_rejected() {
        let env = Envelope::command("a", "server", Command::default());
        assert_eq!(env.validate(), Err(ProtocolError::EmptyAction));
    }

    #[test]
    fn engagement_requires_engage_action() {
        let engage = Envelope::command("", "", Command::new(actions::ENGAGE));
        assert!(engage.check_engagement().is_ok());

        let other = Envelope::command("", "", Command::new(actions::REGISTER));
        assert_eq!(other.check_engagement(), Err(ProtocolError::NotEngage));

        let msg = Envelope::message("", "", Message::default());
        assert_eq!(msg.check_engagement(), Err(ProtocolError::NotEngage));
    }

    #[test]
    fn destination_excludes_server() {
        let mut env = Envelope::message("a", "server", Message::default());
        assert!(!env.has_destination());
        env.to = String::new();
        assert!(!env.has_destination());
        env.to = "b".into();
        assert!(env.has_destination());
    }

    #[test]
    fn proceed_carries_assigned_id() {
        let env = Envelope::proceed("0123456789abcdef");
        assert_eq!(env.source, SERVER_ID);
        assert_eq!(env.to, "0123456789abcdef");
        assert!(env.is_action(actions::PROCEED));
        assert_eq!(env.command.unwrap().data, "0123456789abcdef");
    }
}
