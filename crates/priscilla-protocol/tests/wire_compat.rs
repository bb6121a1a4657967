// Verify the wire format existing adapters and responders speak.

use priscilla_protocol::actions;
use priscilla_protocol::{Envelope, EnvelopeKind};

#[test]
fn engage_from_adapter_parses() {
    let json = r#"{"type":"command","source":"slack","command":{"action":"engage","type":"adapter","time":1700000000,"data":"ab12"}}"#;
    let env: Envelope = serde_json::from_str(json).unwrap();

    assert_eq!(env.kind, EnvelopeKind::Command);
    assert_eq!(env.source, "slack");
    assert!(env.to.is_empty());
    let cmd = env.command.as_ref().unwrap();
    assert_eq!(cmd.action, actions::ENGAGE);
    assert_eq!(cmd.kind, actions::CLIENT_ADAPTER);
    assert_eq!(cmd.time, Some(1_700_000_000));
    assert!(env.check_engagement().is_ok());
}

#[test]
fn register_command_parses_array_and_options() {
    let json = r#"{"type":"command","source":"weather","to":"server","command":{"action":"register","id":"w1","type":"prefix","data":"^weather (\\w+)$","array":["weather","weather <city>"],"options":["fallthrough"]}}"#;
    let env: Envelope = serde_json::from_str(json).unwrap();

    let cmd = env.command.unwrap();
    assert_eq!(cmd.data, r"^weather (\w+)$");
    assert_eq!(cmd.array, vec!["weather", "weather <city>"]);
    assert!(cmd.has_option(actions::OPTION_FALLTHROUGH));
}

#[test]
fn adapter_message_parses_with_missing_optional_fields() {
    let json = r#"{"type":"message","source":"slack","message":{"text":"pris ping","room":"lobby"}}"#;
    let env: Envelope = serde_json::from_str(json).unwrap();

    assert!(env.validate().is_ok());
    let msg = env.message.unwrap();
    assert_eq!(msg.text, "pris ping");
    assert_eq!(msg.room, "lobby");
    assert!(!msg.mentioned);
    assert!(msg.matched.is_none());
}

#[test]
fn terminate_serialization_omits_empty_fields() {
    let env = Envelope::terminate("slack", "bad credential");
    let json = serde_json::to_string(&env).unwrap();

    assert!(json.contains(r#""type":"command""#));
    assert!(json.contains(r#""source":"server""#));
    assert!(json.contains(r#""action":"terminate""#));
    assert!(json.contains(r#""data":"bad credential""#));
    // no message payload, no empty arrays
    assert!(!json.contains(r#""message""#));
    assert!(!json.contains(r#""array""#));
    assert!(!json.contains(r#""options""#));
}

#[test]
fn unknown_type_is_rejected_by_decoder() {
    let json = r#"{"type":"event","source":"x"}"#;
    assert!(serde_json::from_str::<Envelope>(json).is_err());
}

#[test]
fn unknown_fields_are_ignored() {
    let json = r#"{"type":"message","source":"x","to":"y","message":{"text":"hi","extra":1},"future":true}"#;
    let env: Envelope = serde_json::from_str(json).unwrap();
    assert_eq!(env.to, "y");
}
