//! Engagement credential: `data` = hex(HMAC-SHA256(secret, "{time}{source}")).
//!
//! `time` is the client's unix timestamp in seconds and must be within
//! [`ENGAGE_MAX_SKEW_SECS`] of ours, which bounds how long a captured engage
//! command can be replayed.

use hmac::{Hmac, Mac};
use priscilla_core::config::ENGAGE_MAX_SKEW_SECS;
use priscilla_protocol::Command;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the credential a client with `secret` would send.
pub fn sign(secret: &str, time: i64, source: &str) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(format!("{}{}", time, source).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify the engage command sent with requested id `source`.
///
/// An empty `secret` accepts every engagement.
pub fn verify_engagement(cmd: &Command, source: &str, secret: &str, now: i64) -> Result<(), String> {
    if secret.is_empty() {
        return Ok(());
    }

    let time = cmd
        .time
        .ok_or_else(|| "engage command missing 'time'".to_string())?;
    if (now - time).abs() > ENGAGE_MAX_SKEW_SECS {
        return Err(format!(
            "engage time {} outside allowed skew of {}s",
            time, ENGAGE_MAX_SKEW_SECS
        ));
    }

    let expected = hex::decode(&cmd.data)
        .map_err(|_| "engage credential is not valid hex".to_string())?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "invalid HMAC key length".to_string())?;
    mac.update(format!("{}{}", time, source).as_bytes());

    mac.verify_slice(&expected)
        .map_err(|_| "engage credential mismatch".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use priscilla_protocol::actions;

    const NOW: i64 = 1_700_000_000;

    fn engage(time: Option<i64>, data: String) -> Command {
        Command {
            action: actions::ENGAGE.into(),
            time,
            data,
            ..Default::default()
        }
    }

    #[test]
    fn signed_credential_verifies() {
        let data = sign("s3cret", NOW, "slack").unwrap();
        assert!(verify_engagement(&engage(Some(NOW), data), "slack", "s3cret", NOW + 5).is_ok());
    }

    #[test]
    fn credential_bound_to_requested_id() {
        let data = sign("s3cret", NOW, "slack").unwrap();
        let err = verify_engagement(&engage(Some(NOW), data), "irc", "s3cret", NOW).unwrap_err();
        assert_eq!(err, "engage credential mismatch");
    }

    #[test]
    fn wrong_secret_rejected() {
        let data = sign("other", NOW, "").unwrap();
        assert!(verify_engagement(&engage(Some(NOW), data), "", "s3cret", NOW).is_err());
    }

    #[test]
    fn stale_time_rejected() {
        let data = sign("s3cret", NOW, "a").unwrap();
        let err = verify_engagement(&engage(Some(NOW), data), "a", "s3cret", NOW + 61).unwrap_err();
        assert!(err.contains("skew"));
    }

    #[test]
    fn missing_time_and_bad_hex_rejected() {
        assert!(verify_engagement(&engage(None, "00".into()), "a", "s", NOW).is_err());
        assert!(verify_engagement(&engage(Some(NOW), "zz".into()), "a", "s", NOW).is_err());
    }

    #[test]
    fn empty_secret_accepts_anything() {
        assert!(verify_engagement(&engage(None, String::new()), "a", "", NOW).is_ok());
    }
}
