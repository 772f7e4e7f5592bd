use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub const SUBSCRIBE_MODE: &str = "subscribe";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("hub.mode and hub.verify_token are required")]
    MissingParameters,
    #[error("verify token mismatch")]
    TokenMismatch,
}

/// Answers the platform's subscription handshake, returning the challenge
/// to echo back. An unconfigured token never matches.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected_token: Option<&SecretString>,
) -> Result<String, VerificationError> {
    let (Some(mode), Some(token)) = (mode, token) else {
        return Err(VerificationError::MissingParameters);
    };
    let Some(expected_token) = expected_token else {
        return Err(VerificationError::TokenMismatch);
    };

    if mode == SUBSCRIBE_MODE && token == expected_token.expose_secret() {
        Ok(challenge.unwrap_or_default().to_string())
    } else {
        Err(VerificationError::TokenMismatch)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{verify_subscription, VerificationError};

    fn token() -> SecretString {
        SecretString::from("glass-verify".to_string())
    }

    #[test]
    fn matching_token_echoes_challenge() {
        let challenge = verify_subscription(
            Some("subscribe"),
            Some("glass-verify"),
            Some("1158201444"),
            Some(&token()),
        );
        assert_eq!(challenge, Ok("1158201444".to_string()));

        let empty =
            verify_subscription(Some("subscribe"), Some("glass-verify"), None, Some(&token()));
        assert_eq!(empty, Ok(String::new()));
    }

    #[test]
    fn wrong_token_or_mode_is_rejected() {
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("nope"), Some("1"), Some(&token())),
            Err(VerificationError::TokenMismatch)
        );
        assert_eq!(
            verify_subscription(
                Some("unsubscribe"),
                Some("glass-verify"),
                Some("1"),
                Some(&token())
            ),
            Err(VerificationError::TokenMismatch)
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), Some("glass-verify"), Some("1"), None),
            Err(VerificationError::TokenMismatch)
        );
    }

    #[test]
    fn missing_parameters_are_a_bad_request() {
        assert_eq!(
            verify_subscription(None, Some("glass-verify"), Some("1"), Some(&token())),
            Err(VerificationError::MissingParameters)
        );
        assert_eq!(
            verify_subscription(Some("subscribe"), None, None, Some(&token())),
            Err(VerificationError::MissingParameters)
        );
    }
}
