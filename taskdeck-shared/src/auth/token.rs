/// Bearer token service
///
/// Mints and parses compact signed tokens (JWT, HS256) carrying exactly:
/// subject (account identifier), audience (fixed configuration string),
/// issued-at, expiry, and issuer. The signing secret is process-wide and
/// read-only after startup.
///
/// A token minted for an empty subject signs fine but will never parse:
/// [`parse_token`] rejects empty subjects. Callers must not rely on this to
/// detect missing accounts.
///
/// # Example
///
/// ```
/// use taskdeck_shared::auth::token::{mint_token, parse_token};
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let token = mint_token("T-901", Duration::minutes(30), secret, "taskdeck-users")?;
/// let subject = parse_token(&token, secret, "taskdeck-users")?;
/// assert_eq!(subject, "T-901");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Issuer embedded in every minted token
const ISSUER: &str = "taskdeck";

/// The wire prefix for bearer tokens, case-sensitive, trailing space included
const BEARER_PREFIX: &str = "Bearer ";

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Failed to sign the token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature, audience, issuer or envelope is invalid
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// The subject claim is empty
    #[error("Token has no subject")]
    MissingSubject,
}

/// Claims carried by a taskdeck bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account identifier
    pub sub: String,

    /// Audience: fixed per deployment, prevents cross-deployment replay
    pub aud: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiry (Unix timestamp)
    pub exp: i64,
}

/// Mints a signed token whose subject is `account_id`.
pub fn mint_token(
    account_id: &str,
    ttl: Duration,
    secret: &str,
    audience: &str,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id.to_string(),
        aud: audience.to_string(),
        iss: ISSUER.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, &claims, &key)
        .map_err(|e| TokenError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and extracts its subject.
///
/// Checks, in order enforced by the decoder: envelope shape, signature,
/// expiry, audience, issuer. A structurally valid token with an empty
/// subject is rejected with `MissingSubject`.
pub fn parse_token(token: &str, secret: &str, audience: &str) -> Result<String, TokenError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[audience]);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(format!("Token validation failed: {}", e)),
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(TokenError::MissingSubject);
    }

    Ok(token_data.claims.sub)
}

/// Strips the exact `Bearer ` prefix (case-sensitive) from an Authorization
/// header value. Any other prefix, or none, is rejected by returning `None`.
pub fn strip_bearer(header_value: &str) -> Option<&str> {
    header_value.strip_prefix(BEARER_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";
    const AUDIENCE: &str = "taskdeck-users";

    #[test]
    fn test_mint_and_parse_roundtrip() {
        let token = mint_token("T-901", Duration::minutes(30), SECRET, AUDIENCE).unwrap();
        let subject = parse_token(&token, SECRET, AUDIENCE).unwrap();
        assert_eq!(subject, "T-901");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = mint_token("T-901", Duration::minutes(30), SECRET, AUDIENCE).unwrap();
        let result = parse_token(&token, "another-secret-also-32-bytes-long!!", AUDIENCE);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = mint_token("T-901", Duration::minutes(30), SECRET, "other-deployment").unwrap();
        let result = parse_token(&token, SECRET, AUDIENCE);
        assert!(matches!(result, Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = mint_token("T-901", Duration::minutes(-5), SECRET, AUDIENCE).unwrap();
        let result = parse_token(&token, SECRET, AUDIENCE);
        assert!(matches!(result, Err(TokenError::Expired)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = mint_token("T-901", Duration::minutes(30), SECRET, AUDIENCE).unwrap();

        // Flip a byte in the payload segment
        let mut bytes = token.into_bytes();
        let mid = bytes.len() / 2;
        bytes[mid] = if bytes[mid] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        assert!(parse_token(&tampered, SECRET, AUDIENCE).is_err());
    }

    #[test]
    fn test_empty_subject_is_unverifiable() {
        let token = mint_token("", Duration::minutes(30), SECRET, AUDIENCE).unwrap();
        let result = parse_token(&token, SECRET, AUDIENCE);
        assert!(matches!(result, Err(TokenError::MissingSubject)));
    }

    #[test]
    fn test_garbage_envelope_rejected() {
        assert!(parse_token("not-a-jwt", SECRET, AUDIENCE).is_err());
        assert!(parse_token("", SECRET, AUDIENCE).is_err());
    }

    #[test]
    fn test_strip_bearer_is_exact() {
        assert_eq!(strip_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(strip_bearer("bearer abc.def.ghi"), None);
        assert_eq!(strip_bearer("BEARER abc.def.ghi"), None);
        assert_eq!(strip_bearer("Token abc.def.ghi"), None);
        assert_eq!(strip_bearer("abc.def.ghi"), None);
        assert_eq!(strip_bearer("Bearer"), None);
    }
}
