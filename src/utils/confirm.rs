use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::ErrorMessage;

/// Purpose tag baked into every confirmation token. A token minted for
/// another purpose never confirms an email, even with a valid signature.
const CONFIRM_PURPOSE: &str = "email-confirm";

/// Confirmation links are honored for one hour.
const CONFIRM_TOKEN_MAX_AGE_SECS: i64 = 3600;

/// Claims of a signed email-confirmation token. The subject is the
/// email address being confirmed, not a user id: verification yields
/// the email and the caller resolves it to an account.
#[derive(Debug, Serialize, Deserialize)]
struct ConfirmClaims {
    sub: String,
    purpose: String,
    iat: usize,
    exp: usize,
}

/// Mint a signed confirmation token for `email`, valid for one hour.
pub fn create_confirmation_token(
    email: &str,
    secret: &[u8],
) -> Result<String, jsonwebtoken::errors::Error> {
    create_with_expiry(email, secret, CONFIRM_TOKEN_MAX_AGE_SECS)
}

fn create_with_expiry(
    email: &str,
    secret: &[u8],
    expires_in_seconds: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = ConfirmClaims {
        sub: email.to_string(),
        purpose: CONFIRM_PURPOSE.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(expires_in_seconds)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
}

/// Verify a confirmation token and return the embedded email.
///
/// An elapsed window is `TokenExpired`; a bad signature or a token
/// minted for a different purpose is `TokenInvalid`.
pub fn verify_confirmation_token(token: &str, secret: &[u8]) -> Result<String, ErrorMessage> {
    let validation = Validation::new(Algorithm::HS256);

    let decoded = decode::<ConfirmClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ErrorMessage::TokenExpired,
            _ => ErrorMessage::TokenInvalid,
        })?;

    if decoded.claims.purpose != CONFIRM_PURPOSE {
        return Err(ErrorMessage::TokenInvalid);
    }

    Ok(decoded.claims.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-signing-secret";

    #[test]
    fn roundtrip_yields_email() {
        let token = create_confirmation_token("a@x.com", SECRET).unwrap();
        assert_eq!(verify_confirmation_token(&token, SECRET).unwrap(), "a@x.com");
    }

    #[test]
    fn expired_token_is_expired_not_invalid() {
        // Past the decoder's default 60s leeway.
        let token = create_with_expiry("a@x.com", SECRET, -120).unwrap();
        assert_eq!(
            verify_confirmation_token(&token, SECRET).unwrap_err(),
            ErrorMessage::TokenExpired
        );
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = create_confirmation_token("a@x.com", SECRET).unwrap();
        assert_eq!(
            verify_confirmation_token(&token, b"other-secret").unwrap_err(),
            ErrorMessage::TokenInvalid
        );
    }

    #[test]
    fn wrong_purpose_is_invalid() {
        // Sign a structurally identical token with a different purpose tag.
        let claims = ConfirmClaims {
            sub: "a@x.com".to_string(),
            purpose: "password-reset".to_string(),
            iat: Utc::now().timestamp() as usize,
            exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert_eq!(
            verify_confirmation_token(&token, SECRET).unwrap_err(),
            ErrorMessage::TokenInvalid
        );
    }
}
