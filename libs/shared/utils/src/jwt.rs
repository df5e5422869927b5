use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{SessionClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("JWT secret is not set")]
    MissingSecret,
    #[error("Invalid token format")]
    Malformed,
    #[error("Invalid signature encoding")]
    BadSignatureEncoding,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Invalid claims")]
    BadClaims,
    #[error("Token expired")]
    Expired,
}

/// Verifies an HS256 session token from the hosted auth service and returns
/// the signed-in user. `now` decides expiry.
pub fn validate_token(token: &str, jwt_secret: &str, now: DateTime<Utc>) -> Result<User, TokenError> {
    if jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(TokenError::Malformed),
    };

    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        TokenError::BadSignatureEncoding
    })?;

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| TokenError::MissingSecret)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature).map_err(|_| {
        debug!("Token signature verification failed");
        TokenError::BadSignature
    })?;

    let claims_json = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| TokenError::BadClaims)?;
    let claims: SessionClaims = serde_json::from_slice(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        TokenError::BadClaims
    })?;

    if let Some(exp) = claims.exp {
        if exp < now.timestamp() {
            debug!("Token expired at {} (now: {})", exp, now.timestamp());
            return Err(TokenError::Expired);
        }
    }

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        signed_in_at: claims.iat.and_then(|iat| Utc.timestamp_opt(iat, 0).single()),
    };

    debug!("Token validated for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::clock::{Clock, FixedClock};
    use crate::test_utils::{clinic_instant, SessionTokens, TestStaff};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_valid_token_yields_user() {
        let clock = FixedClock::new(clinic_instant(2026, 10, 19, 10, 0));
        let staff = TestStaff::reception();
        let token = SessionTokens::valid_at(&staff, SECRET, &clock);

        let user = validate_token(&token, SECRET, clock.now()).unwrap();
        assert_eq!(user.id, staff.id);
        assert_eq!(user.email.as_deref(), Some("reception@clinic.example"));
        assert_eq!(user.signed_in_at, Some(clock.now()));
    }

    #[test]
    fn test_expiry_follows_the_given_instant() {
        let clock = FixedClock::new(clinic_instant(2026, 10, 19, 10, 0));
        let token = SessionTokens::valid_at(&TestStaff::reception(), SECRET, &clock);

        clock.set(clinic_instant(2026, 10, 19, 12, 0));
        assert_matches!(validate_token(&token, SECRET, clock.now()), Err(TokenError::Expired));
    }

    #[test]
    fn test_rejections() {
        let clock = FixedClock::new(clinic_instant(2026, 10, 19, 10, 0));
        let staff = TestStaff::reception();

        assert_matches!(
            validate_token(&SessionTokens::expired_at(&staff, SECRET, &clock), SECRET, clock.now()),
            Err(TokenError::Expired)
        );
        assert_matches!(
            validate_token(&SessionTokens::forged(&staff, &clock), SECRET, clock.now()),
            Err(TokenError::BadSignature)
        );
        assert_matches!(validate_token("only.two", SECRET, clock.now()), Err(TokenError::Malformed));
        assert_matches!(validate_token("a.b.c", "", clock.now()), Err(TokenError::MissingSecret));
    }
}
