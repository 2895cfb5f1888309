//! JWT token validation and verification-token minting.
//!
//! Bearer principals are issued by the auth collaborator; this service only
//! validates them. Verification tokens for approved purchase requests are
//! minted here, signed with the same secret infrastructure.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{Principal, Role};

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in minutes.
    pub access_token_expires_minutes: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_token_expires_minutes: 15,
        }
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token decoding failed.
    #[error("failed to decode token: {0}")]
    DecodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token is invalid.
    #[error("invalid token")]
    Invalid,
}

/// Payload of a purchase-request verification token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationPayload {
    /// The approved request.
    pub request_id: i64,
    /// Approval timestamp (unix seconds).
    pub approved_at: i64,
    /// Expiration timestamp; verification tokens are long-lived.
    pub exp: i64,
}

/// JWT service for token operations.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("config", &self.config)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a new JWT service with the given configuration.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generates an access token for a principal.
    ///
    /// Exposed for the seeder and tests; production tokens come from the
    /// auth collaborator.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn generate_access_token(
        &self,
        user_id: i64,
        name: &str,
        role: Role,
        school_id: i64,
        department_id: Option<i64>,
    ) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::minutes(self.config.access_token_expires_minutes);
        let claims = Principal::new(user_id, name, role, school_id, department_id, expires_at);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Validates and decodes a bearer token into a principal.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token has expired.
    /// Returns `JwtError::DecodingError` if the token is malformed.
    pub fn validate_token(&self, token: &str) -> Result<Principal, JwtError> {
        let validation = Validation::default();

        decode::<Principal>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::DecodingError(e.to_string()),
            })
    }

    /// Mints a verification token binding `request_id` to its approval time.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if token generation fails.
    pub fn mint_verification_token(
        &self,
        request_id: i64,
        approved_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let payload = VerificationPayload {
            request_id,
            approved_at: approved_at.timestamp(),
            // Ten years; the token outlives any review cycle.
            exp: (approved_at + Duration::days(3650)).timestamp(),
        };

        encode(&Header::default(), &payload, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Verifies a verification token and returns its payload.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Invalid` if the signature does not verify or the
    /// payload names a different request.
    pub fn verify_verification_token(
        &self,
        request_id: i64,
        token: &str,
    ) -> Result<VerificationPayload, JwtError> {
        let validation = Validation::default();

        let payload = decode::<VerificationPayload>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::DecodingError(e.to_string()),
            })?;

        if payload.request_id != request_id {
            return Err(JwtError::Invalid);
        }

        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new(JwtConfig {
            secret: "test-secret-key-for-testing".to_string(),
            access_token_expires_minutes: 15,
        })
    }

    #[test]
    fn test_generate_and_validate_access_token() {
        let service = create_test_service();

        let token = service
            .generate_access_token(42, "Mehmet", Role::Moderator, 3, None)
            .unwrap();
        let principal = service.validate_token(&token).unwrap();

        assert_eq!(principal.user_id(), 42);
        assert_eq!(principal.role, Role::Moderator);
        assert_eq!(principal.school_id, 3);
        assert_eq!(principal.department_id, None);
    }

    #[test]
    fn test_invalid_token() {
        let service = create_test_service();
        let result = service.validate_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_verification_token_round_trip() {
        let service = create_test_service();
        let approved_at = Utc::now();

        let token = service.mint_verification_token(99, approved_at).unwrap();
        let payload = service.verify_verification_token(99, &token).unwrap();

        assert_eq!(payload.request_id, 99);
        assert_eq!(payload.approved_at, approved_at.timestamp());
    }

    #[test]
    fn test_verification_token_wrong_request() {
        let service = create_test_service();
        let token = service.mint_verification_token(99, Utc::now()).unwrap();

        assert!(matches!(
            service.verify_verification_token(100, &token),
            Err(JwtError::Invalid)
        ));
    }

    #[test]
    fn test_verification_token_tampered() {
        let service = create_test_service();
        let other = JwtService::new(JwtConfig {
            secret: "a-different-secret".to_string(),
            access_token_expires_minutes: 15,
        });

        let token = other.mint_verification_token(99, Utc::now()).unwrap();
        assert!(service.verify_verification_token(99, &token).is_err());
    }
}
