use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

pub mod password;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: i64, expiry_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            iat: now.timestamp(),
            exp: (now + Duration::hours(expiry_hours)).timestamp(),
        }
    }
}

/// Expired and malformed tokens are reported separately so the API can return
/// different 401 messages for them.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired!")]
    Expired,
    #[error("Token is invalid!")]
    Invalid,
    #[error("JWT secret is not configured")]
    MissingSecret,
}

pub fn issue_token(user_id: i64, security: &SecurityConfig) -> Result<String, TokenError> {
    if security.jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let claims = Claims::new(user_id, security.jwt_expiry_hours);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(security.jwt_secret.as_bytes()),
    )
    .map_err(|_| TokenError::Invalid)
}

pub fn decode_token(token: &str, security: &SecurityConfig) -> Result<Claims, TokenError> {
    if security.jwt_secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security() -> SecurityConfig {
        SecurityConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 24,
        }
    }

    #[test]
    fn token_roundtrip() {
        let security = security();
        let token = issue_token(42, &security).unwrap();
        let claims = decode_token(&token, &security).unwrap();
        assert_eq!(claims.sub, 42);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_distinguished_from_garbage() {
        let security = security();

        // Expiry far enough in the past to clear the default leeway
        let claims = Claims {
            sub: 1,
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(security.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(decode_token(&token, &security), Err(TokenError::Expired));
        assert_eq!(decode_token("not-a-jwt", &security), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let token = issue_token(1, &security()).unwrap();
        let other = SecurityConfig {
            jwt_secret: "other-secret".to_string(),
            jwt_expiry_hours: 24,
        };
        assert_eq!(decode_token(&token, &other), Err(TokenError::Invalid));
    }
}
