//! JWT access and refresh tokens
//!
//! Both are HS256 tokens signed with separate secrets. Each carries the id
//! of the session it was issued for, so revoking the session revokes them.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::Error as JwtError, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::models::UserRole;

pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Claims of a short-lived access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: i64,
    pub role: UserRole,
    /// Session id
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// Claims of a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: i64,
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly issued token pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Issues and verifies tokens
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_token_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_token_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_token_secret.as_bytes()),
            access_ttl: Duration::minutes(config.access_token_ttl_minutes),
            refresh_ttl: Duration::days(config.refresh_token_ttl_days),
        }
    }

    /// Lifetime of refresh tokens and of the sessions behind them
    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, user_id: i64, role: UserRole, session_id: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id,
            role,
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.access_encoding)
    }

    pub fn issue_refresh(&self, user_id: i64, session_id: &str) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = RefreshClaims {
            sub: user_id,
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.refresh_encoding)
    }

    pub fn issue_pair(&self, user_id: i64, role: UserRole, session_id: &str) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, role, session_id)?,
            refresh_token: self.issue_refresh(user_id, session_id)?,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: self.access_ttl_seconds(),
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, JwtError> {
        decode::<AccessClaims>(token, &self.access_decoding, &Validation::default()).map(|data| data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default()).map(|data| data.claims)
    }
}
