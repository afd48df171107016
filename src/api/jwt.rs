use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::AuthConfig;
use crate::errors::{Result, StudioError};

/// Global cached JwtService instance
static JWT_SERVICE: OnceLock<JwtService> = OnceLock::new();

/// Get the cached JwtService instance
///
/// The service is initialized once from the static config on first use.
pub fn get_jwt_service() -> &'static JwtService {
    JWT_SERVICE.get_or_init(|| JwtService::from_config(&crate::config::get_config().auth))
}

/// User token claims
///
/// Tokens are issued by the hosted auth provider; `sub` is the user's UUID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// JWT Service for validating (and locally issuing) user tokens
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    leeway_secs: u64,
    issued_token_minutes: u64,
    configured: bool,
}

impl JwtService {
    pub fn new(secret: &str, leeway_secs: u64, issued_token_minutes: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            leeway_secs,
            issued_token_minutes,
            configured: !secret.is_empty(),
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        if auth.jwt_secret.is_empty() {
            tracing::warn!("JWT secret not configured, all user requests will be rejected");
        }
        Self::new(
            &auth.jwt_secret,
            auth.token_leeway_secs,
            auth.issued_token_minutes,
        )
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway_secs;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }

    /// Issue a token for `user_id` (CLI and tests)
    pub fn issue_token(&self, user_id: &str, email: Option<&str>) -> Result<String> {
        if !self.configured {
            return Err(StudioError::configuration("JWT secret not configured"));
        }
        uuid::Uuid::parse_str(user_id)
            .map_err(|_| StudioError::validation("User id must be a UUID"))?;

        let now = Utc::now();
        let claims = UserClaims {
            sub: user_id.to_string(),
            email: email.map(String::from),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.issued_token_minutes as i64)).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| StudioError::configuration(format!("Failed to sign token: {}", e)))
    }

    /// Validate a bearer token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<UserClaims> {
        if !self.configured {
            return Err(StudioError::unauthorized("Authentication is not configured"));
        }
        let data = decode::<UserClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| StudioError::unauthorized(format!("Invalid token: {}", e)))?;

        uuid::Uuid::parse_str(&data.claims.sub)
            .map_err(|_| StudioError::unauthorized("Invalid token subject"))?;
        Ok(data.claims)
    }
}
