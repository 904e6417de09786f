//! Session tokens.
//!
//! An access token is an HS256 JWT issued by `buildwatch` and carrying the
//! caller's role and LGU-PMT sub-role, so handlers can gate workflow steps
//! without a user lookup. A refresh token is an opaque random string; the
//! `user_sessions` row keeps only its SHA-256.

use buildwatch_core::hashing::sha256_hex;
use buildwatch_core::types::{DbId, Timestamp};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `iss` claim stamped on and required of every access token.
pub const TOKEN_ISSUER: &str = "buildwatch";

const REFRESH_TOKEN_LENGTH: usize = 48;
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 60;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: DbId,
    /// `EIU`, `LGU-IU`, `LGU-PMT`, `SYS.AD` or `EMS`.
    pub role: String,
    #[serde(default)]
    pub sub_role: Option<String>,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// Reads `JWT_SECRET` (required, non-empty), `JWT_ACCESS_EXPIRY_MINS`
    /// (default 60) and `JWT_REFRESH_EXPIRY_DAYS` (default 7).
    ///
    /// # Panics
    ///
    /// On a missing secret or a non-numeric lifetime. Called once at startup.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        Self {
            secret,
            access_token_expiry_mins: lifetime_from_env(
                "JWT_ACCESS_EXPIRY_MINS",
                DEFAULT_ACCESS_EXPIRY_MINS,
            ),
            refresh_token_expiry_days: lifetime_from_env(
                "JWT_REFRESH_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
            ),
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    pub fn access_expires_in(&self) -> i64 {
        self.access_token_expiry_mins * 60
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation
    }
}

fn lifetime_from_env(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => value,
            _ => panic!("{name} must be a positive integer, got '{raw}'"),
        },
        Err(_) => default,
    }
}

/// Everything a login or refresh hands out. `refresh_token_hash` and
/// `refresh_expires_at` go into the session row; the plaintext goes to the
/// client only.
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_hash: String,
    pub refresh_expires_at: Timestamp,
}

pub fn issue_session_tokens(
    user_id: DbId,
    role: &str,
    sub_role: Option<&str>,
    config: &JwtConfig,
) -> Result<SessionTokens, jsonwebtoken::errors::Error> {
    let access_token = generate_access_token(user_id, role, sub_role, config)?;
    let refresh_token = generate_refresh_token();
    Ok(SessionTokens {
        refresh_token_hash: hash_refresh_token(&refresh_token),
        refresh_token,
        access_token,
        refresh_expires_at: Utc::now() + Duration::days(config.refresh_token_expiry_days),
    })
}

pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    sub_role: Option<&str>,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        sub_role: sub_role.map(str::to_string),
        iss: TOKEN_ISSUER.to_string(),
        iat: now,
        exp: now + config.access_expires_in(),
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Checks signature, expiry and issuer.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &config.validation(),
    )
    .map(|data| data.claims)
}

fn generate_refresh_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

pub fn hash_refresh_token(token: &str) -> String {
    sha256_hex(token)
}
