//! Access tokens and refresh tokens.
//!
//! Access tokens are short-lived HS256 JWTs carrying the user id and role.
//! Refresh tokens are opaque random strings handed to the client once; the
//! server keeps only their SHA-256 digest in `user_sessions`.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use studiora_core::types::DbId;
use uuid::Uuid;

/// `iss` claim written into and required from every access token.
pub const TOKEN_ISSUER: &str = "studiora";

const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: DbId,
    /// `client`, `owner` or `admin`.
    pub role: String,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET`               | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`    |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `30`    |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is missing or empty, or an expiry is not a number.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        let access_token_expiry_mins: i64 = std::env::var("JWT_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_MINS.to_string())
            .parse()
            .expect("JWT_ACCESS_EXPIRY_MINS must be a valid i64");

        let refresh_token_expiry_days: i64 = std::env::var("JWT_REFRESH_EXPIRY_DAYS")
            .unwrap_or_else(|_| DEFAULT_REFRESH_EXPIRY_DAYS.to_string())
            .parse()
            .expect("JWT_REFRESH_EXPIRY_DAYS must be a valid i64");

        Self {
            secret,
            access_token_expiry_mins,
            refresh_token_expiry_days,
        }
    }
}

pub fn generate_access_token(
    user_id: DbId,
    role: &str,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        iss: TOKEN_ISSUER.to_string(),
        exp: now + config.access_token_expiry_mins * 60,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature, expiry and issuer, returning the claims.
pub fn validate_token(
    token: &str,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_issuer(&[TOKEN_ISSUER]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// New refresh token as `(plaintext, sha256_hex)`.
///
/// The plaintext is two concatenated v4 UUIDs in simple form (64 hex chars).
pub fn generate_refresh_token() -> (String, String) {
    let plaintext = format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );
    let hash = hash_refresh_token(&plaintext);
    (plaintext, hash)
}

pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "studiora-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 30,
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn access_token_round_trips_claims() {
        let token = generate_access_token(7, "owner", &config()).unwrap();
        let claims = validate_token(&token, &config()).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, "owner");
        assert_eq!(claims.iss, TOKEN_ISSUER);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: "client".into(),
            iss: TOKEN_ISSUER.into(),
            // Past the default 60 s leeway.
            exp: now - 300,
            iat: now - 1200,
            jti: Uuid::new_v4().to_string(),
        };
        let token = sign(&claims, &config().secret);
        assert!(validate_token(&token, &config()).is_err());
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: 1,
            role: "admin".into(),
            iss: "someone-else".into(),
            exp: now + 600,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        let token = sign(&claims, &config().secret);
        assert!(validate_token(&token, &config()).is_err());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let mut other = config();
        other.secret = "a-completely-different-secret".into();
        let token = generate_access_token(1, "client", &other).unwrap();
        assert!(validate_token(&token, &config()).is_err());
    }

    #[test]
    fn refresh_tokens_are_unique_and_hash_stably() {
        let (a, hash_a) = generate_refresh_token();
        let (b, _) = generate_refresh_token();

        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(hash_refresh_token(&a), hash_a);
        assert_eq!(hash_a.len(), 64);
    }
}
