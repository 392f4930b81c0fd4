//! Signs and verifies access and refresh tokens with one shared HMAC secret.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use tally_config::{TokenConfig, MAX_TOKEN_TTL_SECS};
use tally_models::auth::{AccessClaims, RefreshClaims, SignedAccess, SignedRefresh};
use tally_models::error::{slugs, AppError, AppResult};

/// Access claims for `user_id`. `exp` is stamped by [`TokenCodec::create_access`].
pub fn access_claims(user_id: Uuid) -> AccessClaims {
    AccessClaims { user_id, exp: 0 }
}

/// Refresh claims for `user_id`. `jti` and `exp` are stamped by
/// [`TokenCodec::create_refresh`].
pub fn refresh_claims(user_id: Uuid) -> RefreshClaims {
    RefreshClaims {
        jti: Uuid::nil(),
        user_id,
        exp: 0,
    }
}

/// Lifetimes past [`MAX_TOKEN_TTL_SECS`] are clamped to it.
fn bounded_ttl(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_TOKEN_TTL_SECS) as i64)
}

pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(config: &TokenConfig) -> Self {
        let secret = config.secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: bounded_ttl(config.access_ttl_secs),
            refresh_ttl: bounded_ttl(config.refresh_ttl_secs),
            validation,
        }
    }

    pub fn create_access(&self, mut claims: AccessClaims) -> AppResult<SignedAccess> {
        claims.exp = (Utc::now() + self.access_ttl).timestamp();
        let token = self.sign(&claims)?;
        Ok(SignedAccess { claims, token })
    }

    /// Every call assigns a fresh random `jti`.
    pub fn create_refresh(&self, mut claims: RefreshClaims) -> AppResult<SignedRefresh> {
        claims.jti = Uuid::new_v4();
        claims.exp = (Utc::now() + self.refresh_ttl).timestamp();
        let token = self.sign(&claims)?;
        Ok(SignedRefresh { claims, token })
    }

    pub fn validate_access(&self, token: &str) -> AppResult<SignedAccess> {
        let claims = self.verify::<AccessClaims>(token)?;
        Ok(SignedAccess {
            claims,
            token: token.to_string(),
        })
    }

    /// A token that fails to parse or verify is an error here, never an
    /// empty set of claims.
    pub fn validate_refresh(&self, token: &str) -> AppResult<SignedRefresh> {
        let claims = self.verify::<RefreshClaims>(token)?;
        Ok(SignedRefresh {
            claims,
            token: token.to_string(),
        })
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::unknown(format!("Token signing failed: {e}"), slugs::COULD_NOT_AUTHORIZE_USER))
    }

    fn verify<T: DeserializeOwned>(&self, token: &str) -> AppResult<T> {
        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let message = match e.kind() {
                    JwtErrorKind::ExpiredSignature => "Token expired",
                    JwtErrorKind::InvalidAlgorithm => "Unexpected signing method",
                    JwtErrorKind::InvalidSignature => "Invalid token signature",
                    _ => "Invalid token",
                };
                AppError::authorization(message, slugs::INVALID_TOKEN)
            })
    }
}
