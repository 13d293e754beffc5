use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::config::JwtConfig;
use crate::error::{ApiError, AuthError};
use crate::state::AppState;

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.jwt.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            ttl: Duration::from_secs((ttl_minutes as u64) * 60),
        }
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            email: Some(email.to_string()),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Checks signature and expiry, then that the identity claims are present.
    pub fn verify(&self, token: &str) -> Result<(Uuid, String), AuthError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                // Signature checked out but the claims are not what we issue.
                ErrorKind::Json(_)
                | ErrorKind::MissingRequiredClaim(_)
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience => AuthError::InvalidTokenContent,
                _ => AuthError::MalformedToken,
            }
        })?;

        let claims = data.claims;
        match claims.email {
            Some(email) if !email.is_empty() => {
                debug!(user_id = %claims.sub, "jwt verified");
                Ok((claims.sub, email))
            }
            _ => Err(AuthError::InvalidTokenContent),
        }
    }
}

/// Splits `Authorization: Bearer <token>` into its token part.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.splitn(3, ' ');
    let (scheme, token) = match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) => (scheme, token),
        _ => return Err(AuthError::InvalidTokenFormat),
    };
    if scheme != "Bearer" {
        return Err(AuthError::InvalidTokenFormat);
    }
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Authenticated identity extracted from the bearer token.
///
/// This is the single authorization checkpoint: handlers taking an `AuthUser`
/// are never invoked for a request that fails any of the token checks, and
/// they trust the resolved identity without re-verifying.
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingAuthHeader)?;

        let token = parse_bearer(header)?;

        let (id, email) = keys.verify(token).map_err(|e| {
            warn!(code = e.code(), "token rejected");
            e
        })?;

        Ok(AuthUser { id, email })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn sign_and_verify_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign(user_id, "a@x.com").expect("sign");
        let (id, email) = keys.verify(&token).expect("verify");
        assert_eq!(id, user_id);
        assert_eq!(email, "a@x.com");
    }

    #[tokio::test]
    async fn verify_rejects_garbage_as_malformed() {
        let keys = make_keys();
        assert_eq!(keys.verify("not-a-token"), Err(AuthError::MalformedToken));
    }

    #[tokio::test]
    async fn verify_rejects_wrong_secret_as_malformed() {
        let keys = make_keys();
        let other = JwtKeys {
            encoding: EncodingKey::from_secret(b"other-secret"),
            decoding: DecodingKey::from_secret(b"other-secret"),
            issuer: keys.issuer.clone(),
            audience: keys.audience.clone(),
            ttl: keys.ttl,
        };
        let token = other.sign(Uuid::new_v4(), "a@x.com").expect("sign");
        assert_eq!(keys.verify(&token), Err(AuthError::MalformedToken));
    }

    #[tokio::test]
    async fn verify_rejects_expired_token() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: Some("a@x.com".into()),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize, // expired well past the default leeway
            iss: keys.issuer.clone(),
            aud: keys.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token), Err(AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn verify_rejects_token_without_identity() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = serde_json::json!({
            "sub": Uuid::new_v4(),
            "iat": now,
            "exp": now + 300,
            "iss": keys.issuer,
            "aud": keys.audience,
        });
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token), Err(AuthError::InvalidTokenContent));
    }

    #[tokio::test]
    async fn verify_rejects_foreign_audience() {
        let keys = make_keys();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: Some("a@x.com".into()),
            iat: now as usize,
            exp: (now + 300) as usize,
            iss: keys.issuer.clone(),
            aud: "someone-else".into(),
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert_eq!(keys.verify(&token), Err(AuthError::InvalidTokenContent));
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(parse_bearer("Bearer abc"), Ok("abc"));
        assert_eq!(parse_bearer("Bearer"), Err(AuthError::InvalidTokenFormat));
        assert_eq!(
            parse_bearer("Basic dXNlcjpwdw=="),
            Err(AuthError::InvalidTokenFormat)
        );
        assert_eq!(
            parse_bearer("Bearer a b"),
            Err(AuthError::InvalidTokenFormat)
        );
        assert_eq!(parse_bearer("Bearer "), Err(AuthError::MissingToken));
    }
}
