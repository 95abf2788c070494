//! Session tokens and the authenticated-user extractor.
//!
//! Sessions are stateless HS256 tokens carried in an `HttpOnly` cookie. The
//! token only names the user; the row is reloaded from the database on every
//! authenticated request, so a deleted user is locked out immediately.
//! Requests without a valid session are redirected to `/login`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::Redirect;
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::models::User;
use crate::{db, AppState};

// ---

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum SessionError {
    // ---
    #[error("token encoding error: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

/// Signed session claims. `sub` is the user name (the users table key).
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    // ---
    pub sub: String,
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

/// Issues and verifies session tokens. Cheap to clone; shared via `AppState`.
#[derive(Clone)]
pub struct SessionService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionService {
    // ---
    pub fn new(secret: &str, ttl_hours: u32) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            ttl: Duration::hours(i64::from(ttl_hours)),
        }
    }

    /// Issue a fresh session token for a logged-in user.
    pub fn issue(&self, user: &User) -> Result<String, SessionError> {
        // ---
        let now = Utc::now();
        let claims = Claims {
            sub: user.name.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };

        let header = Header::new(Algorithm::HS256);
        Ok(encode(&header, &claims, &self.encoding_key)?)
    }

    /// Verify a token's signature and expiry and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, SessionError> {
        // ---
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(SessionError::Expired),
                _ => Err(SessionError::Invalid),
            },
        }
    }
}

/// Compare the stored and submitted mobile numbers through SHA-256 digests,
/// so comparison cost does not depend on how long a common prefix the two
/// values share.
pub fn credentials_match(stored: &str, submitted: &str) -> bool {
    // ---
    Sha256::digest(stored.as_bytes()) == Sha256::digest(submitted.as_bytes())
}

// ---

/// Extractor for routes behind the auth gate.
///
/// Reads the session cookie, verifies it, and reloads the [`User`] row. Any
/// failure along the way rejects with a redirect to `/login`, the
/// login-required behavior a browser form app expects.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // ---
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Err(Redirect::to("/login"));
        };

        let claims = state.sessions.verify(cookie.value()).map_err(|e| {
            tracing::debug!("session rejected: {}", e);
            Redirect::to("/login")
        })?;

        match db::find_user(&state.pool, &claims.sub).await {
            Ok(Some(user)) => Ok(CurrentUser(user)),
            Ok(None) => Err(Redirect::to("/login")),
            Err(e) => {
                tracing::error!("session user lookup failed: {}", e);
                Err(Redirect::to("/login"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn alice() -> User {
        // ---
        User {
            name: "alice".to_string(),
            mobile_number: "9999999999".to_string(),
        }
    }

    #[test]
    fn issue_then_verify_round_trips() {
        // ---
        let sessions = SessionService::new("test-secret", 24);
        let token = sessions.issue(&alice()).expect("issue");
        let claims = sessions.verify(&token).expect("verify");

        assert_eq!(claims.sub, "alice");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        // ---
        let ours = SessionService::new("test-secret", 24);
        let theirs = SessionService::new("other-secret", 24);

        let token = theirs.issue(&alice()).unwrap();
        assert!(matches!(ours.verify(&token), Err(SessionError::Invalid)));
    }

    #[test]
    fn verify_rejects_garbage() {
        // ---
        let sessions = SessionService::new("test-secret", 24);
        assert!(sessions.verify("not-a-token").is_err());
        assert!(sessions.verify("").is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        // ---
        // Hand-roll claims expired well past the default leeway.
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "alice".to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let sessions = SessionService::new("test-secret", 24);
        assert!(matches!(
            sessions.verify(&token),
            Err(SessionError::Expired)
        ));
    }

    #[test]
    fn credentials_match_exact_only() {
        // ---
        assert!(credentials_match("9999999999", "9999999999"));
        assert!(!credentials_match("9999999999", "9999999998"));
        assert!(!credentials_match("9999999999", "999999999"));
        assert!(!credentials_match("9999999999", ""));
    }
}
