use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, AppResult},
    models::Role,
    repository::RepositoryState,
};

/// Name of the cookie carrying the session credential.
pub const SESSION_COOKIE: &str = "token";

/// Fixed lifetime of a session credential, in seconds.
pub const SESSION_TTL_SECS: i64 = 60 * 60;

/// Claims
///
/// Payload of the signed session credential. Nothing is stored server-side
/// except the `jti` of credentials revoked at logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity the credential was issued to (the login email).
    pub email: String,
    /// Issued At (Unix seconds).
    pub iat: i64,
    /// Expiration Time (Unix seconds). Checked on every request with zero leeway.
    pub exp: i64,
    /// Credential id, the handle used for server-side revocation.
    pub jti: Uuid,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// IssuedCredential
///
/// A freshly signed token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub token: String,
    pub claims: Claims,
}

/// CredentialIssuer
///
/// Mints session credentials and the cookies that carry them to the browser.
#[derive(Clone)]
pub struct CredentialIssuer {
    key: EncodingKey,
    env: Env,
}

impl CredentialIssuer {
    pub fn new(secret: &str, env: Env) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            env,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.token_secret, config.env)
    }

    /// issue
    ///
    /// Signs `{email, iat, exp, jti}` with HS256. `now` is injected so expiry can be tested.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> AppResult<IssuedCredential> {
        let claims = Claims {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(SESSION_TTL_SECS)).timestamp(),
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AppError::Internal(format!("cannot sign credential: {e}")))?;
        Ok(IssuedCredential { token, claims })
    }

    /// The httpOnly cookie carrying a credential for its whole lifetime.
    pub fn session_cookie(&self, token: String) -> Cookie<'static> {
        self.cookie_base(token)
            .max_age(time::Duration::seconds(SESSION_TTL_SECS))
            .build()
    }

    /// An already-expired cookie with the same attributes, so the browser drops it.
    pub fn revocation_cookie(&self) -> Cookie<'static> {
        self.cookie_base(String::new())
            .max_age(time::Duration::ZERO)
            .expires(time::OffsetDateTime::UNIX_EPOCH)
            .build()
    }

    fn cookie_base(&self, value: String) -> cookie::CookieBuilder<'static> {
        let (secure, same_site) = match self.env {
            Env::Production => (true, SameSite::None),
            Env::Local => (false, SameSite::Strict),
        };
        Cookie::build((SESSION_COOKIE, value))
            .http_only(true)
            .secure(secure)
            .same_site(same_site)
            .path("/")
    }
}

/// CredentialVerifier
///
/// Checks signature and expiry of an inbound credential.
#[derive(Clone)]
pub struct CredentialVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl CredentialVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.token_secret)
    }

    /// verify
    ///
    /// Fails with `Unauthenticated` when the credential is absent, tampered,
    /// signed with another key, or expired.
    pub fn verify(&self, token: Option<&str>) -> AppResult<Claims> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthenticated("missing session credential".into()))?;

        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "session credential expired",
                    ErrorKind::InvalidSignature => "session credential signature mismatch",
                    _ => "invalid session credential",
                };
                tracing::debug!(error = ?e, "{reason}");
                AppError::Unauthenticated(reason.into())
            })
    }
}

/// Reads the credential from the session cookie, falling back to a Bearer header
/// for non-browser clients.
pub fn credential_from_headers(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(String::from)
}

pub fn credential_from_parts(parts: &Parts) -> Option<String> {
    credential_from_headers(&parts.headers)
}

/// AuthSession
///
/// Typed request context produced by the verifier gate. `role` stays `None`
/// until a role lookup has been performed for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub email: String,
    pub role: Option<Role>,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

impl From<Claims> for AuthSession {
    fn from(claims: Claims) -> Self {
        let expires_at = claims.expires_at();
        Self {
            email: claims.email,
            role: None,
            session_id: claims.jti,
            expires_at,
        }
    }
}

/// AuthSession Extractor Implementation
///
/// 0. Reuses a session already verified by the route middleware for this request.
/// 1. Reads the credential (cookie, then Bearer header).
/// 2. Verifies signature and expiry.
/// 3. Rejects credentials revoked at logout.
///
/// Rejection: `AppError::Unauthenticated` (401) before the handler body runs.
impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    CredentialVerifier: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<AuthSession>() {
            return Ok(session.clone());
        }

        let verifier = CredentialVerifier::from_ref(state);
        let repo = RepositoryState::from_ref(state);

        let token = credential_from_parts(parts);
        let claims = verifier.verify(token.as_deref())?;

        if repo.is_session_revoked(claims.jti).await? {
            tracing::debug!(email = %claims.email, "revoked session credential presented");
            return Err(AppError::Unauthenticated("session has been revoked".into()));
        }

        Ok(AuthSession::from(claims))
    }
}
