use axum::{
    extract::FromRequestParts,
    http::{Request, header, request::Parts},
};
use axum_extra::extract::cookie::SameSite;
use bulletin_backend::{
    AppConfig, AppState, InMemoryRepository, MockPaymentService,
    access::{AdminSession, require_owner_or_admin, require_self},
    auth::{AuthSession, CredentialIssuer, CredentialVerifier, SESSION_COOKIE, SESSION_TTL_SECS},
    config::Env,
    error::AppError,
    models::{Role, User},
    repository::{Repository, RepositoryState},
};
use chrono::{Duration, Utc};
use std::sync::Arc;

// --- Test Fixtures ---

fn test_state() -> (AppState, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::new(
        repo.clone() as RepositoryState,
        Arc::new(MockPaymentService::new()),
        AppConfig::default(),
    );
    (state, repo)
}

fn parts_with_header(name: header::HeaderName, value: &str) -> Parts {
    let (parts, _) = Request::builder()
        .uri("/articles")
        .header(name, value)
        .body(())
        .unwrap()
        .into_parts();
    parts
}

fn parts_with_cookie(token: &str) -> Parts {
    parts_with_header(header::COOKIE, &format!("{SESSION_COOKIE}={token}"))
}

fn user(email: &str, role: Role) -> User {
    let now = Utc::now();
    User {
        email: email.to_string(),
        display_name: None,
        photo_url: None,
        role,
        created_at: now,
        premium_taken: None,
        login_time: now,
    }
}

// --- Credential Gate ---

#[tokio::test]
async fn test_valid_cookie_credential_yields_session() {
    let (state, _) = test_state();
    let issued = state.issuer.issue("reader@news.io", Utc::now()).unwrap();
    let mut parts = parts_with_cookie(&issued.token);

    let session = AuthSession::from_request_parts(&mut parts, &state)
        .await
        .expect("valid credential should be accepted");

    assert_eq!(session.email, "reader@news.io");
    assert_eq!(session.session_id, issued.claims.jti);
    assert_eq!(session.role, None, "role is resolved lazily from the store");
}

#[tokio::test]
async fn test_bearer_header_is_accepted_as_fallback() {
    let (state, _) = test_state();
    let issued = state.issuer.issue("reader@news.io", Utc::now()).unwrap();
    let mut parts =
        parts_with_header(header::AUTHORIZATION, &format!("Bearer {}", issued.token));

    let session = AuthSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(session.email, "reader@news.io");
}

#[tokio::test]
async fn test_missing_credential_is_rejected() {
    let (state, _) = test_state();
    let (mut parts, _) = Request::builder().uri("/articles").body(()).unwrap().into_parts();

    let err = AuthSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_expired_credential_is_rejected() {
    let (state, _) = test_state();
    // Issued two hours ago: expired one hour ago.
    let issued = state
        .issuer
        .issue("reader@news.io", Utc::now() - Duration::hours(2))
        .unwrap();
    let mut parts = parts_with_cookie(&issued.token);

    let err = AuthSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(ref m) if m.contains("expired")));
}

#[tokio::test]
async fn test_credential_signed_with_other_secret_is_rejected() {
    let (state, _) = test_state();
    let forged = CredentialIssuer::new("not-the-server-secret", Env::Local)
        .issue("admin@news.io", Utc::now())
        .unwrap();
    let mut parts = parts_with_cookie(&forged.token);

    let err = AuthSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let verifier = CredentialVerifier::new("local-dev-token-secret-change-me");
    let err = verifier.verify(Some("definitely.not.ajwt")).unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(_)));
}

#[tokio::test]
async fn test_revoked_credential_is_rejected() {
    let (state, repo) = test_state();
    let issued = state.issuer.issue("reader@news.io", Utc::now()).unwrap();
    repo.revoke_session(issued.claims.jti, issued.claims.expires_at())
        .await
        .unwrap();
    let mut parts = parts_with_cookie(&issued.token);

    let err = AuthSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated(ref m) if m.contains("revoked")));
}

#[tokio::test]
async fn test_session_verified_by_middleware_is_reused() {
    let (state, _) = test_state();
    let issued = state.issuer.issue("reader@news.io", Utc::now()).unwrap();
    let verified = AuthSession::from(issued.claims);

    // No credential on the request: only the stored session can satisfy the extractor.
    let (mut parts, _) = Request::builder().uri("/articles").body(()).unwrap().into_parts();
    parts.extensions.insert(verified.clone());

    let session = AuthSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap();
    assert_eq!(session, verified);
}

#[test]
fn test_issued_credential_lives_one_hour() {
    let now = Utc::now();
    let issued = CredentialIssuer::new("s", Env::Local).issue("a@b.c", now).unwrap();
    assert_eq!(issued.claims.exp - issued.claims.iat, SESSION_TTL_SECS);
    assert_eq!(issued.claims.iat, now.timestamp());
}

// --- Cookie Policy ---

#[test]
fn test_session_cookie_policy_local() {
    let issuer = CredentialIssuer::new("s", Env::Local);
    let cookie = issuer.session_cookie("tok".into());

    assert_eq!(cookie.name(), SESSION_COOKIE);
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(false));
    assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    assert_eq!(cookie.max_age(), Some(time::Duration::seconds(SESSION_TTL_SECS)));
}

#[test]
fn test_session_cookie_policy_production() {
    let issuer = CredentialIssuer::new("s", Env::Production);
    let cookie = issuer.session_cookie("tok".into());

    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.same_site(), Some(SameSite::None));
}

#[test]
fn test_revocation_cookie_expires_immediately() {
    let issuer = CredentialIssuer::new("s", Env::Production);
    let cookie = issuer.revocation_cookie();

    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    assert_eq!(cookie.secure(), Some(true));
}

// --- Role & Ownership Gates ---

#[tokio::test]
async fn test_admin_session_accepts_admin() {
    let (state, repo) = test_state();
    repo.upsert_user(&user("boss@news.io", Role::Admin)).await.unwrap();
    let issued = state.issuer.issue("boss@news.io", Utc::now()).unwrap();
    let mut parts = parts_with_cookie(&issued.token);

    let AdminSession(session) = AdminSession::from_request_parts(&mut parts, &state)
        .await
        .expect("admin should pass the role gate");
    assert_eq!(session.role, Some(Role::Admin));
}

#[tokio::test]
async fn test_admin_session_rejects_normal_user() {
    let (state, repo) = test_state();
    repo.upsert_user(&user("reader@news.io", Role::User)).await.unwrap();
    let issued = state.issuer.issue("reader@news.io", Utc::now()).unwrap();
    let mut parts = parts_with_cookie(&issued.token);

    let err = AdminSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_admin_session_rejects_unknown_identity() {
    let (state, _) = test_state();
    let issued = state.issuer.issue("ghost@news.io", Utc::now()).unwrap();
    let mut parts = parts_with_cookie(&issued.token);

    let err = AdminSession::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_require_self_and_owner_gates() {
    let (state, _) = test_state();
    let issued = state.issuer.issue("a@news.io", Utc::now()).unwrap();
    let mut session = AuthSession::from(issued.claims);

    assert!(require_self(&session, "a@news.io").is_ok());
    assert!(matches!(
        require_self(&session, "b@news.io"),
        Err(AppError::Forbidden(_))
    ));

    assert!(require_owner_or_admin(&session, "a@news.io").is_ok());
    assert!(matches!(
        require_owner_or_admin(&session, "b@news.io"),
        Err(AppError::Forbidden(_))
    ));

    session.role = Some(Role::Admin);
    assert!(require_owner_or_admin(&session, "b@news.io").is_ok());
}
