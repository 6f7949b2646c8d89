use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    auth::{AuthSession, CredentialVerifier},
    error::{AppError, AppResult},
    models::Role,
    repository::RepositoryState,
};

/// RoleAuthority
///
/// Resolves a verified identity's role from the user store. Always runs after
/// the credential gate; the store handle is injected at construction.
pub struct RoleAuthority {
    repo: RepositoryState,
}

impl RoleAuthority {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// Fills `session.role` from the store. Unknown users resolve to no role.
    pub async fn resolve(&self, mut session: AuthSession) -> AppResult<AuthSession> {
        if session.role.is_none() {
            session.role = self.repo.find_user(&session.email).await?.map(|u| u.role);
        }
        Ok(session)
    }

    /// require_admin
    ///
    /// Fails with `Unauthorized` when no user record exists for the identity
    /// or its role is not `admin`.
    pub async fn require_admin(&self, session: AuthSession) -> AppResult<AuthSession> {
        let session = self.resolve(session).await?;
        if session.role == Some(Role::Admin) {
            Ok(session)
        } else {
            tracing::warn!(email = %session.email, "admin capability required");
            Err(AppError::Unauthorized("admin role required".into()))
        }
    }
}

/// require_self
///
/// Ownership gate for self-scoped paths: the email embedded in the path must be
/// the caller's own identity.
pub fn require_self(session: &AuthSession, path_email: &str) -> AppResult<()> {
    if session.email == path_email {
        Ok(())
    } else {
        tracing::warn!(email = %session.email, target = %path_email, "self-scoped access denied");
        Err(AppError::Forbidden("cannot act on another user's resource".into()))
    }
}

/// require_owner_or_admin
///
/// Ownership gate for documents: the caller owns the document or holds the
/// admin override. Expects the role to be resolved already.
pub fn require_owner_or_admin(session: &AuthSession, owner_email: &str) -> AppResult<()> {
    if session.is_admin() || session.email == owner_email {
        Ok(())
    } else {
        tracing::warn!(email = %session.email, owner = %owner_email, "document owner mismatch");
        Err(AppError::Forbidden("only the author or an admin may change this article".into()))
    }
}

/// AdminSession
///
/// Extractor for admin-only handlers: credential gate followed by the role gate.
#[derive(Debug, Clone)]
pub struct AdminSession(pub AuthSession);

impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    CredentialVerifier: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        RoleAuthority::new(RepositoryState::from_ref(state))
            .require_admin(session)
            .await
            .map(AdminSession)
    }
}
