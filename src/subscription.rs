//! Premium subscription lifecycle.
//!
//! Per user the grant is either absent or active until `premium_taken`.
//! Lapsed grants are cleared lazily, on the next login.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{LoginUpsertRequest, Role, User},
    repository::RepositoryState,
};

/// SubscriptionState
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    NoPremium,
    PremiumActive { expiry: DateTime<Utc> },
}

impl SubscriptionState {
    /// A grant is active up to and including its expiry instant.
    pub fn at(user: &User, now: DateTime<Utc>) -> Self {
        match user.premium_taken {
            Some(expiry) if now <= expiry => SubscriptionState::PremiumActive { expiry },
            _ => SubscriptionState::NoPremium,
        }
    }
}

/// LoginEvent
///
/// Profile fields and timestamp of one sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginEvent {
    pub email: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub login_time: DateTime<Utc>,
}

impl LoginEvent {
    pub fn from_request(req: LoginUpsertRequest, now: DateTime<Utc>) -> Self {
        Self {
            email: req.email.trim().to_string(),
            display_name: req.display_name,
            photo_url: req.photo_url,
            login_time: req.login_time.unwrap_or(now),
        }
    }
}

/// LoginOutcome
///
/// The record to persist and whether a lapsed grant was cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginOutcome {
    pub user: User,
    pub premium_reset: bool,
}

/// apply_login
///
/// Pure transition `(current record, login) -> (new record, reset signal)`.
///
/// * unseen email: new `user`-role record without a grant, created at the login instant.
/// * known email: profile fields are merged (absent incoming values keep the stored ones);
///   a grant whose expiry lies strictly before `login_time` is cleared and reported.
pub fn apply_login(existing: Option<User>, event: &LoginEvent) -> LoginOutcome {
    match existing {
        None => LoginOutcome {
            user: User {
                email: event.email.clone(),
                display_name: event.display_name.clone(),
                photo_url: event.photo_url.clone(),
                role: Role::User,
                created_at: event.login_time,
                premium_taken: None,
                login_time: event.login_time,
            },
            premium_reset: false,
        },
        Some(current) => {
            let lapsed = current
                .premium_taken
                .is_some_and(|expiry| event.login_time > expiry);
            LoginOutcome {
                user: User {
                    email: current.email,
                    display_name: event.display_name.clone().or(current.display_name),
                    photo_url: event.photo_url.clone().or(current.photo_url),
                    role: current.role,
                    created_at: current.created_at,
                    premium_taken: if lapsed { None } else { current.premium_taken },
                    login_time: event.login_time,
                },
                premium_reset: lapsed,
            }
        }
    }
}

/// SubscriptionManager
///
/// Store-backed side of the lifecycle. Relies on the store's upsert for
/// concurrent logins (last write wins).
pub struct SubscriptionManager {
    repo: RepositoryState,
}

impl SubscriptionManager {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// apply_login_upsert
    ///
    /// Looks up the record, applies [`apply_login`], persists it keyed on email.
    /// Calling it twice with the same event yields the same stored record.
    pub async fn apply_login_upsert(&self, event: &LoginEvent) -> AppResult<LoginOutcome> {
        if event.email.is_empty() {
            return Err(AppError::Validation("email is required".into()));
        }

        let existing = self.repo.find_user(&event.email).await?;
        let is_new = existing.is_none();
        let outcome = apply_login(existing, event);
        let stored = self.repo.upsert_user(&outcome.user).await?;

        tracing::info!(
            email = %stored.email,
            new_user = is_new,
            premium_reset = outcome.premium_reset,
            "login recorded"
        );

        Ok(LoginOutcome {
            user: stored,
            premium_reset: outcome.premium_reset,
        })
    }

    /// grant
    ///
    /// `NoPremium -> PremiumActive(expiry)`, driven by the payment confirmation.
    pub async fn grant(
        &self,
        email: &str,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<User> {
        if expiry <= now {
            return Err(AppError::Validation("premium expiry must lie in the future".into()));
        }
        let user = self
            .repo
            .set_premium_taken(email, Some(expiry))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {email}")))?;
        tracing::info!(email = %email, expiry = %expiry, "premium granted");
        Ok(user)
    }
}
