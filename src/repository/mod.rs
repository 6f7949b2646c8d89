//! Document-store access for the `users`, `publishers` and `articles`
//! collections, plus the revoked-session set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Article, ModerateArticleRequest, Publisher, PublisherCount, Role, RoleCount,
    UpdateArticleRequest, User,
};
use crate::query::{ArticleQuery, UserPage};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// StoreError
///
/// Failure reported by the external store. Never retried.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StoreError::Duplicate(db.message().to_string()),
            _ => StoreError::Backend(e.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Repository Trait
///
/// Contract of the document store. Every write is a single-document operation;
/// "no document" comes back as `None` or an empty list, not as an error.
///
/// **Send + Sync + async_trait** let `Arc<dyn Repository>` cross Axum task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, email: &str) -> StoreResult<Option<User>>;
    // Upsert keyed on email. Role and creation time of an existing record are preserved.
    async fn upsert_user(&self, user: &User) -> StoreResult<User>;
    async fn list_users(&self, page: UserPage) -> StoreResult<Vec<User>>;
    async fn set_user_role(&self, email: &str, role: Role) -> StoreResult<Option<User>>;
    async fn set_premium_taken(
        &self,
        email: &str,
        premium_taken: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>>;
    async fn count_users(&self) -> StoreResult<i64>;
    async fn count_premium_users(&self) -> StoreResult<i64>;
    // Grouped count; roles without users are simply absent.
    async fn count_users_by_role(&self) -> StoreResult<Vec<RoleCount>>;

    // --- Publishers ---
    async fn list_publishers(&self) -> StoreResult<Vec<Publisher>>;
    // Case-insensitive exact name lookup.
    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>>;
    async fn insert_publisher(&self, publisher: &Publisher) -> StoreResult<Publisher>;

    // --- Articles ---
    async fn insert_article(&self, article: &Article) -> StoreResult<Article>;
    async fn find_article(&self, id: Uuid) -> StoreResult<Option<Article>>;
    async fn list_articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>>;
    // Same predicate as `list_articles`; sort is ignored.
    async fn count_articles(&self, query: &ArticleQuery) -> StoreResult<i64>;
    async fn list_articles_by_author(&self, email: &str) -> StoreResult<Vec<Article>>;
    async fn increment_view_count(&self, id: Uuid) -> StoreResult<Option<Article>>;
    async fn update_article(
        &self,
        id: Uuid,
        update: &UpdateArticleRequest,
    ) -> StoreResult<Option<Article>>;
    async fn moderate_article(
        &self,
        id: Uuid,
        moderation: &ModerateArticleRequest,
    ) -> StoreResult<Option<Article>>;
    async fn delete_article(&self, id: Uuid) -> StoreResult<bool>;
    async fn count_articles_by_publisher(&self) -> StoreResult<Vec<PublisherCount>>;

    // --- Session revocation ---
    // Records a revoked credential id until its natural expiry; prunes lapsed rows.
    async fn revoke_session(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()>;
    async fn is_session_revoked(&self, jti: Uuid) -> StoreResult<bool>;
}

/// RepositoryState
///
/// Shared handle to the store, injected into every component that needs it.
pub type RepositoryState = Arc<dyn Repository>;
