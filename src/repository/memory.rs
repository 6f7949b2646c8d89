use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Repository, StoreError, StoreResult};
use crate::models::{
    Article, ModerateArticleRequest, PremiumFlag, Publisher, PublisherCount, Role, RoleCount,
    UpdateArticleRequest, User,
};
use crate::query::{ArticleQuery, UserPage};

#[derive(Default)]
struct Collections {
    users: BTreeMap<String, User>,
    publishers: Vec<Publisher>,
    articles: Vec<Article>,
    revoked_sessions: HashMap<Uuid, DateTime<Utc>>,
}

/// InMemoryRepository
///
/// Process-local `Repository` with the same observable semantics as the
/// Postgres store. Used by the test suite and for running the API without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    inner: RwLock<Collections>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(email).cloned())
    }

    async fn upsert_user(&self, user: &User) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        let stored = match inner.users.get(&user.email) {
            Some(existing) => User {
                role: existing.role,
                created_at: existing.created_at,
                ..user.clone()
            },
            None => user.clone(),
        };
        inner.users.insert(stored.email.clone(), stored.clone());
        Ok(stored)
    }

    async fn list_users(&self, page: UserPage) -> StoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn set_user_role(&self, email: &str, role: Role) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(email).map(|user| {
            user.role = role;
            user.clone()
        }))
    }

    async fn set_premium_taken(
        &self,
        email: &str,
        premium_taken: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>> {
        let mut inner = self.inner.write().await;
        Ok(inner.users.get_mut(email).map(|user| {
            user.premium_taken = premium_taken;
            user.clone()
        }))
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.inner.read().await.users.len() as i64)
    }

    async fn count_premium_users(&self) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|u| u.premium_taken.is_some())
            .count() as i64)
    }

    async fn count_users_by_role(&self) -> StoreResult<Vec<RoleCount>> {
        let inner = self.inner.read().await;
        let mut groups: Vec<RoleCount> = Vec::new();
        for user in inner.users.values() {
            match groups.iter_mut().find(|g| g.role == user.role) {
                Some(group) => group.count += 1,
                None => groups.push(RoleCount {
                    role: user.role,
                    count: 1,
                }),
            }
        }
        Ok(groups)
    }

    async fn list_publishers(&self) -> StoreResult<Vec<Publisher>> {
        let mut publishers = self.inner.read().await.publishers.clone();
        publishers.sort_by(|a, b| a.publisher_name.cmp(&b.publisher_name));
        Ok(publishers)
    }

    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>> {
        let needle = name.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .publishers
            .iter()
            .find(|p| p.publisher_name.to_lowercase() == needle)
            .cloned())
    }

    async fn insert_publisher(&self, publisher: &Publisher) -> StoreResult<Publisher> {
        let needle = publisher.publisher_name.to_lowercase();
        let mut inner = self.inner.write().await;
        if inner
            .publishers
            .iter()
            .any(|p| p.publisher_name.to_lowercase() == needle)
        {
            return Err(StoreError::Duplicate(format!(
                "publisher \"{}\" already exists",
                publisher.publisher_name
            )));
        }
        inner.publishers.push(publisher.clone());
        Ok(publisher.clone())
    }

    async fn insert_article(&self, article: &Article) -> StoreResult<Article> {
        let mut inner = self.inner.write().await;
        if inner.articles.iter().any(|a| a.id == article.id) {
            return Err(StoreError::Duplicate(format!("article {} already exists", article.id)));
        }
        inner.articles.push(article.clone());
        Ok(article.clone())
    }

    async fn find_article(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let inner = self.inner.read().await;
        Ok(inner.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>> {
        let inner = self.inner.read().await;
        Ok(query.apply(inner.articles.iter().cloned()))
    }

    async fn count_articles(&self, query: &ArticleQuery) -> StoreResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner.articles.iter().filter(|a| query.matches(a)).count() as i64)
    }

    async fn list_articles_by_author(&self, email: &str) -> StoreResult<Vec<Article>> {
        let inner = self.inner.read().await;
        let mut articles: Vec<Article> = inner
            .articles
            .iter()
            .filter(|a| a.author_email == email)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.posted_date.cmp(&a.posted_date).then_with(|| a.id.cmp(&b.id)));
        Ok(articles)
    }

    async fn increment_view_count(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let mut inner = self.inner.write().await;
        Ok(inner.articles.iter_mut().find(|a| a.id == id).map(|article| {
            article.view_count += 1;
            article.clone()
        }))
    }

    async fn update_article(
        &self,
        id: Uuid,
        update: &UpdateArticleRequest,
    ) -> StoreResult<Option<Article>> {
        let mut inner = self.inner.write().await;
        Ok(inner.articles.iter_mut().find(|a| a.id == id).map(|article| {
            if let Some(title) = &update.title {
                article.title = title.clone();
            }
            if let Some(publisher) = &update.publisher {
                article.publisher = publisher.clone();
            }
            if let Some(tag) = &update.tag {
                article.tag = tag.clone();
            }
            if let Some(body) = &update.body {
                article.body = body.clone();
            }
            article.clone()
        }))
    }

    async fn moderate_article(
        &self,
        id: Uuid,
        moderation: &ModerateArticleRequest,
    ) -> StoreResult<Option<Article>> {
        let mut inner = self.inner.write().await;
        Ok(inner.articles.iter_mut().find(|a| a.id == id).map(|article| {
            if let Some(status) = moderation.status {
                article.status = status;
            }
            if let Some(premium) = moderation.is_premium {
                article.premium = PremiumFlag::from(premium);
            }
            if let Some(reason) = &moderation.decline_reason {
                article.decline_reason = Some(reason.clone());
            } else if moderation.clears_decline_reason() {
                article.decline_reason = None;
            }
            article.clone()
        }))
    }

    async fn delete_article(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.articles.len();
        inner.articles.retain(|a| a.id != id);
        Ok(inner.articles.len() < before)
    }

    async fn count_articles_by_publisher(&self) -> StoreResult<Vec<PublisherCount>> {
        let inner = self.inner.read().await;
        let mut groups: BTreeMap<&str, i64> = BTreeMap::new();
        for article in &inner.articles {
            *groups.entry(article.publisher.as_str()).or_insert(0) += 1;
        }
        Ok(groups
            .into_iter()
            .map(|(publisher, count)| PublisherCount {
                publisher: publisher.to_string(),
                count,
            })
            .collect())
    }

    async fn revoke_session(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        inner.revoked_sessions.retain(|_, expiry| *expiry >= now);
        inner.revoked_sessions.entry(jti).or_insert(expires_at);
        Ok(())
    }

    async fn is_session_revoked(&self, jti: Uuid) -> StoreResult<bool> {
        Ok(self.inner.read().await.revoked_sessions.contains_key(&jti))
    }
}
