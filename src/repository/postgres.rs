use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Repository, StoreResult};
use crate::models::{
    Article, ModerateArticleRequest, PremiumFlag, Publisher, PublisherCount, Role, RoleCount,
    UpdateArticleRequest, User,
};
use crate::query::{ArticleQuery, UserPage};

const USER_COLUMNS: &str =
    "email, display_name, photo_url, role, created_at, premium_taken, login_time";
const ARTICLE_COLUMNS: &str = "id, title, author_email, publisher, tag, body, posted_date, \
     status, decline_reason, premium, view_count";

/// PostgresRepository
///
/// `Repository` backed by Postgres. Each collection is a table keyed the same
/// way as its document (`users.email`, `articles.id`, `publishers.id`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// upsert_user
    ///
    /// `INSERT .. ON CONFLICT (email)`: concurrent logins for one user resolve
    /// last-write-wins. `role` and `created_at` are never overwritten.
    async fn upsert_user(&self, user: &User) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (email) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                photo_url = EXCLUDED.photo_url,
                premium_taken = EXCLUDED.premium_taken,
                login_time = EXCLUDED.login_time
            RETURNING {USER_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(&user.photo_url)
            .bind(user.role)
            .bind(user.created_at)
            .bind(user.premium_taken)
            .bind(user.login_time)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_users(&self, page: UserPage) -> StoreResult<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC, email ASC LIMIT $1 OFFSET $2"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_user_role(&self, email: &str, role: Role) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET role = $2 WHERE email = $1 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(role)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_premium_taken(
        &self,
        email: &str,
        premium_taken: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET premium_taken = $2 WHERE email = $1 RETURNING {USER_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .bind(premium_taken)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_premium_users(&self) -> StoreResult<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE premium_taken IS NOT NULL")
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn count_users_by_role(&self) -> StoreResult<Vec<RoleCount>> {
        Ok(sqlx::query_as::<_, RoleCount>(
            "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_publishers(&self) -> StoreResult<Vec<Publisher>> {
        Ok(sqlx::query_as::<_, Publisher>(
            "SELECT id, publisher_name, logo_url FROM publishers ORDER BY publisher_name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_publisher_by_name(&self, name: &str) -> StoreResult<Option<Publisher>> {
        Ok(sqlx::query_as::<_, Publisher>(
            "SELECT id, publisher_name, logo_url FROM publishers WHERE LOWER(publisher_name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// insert_publisher
    ///
    /// The unique index on `LOWER(publisher_name)` turns a lost race against the
    /// lookup into `StoreError::Duplicate`.
    async fn insert_publisher(&self, publisher: &Publisher) -> StoreResult<Publisher> {
        Ok(sqlx::query_as::<_, Publisher>(
            "INSERT INTO publishers (id, publisher_name, logo_url) VALUES ($1, $2, $3) \
             RETURNING id, publisher_name, logo_url",
        )
        .bind(publisher.id)
        .bind(&publisher.publisher_name)
        .bind(&publisher.logo_url)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn insert_article(&self, article: &Article) -> StoreResult<Article> {
        let sql = format!(
            "INSERT INTO articles ({ARTICLE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(article.id)
            .bind(&article.title)
            .bind(&article.author_email)
            .bind(&article.publisher)
            .bind(&article.tag)
            .bind(&article.body)
            .bind(article.posted_date)
            .bind(article.status)
            .bind(&article.decline_reason)
            .bind(article.premium)
            .bind(article.view_count)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_article(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// list_articles
    ///
    /// Built with `QueryBuilder` so every user-supplied value is a bound parameter.
    async fn list_articles(&self, query: &ArticleQuery) -> StoreResult<Vec<Article>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ARTICLE_COLUMNS} FROM articles"));
        query.push_predicate(&mut builder);
        query.push_order(&mut builder);
        Ok(builder
            .build_query_as::<Article>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_articles(&self, query: &ArticleQuery) -> StoreResult<i64> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM articles");
        query.push_predicate(&mut builder);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_articles_by_author(&self, email: &str) -> StoreResult<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE author_email = $1 ORDER BY posted_date DESC, id ASC"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(email)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn increment_view_count(&self, id: Uuid) -> StoreResult<Option<Article>> {
        let sql = format!(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = $1 RETURNING {ARTICLE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_article(
        &self,
        id: Uuid,
        update: &UpdateArticleRequest,
    ) -> StoreResult<Option<Article>> {
        let sql = format!(
            r#"
            UPDATE articles
            SET title = COALESCE($2, title),
                publisher = COALESCE($3, publisher),
                tag = COALESCE($4, tag),
                body = COALESCE($5, body)
            WHERE id = $1
            RETURNING {ARTICLE_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(&update.title)
            .bind(&update.publisher)
            .bind(&update.tag)
            .bind(&update.body)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn moderate_article(
        &self,
        id: Uuid,
        moderation: &ModerateArticleRequest,
    ) -> StoreResult<Option<Article>> {
        let sql = format!(
            r#"
            UPDATE articles
            SET status = COALESCE($2, status),
                premium = COALESCE($3, premium),
                decline_reason = CASE
                    WHEN $4::text IS NOT NULL THEN $4::text
                    WHEN $5::boolean THEN NULL
                    ELSE decline_reason
                END
            WHERE id = $1
            RETURNING {ARTICLE_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .bind(moderation.status)
            .bind(moderation.is_premium.map(PremiumFlag::from))
            .bind(&moderation.decline_reason)
            .bind(moderation.clears_decline_reason())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_article(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM articles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_articles_by_publisher(&self) -> StoreResult<Vec<PublisherCount>> {
        Ok(sqlx::query_as::<_, PublisherCount>(
            "SELECT publisher, COUNT(*) AS count FROM articles GROUP BY publisher ORDER BY publisher",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn revoke_session(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("DELETE FROM revoked_sessions WHERE expires_at < NOW()")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "INSERT INTO revoked_sessions (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_session_revoked(&self, jti: Uuid) -> StoreResult<bool> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM revoked_sessions WHERE jti = $1)",
        )
        .bind(jti)
        .fetch_one(&self.pool)
        .await?)
    }
}
