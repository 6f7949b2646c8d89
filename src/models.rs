use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations (Mapped to Postgres enum types) ---

/// Role
///
/// Capability level of a user. New users start as `User`; only an admin can
/// elevate someone to `Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// ArticleStatus
///
/// Moderation state. Every article starts `Pending`; only admins move it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[ts(export)]
#[sqlx(type_name = "article_status")]
pub enum ArticleStatus {
    #[default]
    Pending,
    Approved,
    Declined,
}

/// PremiumFlag
///
/// Whether an article is reserved for premium subscribers. Serialized as
/// `"yes"` / `"no"` for the existing frontend.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "premium_flag", rename_all = "lowercase")]
pub enum PremiumFlag {
    Yes,
    #[default]
    No,
}

impl From<bool> for PremiumFlag {
    fn from(premium: bool) -> Self {
        if premium { PremiumFlag::Yes } else { PremiumFlag::No }
    }
}

// --- Core Documents (Mapped to Database) ---

/// User
///
/// The canonical user document. `email` is the natural key everywhere.
/// A non-null `premium_taken` marks the instant the premium grant lapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub email: String,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub premium_taken: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub login_time: DateTime<Utc>,
}

/// Article
///
/// A submitted article. Owned by `author_email`; moderation fields are only
/// written through admin actions and `view_count` only grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub author_email: String,
    pub publisher: String,
    pub tag: String,
    pub body: String,
    #[ts(type = "string")]
    pub posted_date: DateTime<Utc>,
    pub status: ArticleStatus,
    pub decline_reason: Option<String>,
    pub premium: PremiumFlag,
    pub view_count: i64,
}

impl Article {
    /// new_submission
    ///
    /// Builds a freshly submitted article. Moderation state always starts at
    /// `Pending`, not premium, zero views.
    pub fn new_submission(req: CreateArticleRequest, author_email: &str, posted_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: req.title.trim().to_string(),
            author_email: author_email.to_string(),
            publisher: req.publisher,
            tag: req.tag,
            body: req.body,
            posted_date,
            status: ArticleStatus::Pending,
            decline_reason: None,
            premium: PremiumFlag::No,
            view_count: 0,
        }
    }
}

/// Publisher
///
/// A curated publisher. Names are unique ignoring letter case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub id: Uuid,
    pub publisher_name: String,
    #[serde(rename = "logoURL")]
    pub logo_url: Option<String>,
}

impl Publisher {
    pub fn new(req: CreatePublisherRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            publisher_name: req.publisher_name.trim().to_string(),
            logo_url: req.logo_url,
        }
    }
}

/// PublisherCount
///
/// One row of the articles-per-publisher grouping.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PublisherCount {
    pub publisher: String,
    pub count: i64,
}

/// RoleCount
///
/// One row of the users-per-role grouping.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RoleCount {
    pub role: Role,
    pub count: i64,
}

// --- Request Payloads (Input Schemas) ---

/// IssueSessionRequest
///
/// Body of `POST /jwt`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct IssueSessionRequest {
    pub email: String,
}

/// LoginUpsertRequest
///
/// Body of `PUT /users`, sent by the frontend after every sign-in.
/// `login_time` defaults to the server clock when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoginUpsertRequest {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub login_time: Option<DateTime<Utc>>,
}

/// UpdatePremiumRequest
///
/// Body of `PATCH /users/{email}/premium`, sent once a payment is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePremiumRequest {
    #[ts(type = "string")]
    pub premium_taken: DateTime<Utc>,
}

/// CreatePublisherRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreatePublisherRequest {
    pub publisher_name: String,
    #[serde(default, rename = "logoURL")]
    pub logo_url: Option<String>,
}

/// CreateArticleRequest
///
/// Body of `POST /articles`. Moderation fields are not part of the payload:
/// whatever the client sends for status, premium or views is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateArticleRequest {
    pub title: String,
    pub publisher: String,
    pub tag: String,
    pub body: String,
}

/// UpdateArticleRequest
///
/// Partial content update by the owner or an admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl UpdateArticleRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.publisher.is_none() && self.tag.is_none() && self.body.is_none()
    }
}

/// ModerateArticleRequest
///
/// Admin-only moderation payload (`PATCH /admin/articles/{id}`).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ModerateArticleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_reason: Option<String>,
}

impl ModerateArticleRequest {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.is_premium.is_none() && self.decline_reason.is_none()
    }

    /// Moving an article to any status other than `Declined` without a new
    /// reason drops the stored one.
    pub fn clears_decline_reason(&self) -> bool {
        self.decline_reason.is_none()
            && self.status.is_some_and(|status| status != ArticleStatus::Declined)
    }
}

/// PaymentIntentRequest
///
/// Price in the smallest currency unit (cents).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PaymentIntentRequest {
    pub price: i64,
}

// --- Response Schemas (Output) ---

/// SuccessResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SuccessResponse {
    pub success: bool,
}

/// LoginUpsertResponse
///
/// `premium_reset` tells the client the user's premium grant lapsed and was cleared.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoginUpsertResponse {
    pub user: User,
    pub premium_reset: bool,
}

/// RoleResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleResponse {
    pub role: Role,
}

/// CountResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CountResponse {
    pub count: i64,
}

/// UserStats
///
/// Homepage counters for `GET /users-count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub normal_users: i64,
    pub admin_users: i64,
    pub premium_users: i64,
}

/// PaymentIntentResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}
