use crate::{
    AppState,
    access::{AdminSession, RoleAuthority, require_owner_or_admin, require_self},
    auth::{AuthSession, credential_from_headers},
    error::{AppError, AppResult},
    models::{
        Article, CountResponse, CreateArticleRequest, CreatePublisherRequest, IssueSessionRequest,
        LoginUpsertRequest, LoginUpsertResponse, ModerateArticleRequest, PaymentIntentRequest,
        PaymentIntentResponse, Publisher, Role, RoleResponse, SuccessResponse, UpdateArticleRequest,
        UpdatePremiumRequest, User, UserStats,
    },
    query::{ArticleFilter, ArticleQuery, ArticleSort, UserPage},
    reports::{AggregationReporter, ChartRow},
    subscription::{LoginEvent, SubscriptionManager},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

// --- Query Parameter Structs ---

/// PublicArticleParams
///
/// Query parameters of the reader listing (GET /articles).
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PublicArticleParams {
    pub publisher: Option<String>,
    pub tag: Option<String>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    /// `true` ranks most viewed first, `false` least viewed first.
    pub sort: Option<bool>,
}

/// AdminArticleParams
///
/// Query parameters of the moderation listing (GET /admin/articles).
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminArticleParams {
    pub publisher: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    /// `asc` or `desc` on the posting date.
    pub sort: Option<String>,
}

/// ArticleCountParams
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ArticleCountParams {
    pub publisher: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

/// UserPageParams
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserPageParams {
    /// Zero-based page index.
    pub page: Option<u32>,
    pub size: Option<u32>,
}

fn parse_article_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::MalformedIdentifier(raw.to_string()))
}

async fn load_article(state: &AppState, id: Uuid) -> AppResult<Article> {
    state
        .repo
        .find_article(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("article {id}")))
}

// --- Session Handlers ---

/// issue_session
///
/// [Public Route] Signs a one-hour session credential for `email` and sets it
/// in the httpOnly `token` cookie.
#[utoipa::path(
    post,
    path = "/jwt",
    request_body = IssueSessionRequest,
    responses((status = 200, description = "Session cookie set", body = SuccessResponse))
)]
pub async fn issue_session(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<IssueSessionRequest>,
) -> AppResult<(CookieJar, Json<SuccessResponse>)> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }

    let issued = state.issuer.issue(email, Utc::now())?;
    tracing::info!(email = %email, jti = %issued.claims.jti, "session issued");

    Ok((
        jar.add(state.issuer.session_cookie(issued.token)),
        Json(SuccessResponse { success: true }),
    ))
}

/// revoke_session
///
/// [Public Route] Clears the session cookie. A still-valid presented credential,
/// from the cookie or a Bearer header, is also recorded as revoked so a replayed
/// copy is refused until it expires.
#[utoipa::path(
    get,
    path = "/logout",
    responses((status = 200, description = "Session cleared", body = SuccessResponse))
)]
pub async fn revoke_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SuccessResponse>), (CookieJar, AppError)> {
    let presented = credential_from_headers(&headers);
    let cleared = jar.add(state.issuer.revocation_cookie());

    if let Ok(claims) = state.verifier.verify(presented.as_deref()) {
        if let Err(e) = state.repo.revoke_session(claims.jti, claims.expires_at()).await {
            return Err((cleared, e.into()));
        }
        tracing::info!(email = %claims.email, jti = %claims.jti, "session revoked");
    }

    Ok((cleared, Json(SuccessResponse { success: true })))
}

// --- User Handlers ---

/// login_upsert
///
/// [Public Route] Records a sign-in. Creates unseen users with the `user` role
/// and clears a premium grant that lapsed before this login.
#[utoipa::path(
    put,
    path = "/users",
    request_body = LoginUpsertRequest,
    responses((status = 200, description = "Stored user", body = LoginUpsertResponse))
)]
pub async fn login_upsert(
    State(state): State<AppState>,
    Json(payload): Json<LoginUpsertRequest>,
) -> AppResult<Json<LoginUpsertResponse>> {
    let event = LoginEvent::from_request(payload, Utc::now());
    let outcome = SubscriptionManager::new(state.repo.clone())
        .apply_login_upsert(&event)
        .await?;
    Ok(Json(LoginUpsertResponse {
        user: outcome.user,
        premium_reset: outcome.premium_reset,
    }))
}

/// get_user
///
/// [Authenticated Route] The caller's own user record.
#[utoipa::path(
    get,
    path = "/users/{email}",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 403, description = "Not your record")
    )
)]
pub async fn get_user(
    session: AuthSession,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<Option<User>>> {
    require_self(&session, &email)?;
    Ok(Json(state.repo.find_user(&email).await?))
}

/// get_user_role
///
/// [Authenticated Route] The caller's role, used by the frontend to show admin screens.
#[utoipa::path(
    get,
    path = "/users/{email}/role",
    params(("email" = String, Path, description = "User email")),
    responses((status = 200, description = "Role", body = RoleResponse))
)]
pub async fn get_user_role(
    session: AuthSession,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<RoleResponse>> {
    require_self(&session, &email)?;
    let user = state
        .repo
        .find_user(&email)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {email}")))?;
    Ok(Json(RoleResponse { role: user.role }))
}

/// list_user_articles
///
/// [Authenticated Route] Every article the caller authored, in any moderation state.
#[utoipa::path(
    get,
    path = "/users/{email}/articles",
    params(("email" = String, Path, description = "Author email")),
    responses((status = 200, description = "My articles", body = [Article]))
)]
pub async fn list_user_articles(
    session: AuthSession,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<Article>>> {
    require_self(&session, &email)?;
    Ok(Json(state.repo.list_articles_by_author(&email).await?))
}

/// update_premium
///
/// [Authenticated Route] Payment-confirmation hook: starts the caller's premium
/// grant, lapsing at `premiumTaken`.
#[utoipa::path(
    patch,
    path = "/users/{email}/premium",
    params(("email" = String, Path, description = "User email")),
    request_body = UpdatePremiumRequest,
    responses((status = 200, description = "Updated user", body = User))
)]
pub async fn update_premium(
    session: AuthSession,
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(payload): Json<UpdatePremiumRequest>,
) -> AppResult<Json<User>> {
    require_self(&session, &email)?;
    let user = SubscriptionManager::new(state.repo.clone())
        .grant(&email, payload.premium_taken, Utc::now())
        .await?;
    Ok(Json(user))
}

/// users_count
///
/// [Public Route] Homepage counters: total, normal, admin and premium users.
#[utoipa::path(
    get,
    path = "/users-count",
    responses((status = 200, description = "User counts", body = UserStats))
)]
pub async fn users_count(State(state): State<AppState>) -> AppResult<Json<UserStats>> {
    let stats = AggregationReporter::new(state.repo.clone())
        .user_role_counts()
        .await?;
    Ok(Json(stats))
}

/// list_users
///
/// [Admin Route] One zero-based page of users.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserPageParams),
    responses((status = 200, description = "Users", body = [User]))
)]
pub async fn list_users(
    AdminSession(_admin): AdminSession,
    State(state): State<AppState>,
    Query(params): Query<UserPageParams>,
) -> AppResult<Json<Vec<User>>> {
    let page = UserPage::new(params.page, params.size);
    Ok(Json(state.repo.list_users(page).await?))
}

/// make_admin
///
/// [Admin Route] Elevates a user to the `admin` role.
#[utoipa::path(
    patch,
    path = "/admin/users/{email}/role",
    params(("email" = String, Path, description = "User email")),
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn make_admin(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<User>> {
    let user = state
        .repo
        .set_user_role(&email, Role::Admin)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {email}")))?;
    tracing::info!(admin = %admin.email, target = %email, role = user.role.as_str(), "role changed");
    Ok(Json(user))
}

// --- Publisher Handlers ---

/// list_publishers
///
/// [Public Route] All curated publishers.
#[utoipa::path(
    get,
    path = "/publishers",
    responses((status = 200, description = "Publishers", body = [Publisher]))
)]
pub async fn list_publishers(State(state): State<AppState>) -> AppResult<Json<Vec<Publisher>>> {
    Ok(Json(state.repo.list_publishers().await?))
}

/// create_publisher
///
/// [Admin Route] Adds a publisher. Rejected with 409 when a publisher with the
/// same name ignoring case already exists.
#[utoipa::path(
    post,
    path = "/admin/publishers",
    request_body = CreatePublisherRequest,
    responses(
        (status = 201, description = "Created", body = Publisher),
        (status = 409, description = "Name already taken")
    )
)]
pub async fn create_publisher(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<CreatePublisherRequest>,
) -> AppResult<(StatusCode, Json<Publisher>)> {
    let publisher = Publisher::new(payload);
    if publisher.publisher_name.is_empty() {
        return Err(AppError::Validation("publisherName is required".into()));
    }

    if state
        .repo
        .find_publisher_by_name(&publisher.publisher_name)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "publisher \"{}\" already exists",
            publisher.publisher_name
        )));
    }

    let created = state.repo.insert_publisher(&publisher).await?;
    tracing::info!(admin = %admin.email, publisher = %created.publisher_name, "publisher created");
    Ok((StatusCode::CREATED, Json(created)))
}

// --- Article Handlers ---

/// list_articles
///
/// [Authenticated Route] Approved articles, filtered by publisher, tag and
/// title search, optionally ranked by view count.
#[utoipa::path(
    get,
    path = "/articles",
    params(PublicArticleParams),
    responses((status = 200, description = "Approved articles", body = [Article]))
)]
pub async fn list_articles(
    _session: AuthSession,
    State(state): State<AppState>,
    Query(params): Query<PublicArticleParams>,
) -> AppResult<Json<Vec<Article>>> {
    let query = ArticleQuery::public(ArticleFilter::new(params.publisher, params.tag, params.search))
        .sorted(ArticleSort::by_popularity(params.sort));
    Ok(Json(state.repo.list_articles(&query).await?))
}

/// articles_count
///
/// [Public Route] Size of the reader listing under the same filter, for page counts.
#[utoipa::path(
    get,
    path = "/articles-count",
    params(ArticleCountParams),
    responses((status = 200, description = "Matching articles", body = CountResponse))
)]
pub async fn articles_count(
    State(state): State<AppState>,
    Query(params): Query<ArticleCountParams>,
) -> AppResult<Json<CountResponse>> {
    let query = ArticleQuery::public(ArticleFilter::new(params.publisher, params.tag, params.search));
    let count = state.repo.count_articles(&query).await?;
    Ok(Json(CountResponse { count }))
}

/// list_all_articles
///
/// [Admin Route] Articles in every moderation state, optionally filtered,
/// optionally sorted by posting date.
#[utoipa::path(
    get,
    path = "/admin/articles",
    params(AdminArticleParams),
    responses((status = 200, description = "All articles", body = [Article]))
)]
pub async fn list_all_articles(
    AdminSession(_admin): AdminSession,
    State(state): State<AppState>,
    Query(params): Query<AdminArticleParams>,
) -> AppResult<Json<Vec<Article>>> {
    let query =
        ArticleQuery::privileged(ArticleFilter::new(params.publisher, params.tag, params.search))
            .sorted(ArticleSort::by_recency(params.sort.as_deref()));
    Ok(Json(state.repo.list_articles(&query).await?))
}

/// get_article
///
/// [Public Route] A single article by id, `null` when absent.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses((status = 200, description = "Article, or null when absent", body = Article))
)]
pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Option<Article>>> {
    let id = parse_article_id(&id)?;
    Ok(Json(state.repo.find_article(id).await?))
}

/// create_article
///
/// [Authenticated Route] Submits an article authored by the caller. It starts
/// `Pending`, not premium, with zero views.
#[utoipa::path(
    post,
    path = "/articles",
    request_body = CreateArticleRequest,
    responses((status = 201, description = "Created", body = Article))
)]
pub async fn create_article(
    session: AuthSession,
    State(state): State<AppState>,
    Json(payload): Json<CreateArticleRequest>,
) -> AppResult<(StatusCode, Json<Article>)> {
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("title is required".into()));
    }
    let article = Article::new_submission(payload, &session.email, Utc::now());
    let created = state.repo.insert_article(&article).await?;
    tracing::info!(author = %session.email, id = %created.id, "article submitted");
    Ok((StatusCode::CREATED, Json(created)))
}

/// increment_views
///
/// [Authenticated Route] Adds one view to an article.
#[utoipa::path(
    patch,
    path = "/articles/{id}/views",
    params(("id" = String, Path, description = "Article ID")),
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 404, description = "Not Found")
    )
)]
pub async fn increment_views(
    _session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Article>> {
    let id = parse_article_id(&id)?;
    let article = state
        .repo
        .increment_view_count(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("article {id}")))?;
    Ok(Json(article))
}

/// update_article
///
/// [Authenticated Route] Content update by the author, or by an admin.
#[utoipa::path(
    put,
    path = "/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    request_body = UpdateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 403, description = "Not the author")
    )
)]
pub async fn update_article(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateArticleRequest>,
) -> AppResult<Json<Article>> {
    let id = parse_article_id(&id)?;
    if payload.is_empty() {
        return Err(AppError::Validation("nothing to update".into()));
    }

    let article = load_article(&state, id).await?;
    let session = RoleAuthority::new(state.repo.clone()).resolve(session).await?;
    require_owner_or_admin(&session, &article.author_email)?;

    let updated = state
        .repo
        .update_article(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("article {id}")))?;
    Ok(Json(updated))
}

/// delete_article
///
/// [Authenticated Route] Removes an article; author or admin only.
#[utoipa::path(
    delete,
    path = "/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_article(
    session: AuthSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_article_id(&id)?;
    let article = load_article(&state, id).await?;
    let session = RoleAuthority::new(state.repo.clone()).resolve(session).await?;
    require_owner_or_admin(&session, &article.author_email)?;

    if state.repo.delete_article(id).await? {
        tracing::info!(by = %session.email, id = %id, "article deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("article {id}")))
    }
}

/// moderate_article
///
/// [Admin Route] Changes status, decline reason and/or the premium flag.
#[utoipa::path(
    patch,
    path = "/admin/articles/{id}",
    params(("id" = String, Path, description = "Article ID")),
    request_body = ModerateArticleRequest,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 404, description = "Not Found")
    )
)]
pub async fn moderate_article(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ModerateArticleRequest>,
) -> AppResult<Json<Article>> {
    let id = parse_article_id(&id)?;
    if payload.is_empty() {
        return Err(AppError::Validation("nothing to moderate".into()));
    }

    let article = state
        .repo
        .moderate_article(id, &payload)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("article {id}")))?;
    tracing::info!(
        admin = %admin.email,
        id = %id,
        status = ?article.status,
        premium = ?article.premium,
        "article moderated"
    );
    Ok(Json(article))
}

/// admin_stats
///
/// [Admin Route] Articles per publisher, prefixed with the chart header row.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Header pair, then one [publisher, count] pair per publisher"))
)]
pub async fn admin_stats(
    AdminSession(_admin): AdminSession,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ChartRow>>> {
    let rows = AggregationReporter::new(state.repo.clone())
        .publisher_article_counts()
        .await?;
    Ok(Json(rows))
}

// --- Payments ---

/// create_payment_intent
///
/// [Public Route] Asks the payment provider for a client secret.
#[utoipa::path(
    post,
    path = "/create-payment-intent",
    request_body = PaymentIntentRequest,
    responses((status = 200, description = "Client secret", body = PaymentIntentResponse))
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<PaymentIntentRequest>,
) -> AppResult<Json<PaymentIntentResponse>> {
    if payload.price <= 0 {
        return Err(AppError::Validation("price must be positive".into()));
    }
    let client_secret = state
        .payments
        .create_payment_intent(payload.price)
        .await
        .map_err(AppError::Payment)?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}
