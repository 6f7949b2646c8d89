use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, put},
};

/// Authenticated Router Module
///
/// Routes for any caller holding a valid, unrevoked session credential.
/// Ownership is enforced inside the handlers: `/users/{email}/*` paths must
/// name the caller, and article edits need the author or an admin.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Articles ---
        // GET /articles?publisher=...&tag=...&search=...&sort=true|false
        // Approved articles only. `sort` ranks by view count.
        // POST /articles
        // Submits an article as the caller. Always starts pending.
        .route(
            "/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        // PUT/DELETE /articles/{id}
        .route(
            "/articles/{id}",
            put(handlers::update_article).delete(handlers::delete_article),
        )
        // PATCH /articles/{id}/views
        .route("/articles/{id}/views", patch(handlers::increment_views))
        // --- Self-scoped user data ---
        .route("/users/{email}", get(handlers::get_user))
        .route("/users/{email}/role", get(handlers::get_user_role))
        .route("/users/{email}/articles", get(handlers::list_user_articles))
        // PATCH /users/{email}/premium
        // Payment confirmation: records when the premium grant lapses.
        .route("/users/{email}/premium", patch(handlers::update_premium))
}
