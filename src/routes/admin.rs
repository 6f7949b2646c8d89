use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Admin Router Module
///
/// Moderation and oversight endpoints, nested under `/admin`. Every handler
/// takes the `AdminSession` extractor, which verifies the credential and then
/// resolves the caller's role from the user store. Non-admins get 401 before
/// the handler body runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users?page=0&size=10
        .route("/users", get(handlers::list_users))
        // PATCH /admin/users/{email}/role
        // Elevates the user to admin.
        .route("/users/{email}/role", patch(handlers::make_admin))
        // POST /admin/publishers
        // 409 when the name is already taken, ignoring case.
        .route("/publishers", post(handlers::create_publisher))
        // GET /admin/articles?sort=asc|desc
        // Every moderation state, optionally ordered by posting date.
        .route("/articles", get(handlers::list_all_articles))
        // PATCH /admin/articles/{id}
        // Approve/decline with reason, toggle premium.
        .route("/articles/{id}", patch(handlers::moderate_article))
        // GET /admin/stats
        // Articles per publisher for the dashboard chart.
        .route("/stats", get(handlers::admin_stats))
}
