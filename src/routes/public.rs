use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Public Router Module
///
/// Endpoints reachable without a session: session issuance, the login upsert
/// hook, homepage counters and the publisher catalogue. Article retrieval by
/// id is public; the listing itself requires a session.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // POST /jwt
        // Signs a one-hour credential and sets it in the `token` cookie.
        .route("/jwt", post(handlers::issue_session))
        // GET /logout
        // Clears the cookie and revokes the presented credential.
        .route("/logout", get(handlers::revoke_session))
        // PUT /users
        // Called by the frontend after every sign-in. Creates or refreshes the user
        // and lazily clears a lapsed premium grant.
        .route("/users", put(handlers::login_upsert))
        // GET /users-count
        .route("/users-count", get(handlers::users_count))
        // GET /publishers
        .route("/publishers", get(handlers::list_publishers))
        // GET /articles-count?publisher=...&tag=...&search=...
        // Same approved-only predicate as the reader listing.
        .route("/articles-count", get(handlers::articles_count))
        // GET /articles/{id}
        .route("/articles/{id}", get(handlers::get_article))
        // POST /create-payment-intent
        .route(
            "/create-payment-intent",
            post(handlers::create_payment_intent),
        )
}
