use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Gates: credential verification, then role and ownership checks.
pub mod access;
pub mod auth;

// Domain services.
pub mod payments;
pub mod query;
pub mod reports;
pub mod subscription;

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;

// Router segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::{AuthSession, CredentialIssuer, CredentialVerifier};
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use payments::{HttpPaymentClient, MockPaymentService, PaymentState};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every annotated handler, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::issue_session, handlers::revoke_session, handlers::login_upsert,
        handlers::get_user, handlers::get_user_role, handlers::list_user_articles,
        handlers::update_premium, handlers::users_count, handlers::list_users,
        handlers::make_admin, handlers::list_publishers, handlers::create_publisher,
        handlers::list_articles, handlers::articles_count, handlers::list_all_articles,
        handlers::get_article, handlers::create_article, handlers::increment_views,
        handlers::update_article, handlers::delete_article, handlers::moderate_article,
        handlers::admin_stats, handlers::create_payment_intent
    ),
    components(
        schemas(
            models::Role, models::ArticleStatus, models::PremiumFlag,
            models::User, models::Article, models::Publisher,
            models::IssueSessionRequest, models::LoginUpsertRequest, models::UpdatePremiumRequest,
            models::CreatePublisherRequest, models::CreateArticleRequest,
            models::UpdateArticleRequest, models::ModerateArticleRequest,
            models::PaymentIntentRequest, models::SuccessResponse, models::LoginUpsertResponse,
            models::RoleResponse, models::CountResponse, models::UserStats,
            models::PaymentIntentResponse, reports::ChartCell,
        )
    ),
    tags(
        (name = "bulletin", description = "News bulletin platform API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cloneable container for every service a handler may need.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: users, publishers, articles and revoked sessions.
    pub repo: RepositoryState,
    /// Payment provider client.
    pub payments: PaymentState,
    pub issuer: CredentialIssuer,
    pub verifier: CredentialVerifier,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the signing and verification halves from the configured secret.
    pub fn new(repo: RepositoryState, payments: PaymentState, config: AppConfig) -> Self {
        Self {
            repo,
            payments,
            issuer: CredentialIssuer::from_config(&config),
            verifier: CredentialVerifier::from_config(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for PaymentState {
    fn from_ref(app_state: &AppState) -> PaymentState {
        app_state.payments.clone()
    }
}

impl FromRef<AppState> for CredentialIssuer {
    fn from_ref(app_state: &AppState) -> CredentialIssuer {
        app_state.issuer.clone()
    }
}

impl FromRef<AppState> for CredentialVerifier {
    fn from_ref(app_state: &AppState) -> CredentialVerifier {
        app_state.verifier.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Session gate for `authenticated_routes`. Extracting `AuthSession` verifies
/// the credential and its revocation status; a rejection short-circuits with
/// 401 before the handler runs. The verified session is stored in the request
/// extensions, where the handler's own `AuthSession` extractor picks it up.
async fn auth_middleware(session: AuthSession, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(session);
    next.run(request).await
}

/// create_router
///
/// Assembles the routing table, scoped middleware and the shared state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS: credentials require explicit origins, methods and headers.
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin handlers enforce the role through the `AdminSession` extractor.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span per request carrying method, URI and the `x-request-id` value.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
