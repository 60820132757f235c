use crate::config::Settings;
use crate::database::sqlite::SqliteDatabase;
use crate::errors::{AppError, Result};
use crate::services::auth::AuthService;
use crate::services::kyc_service::KycService;
use crate::services::mailer::SmtpMailer;
use crate::services::notification_service::NotificationService;
use crate::services::provider::HttpProviderClient;
use crate::utils::middleware::RateLimiter;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::{response::IntoResponse, routing::get, Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use utoipa::{Modify, OpenApi};
use utoipa_redoc::{Redoc, Servable};
use uuid::Uuid;

pub mod routes;
pub mod types;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::register,
        routes::submit_documents,
        routes::submit_payment_proof,
        routes::handle_callback,
        routes::get_status,
        routes::view_notifications,
        routes::mark_notification_read,
    ),
    components(
        schemas(
            types::KycResponse,
            types::ErrorResponse,
            types::NotificationItem,
            types::NotificationResponse,
            types::DocumentsUpload,
            types::PaymentProofUpload,
            crate::models::kyc::KycStatus,
            crate::models::kyc::IdentityDocumentKind,
            crate::models::notification::NotificationType,
            crate::models::notification::NotificationCategory,
            crate::models::provider::RegistrationSubmission,
            crate::models::provider::Address,
            crate::models::provider::DocumentMetadata,
            crate::models::provider::CallbackPayload,
        )
    ),
    tags(
        (name = "KYC", description = "Identity verification. Every endpoint except the provider callback requires 'Bearer <token>'."),
        (name = "Notification", description = "In-app notifications")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityRequirement, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
        openapi.security = Some(vec![SecurityRequirement::new("bearerAuth", Vec::<String>::new())]);
    }
}

/// Everything a handler needs. Cloned per request; all fields are shared handles.
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<SqliteDatabase>,
    pub auth: Arc<AuthService>,
    pub kyc: Arc<KycService>,
    pub notifications: Arc<NotificationService>,
    pub limiter: Arc<RateLimiter>,
    pub callback_secret: Option<String>,
}

pub async fn request_id_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = Uuid::new_v4().to_string();
    req.extensions_mut().insert(request_id.clone());
    let span = tracing::info_span!("request", request_id = %request_id, method = %req.method(), uri = %req.uri());
    next.run(req).instrument(span).await
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let body_limit = state.kyc.settings().max_request_body_size();

    Router::new()
        .nest("/api/kyc", routes::kyc_router(state.clone()))
        .nest("/api/notifications", routes::notifications_router())
        .route("/health", get(health_check))
        .route("/docs/openapi.json", get(openapi_json))
        .merge(Redoc::with_url("/api/redoc", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Wires the production services from `settings` and serves until the process stops.
pub async fn start_http_server(settings: Settings) -> Result<()> {
    let database = Arc::new(SqliteDatabase::new(&settings.database_path).await?);
    let notifications = Arc::new(NotificationService::new(database.clone()));
    let provider = Arc::new(HttpProviderClient::new(&settings.provider)?);
    let mailer = Arc::new(SmtpMailer::new(&settings.smtp)?);

    let kyc = Arc::new(KycService::new(
        database.clone(),
        provider,
        mailer,
        notifications.clone(),
        settings.kyc.clone(),
    ));

    let limiter = Arc::new(RateLimiter::per_second(settings.rate_limit_per_sec));
    spawn_limiter_pruning(limiter.clone());

    let state = AppState {
        database: database.clone(),
        auth: Arc::new(AuthService::new(settings.jwt_secret.clone(), database)),
        kyc,
        notifications,
        limiter,
        callback_secret: settings.callback_secret.clone(),
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::ConfigError(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(
        section = "http",
        action = "listening",
        addr = %addr,
        selfie_step = settings.kyc.features.selfie_enabled(),
        max_kyc_files_size = settings.kyc.max_kyc_files_size
    );

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .map_err(|e| AppError::InternalError(format!("Server error: {}", e)))
}

fn spawn_limiter_pruning(limiter: Arc<RateLimiter>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            limiter.prune();
        }
    });
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}
