use crate::api::types::*;
use crate::api::AppState;
use crate::errors::AppError;
use crate::models::kyc::{DocumentBucket, IdentityDocumentKind, KycFile};
use crate::models::provider::RegistrationSubmission;
use crate::models::user::User;
use crate::utils::crypto::CallbackSigner;
use crate::utils::middleware::rate_limit_middleware;
use crate::utils::validation::Validator;
use axum::{
    body::Bytes,
    extract::{multipart::Field, ConnectInfo, FromRequestParts, Multipart, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use tracing::{error, info};
use uuid::Uuid;

/// Header carrying base64(HMAC-SHA256(secret, body)) on provider callbacks.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// The caller, resolved from `Authorization: Bearer ...`.
pub struct AuthUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|auth| auth.to_str().ok())
            .and_then(|auth| auth.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::AuthenticationError("Missing or invalid Authorization header".to_string()))?;

        let user = state.auth.authenticate(token.trim()).await?;
        Ok(AuthUser(user))
    }
}

/// Client address: first `X-Forwarded-For` hop, else the socket peer.
pub struct ClientIp(pub String);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let ip = forwarded
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string());

        Ok(ClientIp(ip))
    }
}

pub fn kyc_router(state: AppState) -> Router<AppState> {
    let user_routes = Router::new()
        .route("/register", post(register))
        .route("/documents", post(submit_documents))
        .route("/payment-proof", post(submit_payment_proof))
        .route("/status", get(get_status))
        .route_layer(middleware::from_fn_with_state(state.limiter.clone(), rate_limit_middleware));

    Router::new()
        .merge(user_routes)
        .route("/callback", post(handle_callback))
}

pub fn notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_notifications))
        .route("/:id/mark-read", post(mark_notification_read))
}

#[utoipa::path(
    post,
    path = "/api/kyc/register",
    request_body = RegistrationSubmission,
    responses(
        (status = 200, body = KycResponse, description = "Registration stored"),
        (status = 400, body = ErrorResponse, description = "Invalid registration data"),
        (status = 401, body = ErrorResponse, description = "Unauthorized"),
        (status = 409, body = ErrorResponse, description = "A verification is already in progress"),
        (status = 500, body = ErrorResponse, description = "Provider or storage failure")
    ),
    tag = "KYC"
)]
pub async fn register(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ClientIp(ip): ClientIp,
    Json(submission): Json<RegistrationSubmission>,
) -> Result<Json<KycResponse>, AppError> {
    info!(section = "http", action = "kyc_register", user_id = user.id, ip = %ip);
    let kyc = state.kyc.register(&user, &ip, submission).await?;
    Ok(Json(kyc.into()))
}

#[utoipa::path(
    post,
    path = "/api/kyc/documents",
    request_body(content = DocumentsUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = KycResponse, description = "Documents forwarded to the provider"),
        (status = 400, body = ErrorResponse, description = "Missing, oversized or unsupported files"),
        (status = 401, body = ErrorResponse, description = "Unauthorized"),
        (status = 404, body = ErrorResponse, description = "No registration yet"),
        (status = 409, body = ErrorResponse, description = "Documents are not expected in the current state"),
        (status = 500, body = ErrorResponse, description = "Provider or storage failure")
    ),
    tag = "KYC"
)]
pub async fn submit_documents(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<KycResponse>, AppError> {
    let limit = state.kyc.settings().max_kyc_files_size;
    let selfie_enabled = state.kyc.settings().features.selfie_enabled();

    let mut document = None;
    let mut selfie = None;
    let mut document_type = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "document" => document = Some(read_file(field, limit, 0, FileLimit::PerFile).await?),
            // without the selfie step the part is skipped unread
            "selfie" if selfie_enabled => selfie = Some(read_file(field, limit, 0, FileLimit::PerFile).await?),
            "document_type" => {
                document_type = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let document = document.ok_or_else(|| AppError::ValidationError("document is required".to_string()))?;
    let document_kind: IdentityDocumentKind = document_type
        .ok_or_else(|| AppError::ValidationError("document_type is required".to_string()))?
        .parse()
        .map_err(AppError::ValidationError)?;

    let mut buckets = vec![DocumentBucket::identity(document_kind, document.clone())];
    if selfie_enabled {
        let selfie = selfie.ok_or_else(|| AppError::ValidationError("selfie is required".to_string()))?;
        buckets.push(DocumentBucket::selfie(document_kind, selfie, document));
    }

    info!(section = "http", action = "kyc_documents", user_id = user.id, buckets = buckets.len());
    let kyc = state.kyc.submit_documents(&user, buckets).await?;
    Ok(Json(kyc.into()))
}

#[utoipa::path(
    post,
    path = "/api/kyc/payment-proof",
    request_body(content = PaymentProofUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = KycResponse, description = "Payment proof sent for review"),
        (status = 400, body = ErrorResponse, description = "Missing, oversized or unsupported files"),
        (status = 401, body = ErrorResponse, description = "Unauthorized"),
        (status = 404, body = ErrorResponse, description = "No KYC record"),
        (status = 409, body = ErrorResponse, description = "Identity is not approved yet"),
        (status = 500, body = ErrorResponse, description = "Email or storage failure")
    ),
    tag = "KYC"
)]
pub async fn submit_payment_proof(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<KycResponse>, AppError> {
    let limit = state.kyc.settings().max_kyc_files_size;
    let mut files: Vec<KycFile> = Vec::new();
    let mut total = 0u64;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("document") {
            continue;
        }
        let file = read_file(field, limit, total, FileLimit::Total).await?;
        total += file.size;
        files.push(file);
    }

    info!(section = "http", action = "kyc_payment_proof", user_id = user.id, files = files.len(), bytes = total);
    let kyc = state.kyc.submit_payment_proof(&user, files).await?;
    Ok(Json(kyc.into()))
}

#[utoipa::path(
    post,
    path = "/api/kyc/callback",
    request_body = crate::models::provider::CallbackPayload,
    responses(
        (status = 200, description = "Decision applied"),
        (status = 401, body = ErrorResponse, description = "Bad signature"),
        (status = 500, body = ErrorResponse, description = "Not applied, retry later")
    ),
    security(()),
    tag = "KYC"
)]
pub async fn handle_callback(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    if let Some(secret) = state.callback_secret.as_deref() {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if let Err(e) = CallbackSigner::verify(secret, &body, signature) {
            return e.into_response();
        }
    }

    match state.kyc.handle_callback(&body).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            // the provider retries anything that is not a 200
            error!(section = "http", action = "kyc_callback", error = %e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/kyc/status",
    responses(
        (status = 200, body = KycResponse, description = "Current KYC record"),
        (status = 401, body = ErrorResponse, description = "Unauthorized"),
        (status = 404, body = ErrorResponse, description = "No KYC record")
    ),
    tag = "KYC"
)]
pub async fn get_status(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<KycResponse>, AppError> {
    let kyc = state.kyc.get_status(&user).await?;
    Ok(Json(kyc.into()))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, body = NotificationResponse, description = "List of user notifications"),
        (status = 401, body = ErrorResponse, description = "Unauthorized or invalid JWT")
    ),
    tag = "Notification"
)]
pub async fn view_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<NotificationResponse>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let notifications = state.notifications.get_user_notifications(user.id, Some(limit)).await?;
    Ok(Json(NotificationResponse {
        notifications: notifications.into_iter().map(NotificationItem::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/mark-read",
    params(("id" = Uuid, Path, description = "Notification ID to mark as read")),
    responses(
        (status = 200, description = "Notification marked as read"),
        (status = 401, body = ErrorResponse, description = "Unauthorized"),
        (status = 404, body = ErrorResponse, description = "No such notification")
    ),
    tag = "Notification"
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.notifications.mark_notification_read(user.id, &notification_id).await? {
        Ok(StatusCode::OK)
    } else {
        Err(AppError::NotFound(format!("Notification {}", notification_id)))
    }
}

#[derive(Clone, Copy)]
enum FileLimit {
    PerFile,
    Total,
}

/// Streams one file part, failing as soon as the limit is crossed, then sniffs its type.
async fn read_file(mut field: Field<'_>, limit: u64, already_read: u64, mode: FileLimit) -> Result<KycFile, AppError> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let mut data = Vec::new();

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        let size = (data.len() + chunk.len()) as u64;
        if already_read + size > limit {
            return Err(match mode {
                FileLimit::PerFile => AppError::FileTooLarge {
                    file_name,
                    limit_mb: limit / (1024 * 1024),
                },
                FileLimit::Total => AppError::TotalSizeExceeded {
                    total: already_read + size,
                    limit_mb: limit / (1024 * 1024),
                },
            });
        }
        data.extend_from_slice(&chunk);
    }

    let mime = Validator::validate_upload(&file_name, &data)?;
    Ok(KycFile::new(&file_name, mime, data))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::ValidationError(format!("Invalid multipart body: {}", e.body_text()))
}
