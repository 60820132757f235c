use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use kyc_backend::config::ProviderSettings;
use kyc_backend::errors::AppError;
use kyc_backend::models::kyc::{DocumentBucket, IdentityDocumentKind, KycFile};
use kyc_backend::models::provider::{CustomerRegistrationRequest, RegistrationSubmission};
use kyc_backend::services::provider::{HttpProviderClient, ProviderClient};
use std::time::Duration;

/// Provider stand-in on a random local port. Registrations answer with the
/// status encoded in the request's last name; every document upload gets a 422.
async fn stub_provider() -> String {
    let app = Router::new()
        .route(
            "/customers/registration",
            post(|headers: HeaderMap, body: String| async move {
                if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some("key-1") {
                    return (StatusCode::UNAUTHORIZED, String::new());
                }
                let status = if body.contains("Unprocessable") {
                    StatusCode::UNPROCESSABLE_ENTITY
                } else if body.contains("Outage") {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::OK
                };
                (status, r#"{"is_success":false,"registration_id":"R9"}"#.to_string())
            }),
        )
        .route(
            "/customers/:registration_id/documents",
            post(|Path(_registration_id): Path<String>| async {
                (StatusCode::UNPROCESSABLE_ENTITY, r#"[{"is_success":false}]"#)
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: String) -> HttpProviderClient {
    HttpProviderClient::new(&ProviderSettings {
        base_url,
        api_key: "key-1".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

fn request(last_name: &str) -> CustomerRegistrationRequest {
    CustomerRegistrationRequest {
        external_user_id: "1".to_string(),
        ip_address: "10.0.0.1".to_string(),
        submission: RegistrationSubmission {
            first_name: "A".into(),
            last_name: last_name.into(),
            date_of_birth: "1990-01-01".into(),
            address: None,
            document: None,
            metadata: None,
        },
    }
}

#[tokio::test]
async fn success_body_is_returned_raw() {
    let provider = client(stub_provider().await);
    let body = provider.customer_registration(&request("Doe")).await.unwrap();
    assert_eq!(body, br#"{"is_success":false,"registration_id":"R9"}"#.to_vec());
}

#[tokio::test]
async fn client_error_status_is_a_provider_error() {
    let provider = client(stub_provider().await);
    let err = provider
        .customer_registration(&request("Unprocessable"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProviderRejected(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn server_error_status_is_unavailable() {
    let provider = client(stub_provider().await);
    let err = provider.customer_registration(&request("Outage")).await.unwrap_err();
    assert!(matches!(err, AppError::ProviderUnavailable(_)));
}

#[tokio::test]
async fn rejected_document_upload_is_a_provider_error() {
    let provider = client(stub_provider().await);
    let bucket = DocumentBucket::identity(
        IdentityDocumentKind::Passport,
        KycFile::new("passport.png", "image/png", b"\x89PNG\r\n\x1a\n".to_vec()),
    );
    let err = provider.document_verification(1, "R9", &bucket).await.unwrap_err();
    assert!(matches!(err, AppError::ProviderRejected(_)));
}

#[tokio::test]
async fn unreachable_provider_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{}", addr))
        .customer_registration(&request("Doe"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProviderUnavailable(_)));
}
