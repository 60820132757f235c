mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::*;
use http_body_util::BodyExt;
use kyc_backend::models::kyc::KycStatus;
use kyc_backend::services::jwt::JwtManager;
use kyc_backend::utils::crypto::CallbackSigner;
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "kyc-test-boundary";

struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    data: Vec<u8>,
}

fn text_part<'a>(name: &'a str, value: &str) -> Part<'a> {
    Part {
        name,
        file_name: None,
        data: value.as_bytes().to_vec(),
    }
}

fn file_part<'a>(name: &'a str, file_name: &'a str, data: Vec<u8>) -> Part<'a> {
    Part {
        name,
        file_name: Some(file_name),
        data,
    }
}

fn multipart_body(parts: Vec<Part<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                        part.name, file_name
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(&part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn token(user_id: u64) -> String {
    JwtManager::new(JWT_SECRET.to_string()).generate_token(user_id).unwrap()
}

fn multipart_request(uri: &str, user_id: u64, parts: Vec<Part<'_>>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(user_id)))
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn json_request(uri: &str, user_id: u64, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(user_id)))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str, user_id: u64) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(user_id)))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &TestApp, secret: Option<&str>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.router(secret).oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, body)
}

async fn send_json(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, None, request).await;
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, value)
}

const REGISTRATION: &str = r#"{"first_name": "A", "last_name": "Doe", "date_of_birth": "1990-01-01"}"#;

async fn registered(app: &TestApp, user_id: u64) {
    app.seed_user(user_id).await;
    app.provider.on_registration(registration_ok("R1"));
    let (status, body) = send_json(app, json_request("/api/kyc/register", user_id, REGISTRATION)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
}

#[tokio::test]
async fn register_returns_the_record() {
    let app = TestApp::new(false).await;
    app.seed_user(1).await;
    app.provider.on_registration(registration_ok("R1"));

    let request = Request::builder()
        .method("POST")
        .uri("/api/kyc/register")
        .header("authorization", format!("Bearer {}", token(1)))
        .header("content-type", "application/json")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .body(Body::from(REGISTRATION))
        .unwrap();
    let (status, body) = send_json(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "step_one_success");
    assert_eq!(body["registration_id"], "R1");
    assert_eq!(body["level"], 1);
    assert_eq!(app.provider.registration_requests.lock().unwrap()[0].ip_address, "203.0.113.7");
}

#[tokio::test]
async fn documents_and_status_round_trip() {
    let app = TestApp::new(true).await;
    registered(&app, 2).await;

    app.provider.on_documents(document_ok("X1"));
    app.provider.on_documents(document_ok("X2"));
    let request = multipart_request(
        "/api/kyc/documents",
        2,
        vec![
            text_part("document_type", "passport"),
            file_part("document", "Passport.PNG", png(1024)),
            file_part("selfie", "me.png", png(1024)),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "step_two_pending");
    assert_eq!(body["reference_ids"], serde_json::json!(["X1", "X2"]));

    let uploads = app.provider.uploads();
    assert_eq!(uploads[0].file_names, vec!["passport.png"]);
    assert_eq!(uploads[1].file_names, vec!["me.png", "passport.png"]);

    let (status, body) = send_json(&app, get_request("/api/kyc/status", 2)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "step_two_pending");
}

#[tokio::test]
async fn oversized_file_is_rejected() {
    let app = TestApp::with_limit(false, MB).await;
    registered(&app, 3).await;

    let request = multipart_request(
        "/api/kyc/documents",
        3,
        vec![
            text_part("document_type", "passport"),
            file_part("document", "big.png", png(MB as usize + 1)),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Size of attachements should be <= 1 MB");
    assert!(app.provider.uploads().is_empty());
}

#[tokio::test]
async fn executable_upload_is_rejected() {
    let app = TestApp::new(false).await;
    registered(&app, 4).await;

    let request = multipart_request(
        "/api/kyc/documents",
        4,
        vec![
            text_part("document_type", "passport"),
            file_part("document", "passport.png", b"MZ\x90\x00\x03\x00\x00\x00\x04\x00".to_vec()),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("application/x-msdownload"));
    assert!(app.provider.uploads().is_empty());
}

#[tokio::test]
async fn selfie_gating_at_the_edge() {
    // flag off: the selfie part is ignored
    let app = TestApp::new(false).await;
    registered(&app, 5).await;
    app.provider.on_documents(document_ok("X1"));
    let request = multipart_request(
        "/api/kyc/documents",
        5,
        vec![
            text_part("document_type", "id_card"),
            file_part("document", "id.png", png(64)),
            file_part("selfie", "me.png", png(64)),
        ],
    );
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.provider.uploads().len(), 1);

    // flag on: a missing selfie is a validation error
    let app = TestApp::new(true).await;
    registered(&app, 5).await;
    let request = multipart_request(
        "/api/kyc/documents",
        5,
        vec![
            text_part("document_type", "id_card"),
            file_part("document", "id.png", png(64)),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("selfie"));
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = TestApp::new(false).await;
    app.seed_user(6).await;

    let request = Request::builder().uri("/api/kyc/status").body(Body::empty()).unwrap();
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let foreign = JwtManager::new("other".into()).generate_token(6).unwrap();
    let request = Request::builder()
        .uri("/api/kyc/status")
        .header("authorization", format!("Bearer {}", foreign))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // valid signature, unknown user
    let (status, _) = send_json(&app, get_request("/api/kyc/status", 999)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn status_without_record_is_404() {
    let app = TestApp::new(false).await;
    app.seed_user(7).await;
    let (status, body) = send_json(&app, get_request("/api/kyc/status", 7)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn provider_failure_is_a_generic_500() {
    let app = TestApp::new(false).await;
    app.seed_user(8).await;
    app.provider.on_registration(Reply::Unavailable);

    let (status, body) = send_json(&app, json_request("/api/kyc/register", 8, REGISTRATION)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
}

#[tokio::test]
async fn callback_applies_or_asks_for_retry() {
    let app = TestApp::new(false).await;
    registered(&app, 9).await;
    app.provider.on_documents(document_ok("X1"));
    let request = multipart_request(
        "/api/kyc/documents",
        9,
        vec![text_part("document_type", "passport"), file_part("document", "id.png", png(64))],
    );
    assert_eq!(send(&app, None, request).await.0, StatusCode::OK);

    let callback_request = |body: Vec<u8>| {
        Request::builder()
            .method("POST")
            .uri("/api/kyc/callback")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    };

    let (status, _) = send(&app, None, callback_request(callback("UNKNOWN", "approved"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = send(&app, None, callback_request(callback("X1", "approved"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());

    let (_, body) = send_json(&app, get_request("/api/kyc/status", 9)).await;
    assert_eq!(body["status"], "approved");
    assert_eq!(body["level"], 2);
}

#[tokio::test]
async fn signed_callbacks_are_verified() {
    let app = TestApp::new(false).await;
    registered(&app, 10).await;
    app.provider.on_documents(document_ok("X1"));
    let request = multipart_request(
        "/api/kyc/documents",
        10,
        vec![text_part("document_type", "passport"), file_part("document", "id.png", png(64))],
    );
    assert_eq!(send(&app, None, request).await.0, StatusCode::OK);

    let body = callback("X1", "rejected");
    let unsigned = Request::builder()
        .method("POST")
        .uri("/api/kyc/callback")
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _) = send(&app, Some("hook-secret"), unsigned).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let signature = CallbackSigner::sign("hook-secret", &body).unwrap();
    let signed = Request::builder()
        .method("POST")
        .uri("/api/kyc/callback")
        .header("x-signature", signature)
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(&app, Some("hook-secret"), signed).await;
    assert_eq!(status, StatusCode::OK);

    let kyc = app.kyc.get_status(&app.user(10).await).await.unwrap();
    assert_eq!(kyc.status, KycStatus::Rejected);
}

#[tokio::test]
async fn payment_proof_over_http() {
    let app = TestApp::with_limit(false, MB).await;
    registered(&app, 11).await;
    app.provider.on_documents(document_ok("X1"));
    let request = multipart_request(
        "/api/kyc/documents",
        11,
        vec![text_part("document_type", "passport"), file_part("document", "id.png", png(64))],
    );
    assert_eq!(send(&app, None, request).await.0, StatusCode::OK);
    app.kyc.handle_callback(&callback("X1", "approved")).await.unwrap();

    let half = (MB / 2) as usize;
    let request = multipart_request(
        "/api/kyc/payment-proof",
        11,
        vec![
            file_part("document", "a.png", png(half)),
            file_part("document", "b.png", png(half + 1)),
        ],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Size of attachements should be <= 1 MB");

    let request = multipart_request(
        "/api/kyc/payment-proof",
        11,
        vec![file_part("document", "receipt.pdf", b"%PDF-1.4\n...".to_vec())],
    );
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["status"], "step_three_pending");
    assert_eq!(app.mailer.payment_proof_count(), 1);
}

#[tokio::test]
async fn notifications_are_listed_for_the_caller() {
    let app = TestApp::new(false).await;
    registered(&app, 12).await;
    app.seed_user(13).await;

    let (status, body) = send_json(&app, get_request("/api/notifications", 12)).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["notifications"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Verification level 1");
    assert_eq!(items[0]["status"], "Unread");

    let id = items[0]["id"].as_str().unwrap().to_string();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/notifications/{}/mark-read", id))
        .header("authorization", format!("Bearer {}", token(13)))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, None, request).await.0, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/notifications/{}/mark-read", id))
        .header("authorization", format!("Bearer {}", token(12)))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, None, request).await.0, StatusCode::OK);

    let (_, body) = send_json(&app, get_request("/api/notifications", 13)).await;
    assert!(body["notifications"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_and_docs_are_public() {
    let app = TestApp::new(false).await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, None, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let request = Request::builder().uri("/docs/openapi.json").body(Body::empty()).unwrap();
    let (status, body) = send(&app, None, request).await;
    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_slice(&body).unwrap();
    assert!(doc["paths"]["/api/kyc/documents"].is_object());
}
