/// Integration tests for the authenticated-request pipeline
///
/// Token extraction, verification and lazy creation of the local user, as
/// seen through the HTTP surface.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use basecamp_shared::auth::identity::VerifiedIdentity;
use basecamp_shared::auth::jwt::HmacVerifier;
use common::{TestContext, UnreachableVerifier};
use std::sync::Arc;
use serde_json::json;
use tower::Service as _;

async fn get_with_header(ctx: &TestContext, uri: &str, authorization: &str) -> StatusCode {
    let request = Request::builder()
        .uri(uri)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap();

    ctx.app.clone().call(request).await.unwrap().status()
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/me", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization token");
    assert_eq!(body["code"], "unauthorized");
    assert_eq!(ctx.store.user_count(), 0);
}

#[tokio::test]
async fn test_non_bearer_header_counts_as_missing() {
    let ctx = TestContext::new();
    let token = ctx.token_for("uid-basic");

    for header in [
        format!("Basic {token}"),
        format!("bearer {token}"),
        "Bearer ".to_string(),
        token.clone(),
    ] {
        assert_eq!(
            get_with_header(&ctx, "/me", &header).await,
            StatusCode::UNAUTHORIZED,
            "header {header:?}"
        );
    }
    assert_eq!(ctx.store.user_count(), 0);
}

#[tokio::test]
async fn test_invalid_tokens_are_rejected() {
    let ctx = TestContext::new();
    let foreign = HmacVerifier::new("some-other-secret-that-is-long-enough")
        .issue_for(&VerifiedIdentity::new("uid-foreign"), chrono::Duration::hours(1))
        .unwrap();

    for token in [
        "not-a-jwt".to_string(),
        ctx.expired_token_for("uid-expired"),
        foreign,
    ] {
        let (status, body) = ctx.get("/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid or expired token");
    }
    assert_eq!(ctx.store.user_count(), 0);
}

#[tokio::test]
async fn test_first_request_creates_user_from_identity() {
    let ctx = TestContext::new();
    let identity = VerifiedIdentity {
        email: Some("ada@example.com".to_string()),
        name: Some("Ada Lovelace".to_string()),
        picture: Some("https://img.example.com/ada.png".to_string()),
        ..VerifiedIdentity::new("uid-ada")
    };
    let token = ctx.token_with(&identity);

    let (status, body) = ctx.get("/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Ada Lovelace");
    assert_eq!(body["user"]["avatarUrl"], "https://img.example.com/ada.png");
    assert_eq!(body["user"]["tier"], "free");
    assert_eq!(body["stats"]["projectCount"], 0);
}

#[tokio::test]
async fn test_identity_without_email_gets_empty_email() {
    let ctx = TestContext::new();
    let token = ctx.token_for("uid-anonymous-email");

    let (status, body) = ctx.get("/me", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "");
    assert!(body["user"]["name"].is_null());
    assert!(body["user"]["avatarUrl"].is_null());
}

#[tokio::test]
async fn test_sequential_requests_resolve_to_one_user() {
    let ctx = TestContext::new();
    let token = ctx.token_for("uid-repeat");

    let (_, first) = ctx.get("/me", Some(&token)).await;
    let (_, second) = ctx.get("/me", Some(&token)).await;

    assert_eq!(first["user"]["id"], second["user"]["id"]);
    assert_eq!(ctx.store.users_with_external_id("uid-repeat"), 1);
    assert_eq!(ctx.store.user_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_requests_create_one_user() {
    let ctx = TestContext::new();
    let token = ctx.token_for("uid-stampede");

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let mut app = ctx.app.clone();
            let token = token.clone();
            tokio::spawn(async move {
                let request = Request::builder()
                    .uri("/me")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap();
                app.call(request).await.unwrap().status()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(ctx.store.users_with_external_id("uid-stampede"), 1);
}

#[tokio::test]
async fn test_optional_route_ignores_bad_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/projects", Some("garbage")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"], json!([]));
    assert_eq!(ctx.store.user_count(), 0);
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let ctx = TestContext::new();

    for (method, uri) in [
        ("PATCH", "/me"),
        ("DELETE", "/me"),
        ("POST", "/projects"),
        ("GET", "/api-keys"),
        ("POST", "/api-keys"),
        ("DELETE", "/api-keys/00000000-0000-0000-0000-000000000000"),
        ("GET", "/usage"),
        ("POST", "/usage"),
    ] {
        let (status, _) = ctx.send(method, uri, None, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_error_responses_carry_security_headers() {
    let ctx = TestContext::new();
    let request = Request::builder().uri("/me").body(Body::empty()).unwrap();

    let response = ctx.app.clone().call(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
}

#[tokio::test]
async fn test_unreachable_provider_is_service_unavailable() {
    let ctx = TestContext::with_verifier(Arc::new(UnreachableVerifier));
    let token = ctx.token_for("uid-1");

    let (status, body) = ctx.get("/me", Some(&token)).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Identity provider unavailable");
    assert_eq!(body["code"], "service_unavailable");
    assert_eq!(ctx.store.user_count(), 0);
}

#[tokio::test]
async fn test_unreachable_provider_leaves_listing_anonymous() {
    let ctx = TestContext::with_verifier(Arc::new(UnreachableVerifier));
    let token = ctx.token_for("uid-1");

    let (status, body) = ctx.get("/projects", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["projects"], json!([]));
}
