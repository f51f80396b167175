/// HTTP boundary tests
///
/// Everything here is decided before the handler reaches the database:
/// authentication, routing, method handling, CORS, and request validation.
/// They run against a router whose database is unreachable.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{offline_app, send, TEST_SECRET};
use opsdesk_shared::auth::jwt::issue_token_pair;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

const RESOURCES: [&str; 7] = [
    "/budgets",
    "/invoices",
    "/tasks",
    "/notes",
    "/team",
    "/dashboard",
    "/profile",
];

#[tokio::test]
async fn test_missing_credentials_is_401() {
    let app = offline_app();

    for path in RESOURCES {
        let (status, body) = send(&app, "GET", path, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", path);
        assert!(body["error"].is_string(), "{}", path);
    }
}

#[tokio::test]
async fn test_mutations_without_credentials_are_401() {
    let app = offline_app();

    let (status, _) = send(&app, "POST", "/budgets", None, Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "DELETE", "/tasks?id=00000000-0000-0000-0000-000000000000", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_token_is_401() {
    let app = offline_app();

    let (status, body) = send(&app, "GET", "/tasks", Some("not.a.jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let forged = issue_token_pair(Uuid::new_v4(), "some-other-secret-that-is-32-bytes!!")
        .unwrap()
        .access_token;
    let (status, _) = send(&app, "GET", "/tasks", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = offline_app();
    let pair = issue_token_pair(Uuid::new_v4(), TEST_SECRET).unwrap();

    let (status, _) = send(&app, "GET", "/notes", Some(&pair.refresh_token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_401() {
    let app = offline_app();

    let request = Request::builder()
        .method("GET")
        .uri("/budgets")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsupported_method_is_405_before_auth() {
    let app = offline_app();

    for path in ["/budgets", "/invoices", "/tasks", "/notes", "/team", "/profile"] {
        let (status, body) = send(&app, "PUT", path, None, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", path);
        assert_eq!(body["error"], "Method not allowed");
    }

    let (status, _) = send(&app, "POST", "/dashboard", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(&app, "GET", "/auth/login", None, None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let app = offline_app();

    let (status, body) = send(&app, "GET", "/projects", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_bare_options_is_200_without_auth() {
    let app = offline_app();

    for path in ["/budgets", "/team", "/dashboard", "/anything"] {
        let (status, _) = send(&app, "OPTIONS", path, None, None).await;
        assert_eq!(status, StatusCode::OK, "{}", path);
    }
}

#[tokio::test]
async fn test_cors_preflight_is_permissive() {
    let app = offline_app();

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/tasks")
        .header("origin", "https://ops.example.com")
        .header("access-control-request-method", "PATCH")
        .header("access-control-request-headers", "authorization,content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = offline_app();

    let request = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_validates_before_lookup() {
    let app = offline_app();

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": "not-an-email", "password": "" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_refresh_rejects_bad_tokens() {
    let app = offline_app();

    let (status, _) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": "garbage" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let access = issue_token_pair(Uuid::new_v4(), TEST_SECRET)
        .unwrap()
        .access_token;
    let (status, _) = send(
        &app,
        "POST",
        "/auth/refresh",
        None,
        Some(json!({ "refresh_token": access })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_degraded_database() {
    let app = offline_app();

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert!(body["version"].is_string());
}
