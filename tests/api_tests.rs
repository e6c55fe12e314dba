//! API integration tests driving the router in-process

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use gearloan_server::{api::create_router, qr, AppState};

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    async fn new() -> Self {
        let state = common::seeded_state().await;
        Self {
            router: create_router(state.clone()),
            state,
        }
    }

    async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{}", uri));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Body is not JSON")
        };
        (status, body)
    }

    async fn login(&self, (email, password): (&str, &str)) -> (String, i64) {
        let (status, body) = self
            .request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        let token = body["token"].as_str().expect("No token in response").to_string();
        let user_id = body["user"]["id"].as_i64().expect("No user id in response");
        (token, user_id)
    }
}

fn return_date(days: i64) -> String {
    (Utc::now() + Duration::days(days)).date_naive().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.request(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "admin@admin.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "NotAuthorized");
}

#[tokio::test]
async fn test_roles_are_enforced() {
    let app = TestApp::new().await;
    let (user_token, user_id) = app.login(common::USER).await;
    let (admin_token, _) = app.login(common::ADMIN).await;

    let (status, _) = app.request(Method::GET, "/admin/dashboard", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .request(Method::GET, "/admin/dashboard", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            "/admin/scan/cancel",
            Some(&user_token),
            Some(json!({ "user_id": user_id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::GET, "/user/scan/check-status", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_scan_handshake() {
    let app = TestApp::new().await;
    let (user_token, user_id) = app.login(common::USER).await;
    let (admin_token, _) = app.login(common::ADMIN).await;
    let item_id = common::item_id(&app.state, "ITM-002").await;

    // Borrower opens the dialog
    let (status, body) = app
        .request(
            Method::POST,
            "/user/scan/intent",
            Some(&user_token),
            Some(json!({ "item_id": item_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["poll_interval_ms"], 2000);
    let payload = body["payload"].as_str().unwrap().to_string();

    let (_, body) = app
        .request(Method::GET, "/user/scan/check-status", Some(&user_token), None)
        .await;
    assert_eq!(body["status"], "waiting");

    // Admin scans the raw code
    let (status, body) = app
        .request(
            Method::POST,
            "/admin/scan/lookup",
            Some(&admin_token),
            Some(json!({ "payload": payload })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], user_id);
    assert_eq!(body["user_name"], "Regular User");
    assert_eq!(body["item_name"], "Projector Epson");
    assert_eq!(body["item_stock"], 2);

    let (_, body) = app
        .request(Method::GET, "/user/scan/check-status", Some(&user_token), None)
        .await;
    assert_eq!(body["status"], "scanning");

    // Admin approves
    let (status, body) = app
        .request(
            Method::POST,
            "/admin/scan",
            Some(&admin_token),
            Some(json!({ "user_id": user_id, "item_id": item_id, "return_date": return_date(7) })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "approved");
    let borrowing_id = body["id"].as_i64().unwrap();

    let (_, body) = app
        .request(Method::GET, "/user/scan/check-status", Some(&user_token), None)
        .await;
    assert_eq!(body["status"], "approved");

    let (_, body) = app
        .request(Method::GET, &format!("/items/{}", item_id), Some(&user_token), None)
        .await;
    assert_eq!(body["stock"], 1);

    let (_, body) = app
        .request(Method::GET, "/user/borrowings", Some(&user_token), None)
        .await;
    let mine = body.as_array().unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"], borrowing_id);
    assert_eq!(mine[0]["item_code"], "ITM-002");
    assert_eq!(mine[0]["is_overdue"], false);

    let (_, body) = app
        .request(Method::GET, "/admin/dashboard", Some(&admin_token), None)
        .await;
    assert_eq!(body["totalItems"], 5);
    assert_eq!(body["activeBorrowings"], 1);
    assert_eq!(body["overdueItems"], 0);

    // Return, then return again
    let uri = format!("/admin/borrowings/{}/return", borrowing_id);
    let (status, body) = app.request(Method::POST, &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "returned");

    let (status, body) = app.request(Method::POST, &uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Item already returned");

    let (_, body) = app
        .request(Method::GET, &format!("/items/{}", item_id), Some(&user_token), None)
        .await;
    assert_eq!(body["stock"], 2);
}

#[tokio::test]
async fn test_cancel_resets_waiting() {
    let app = TestApp::new().await;
    let (user_token, user_id) = app.login(common::USER).await;
    let (admin_token, _) = app.login(common::ADMIN).await;
    let item_id = common::item_id(&app.state, "ITM-004").await;

    app.request(
        Method::POST,
        "/admin/scan/lookup",
        Some(&admin_token),
        Some(json!({ "user_id": user_id, "item_id": item_id })),
    )
    .await;

    for _ in 0..2 {
        let (status, body) = app
            .request(
                Method::POST,
                "/admin/scan/cancel",
                Some(&admin_token),
                Some(json!({ "user_id": user_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "waiting");
    }

    let (_, body) = app
        .request(Method::GET, "/user/scan/check-status", Some(&user_token), None)
        .await;
    assert_eq!(body["status"], "waiting");

    let (status, _) = app
        .request(Method::POST, "/user/scan/cancel", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_lookup_rejects_bad_payloads() {
    let app = TestApp::new().await;
    let (admin_token, _) = app.login(common::ADMIN).await;

    let cases = [
        (json!({ "payload": "not json" }), StatusCode::BAD_REQUEST, "MalformedPayload"),
        (json!({ "payload": "{\"item_id\":1}" }), StatusCode::BAD_REQUEST, "MissingFields"),
        (json!({ "user_id": 1 }), StatusCode::BAD_REQUEST, "MissingFields"),
        (json!({ "payload": qr::encode(4242, 1) }), StatusCode::NOT_FOUND, "NotFound"),
    ];
    for (body, expected_status, expected_error) in cases {
        let (status, reply) = app
            .request(Method::POST, "/admin/scan/lookup", Some(&admin_token), Some(body))
            .await;
        assert_eq!(status, expected_status, "{}", reply);
        assert_eq!(reply["error"], expected_error);
    }
}

#[tokio::test]
async fn test_out_of_stock_commit() {
    let app = TestApp::new().await;
    let (user_token, user_id) = app.login(common::USER).await;
    let (admin_token, _) = app.login(common::ADMIN).await;
    let item_id = common::item_id(&app.state, "ITM-003").await;
    let approve = json!({ "user_id": user_id, "item_id": item_id, "return_date": return_date(1) });

    let (status, _) = app
        .request(Method::POST, "/admin/scan", Some(&admin_token), Some(approve.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .request(Method::POST, "/admin/scan", Some(&admin_token), Some(approve))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "StockUnavailable");

    let (status, _) = app
        .request(
            Method::POST,
            "/user/scan/intent",
            Some(&user_token),
            Some(json!({ "item_id": item_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app
        .request(Method::GET, "/admin/borrowings", Some(&admin_token), None)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_past_return_date_rejected() {
    let app = TestApp::new().await;
    let (_, user_id) = app.login(common::USER).await;
    let (admin_token, _) = app.login(common::ADMIN).await;
    let item_id = common::item_id(&app.state, "ITM-005").await;

    let (status, body) = app
        .request(
            Method::POST,
            "/admin/scan",
            Some(&admin_token),
            Some(json!({ "user_id": user_id, "item_id": item_id, "return_date": return_date(-3) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BadValue");
}
