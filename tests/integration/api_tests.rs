//! API integration tests
//!
//! Drive the full router in-process against the in-memory user store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use libapp_server::{
    api, config::AppConfig, models::user::NewUser, repository::MemoryUserRepository, AppState,
};

const ADMIN: (&str, &str) = ("admin", "admin-password");
const PASSWORD: &str = "secret1";

async fn setup() -> (Router, AppState) {
    let state = AppState::new(AppConfig::default(), Arc::new(MemoryUserRepository::new()));
    state.services.users.bootstrap(Some(ADMIN)).await.unwrap();
    (api::router(state.clone()), state)
}

async fn register(state: &AppState, username: &str) {
    state
        .services
        .users
        .register(NewUser {
            username: username.to_string(),
            password: PASSWORD.to_string(),
            password2: PASSWORD.to_string(),
        })
        .await
        .unwrap();
}

async fn token(state: &AppState, username: &str) -> String {
    state.services.users.issue_token(username).await.unwrap()
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

fn request(method: Method, uri: &str, authorization: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

#[tokio::test]
async fn test_health_check_is_public() {
    let (app, _) = setup().await;

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_user_can_read_but_not_write() {
    let (app, state) = setup().await;
    register(&state, "alice").await;
    let bearer = format!("Bearer {}", token(&state, "alice").await);

    let (status, body) = send(&app, request(Method::GET, "/api/books", Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/books",
            Some(&bearer),
            Some(json!({ "title": "Dune", "authorIds": [], "genreIds": [] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");
}

#[tokio::test]
async fn test_missing_or_broken_credentials() {
    let (app, state) = setup().await;

    let (status, _) = send(&app, request(Method::GET, "/api/books", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    for header in ["Bearer ", "Bearer abc.def", "Bearer not-a-token", "abc.def.ghi"] {
        let (status, body) = send(&app, request(Method::GET, "/api/books", Some(header), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "header {:?}", header);
        assert_eq!(body["message"], "Authentication required");
    }

    // subject unknown to the store
    let ghost = state
        .services
        .codec
        .issue("ghost", &libapp_server::security::SigningSecret::generate(), Utc::now())
        .unwrap();
    let (status, _) = send(
        &app,
        request(Method::GET, "/api/books", Some(&format!("Bearer {}", ghost)), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_without_bearer_prefix() {
    let (app, state) = setup().await;
    register(&state, "alice").await;
    let raw = token(&state, "alice").await;

    let (status, body) = send(&app, request(Method::GET, "/api/me", Some(&raw), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["roles"], json!(["USER"]));

    let doubled = format!("Bearer Bearer {}", raw);
    let (status, _) = send(&app, request(Method::GET, "/api/me", Some(&doubled), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (app, state) = setup().await;
    register(&state, "alice").await;

    let stale = state
        .services
        .users
        .issue_token_at("alice", Utc::now() - Duration::days(2))
        .await
        .unwrap();
    let (status, _) = send(
        &app,
        request(Method::GET, "/api/authors", Some(&format!("Bearer {}", stale)), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register() {
    let (app, _) = setup().await;
    let body = json!({ "username": "bob", "password": PASSWORD, "password2": PASSWORD });

    let (status, response) = send(
        &app,
        request(Method::POST, "/users/register", None, Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response, json!({ "isRegistered": true }));

    let (status, _) = send(&app, request(Method::POST, "/users/register", None, Some(body))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_rejects_invalid_input() {
    let (app, _) = setup().await;

    let mismatch = json!({ "username": "bob", "password": PASSWORD, "password2": "other1" });
    let (status, _) = send(&app, request(Method::POST, "/users/register", None, Some(mismatch))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let short = json!({ "username": "bo", "password": PASSWORD, "password2": PASSWORD });
    let (status, _) = send(&app, request(Method::POST, "/users/register", None, Some(short))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the name would not survive a Basic header
    let colon = json!({ "username": "bob:x", "password": PASSWORD, "password2": PASSWORD });
    let (status, _) = send(&app, request(Method::POST, "/users/register", None, Some(colon))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(Method::POST, "/users/get-token", Some(&basic("bob", "x")), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_while_authenticated_is_forbidden() {
    let (app, state) = setup().await;
    register(&state, "alice").await;

    let body = json!({ "username": "carol", "password": PASSWORD, "password2": PASSWORD });
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/users/register",
            Some(&basic("alice", PASSWORD)),
            Some(body),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_get_token() {
    let (app, state) = setup().await;
    register(&state, "alice").await;

    let (status, _) = send(
        &app,
        request(Method::POST, "/users/get-token", Some(&basic("alice", "wrong-password")), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request(Method::GET, "/users/get-token", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        request(Method::GET, "/users/get-token", Some(&basic("alice", PASSWORD)), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/me", Some(&format!("Bearer {}", token)), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn test_rotate_secret_revokes_tokens() {
    let (app, state) = setup().await;
    register(&state, "alice").await;
    let bearer = format!("Bearer {}", token(&state, "alice").await);

    let (status, _) = send(&app, request(Method::GET, "/api/books", Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(Method::POST, "/users/rotate-secret", Some(&basic("alice", PASSWORD)), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request(Method::GET, "/api/books", Some(&bearer), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_manages_catalog() {
    let (app, state) = setup().await;
    register(&state, "alice").await;
    let admin = format!("Bearer {}", token(&state, ADMIN.0).await);
    let user = format!("Bearer {}", token(&state, "alice").await);

    let (status, author) = send(
        &app,
        request(
            Method::POST,
            "/api/authors",
            Some(&admin),
            Some(json!({ "name": "Frank Herbert" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, genre) = send(
        &app,
        request(Method::POST, "/api/genres", Some(&admin), Some(json!({ "name": "Science fiction" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, book) = send(
        &app,
        request(
            Method::POST,
            "/api/books",
            Some(&admin),
            Some(json!({
                "title": "Dune",
                "authorIds": [author["id"]],
                "genreIds": [genre["id"]]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(book["authors"][0]["name"], "Frank Herbert");

    let (status, books) = send(
        &app,
        request(Method::GET, "/api/books?author=herbert", Some(&user), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(books.as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/books",
            Some(&admin),
            Some(json!({ "title": "Orphan", "authorIds": [999], "genreIds": [] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let info_uri = format!("/api/books/{}/bookInfo", book["id"]);
    let (status, info) = send(&app, request(Method::GET, &info_uri, Some(&user), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["id"], book["id"]);
    assert_eq!(info["isbn"], Value::Null);

    let patch = json!({ "numberOfPages": 412, "language": "English" });
    let (status, _) = send(
        &app,
        request(Method::PATCH, &info_uri, Some(&user), Some(patch.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, info) = send(&app, request(Method::PATCH, &info_uri, Some(&admin), Some(patch))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["numberOfPages"], 412);

    let (status, info) = send(
        &app,
        request(Method::PATCH, &info_uri, Some(&admin), Some(json!({ "publicationYear": 1965 }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["language"], "English");
    assert_eq!(info["publicationYear"], 1965);

    let uri = format!("/api/books/{}", book["id"]);
    let (status, deleted) = send(&app, request(Method::DELETE, &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "deleted": true }));

    let (status, deleted) = send(&app, request(Method::DELETE, &uri, Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted, json!({ "deleted": false }));

    let (status, _) = send(&app, request(Method::GET, &info_uri, Some(&user), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for uri in [
        format!("/api/authors/{}", author["id"]),
        format!("/api/genres/{}", genre["id"]),
    ] {
        let (status, deleted) = send(&app, request(Method::DELETE, &uri, Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, json!({ "deleted": true }));

        let (status, deleted) = send(&app, request(Method::DELETE, &uri, Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted, json!({ "deleted": false }));
    }
}

#[tokio::test]
async fn test_entry_can_be_returned_once() {
    let (app, state) = setup().await;
    register(&state, "alice").await;
    let admin = format!("Bearer {}", token(&state, ADMIN.0).await);

    let (_, book) = send(
        &app,
        request(Method::POST, "/api/books", Some(&admin), Some(json!({ "title": "Emma" }))),
    )
    .await;

    let (status, entry) = send(
        &app,
        request(
            Method::POST,
            "/api/entries",
            Some(&admin),
            Some(json!({ "borrowedBookId": book["id"], "borrowerUsername": "alice" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["returned"], false);

    let uri = format!("/api/entries/{}", entry["id"]);
    let (status, entry) = send(
        &app,
        request(Method::PATCH, &uri, Some(&admin), Some(json!({ "returned": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["returned"], true);

    let (status, _) = send(
        &app,
        request(Method::PATCH, &uri, Some(&admin), Some(json!({ "returned": true }))),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, entries) = send(
        &app,
        request(Method::GET, "/api/entries?returned=true&username=alice", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().map(Vec::len), Some(1));

    for (since, expected) in [("day", 1), ("WEEK", 1), ("century", 1)] {
        let uri = format!("/api/entries?since={}&bookTitle=emma", since);
        let (status, entries) = send(&app, request(Method::GET, &uri, Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(entries.as_array().map(Vec::len), Some(expected), "since {}", since);
    }
}

#[tokio::test]
async fn test_cors_only_on_api_chain() {
    let (app, _) = setup().await;

    let preflight = |uri: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri(uri)
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(preflight("/api/books")).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );

    let response = app.clone().oneshot(preflight("/users/get-token")).await.unwrap();
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
