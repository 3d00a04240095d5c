//! Router tests over a mock database

use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request as HttpRequest, StatusCode},
};
use paperdesk_common::db::models::User;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
use std::collections::BTreeMap;
use tower::ServiceExt;

fn test_state(conn: DatabaseConnection) -> AppState {
    let config = Arc::new(AppConfig::default());
    let repo = Repository::new(DbPool::from_connection(conn));
    let tagger = TagExtractor::new(
        None,
        Arc::new(MemoryTagCache::new()),
        config.tagging.clone(),
    );

    AppState {
        jwt: Arc::new(JwtManager::new("test-secret", 3600)),
        files: Arc::new(LocalFileStore::new(std::env::temp_dir().join("paperdesk-public"))),
        exports: Arc::new(LocalFileStore::new(std::env::temp_dir().join("paperdesk-private"))),
        tagger: Arc::new(tagger),
        repo,
        cache: None,
        config,
    }
}

fn user(id: i64) -> User {
    let now = chrono::Utc::now().fixed_offset();
    User {
        id,
        name: "Sara".to_string(),
        email: "sara@example.com".to_string(),
        mobile: None,
        password_hash: String::new(),
        created_at: now,
        updated_at: now,
    }
}

fn permission_rows(names: &[&str]) -> Vec<BTreeMap<&'static str, Value>> {
    names
        .iter()
        .map(|name| BTreeMap::from([("name", Value::from(name.to_string()))]))
        .collect()
}

/// Mock connection that resolves `user_id` to an actor holding `names`
fn actor_database(user_id: i64, names: &[&str]) -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![user(user_id)]])
        .append_query_results([permission_rows(names)])
        .into_connection()
}

fn empty_database() -> DatabaseConnection {
    MockDatabase::new(DatabaseBackend::Postgres).into_connection()
}

fn bearer(state: &AppState, user_id: i64) -> String {
    format!("Bearer {}", state.jwt.generate_token(user_id).unwrap())
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = create_router(test_state(empty_database()));

    let response = app
        .oneshot(HttpRequest::get("/v1/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_guest_cannot_list_papers() {
    let app = create_router(test_state(empty_database()));

    let response = app
        .oneshot(HttpRequest::get("/v1/papers").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_invalid_token_is_treated_as_guest() {
    let app = create_router(test_state(empty_database()));

    let response = app
        .oneshot(
            HttpRequest::get("/v1/roles")
                .header(header::AUTHORIZATION, "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_grant_is_forbidden() {
    let state = test_state(actor_database(7, &["paper.viewAny"]));
    let token = bearer(&state, 7);
    let app = create_router(state);

    let response = app
        .oneshot(
            HttpRequest::builder()
                .method(Method::DELETE)
                .uri("/v1/papers/12")
                .header(header::AUTHORIZATION, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_cannot_delete_own_account() {
    let state = test_state(actor_database(7, &["user.delete", "user.viewAny"]));
    let token = bearer(&state, 7);
    let app = create_router(state);

    let response = app
        .oneshot(
            HttpRequest::builder()
                .method(Method::DELETE)
                .uri("/v1/users/7")
                .header(header::AUTHORIZATION, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_extract_tags_without_api_key_uses_fallback() {
    let state = test_state(actor_database(7, &["paper.create"]));
    let token = bearer(&state, 7);
    let app = create_router(state);

    let body = serde_json::json!({
        "text": "Transformer architectures improve protein structure prediction accuracy"
    });

    let response = app
        .oneshot(
            HttpRequest::builder()
                .method(Method::POST)
                .uri("/v1/tags/extract")
                .header(header::AUTHORIZATION, token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["fallback_used"], true);
    assert!(body["fallback_reason"]
        .as_str()
        .unwrap()
        .contains("No OpenAI API key configured"));

    let tags = body["tags"].as_array().unwrap();
    assert!(!tags.is_empty());
    assert!(tags.iter().any(|t| t == "transformer"));
}

#[tokio::test]
async fn test_token_for_deleted_user_is_guest() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<User>::new()])
        .into_connection();
    let state = test_state(db);
    let token = bearer(&state, 99);
    let app = create_router(state);

    let response = app
        .oneshot(
            HttpRequest::get("/v1/auth/me")
                .header(header::AUTHORIZATION, token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_startup_requires_jwt_secret() {
    let repo = Repository::new(DbPool::from_connection(empty_database()));
    let result = build_state(Arc::new(AppConfig::default()), repo).await;
    assert!(matches!(result, Err(AppError::Configuration { .. })));

    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some("a-long-random-secret".to_string());
    let repo = Repository::new(DbPool::from_connection(empty_database()));
    let state = build_state(Arc::new(config), repo).await.unwrap();

    let token = state.jwt.generate_token(3).unwrap();
    assert_eq!(state.jwt.identify(&token), Some(3));
}
