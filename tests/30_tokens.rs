mod common;

use axum::http::{Method, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use common::{register_and_login, send, test_app, test_app_with, test_config, TEST_SECRET};
use planner_api::database::{filter, DocumentStore};

fn craft_token(secret: &str, sub: &str, token_type: &str, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "sub": sub,
        "username": "alice",
        "token_type": token_type,
        "jti": uuid::Uuid::new_v4(),
        "iat": now,
        "exp": now + exp_offset_secs,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

async fn refresh(app: &common::App, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, "/api/users/refresh-token", None, Some(body)).await
}

#[tokio::test]
async fn refresh_issues_a_working_pair() {
    let app = test_app();
    let alice = register_and_login(&app, "alice").await;

    let (status, body) = refresh(&app, json!({"refresh": alice.refresh})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let access = body["data"]["access"].as_str().unwrap();
    assert!(body["data"]["refresh"].is_string());
    assert_ne!(body["data"]["refresh"], json!(alice.refresh));

    let (status, body) = send(&app, Method::GET, "/api/users/protected", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"], "alice");
}

#[tokio::test]
async fn refresh_requires_a_token() {
    let app = test_app();
    let (status, body) = refresh(&app, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn refresh_rejects_bad_tokens() {
    let app = test_app();
    let alice = register_and_login(&app, "alice").await;

    let expired = craft_token(TEST_SECRET, &alice.user_id, "refresh", -60);
    let forged = craft_token("someone-elses-secret", &alice.user_id, "refresh", 3600);

    for token in [
        "garbage".to_string(),
        expired,
        forged,
        // An access token is not a refresh token
        alice.access.clone(),
    ] {
        let (status, body) = refresh(&app, json!({"refresh": token})).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", body);
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn refresh_for_deleted_user_is_not_found() {
    let (app, state) = test_app_with(&test_config(false));
    let alice = register_and_login(&app, "alice").await;

    state
        .store
        .delete_one("users", &filter([("username", json!("alice"))]))
        .await
        .unwrap();

    let (status, body) = refresh(&app, json!({"refresh": alice.refresh})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn bearer_must_be_a_live_access_token() {
    let app = test_app();
    let alice = register_and_login(&app, "alice").await;

    let expired = craft_token(TEST_SECRET, &alice.user_id, "access", -60);
    let forged = craft_token("someone-elses-secret", &alice.user_id, "access", 3600);

    for token in [expired.as_str(), forged.as_str(), alice.refresh.as_str()] {
        let (status, _) = send(&app, Method::GET, "/api/users/protected", Some(token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Still usable while unexpired and correctly signed
    let crafted = craft_token(TEST_SECRET, &alice.user_id, "access", 3600);
    let (status, _) = send(&app, Method::GET, "/api/users/protected", Some(&crafted), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_subject_is_a_validation_error() {
    let app = test_app();
    let token = craft_token(TEST_SECRET, "not-a-uuid", "access", 3600);

    let (status, body) = send(&app, Method::GET, "/api/plans", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user ID format");
}

#[tokio::test]
async fn logout_is_stateless_without_revocation() {
    let app = test_app();
    let alice = register_and_login(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users/logout",
        Some(&alice.access),
        Some(json!({"refresh": alice.refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/api/users/protected", Some(&alice.access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = refresh(&app, json!({"refresh": alice.refresh})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_revokes_tokens_when_enabled() {
    let (app, _) = test_app_with(&test_config(true));
    let alice = register_and_login(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/users/logout",
        Some(&alice.access),
        Some(json!({"refresh": alice.refresh})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/api/users/protected", Some(&alice.access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = refresh(&app, json!({"refresh": alice.refresh})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_rotation_retires_old_token_when_enabled() {
    let (app, _) = test_app_with(&test_config(true));
    let alice = register_and_login(&app, "alice").await;

    let (status, body) = refresh(&app, json!({"refresh": alice.refresh})).await;
    assert_eq!(status, StatusCode::OK);
    let rotated = body["data"]["refresh"].as_str().unwrap().to_string();

    let (status, _) = refresh(&app, json!({"refresh": alice.refresh})).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = refresh(&app, json!({"refresh": rotated})).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn simultaneous_refreshes_yield_one_pair_when_enabled() {
    let (app, _) = test_app_with(&test_config(true));
    let alice = register_and_login(&app, "alice").await;

    let body = json!({"refresh": alice.refresh});
    let ((first, _), (second, _)) = tokio::join!(refresh(&app, body.clone()), refresh(&app, body.clone()));

    let statuses = [first, second];
    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1, "{:?}", statuses);
    assert!(statuses.contains(&StatusCode::UNAUTHORIZED));
}
