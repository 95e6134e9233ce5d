//! Account flow integration tests
//!
//! Tests signup, login and credential rotation against an in-memory
//! SQLite directory.

mod common;

use common::*;
use reqwest::StatusCode;
use smartsafe_gate::directory::UserDirectory;
use smartsafe_gate::error::{AccountError, AuthError};

/// Test 1: create_user stores exactly one hashed record
#[tokio::test]
async fn test_create_user_stores_one_record() {
    let (state, directory) = create_test_state().await;

    let created = state
        .accounts
        .create_user(USER_ADDRESS, USER_PASSWORD, USER_KEY)
        .await
        .unwrap();
    assert_eq!(created.identifier, USER_ADDRESS);

    assert_eq!(directory.count().await.unwrap(), 1);
    let stored = directory
        .find_by_identifier(USER_ADDRESS)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.identifier, USER_ADDRESS);
    assert_eq!(stored.auth_key, USER_KEY);
    assert_ne!(stored.hashed_secret, USER_PASSWORD);
    assert!(stored.hashed_secret.starts_with("$2b$04$"));
}

/// Test 2: Duplicate signup is rejected
#[tokio::test]
async fn test_duplicate_signup() {
    let (state, directory) = create_test_state().await;

    state
        .accounts
        .create_user(USER_ADDRESS, USER_PASSWORD, USER_KEY)
        .await
        .unwrap();
    let second = state
        .accounts
        .create_user(USER_ADDRESS, "otherPassword", "otherKey")
        .await;

    assert!(matches!(second, Err(AccountError::AlreadyExists(_))));
    assert_eq!(directory.count().await.unwrap(), 1);
}

/// Test 3: Signup, login and account lookup over HTTP
#[tokio::test]
async fn test_signup_then_login_over_http() {
    let (state, _) = create_test_state().await;
    let (addr, shutdown_tx) = run_test_server(state).await;
    let client = create_test_client();

    let signup = client
        .post(format!("http://{}/signup", addr))
        .header("X-Forwarded-Proto", "https")
        .json(&serde_json::json!({
            "address": USER_ADDRESS,
            "password": USER_PASSWORD,
            "key": USER_KEY
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(signup.status(), StatusCode::CREATED);

    let duplicate = client
        .post(format!("http://{}/signup", addr))
        .header("X-Forwarded-Proto", "https")
        .json(&serde_json::json!({
            "address": USER_ADDRESS,
            "password": USER_PASSWORD,
            "key": USER_KEY
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let login = client
        .post(format!("http://{}/login", addr))
        .header("X-Forwarded-Proto", "https")
        .header("Authorization", basic_auth(USER_ADDRESS, USER_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let body: serde_json::Value = login.json().await.unwrap();
    assert_eq!(body["address"], USER_ADDRESS);

    let bad_login = client
        .post(format!("http://{}/login", addr))
        .header("X-Forwarded-Proto", "https")
        .header("Authorization", basic_auth(USER_ADDRESS, "wrongPassword"))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_login.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = bad_login.json().await.unwrap();
    assert_eq!(body["error"], "Authentication failed");

    let logout = client
        .post(format!("http://{}/logout", addr))
        .header("X-Forwarded-Proto", "https")
        .header("Authorization", basic_auth(USER_ADDRESS, USER_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let anonymous_logout = client
        .post(format!("http://{}/logout", addr))
        .header("X-Forwarded-Proto", "https")
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous_logout.status(), StatusCode::NO_CONTENT);

    let _ = shutdown_tx.send(());
}

/// Test 4: Rotation replaces the stored hash
#[tokio::test]
async fn test_rotate_secret() {
    let (state, _) = create_test_state().await;
    state
        .accounts
        .create_user(USER_ADDRESS, USER_PASSWORD, USER_KEY)
        .await
        .unwrap();

    state
        .accounts
        .rotate_secret(USER_ADDRESS, USER_PASSWORD, "newPassword")
        .await
        .unwrap();

    let gate = state.admission.gate();
    assert_eq!(
        gate.authenticate(USER_ADDRESS, USER_PASSWORD).await,
        Err(AuthError::InvalidCredential)
    );
    assert!(gate.authenticate(USER_ADDRESS, "newPassword").await.is_ok());
}

/// Test 5: Rotation over HTTP
#[tokio::test]
async fn test_rotate_secret_over_http() {
    let (state, _) = create_test_state().await;
    state
        .accounts
        .create_user(USER_ADDRESS, USER_PASSWORD, USER_KEY)
        .await
        .unwrap();
    let (addr, shutdown_tx) = run_test_server(state).await;
    let client = create_test_client();

    let rotate = client
        .put(format!("http://{}/account/password", addr))
        .header("X-Forwarded-Proto", "https")
        .header("Authorization", basic_auth(USER_ADDRESS, USER_PASSWORD))
        .json(&serde_json::json!({
            "current_password": USER_PASSWORD,
            "new_password": "newPassword"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(rotate.status(), StatusCode::NO_CONTENT);

    let old = client
        .get(format!("http://{}/account", addr))
        .header("X-Forwarded-Proto", "https")
        .header("Authorization", basic_auth(USER_ADDRESS, USER_PASSWORD))
        .send()
        .await
        .unwrap();
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = client
        .get(format!("http://{}/account", addr))
        .header("X-Forwarded-Proto", "https")
        .header("Authorization", basic_auth(USER_ADDRESS, "newPassword"))
        .send()
        .await
        .unwrap();
    assert_eq!(new.status(), StatusCode::OK);

    let _ = shutdown_tx.send(());
}
