mod common;

use axum::http::StatusCode;
use buildwatch_core::roles::{ROLE_EIU, ROLE_SYS_AD};
use common::{
    body_json, build_test_app, delete_auth, get_auth, patch_json_auth, post_auth, post_json,
    post_json_auth, put_json_auth, seed_user, token_for, TEST_PASSWORD,
};
use serde_json::json;
use sqlx::PgPool;

async fn login(pool: &PgPool, username: &str, password: &str) -> axum::http::Response<axum::body::Body> {
    post_json(
        build_test_app(pool.clone()),
        "/api/v1/auth/login",
        json!({ "username": username, "password": password }),
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_returns_tokens_and_user(pool: PgPool) {
    seed_user(&pool, "eiu_alice", ROLE_EIU, None).await;

    let response = login(&pool, "eiu_alice", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(json["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(json["expires_in"], 3600);
    assert_eq!(json["user"]["username"], "eiu_alice");
    assert_eq!(json["user"]["role"], ROLE_EIU);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_accepts_email(pool: PgPool) {
    seed_user(&pool, "eiu_bob", ROLE_EIU, None).await;
    let response = login(&pool, "eiu_bob@buildwatch.test", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_password_is_unauthorized(pool: PgPool) {
    seed_user(&pool, "eiu_carol", ROLE_EIU, None).await;

    let response = login(&pool, "eiu_carol", "not-the-password").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHORIZED");

    let response = login(&pool, "nobody", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_failures_lock_the_account(pool: PgPool) {
    seed_user(&pool, "eiu_dave", ROLE_EIU, None).await;

    for _ in 0..5 {
        let response = login(&pool, "eiu_dave", "wrong-password").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // Correct password is refused while the lock holds.
    let response = login(&pool, "eiu_dave", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_rotates_the_token(pool: PgPool) {
    seed_user(&pool, "eiu_erin", ROLE_EIU, None).await;
    let json = body_json(login(&pool, "eiu_erin", TEST_PASSWORD).await).await;
    let refresh_token = json["refresh_token"].as_str().unwrap().to_string();

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], json!(refresh_token));

    // The presented token is single-use.
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_returns_the_caller(pool: PgPool) {
    seed_user(&pool, "eiu_frank", ROLE_EIU, None).await;
    let json = body_json(login(&pool, "eiu_frank", TEST_PASSWORD).await).await;
    let token = json["access_token"].as_str().unwrap();

    let response = get_auth(build_test_app(pool.clone()), "/api/v1/auth/me", token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await;
    assert_eq!(me["data"]["username"], "eiu_frank");
    assert!(me["data"].get("password_hash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn change_password_requires_current_password(pool: PgPool) {
    seed_user(&pool, "eiu_gina", ROLE_EIU, None).await;
    let json = body_json(login(&pool, "eiu_gina", TEST_PASSWORD).await).await;
    let token = json["access_token"].as_str().unwrap();

    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/auth/password",
        token,
        json!({ "current_password": "wrong", "new_password": "Another-pass-456" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/auth/password",
        token,
        json!({ "current_password": TEST_PASSWORD, "new_password": "Another-pass-456" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert_eq!(login(&pool, "eiu_gina", TEST_PASSWORD).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(login(&pool, "eiu_gina", "Another-pass-456").await.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn logout_revokes_refresh_tokens(pool: PgPool) {
    seed_user(&pool, "eiu_hank", ROLE_EIU, None).await;
    let json = body_json(login(&pool, "eiu_hank", TEST_PASSWORD).await).await;
    let token = json["access_token"].as_str().unwrap();
    let refresh_token = json["refresh_token"].as_str().unwrap();

    let response = post_json_auth(build_test_app(pool.clone()), "/api/v1/auth/logout", token, json!({})).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_system_admins_create_users(pool: PgPool) {
    let admin = seed_user(&pool, "sysad_ann", ROLE_SYS_AD, None).await;
    let eiu = seed_user(&pool, "eiu_ed", ROLE_EIU, None).await;
    let body = json!({
        "username": "eiu_new",
        "email": "eiu_new@buildwatch.test",
        "password": TEST_PASSWORD,
        "full_name": "New Partner",
        "role": ROLE_EIU,
    });

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/users",
        &token_for(&eiu),
        body.clone(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/users",
        &token_for(&admin),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = login(&pool, "eiu_new", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn blocked_users_cannot_log_in(pool: PgPool) {
    let admin = seed_user(&pool, "sysad_bea", ROLE_SYS_AD, None).await;
    let eiu = seed_user(&pool, "eiu_fay", ROLE_EIU, None).await;
    let token = token_for(&admin);

    let response = patch_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/users/{}/status", eiu.id),
        &token,
        json!({ "status": "blocked" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "blocked");

    let response = login(&pool, "eiu_fay", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = patch_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/users/{}/status", eiu.id),
        &token,
        json!({ "status": "deleted" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = patch_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/users/{}/status", eiu.id),
        &token,
        json!({ "status": "active" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = login(&pool, "eiu_fay", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admins_cannot_administer_themselves(pool: PgPool) {
    let admin = seed_user(&pool, "sysad_cy", ROLE_SYS_AD, None).await;
    let token = token_for(&admin);

    let response = patch_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/users/{}/status", admin.id),
        &token,
        json!({ "status": "blocked" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = delete_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/users/{}", admin.id),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = login(&pool, "sysad_cy", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reset_password_issues_a_working_temporary_password(pool: PgPool) {
    let admin = seed_user(&pool, "sysad_dot", ROLE_SYS_AD, None).await;
    let eiu = seed_user(&pool, "eiu_gus", ROLE_EIU, None).await;

    let response = post_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/users/{}/reset-password", eiu.id),
        &token_for(&admin),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"], eiu.id);
    let temporary = json["data"]["temporary_password"]
        .as_str()
        .expect("generated password")
        .to_string();

    let response = login(&pool, "eiu_gus", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = login(&pool, "eiu_gus", &temporary).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleted_users_are_hidden_until_restored(pool: PgPool) {
    let admin = seed_user(&pool, "sysad_eve", ROLE_SYS_AD, None).await;
    let eiu = seed_user(&pool, "eiu_hal", ROLE_EIU, None).await;
    let token = token_for(&admin);
    let uri = format!("/api/v1/users/{}", eiu.id);

    let response = delete_auth(build_test_app(pool.clone()), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = login(&pool, "eiu_hal", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(build_test_app(pool.clone()), "/api/v1/users", &token).await;
    let json = body_json(response).await;
    let listed = json["data"].as_array().expect("user list");
    assert!(listed.iter().all(|u| u["id"] != eiu.id));

    let response = delete_auth(build_test_app(pool.clone()), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &format!("{uri}/restore"),
        &token,
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "active");

    let response = login(&pool, "eiu_hal", TEST_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}
