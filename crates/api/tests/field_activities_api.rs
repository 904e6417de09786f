mod common;

use axum::http::StatusCode;
use buildwatch_core::roles::{ROLE_EIU, ROLE_LGU_IU};
use buildwatch_db::models::user::User;
use common::{
    body_json, build_test_app, delete_auth, get_auth, post_json_auth, put_json_auth, seed_user,
    token_for,
};
use serde_json::{json, Value};
use sqlx::PgPool;

struct Fixture {
    iu: User,
    eiu: User,
    project_id: i64,
}

/// A draft project with `eiu_partner` assigned as its EIU partner.
async fn setup(pool: &PgPool) -> Fixture {
    let iu = seed_user(pool, "iu_office", ROLE_LGU_IU, None).await;
    let eiu = seed_user(pool, "eiu_partner", ROLE_EIU, None).await;
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        &token_for(&iu),
        json!({
            "project_code": "INF-2026-300",
            "name": "Drainage canal rehabilitation",
            "category": "infrastructure",
            "location": "Purok 3",
            "total_budget": 600_000.0,
            "start_date": "2026-04-01",
            "end_date": "2026-10-31",
            "eiu_partner_id": eiu.id
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let project_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    Fixture { iu, eiu, project_id }
}

fn site_visit(project_id: i64) -> Value {
    json!({
        "project_id": project_id,
        "activity_type": "site_visit",
        "title": "Week 12 inspection",
        "description": "Checked canal lining on the north segment",
        "location": "Purok 3",
        "findings": "Lining cracked near outfall",
        "attachments": ["north-segment.jpg"]
    })
}

async fn log_activity(pool: &PgPool, fx: &Fixture) -> i64 {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities",
        &token_for(&fx.eiu),
        site_visit(fx.project_id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn review(pool: &PgPool, reviewer: &User, id: i64, body: Value) -> axum::http::Response<axum::body::Body> {
    post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/eiu-activities/{id}/review"),
        &token_for(reviewer),
        body,
    )
    .await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn only_the_assigned_partner_logs_activities(pool: PgPool) {
    let fx = setup(&pool).await;
    let stranger = seed_user(&pool, "eiu_stranger", ROLE_EIU, None).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities",
        &token_for(&stranger),
        site_visit(fx.project_id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities",
        &token_for(&fx.iu),
        site_visit(fx.project_id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut bad = site_visit(fx.project_id);
    bad["attachments"] = json!({ "file": "x.jpg" });
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities",
        &token_for(&fx.eiu),
        bad,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities",
        &token_for(&fx.eiu),
        site_visit(fx.project_id),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["review_status"], "pending_review");
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["priority"], "medium");
    let id = json["data"]["id"].as_i64().unwrap();

    // The office hears about it.
    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/notifications",
        &token_for(&fx.iu),
    )
    .await;
    assert!(body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == "New field activity"));

    let uri = format!("/api/v1/eiu-activities/{id}");
    let response = get_auth(build_test_app(pool.clone()), &uri, &token_for(&stranger)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = get_auth(build_test_app(pool.clone()), &uri, &token_for(&fx.iu)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities/mine",
        &token_for(&stranger),
    )
    .await;
    assert!(body_json(response).await["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn revision_requests_reopen_the_activity(pool: PgPool) {
    let fx = setup(&pool).await;
    let other_office = seed_user(&pool, "iu_other", ROLE_LGU_IU, None).await;
    let id = log_activity(&pool, &fx).await;
    let uri = format!("/api/v1/eiu-activities/{id}");
    let eiu_token = token_for(&fx.eiu);

    let response = review(&pool, &other_office, id, json!({ "review_status": "approved" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Anything short of approval needs a reason.
    let response = review(&pool, &fx.iu, id, json!({ "review_status": "requires_revision" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = review(
        &pool,
        &fx.iu,
        id,
        json!({ "review_status": "requires_revision", "review_comments": "Add photos of the outfall" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Activity requires_revision");
    assert_eq!(json["data"]["status"], "in_progress");
    assert_eq!(json["data"]["reviewed_by"], fx.iu.id);

    // Returned work can be edited but not withdrawn.
    let response = delete_auth(build_test_app(pool.clone()), &uri, &eiu_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        &eiu_token,
        json!({ "attachments": ["north-segment.jpg", "outfall.jpg"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["review_status"], "pending_review");
    assert_eq!(json["data"]["status"], "pending");
    assert_eq!(json["data"]["attachments"].as_array().unwrap().len(), 2);

    let response = review(&pool, &fx.iu, id, json!({ "review_status": "approved" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "completed");

    // Decided activities are frozen.
    let response = review(&pool, &fx.iu, id, json!({ "review_status": "approved" })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        &eiu_token,
        json!({ "title": "Renamed" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities?review_status=approved",
        &token_for(&fx.iu),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["stats"]["total"], 1);
    assert_eq!(json["stats"]["approved"], 1);
    assert_eq!(json["stats"]["pending_review"], 0);

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/eiu-activities",
        &token_for(&other_office),
    )
    .await;
    let json = body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());
    assert_eq!(json["stats"]["total"], 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deletion_rights(pool: PgPool) {
    let fx = setup(&pool).await;
    let stranger = seed_user(&pool, "eiu_stranger", ROLE_EIU, None).await;

    // Authors withdraw unreviewed work.
    let id = log_activity(&pool, &fx).await;
    let uri = format!("/api/v1/eiu-activities/{id}");
    let response = delete_auth(build_test_app(pool.clone()), &uri, &token_for(&stranger)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = delete_auth(build_test_app(pool.clone()), &uri, &token_for(&fx.eiu)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(build_test_app(pool.clone()), &uri, &token_for(&fx.eiu)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // The owning office removes anything on its project.
    let id = log_activity(&pool, &fx).await;
    let response = review(&pool, &fx.iu, id, json!({ "review_status": "approved" })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let uri = format!("/api/v1/eiu-activities/{id}");
    let response = delete_auth(build_test_app(pool.clone()), &uri, &token_for(&fx.iu)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
