mod common;

use axum::http::StatusCode;
use buildwatch_core::roles::{ROLE_EIU, ROLE_LGU_IU};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use buildwatch_db::models::user::User;
use common::{
    body_bytes, body_json, build_test_app, delete_auth, get_auth, post_auth, post_json_auth,
    seed_mpmec, seed_secretariat, seed_user, token_for,
};
use serde_json::{json, Value};
use sqlx::PgPool;

fn project_body(code: &str) -> Value {
    json!({
        "project_code": code,
        "name": "Barangay road concreting",
        "description": "Concreting of 1.2 km farm-to-market road",
        "category": "infrastructure",
        "location": "Barangay San Isidro",
        "total_budget": 1_500_000.0,
        "start_date": "2026-01-15",
        "end_date": "2026-12-15"
    })
}

async fn create_project(pool: &PgPool, token: &str, code: &str) -> i64 {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        token,
        project_body(code),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

async fn add_milestone(
    pool: &PgPool,
    token: &str,
    project_id: i64,
    title: &str,
    weight: f64,
) -> StatusCode {
    post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/milestones"),
        token,
        json!({ "title": title, "weight": weight }),
    )
    .await
    .status()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn implementing_office_creates_project_as_draft(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let token = token_for(&iu);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        &token,
        project_body("INF-2026-001"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["workflow_status"], "draft");
    assert_eq!(json["data"]["implementing_office_id"], iu.id);
    assert_eq!(json["data"]["priority"], "medium");
    assert_eq!(json["data"]["overall_progress"], 0.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn eiu_cannot_create_projects(pool: PgPool) {
    let eiu = seed_user(&pool, "eiu_partner", ROLE_EIU, None).await;
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        &token_for(&eiu),
        project_body("INF-2026-002"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn invalid_project_input_is_rejected(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let token = token_for(&iu);

    let mut body = project_body("bad code");
    let response = post_json_auth(build_test_app(pool.clone()), "/api/v1/projects", &token, body.clone()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    body["project_code"] = json!("INF-2026-003");
    body["end_date"] = json!("2025-01-01");
    let response = post_json_auth(build_test_app(pool.clone()), "/api/v1/projects", &token, body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_project_code_conflicts(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let token = token_for(&iu);
    create_project(&pool, &token, "INF-2026-004").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        &token,
        project_body("INF-2026-004"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn milestone_weights_are_capped_and_reported(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let token = token_for(&iu);
    let project_id = create_project(&pool, &token, "INF-2026-005").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/milestones"),
        &token,
        json!({ "title": "Site clearing", "weight": 40.0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let milestone = body_json(response).await;
    assert_eq!(milestone["data"]["timeline_weight"], 13.33);
    assert_eq!(milestone["data"]["budget_weight"], 13.33);
    assert_eq!(milestone["data"]["physical_weight"], 13.34);
    assert_eq!(milestone["data"]["status"], "pending");
    assert_eq!(milestone["data"]["sort_order"], 1);

    assert_eq!(
        add_milestone(&pool, &token, project_id, "Concreting", 70.0).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        add_milestone(&pool, &token, project_id, "Concreting", 50.0).await,
        StatusCode::CREATED
    );

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/milestones/weights"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let weights = body_json(response).await;
    assert_eq!(weights["data"]["total_weight"], 90.0);
    assert_eq!(weights["data"]["remaining_weight"], 10.0);
    assert_eq!(weights["data"]["is_complete"], false);
    assert_eq!(weights["data"]["milestone_count"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn submission_requires_complete_weights(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let token = token_for(&iu);
    let project_id = create_project(&pool, &token, "INF-2026-006").await;
    let submit_uri = format!("/api/v1/projects/{project_id}/submit-to-secretariat");

    add_milestone(&pool, &token, project_id, "Phase 1", 60.0).await;
    let response = post_auth(build_test_app(pool.clone()), &submit_uri, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    add_milestone(&pool, &token, project_id, "Phase 2", 40.0).await;
    let response = post_auth(build_test_app(pool.clone()), &submit_uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["workflow_status"], "submitted");
    assert_eq!(json["data"]["submitted_to_secretariat"], true);

    // Submitting twice is an invalid transition.
    let response = post_auth(build_test_app(pool.clone()), &submit_uri, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn secretariat_then_mpmec_approve(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let secretariat = seed_secretariat(&pool, "pmt_secretariat").await;
    let mpmec = seed_mpmec(&pool, "pmt_mpmec").await;
    let iu_token = token_for(&iu);
    let project_id = create_project(&pool, &iu_token, "INF-2026-007").await;
    add_milestone(&pool, &iu_token, project_id, "Whole project", 100.0).await;

    // MPMEC sign-off needs Secretariat approval first.
    let mpmec_uri = format!("/api/v1/projects/{project_id}/mpmec-approve");
    let response = post_auth(build_test_app(pool.clone()), &mpmec_uri, &token_for(&mpmec)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    post_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/submit-to-secretariat"),
        &iu_token,
    )
    .await;

    // The implementing office cannot approve its own project.
    let approve_uri = format!("/api/v1/projects/{project_id}/secretariat-approve");
    let response = post_auth(build_test_app(pool.clone()), &approve_uri, &iu_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &approve_uri,
        &token_for(&secretariat),
        json!({ "comments": "Complete documents" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["workflow_status"], "secretariat_approved");
    assert_eq!(json["data"]["approved_by_secretariat"], true);
    assert_eq!(json["data"]["secretariat_approved_by"], secretariat.id);

    let response = post_auth(build_test_app(pool.clone()), &mpmec_uri, &token_for(&mpmec)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["approved_by_mpmec"], true);

    let response = post_auth(build_test_app(pool.clone()), &mpmec_uri, &token_for(&mpmec)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The office is told about each approval.
    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/notifications/unread-count",
        &iu_token,
    )
    .await;
    let json = body_json(response).await;
    assert!(json["data"]["count"].as_i64().unwrap() >= 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn secretariat_reject_returns_to_draft(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let secretariat = seed_secretariat(&pool, "pmt_secretariat").await;
    let iu_token = token_for(&iu);
    let project_id = create_project(&pool, &iu_token, "INF-2026-008").await;
    add_milestone(&pool, &iu_token, project_id, "Whole project", 100.0).await;
    post_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/submit-to-secretariat"),
        &iu_token,
    )
    .await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/secretariat-reject"),
        &token_for(&secretariat),
        json!({ "comments": "Missing program of work" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["workflow_status"], "draft");
    assert_eq!(json["data"]["secretariat_comments"], "Missing program of work");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn projects_are_scoped_to_their_office(pool: PgPool) {
    let owner = seed_user(&pool, "iu_owner", ROLE_LGU_IU, None).await;
    let other = seed_user(&pool, "iu_other", ROLE_LGU_IU, None).await;
    let project_id = create_project(&pool, &token_for(&owner), "INF-2026-009").await;

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}"),
        &token_for(&other),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(build_test_app(pool.clone()), "/api/v1/projects", &token_for(&other)).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    let response = delete_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}"),
        &token_for(&owner),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}"),
        &token_for(&owner),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// An approved, ongoing project whose only milestone fell due in 2020.
async fn overdue_project(pool: &PgPool, iu: &User, secretariat: &User, code: &str) -> i64 {
    let iu_token = token_for(iu);
    let project_id = create_project(pool, &iu_token, code).await;
    let response = post_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/milestones"),
        &iu_token,
        json!({ "title": "Site clearing", "weight": 100.0, "due_date": "2020-01-31" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    post_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/submit-to-secretariat"),
        &iu_token,
    )
    .await;
    let response = post_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}/secretariat-approve"),
        &token_for(secretariat),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    project_id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delay_check_marks_overdue_work(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let secretariat = seed_secretariat(&pool, "pmt_secretariat").await;
    let stranger = seed_user(&pool, "eiu_stranger", ROLE_EIU, None).await;
    let project_id = overdue_project(&pool, &iu, &secretariat, "INF-2026-020").await;
    let uri = format!("/api/v1/projects/{project_id}/delay-check");

    let response = post_auth(build_test_app(pool.clone()), &uri, &token_for(&stranger)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_auth(build_test_app(pool.clone()), &uri, &token_for(&iu)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["is_delayed"], true);
    assert_eq!(json["data"]["previous_status"], "ongoing");
    assert_eq!(json["data"]["status"], "delayed");
    assert_eq!(json["data"]["milestones_marked_delayed"], 1);
    assert_eq!(json["data"]["delay_info"]["overdue_milestone_count"], 1);
    assert_eq!(json["data"]["delay_info"]["severity"], "critical");

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}"),
        &token_for(&iu),
    )
    .await;
    let project = body_json(response).await;
    assert_eq!(project["data"]["status"], "delayed");
    assert_eq!(project["data"]["milestones"][0]["status"], "delayed");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn portfolio_delay_check_is_for_oversight(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let secretariat = seed_secretariat(&pool, "pmt_secretariat").await;
    overdue_project(&pool, &iu, &secretariat, "INF-2026-021").await;
    let on_time = create_project(&pool, &token_for(&iu), "INF-2026-022").await;

    let response = post_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects/delay-check",
        &token_for(&iu),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects/delay-check",
        &token_for(&secretariat),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    // The draft project is not active, so it is not checked.
    assert_eq!(json["data"]["checked"], 1);
    assert_eq!(json["data"]["delayed"], 1);
    let reports = json["data"]["reports"].as_array().unwrap();
    assert!(reports.iter().all(|r| r["project_id"] != on_time));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn export_is_an_xlsx_attachment(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let stranger = seed_user(&pool, "other_office", ROLE_LGU_IU, None).await;
    let token = token_for(&iu);
    let project_id = create_project(&pool, &token, "INF-2026-030").await;
    add_milestone(&pool, &token, project_id, "Whole project", 100.0).await;
    let uri = format!("/api/v1/projects/{project_id}/export");

    let response = get_auth(build_test_app(pool.clone()), &uri, &token_for(&stranger)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(build_test_app(pool.clone()), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = response.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment;"));
    assert!(disposition.contains("INF-2026-030"));
    let bytes = body_bytes(response).await;
    assert!(bytes.starts_with(b"PK"), "xlsx is a zip archive");
}

async fn dashboard(pool: &PgPool, user: &User) -> Value {
    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects/dashboard/stats",
        &token_for(user),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn dashboard_counts_follow_the_callers_role(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let other_iu = seed_user(&pool, "iu_other", ROLE_LGU_IU, None).await;
    let eiu = seed_user(&pool, "eiu_partner", ROLE_EIU, None).await;
    let secretariat = seed_secretariat(&pool, "pmt_secretariat").await;
    let mpmec = seed_mpmec(&pool, "pmt_mpmec").await;
    let iu_token = token_for(&iu);

    let mut body = project_body("INF-2026-020");
    body["eiu_partner_id"] = json!(eiu.id);
    let response =
        post_json_auth(build_test_app(pool.clone()), "/api/v1/projects", &iu_token, body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let approved_id = body_json(response).await["data"]["id"].as_i64().unwrap();
    add_milestone(&pool, &iu_token, approved_id, "Whole project", 100.0).await;
    post_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{approved_id}/submit-to-secretariat"),
        &iu_token,
    )
    .await;
    let response = post_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/projects/{approved_id}/secretariat-approve"),
        &token_for(&secretariat),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    create_project(&pool, &iu_token, "INF-2026-021").await;
    create_project(&pool, &token_for(&other_iu), "INF-2026-022").await;

    let stats = dashboard(&pool, &iu).await;
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["ongoing"], 1);
    assert_eq!(stats["average_progress"], 0.0);
    assert_eq!(stats["awaiting_review"], 0);

    assert_eq!(dashboard(&pool, &other_iu).await["total"], 1);
    assert_eq!(dashboard(&pool, &eiu).await["total"], 1);
    assert_eq!(dashboard(&pool, &mpmec).await["total"], 1);
    assert_eq!(dashboard(&pool, &secretariat).await["total"], 3);
}
