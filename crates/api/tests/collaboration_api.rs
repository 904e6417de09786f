mod common;

use axum::http::StatusCode;
use buildwatch_core::roles::{ROLE_EIU, ROLE_EMS, ROLE_LGU_IU};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use common::{
    body_bytes, body_json, build_test_app, build_test_app_in, delete_auth, get_auth, post_auth,
    post_json_auth, post_multipart_auth, put_json_auth, seed_secretariat, seed_user, token_for,
    FilePart,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn drafts_are_hidden_until_published(pool: PgPool) {
    let pmt = seed_secretariat(&pool, "pmt_secretariat").await;
    let eiu = seed_user(&pool, "eiu_reader", ROLE_EIU, None).await;
    let pmt_token = token_for(&pmt);
    let eiu_token = token_for(&eiu);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/policies",
        &pmt_token,
        json!({
            "title": "Site inspection guidelines",
            "document_type": "guideline",
            "category": "infrastructure",
            "tags": ["inspection"]
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let policy = body_json(response).await;
    assert_eq!(policy["data"]["status"], "draft");
    let id = policy["data"]["id"].as_i64().unwrap();

    // Only oversight roles manage policies.
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/policies",
        &eiu_token,
        json!({ "title": "x", "document_type": "guideline", "category": "general" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let uri = format!("/api/v1/policies/{id}");
    let response = get_auth(build_test_app(pool.clone()), &uri, &eiu_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Publishing goes through the dedicated action.
    let response = put_json_auth(
        build_test_app(pool.clone()),
        &uri,
        &pmt_token,
        json!({ "status": "published" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let publish_uri = format!("/api/v1/policies/{id}/publish");
    let response = post_auth(build_test_app(pool.clone()), &publish_uri, &pmt_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "published");

    let response = post_auth(build_test_app(pool.clone()), &publish_uri, &pmt_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = get_auth(build_test_app(pool.clone()), &uri, &eiu_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["view_count"], 1);

    let response = get_auth(build_test_app(pool.clone()), "/api/v1/policies", &eiu_token).await;
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Communications
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn messages_are_delivered_and_read(pool: PgPool) {
    let sender = seed_user(&pool, "iu_sender", ROLE_LGU_IU, None).await;
    let recipient = seed_user(&pool, "eiu_recipient", ROLE_EIU, None).await;
    let sender_token = token_for(&sender);
    let recipient_token = token_for(&recipient);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/communications",
        &sender_token,
        json!({
            "recipient_id": sender.id,
            "subject": "Note to self",
            "message": "Should not send"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/communications",
        &sender_token,
        json!({
            "recipient_id": recipient.id,
            "subject": "Site visit",
            "message": "Please confirm the inspection schedule.",
            "priority": "urgent"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let message = body_json(response).await;
    let id = message["data"]["id"].as_i64().unwrap();
    assert_eq!(message["data"]["is_read"], false);

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/notifications",
        &recipient_token,
    )
    .await;
    let notifications = body_json(response).await;
    assert_eq!(notifications["data"][0]["priority"], "Critical");

    let stats = body_json(
        get_auth(
            build_test_app(pool.clone()),
            "/api/v1/communications/stats",
            &recipient_token,
        )
        .await,
    )
    .await;
    assert_eq!(stats["data"]["unread"], 1);

    let uri = format!("/api/v1/communications/{id}");
    let response = get_auth(build_test_app(pool.clone()), &uri, &recipient_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_read"], true);

    // Deleting hides the message from one side only.
    let response = delete_auth(build_test_app(pool.clone()), &uri, &recipient_token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = get_auth(build_test_app(pool.clone()), &uri, &recipient_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = get_auth(build_test_app(pool.clone()), &uri, &sender_token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// RPMES forms
// ---------------------------------------------------------------------------

async fn create_project(pool: &PgPool, token: &str) -> i64 {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        token,
        json!({
            "project_code": "EDU-2026-010",
            "name": "School building repair",
            "category": "education",
            "location": "Barangay Malinis",
            "total_budget": 800_000.0,
            "start_date": "2026-03-01",
            "end_date": "2026-09-30"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rpmes_forms_route_to_their_validator(pool: PgPool) {
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let pmt = seed_secretariat(&pool, "pmt_secretariat").await;
    let ems = seed_user(&pool, "ems_reviewer", ROLE_EMS, None).await;
    let iu_token = token_for(&iu);
    let project_id = create_project(&pool, &iu_token).await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/rpmes",
        &iu_token,
        json!({
            "project_id": project_id,
            "form_type": "RPMES Form 12",
            "reporting_year": 2026,
            "form_data": { "a": 1 }
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/rpmes",
        &iu_token,
        json!({
            "project_id": project_id,
            "form_type": "RPMES Form 2",
            "reporting_year": 2026,
            "reporting_period": "Q1",
            "form_data": { "physical_accomplishment": 12.5 },
            "submit": true
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let form = body_json(response).await;
    assert_eq!(form["data"]["status"], "Submitted");
    assert_eq!(form["data"]["form_category"], "Input");
    let id = form["data"]["id"].as_i64().unwrap();
    let validate_uri = format!("/api/v1/rpmes/{id}/validate");

    // Input forms belong to LGU-PMT, not EMS.
    let response = post_json_auth(
        build_test_app(pool.clone()),
        &validate_uri,
        &token_for(&ems),
        json!({ "approved": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &validate_uri,
        &token_for(&pmt),
        json!({ "approved": false }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &validate_uri,
        &token_for(&pmt),
        json!({ "approved": false, "feedback": "Attach the accomplishment photos" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "Rejected");

    // A rejected form goes back to its submitter for edits.
    let response = put_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/rpmes/{id}"),
        &iu_token,
        json!({ "form_data": { "physical_accomplishment": 13.0 }, "submit": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "Submitted");

    let response = post_json_auth(
        build_test_app(pool.clone()),
        &validate_uri,
        &token_for(&pmt),
        json!({ "approved": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "Approved");

    let response = delete_auth(build_test_app(pool.clone()), &format!("/api/v1/rpmes/{id}"), &iu_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

async fn file_form(pool: &PgPool, token: &str, project_id: i64, form_type: &str) -> i64 {
    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/rpmes",
        token,
        json!({
            "project_id": project_id,
            "form_type": form_type,
            "reporting_year": 2026,
            "form_data": { "physical_accomplishment": 40.0, "issues": "Rain delays" },
            "submit": true
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rpmes_bundles_export_by_role(pool: PgPool) {
    let iu = seed_user(&pool, "iu_exporter", ROLE_LGU_IU, None).await;
    let pmt = seed_secretariat(&pool, "pmt_exporter").await;
    let ems = seed_user(&pool, "ems_exporter", ROLE_EMS, None).await;
    let iu_token = token_for(&iu);
    let project_id = create_project(&pool, &iu_token).await;
    let input_form = file_form(&pool, &iu_token, project_id, "RPMES Form 1").await;
    let output_form = file_form(&pool, &iu_token, project_id, "RPMES Form 7").await;

    let input_uri = format!("/api/v1/rpmes/export/{project_id}/input");
    let output_uri = format!("/api/v1/rpmes/export/{project_id}/output");

    let response = get_auth(build_test_app(pool.clone()), &input_uri, &token_for(&pmt)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = get_auth(build_test_app(pool.clone()), &output_uri, &iu_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/rpmes/export/{project_id}/everything"),
        &iu_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = get_auth(build_test_app(pool.clone()), &input_uri, &iu_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = response.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"RPMES-Forms-1-4-School-building-repair-"));
    assert_eq!(&body_bytes(response).await[..2], b"PK");

    let response = get_auth(build_test_app(pool.clone()), &output_uri, &token_for(&ems)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/rpmes/{output_form}/export"),
        &token_for(&pmt),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"RPMES-Form-7-EDU-2026-010-2026.xlsx\"");

    // Every export is counted on the forms it covered.
    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/rpmes/{input_form}"),
        &iu_token,
    )
    .await;
    let form = body_json(response).await;
    assert_eq!(form["data"]["export_count"], 1);
    assert!(form["data"]["last_exported_at"].is_string());
    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/rpmes/{output_form}"),
        &iu_token,
    )
    .await;
    assert_eq!(body_json(response).await["data"]["export_count"], 2);
}

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

const TEMPLATE_BYTES: &[u8] = b"%PDF-1.4 quarterly report form";

#[sqlx::test(migrations = "../../db/migrations")]
async fn templates_are_uploaded_approved_and_downloaded(pool: PgPool) {
    let uploads = tempfile::tempdir().unwrap();
    let app = || build_test_app_in(pool.clone(), uploads.path());
    let pmt = seed_secretariat(&pool, "pmt_secretariat").await;
    let iu = seed_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    let pmt_token = token_for(&pmt);
    let iu_token = token_for(&iu);
    let fields = [
        ("name", "Quarterly physical report"),
        ("category", "progress_reports"),
        ("is_required", "yes"),
    ];
    let file = FilePart {
        field: "file",
        file_name: "Q-report.pdf",
        content_type: "application/pdf",
        bytes: TEMPLATE_BYTES,
    };

    // Only the Secretariat or SYS.AD upload.
    let response =
        post_multipart_auth(app(), "/api/v1/templates", &iu_token, &fields, &[file]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let file = FilePart {
        field: "file",
        file_name: "Q-report.pdf",
        content_type: "application/pdf",
        bytes: TEMPLATE_BYTES,
    };
    let response =
        post_multipart_auth(app(), "/api/v1/templates", &pmt_token, &fields, &[file]).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let template = body_json(response).await;
    assert_eq!(template["data"]["status"], "pending");
    assert_eq!(template["data"]["is_required"], true);
    assert_eq!(template["data"]["file_type"], "pdf");
    let id = template["data"]["id"].as_i64().unwrap();
    let download_uri = format!("/api/v1/templates/{id}/download");

    // Pending templates are invisible to everyone else.
    let response = get_auth(app(), &download_uri, &iu_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let approve_uri = format!("/api/v1/templates/{id}/approve");
    let response = post_auth(app(), &approve_uri, &iu_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = post_auth(app(), &approve_uri, &pmt_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["status"], "active");
    assert_eq!(json["data"]["approved_by"], pmt.id);

    let response = get_auth(app(), &download_uri, &iu_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"Q-report.pdf\"");
    assert_eq!(body_bytes(response).await, TEMPLATE_BYTES);

    let response = get_auth(app(), &format!("/api/v1/templates/{id}"), &iu_token).await;
    assert_eq!(body_json(response).await["data"]["download_count"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn template_uploads_accept_office_documents_only(pool: PgPool) {
    let pmt = seed_secretariat(&pool, "pmt_secretariat").await;
    let response = post_multipart_auth(
        build_test_app(pool.clone()),
        "/api/v1/templates",
        &token_for(&pmt),
        &[("name", "Site photo"), ("category", "monitoring_forms")],
        &[FilePart {
            field: "file",
            file_name: "photo.jpg",
            content_type: "image/jpeg",
            bytes: b"\xFF\xD8\xFF",
        }],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
