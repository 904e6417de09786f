//! Integration tests for the repository layer against a real database:
//! users, projects, milestones, constraint violations and soft deletes.

use assert_matches::assert_matches;
use buildwatch_core::milestone::{split_division_weights, MilestoneStatus};
use buildwatch_core::project::{ProjectCategory, ProjectStatus};
use buildwatch_core::roles::{ROLE_EIU, ROLE_LGU_IU, ROLE_LGU_PMT, SUB_ROLE_SECRETARIAT};
use buildwatch_core::user::UserStatus;
use buildwatch_core::workflow::WorkflowStatus;
use buildwatch_db::models::milestone::{CreateMilestone, UpdateMilestone};
use buildwatch_db::models::session::CreateSession;
use buildwatch_db::models::project::{CreateProject, ProjectQuery, UpdateProject};
use buildwatch_db::models::user::{CreateUser, User, UserQuery};
use buildwatch_db::repositories::{MilestoneRepo, ProjectRepo, RoleRepo, SessionRepo, UserRepo};
use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(pool: &PgPool, username: &str, role: &str, sub_role: Option<&str>) -> User {
    let role = RoleRepo::find_by_name(pool, role).await.unwrap().unwrap();
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@lgu.example"),
            password_hash: "not-a-real-hash".to_string(),
            full_name: format!("{username} tester"),
            role_id: role.id,
            sub_role: sub_role.map(str::to_string),
            department: None,
            contact_number: None,
        },
    )
    .await
    .unwrap()
}

fn new_project(code: &str) -> CreateProject {
    CreateProject {
        project_code: code.to_string(),
        name: format!("Project {code}"),
        description: String::new(),
        category: ProjectCategory::Infrastructure,
        location: "Poblacion".to_string(),
        priority: None,
        funding_source: None,
        total_budget: 1_000_000.0,
        start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        expected_outputs: None,
        target_beneficiaries: None,
        eiu_partner_id: None,
    }
}

fn new_milestone(project_id: i64, title: &str, weight: f64) -> CreateMilestone {
    let split = split_division_weights(weight);
    CreateMilestone {
        project_id,
        title: title.to_string(),
        description: None,
        weight,
        planned_budget: None,
        due_date: None,
        sort_order: 0,
        timeline_weight: split.timeline,
        budget_weight: split.budget,
        physical_weight: split.physical,
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_create_resolves_role_name(pool: PgPool) {
    let user = new_user(&pool, "iu_office", ROLE_LGU_IU, None).await;
    assert_eq!(user.role, ROLE_LGU_IU);
    assert_eq!(user.status, UserStatus::Active);

    let by_email = UserRepo::find_by_login(&pool, "IU_OFFICE@lgu.example").await.unwrap();
    assert_eq!(by_email.map(|u| u.id), Some(user.id));
    let by_name = UserRepo::find_by_login(&pool, "iu_office").await.unwrap();
    assert_eq!(by_name.map(|u| u.id), Some(user.id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_username_violates_unique(pool: PgPool) {
    new_user(&pool, "dup", ROLE_EIU, None).await;
    let role = RoleRepo::find_by_name(&pool, ROLE_EIU).await.unwrap().unwrap();
    let err = UserRepo::create(
        &pool,
        &CreateUser {
            username: "dup".to_string(),
            email: "other@lgu.example".to_string(),
            password_hash: "x".to_string(),
            full_name: "Dup".to_string(),
            role_id: role.id,
            sub_role: None,
            department: None,
            contact_number: None,
        },
    )
    .await
    .unwrap_err();

    assert_matches!(
        err,
        sqlx::Error::Database(ref db) if db.constraint() == Some("uq_users_username")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_user_soft_delete_and_restore(pool: PgPool) {
    let user = new_user(&pool, "temp", ROLE_EIU, None).await;

    assert!(UserRepo::soft_delete(&pool, user.id).await.unwrap());
    assert!(!UserRepo::soft_delete(&pool, user.id).await.unwrap());

    let listed = UserRepo::list(&pool, &UserQuery::default()).await.unwrap();
    assert!(listed.iter().all(|u| u.id != user.id), "deleted users are hidden by default");

    let deleted = UserRepo::list(
        &pool,
        &UserQuery { status: Some(UserStatus::Deleted), ..Default::default() },
    )
    .await
    .unwrap();
    assert_eq!(deleted.len(), 1);

    assert!(!UserRepo::set_status(&pool, user.id, UserStatus::Active).await.unwrap());
    assert!(UserRepo::restore(&pool, user.id).await.unwrap());
    let restored = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(restored.status, UserStatus::Active);
    assert!(restored.deleted_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_login_counter(pool: PgPool) {
    let user = new_user(&pool, "counter", ROLE_EIU, None).await;
    assert_eq!(UserRepo::increment_failed_login(&pool, user.id).await.unwrap(), 1);
    assert_eq!(UserRepo::increment_failed_login(&pool, user.id).await.unwrap(), 2);

    UserRepo::record_successful_login(&pool, user.id).await.unwrap();
    let user = UserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert_eq!(user.failed_login_count, 0);
    assert!(user.last_login_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_secretariat_listing(pool: PgPool) {
    let sec = new_user(&pool, "sec", ROLE_LGU_PMT, Some(SUB_ROLE_SECRETARIAT)).await;
    new_user(&pool, "mpmec", ROLE_LGU_PMT, Some("MPMEC")).await;
    let blocked = new_user(&pool, "sec2", ROLE_LGU_PMT, Some(SUB_ROLE_SECRETARIAT)).await;
    UserRepo::set_status(&pool, blocked.id, UserStatus::Blocked).await.unwrap();

    let members = UserRepo::list_active_secretariat(&pool).await.unwrap();
    let ids: Vec<_> = members.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![sec.id]);
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_create_defaults(pool: PgPool) {
    let iu = new_user(&pool, "iu", ROLE_LGU_IU, None).await;
    let project = ProjectRepo::create(&pool, iu.id, &new_project("INF-001")).await.unwrap();

    assert_eq!(project.status, ProjectStatus::Pending);
    assert_eq!(project.workflow_status, WorkflowStatus::Draft);
    assert_eq!(project.implementing_office_id, iu.id);
    assert_eq!(project.overall_progress, 0.0);
    assert!(!project.approved_by_secretariat);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_code_is_unique(pool: PgPool) {
    let iu = new_user(&pool, "iu", ROLE_LGU_IU, None).await;
    ProjectRepo::create(&pool, iu.id, &new_project("INF-001")).await.unwrap();
    let err = ProjectRepo::create(&pool, iu.id, &new_project("INF-001")).await.unwrap_err();
    assert_matches!(
        err,
        sqlx::Error::Database(ref db) if db.constraint() == Some("uq_projects_project_code")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_end_before_start_rejected(pool: PgPool) {
    let iu = new_user(&pool, "iu", ROLE_LGU_IU, None).await;
    let mut input = new_project("INF-002");
    input.end_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let err = ProjectRepo::create(&pool, iu.id, &input).await.unwrap_err();
    assert_matches!(
        err,
        sqlx::Error::Database(ref db) if db.constraint() == Some("ck_projects_dates")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_list_scoping_and_soft_delete(pool: PgPool) {
    let iu_a = new_user(&pool, "iu_a", ROLE_LGU_IU, None).await;
    let iu_b = new_user(&pool, "iu_b", ROLE_LGU_IU, None).await;
    let eiu = new_user(&pool, "eiu", ROLE_EIU, None).await;

    let mut assigned = new_project("A-001");
    assigned.eiu_partner_id = Some(eiu.id);
    let a1 = ProjectRepo::create(&pool, iu_a.id, &assigned).await.unwrap();
    let a2 = ProjectRepo::create(&pool, iu_a.id, &new_project("A-002")).await.unwrap();
    ProjectRepo::create(&pool, iu_b.id, &new_project("B-001")).await.unwrap();

    let owned = ProjectRepo::list(
        &pool,
        &ProjectQuery { implementing_office_id: Some(iu_a.id), ..Default::default() },
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(owned.len(), 2);

    let partnered = ProjectRepo::list(
        &pool,
        &ProjectQuery { eiu_partner_id: Some(eiu.id), ..Default::default() },
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(partnered.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a1.id]);

    let searched = ProjectRepo::list(
        &pool,
        &ProjectQuery { search: Some("b-00".to_string()), ..Default::default() },
        50,
        0,
    )
    .await
    .unwrap();
    assert_eq!(searched.len(), 1);

    assert!(ProjectRepo::soft_delete(&pool, a2.id).await.unwrap());
    assert!(ProjectRepo::find_by_id(&pool, a2.id).await.unwrap().is_none());
    let all = ProjectRepo::list(&pool, &ProjectQuery::default(), 50, 0).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_project_update_coalesces(pool: PgPool) {
    let iu = new_user(&pool, "iu", ROLE_LGU_IU, None).await;
    let project = ProjectRepo::create(&pool, iu.id, &new_project("INF-003")).await.unwrap();

    let updated = ProjectRepo::update(
        &pool,
        project.id,
        &UpdateProject { location: Some("Barangay 5".to_string()), ..Default::default() },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.location, "Barangay 5");
    assert_eq!(updated.name, project.name);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_workflow_transition_is_conditional(pool: PgPool) {
    let iu = new_user(&pool, "iu", ROLE_LGU_IU, None).await;
    let sec = new_user(&pool, "sec", ROLE_LGU_PMT, Some(SUB_ROLE_SECRETARIAT)).await;
    let project = ProjectRepo::create(&pool, iu.id, &new_project("INF-004")).await.unwrap();

    let submitted = ProjectRepo::submit_to_secretariat(
        &pool,
        project.id,
        WorkflowStatus::Draft,
        WorkflowStatus::Submitted,
    )
    .await
    .unwrap()
    .unwrap();
    assert!(submitted.submitted_to_secretariat);

    // Second submission finds no draft row.
    let again = ProjectRepo::submit_to_secretariat(
        &pool,
        project.id,
        WorkflowStatus::Draft,
        WorkflowStatus::Submitted,
    )
    .await
    .unwrap();
    assert!(again.is_none());

    let approved = ProjectRepo::secretariat_approve(
        &pool,
        project.id,
        WorkflowStatus::Submitted,
        WorkflowStatus::SecretariatApproved,
        sec.id,
        None,
    )
    .await
    .unwrap()
    .unwrap();
    assert!(approved.approved_by_secretariat);
    assert_eq!(approved.secretariat_approved_by, Some(sec.id));
    assert_eq!(approved.status, ProjectStatus::Ongoing);

    let mpmec = ProjectRepo::mpmec_approve(&pool, project.id, sec.id).await.unwrap();
    assert!(mpmec.unwrap().approved_by_mpmec);
    assert!(ProjectRepo::mpmec_approve(&pool, project.id, sec.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Milestones
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_milestone_weights_and_status(pool: PgPool) {
    let iu = new_user(&pool, "iu", ROLE_LGU_IU, None).await;
    let project = ProjectRepo::create(&pool, iu.id, &new_project("INF-005")).await.unwrap();

    let m1 = MilestoneRepo::create(&pool, &new_milestone(project.id, "Groundwork", 40.0))
        .await
        .unwrap();
    let m2 = MilestoneRepo::create(&pool, &new_milestone(project.id, "Structure", 60.0))
        .await
        .unwrap();
    assert_eq!(m1.timeline_weight, 13.33);
    assert_eq!(m1.physical_weight, 13.34);

    assert_eq!(MilestoneRepo::total_weight(&pool, project.id, None).await.unwrap(), 100.0);
    assert_eq!(MilestoneRepo::total_weight(&pool, project.id, Some(m2.id)).await.unwrap(), 40.0);

    MilestoneRepo::set_status(&pool, m1.id, MilestoneStatus::Completed).await.unwrap();
    let m1 = MilestoneRepo::find_by_id(&pool, m1.id).await.unwrap().unwrap();
    assert_eq!(m1.status, MilestoneStatus::Completed);
    assert!(m1.completed_at.is_some());

    let m2 = MilestoneRepo::update(
        &pool,
        m2.id,
        &UpdateMilestone { title: Some("Superstructure".to_string()), ..Default::default() },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(m2.title, "Superstructure");
    assert_eq!(m2.weight, 60.0);

    let listed = MilestoneRepo::list_by_project(&pool, project.id).await.unwrap();
    assert_eq!(listed.len(), 2);

    assert!(MilestoneRepo::delete(&pool, m2.id).await.unwrap());
    assert_eq!(MilestoneRepo::total_weight(&pool, project.id, None).await.unwrap(), 40.0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_delayed_skips_completed(pool: PgPool) {
    let iu = new_user(&pool, "iu", ROLE_LGU_IU, None).await;
    let project = ProjectRepo::create(&pool, iu.id, &new_project("INF-006")).await.unwrap();
    let m1 = MilestoneRepo::create(&pool, &new_milestone(project.id, "A", 50.0)).await.unwrap();
    let m2 = MilestoneRepo::create(&pool, &new_milestone(project.id, "B", 50.0)).await.unwrap();
    MilestoneRepo::set_status(&pool, m2.id, MilestoneStatus::Completed).await.unwrap();

    let changed = MilestoneRepo::mark_delayed(&pool, &[m1.id, m2.id]).await.unwrap();
    assert_eq!(changed, 1);
    let m2 = MilestoneRepo::find_by_id(&pool, m2.id).await.unwrap().unwrap();
    assert_eq!(m2.status, MilestoneStatus::Completed);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

fn session(user_id: i64, hash: &str, expires_in: Duration) -> CreateSession {
    CreateSession {
        user_id,
        refresh_token_hash: hash.to_string(),
        expires_at: Utc::now() + expires_in,
        user_agent: None,
        ip_address: None,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_session_revoke_is_single_use(pool: PgPool) {
    let user = new_user(&pool, "eiu_session", ROLE_EIU, None).await;
    let live = SessionRepo::create(&pool, &session(user.id, "live", Duration::days(7)))
        .await
        .unwrap();

    assert!(SessionRepo::find_active_by_hash(&pool, "live").await.unwrap().is_some());
    assert!(SessionRepo::revoke(&pool, live.id).await.unwrap());
    assert!(!SessionRepo::revoke(&pool, live.id).await.unwrap());
    assert!(SessionRepo::find_active_by_hash(&pool, "live").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_purge_dead_keeps_live_sessions(pool: PgPool) {
    let user = new_user(&pool, "eiu_purge", ROLE_EIU, None).await;
    SessionRepo::create(&pool, &session(user.id, "live", Duration::days(7)))
        .await
        .unwrap();
    SessionRepo::create(&pool, &session(user.id, "expired", -Duration::days(40)))
        .await
        .unwrap();

    let purged = SessionRepo::purge_dead(&pool, Utc::now() - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(purged, 1);
    assert!(SessionRepo::find_active_by_hash(&pool, "live").await.unwrap().is_some());

    // A just-revoked session is inside the retention window.
    assert_eq!(SessionRepo::revoke_all_for_user(&pool, user.id).await.unwrap(), 1);
    let purged = SessionRepo::purge_dead(&pool, Utc::now() - Duration::days(30))
        .await
        .unwrap();
    assert_eq!(purged, 0);
}
