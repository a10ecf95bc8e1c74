/// Integration tests for the Tasklane API
///
/// These drive the full router against a real PostgreSQL database:
/// - Signup, login and token handling
/// - Project ownership and membership rules
/// - Task permissions and assignment
/// - Soft delete visibility
///
/// Run with `cargo test -p tasklane-api -- --ignored` once `DATABASE_URL`
/// and `JWT_SECRET` point at a disposable database.

mod common;

use axum::http::{header, Method, StatusCode};
use common::{unique_email, TestContext, TEST_PASSWORD};
use serde_json::json;
use std::time::Instant;
use tasklane_shared::auth::password::verify_password;
use tasklane_shared::models::user::User;
use uuid::Uuid;

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_signup_stores_hash_and_login_round_trips() {
    let ctx = TestContext::new().await.unwrap();
    let email = unique_email("Alice");

    let (status, json) = ctx
        .request(
            Method::POST,
            "/api/signup",
            None,
            Some(json!({ "name": "Alice", "email": email, "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", json);
    assert!(json["user"].get("password_hash").is_none());

    let user_id: Uuid = json["user"]["id"].as_str().unwrap().parse().unwrap();
    ctx.track_user(user_id);

    let stored = User::find_by_id(&ctx.db, user_id).await.unwrap().unwrap();
    assert_ne!(stored.password_hash, TEST_PASSWORD);
    assert!(verify_password(TEST_PASSWORD, &stored.password_hash).unwrap());
    assert!(!verify_password("Test-Passw0rd?", &stored.password_hash).unwrap());

    let response = ctx
        .send(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": email.to_uppercase(), "password": TEST_PASSWORD })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("Authorization="));
    assert!(cookie.contains("HttpOnly"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_duplicate_signup_conflicts() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.create_user("Alice").await.unwrap();

    let (status, json) = ctx
        .request(
            Method::POST,
            "/api/signup",
            None,
            Some(json!({
                "name": "Alice Again",
                "email": alice.user.email.to_uppercase(),
                "password": TEST_PASSWORD,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "conflict");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_login_failures_are_indistinguishable() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.create_user("Alice").await.unwrap();

    let (wrong_password_status, wrong_password) = ctx
        .request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": alice.user.email, "password": "Wrong-Passw0rd!" })),
        )
        .await;

    let (unknown_email_status, unknown_email) = ctx
        .request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": unique_email("nobody"), "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(wrong_password_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_login_failure_timing_does_not_reveal_email() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.create_user("Alice").await.unwrap();

    let wrong_password = json!({ "email": alice.user.email, "password": "Wrong-Passw0rd!" });
    let unknown_email = json!({ "email": unique_email("nobody"), "password": TEST_PASSWORD });

    let mut elapsed = Vec::new();
    for body in [wrong_password, unknown_email] {
        let started = Instant::now();
        for _ in 0..3 {
            let (status, _) = ctx
                .request(Method::POST, "/api/login", None, Some(body.clone()))
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
        elapsed.push(started.elapsed());
    }

    // Both paths run one Argon2id verification per attempt
    let (wrong_password, unknown_email) = (elapsed[0], elapsed[1]);
    assert!(
        unknown_email * 3 >= wrong_password && wrong_password * 3 >= unknown_email,
        "wrong_password={:?} unknown_email={:?}",
        wrong_password,
        unknown_email
    );

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_login_succeeds_when_last_login_update_fails() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.create_user("Alice").await.unwrap();
    let suffix = alice.id().simple();

    // Any write of last_login_at for this user raises
    sqlx::query(&format!(
        "CREATE FUNCTION reject_login_{suffix}() RETURNS trigger AS $$ \
         BEGIN RAISE EXCEPTION 'last login write rejected'; END; $$ LANGUAGE plpgsql"
    ))
    .execute(&ctx.db)
    .await
    .unwrap();
    sqlx::query(&format!(
        "CREATE TRIGGER reject_login_{suffix} BEFORE UPDATE OF last_login_at ON users \
         FOR EACH ROW WHEN (OLD.id = '{id}') EXECUTE FUNCTION reject_login_{suffix}()",
        id = alice.id()
    ))
    .execute(&ctx.db)
    .await
    .unwrap();

    let (status, json) = ctx
        .request(
            Method::POST,
            "/api/login",
            None,
            Some(json!({ "email": alice.user.email, "password": TEST_PASSWORD })),
        )
        .await;

    sqlx::query(&format!("DROP TRIGGER reject_login_{suffix} ON users"))
        .execute(&ctx.db)
        .await
        .unwrap();
    sqlx::query(&format!("DROP FUNCTION reject_login_{suffix}()"))
        .execute(&ctx.db)
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK, "{}", json);
    assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));

    let last_login: Option<chrono::DateTime<chrono::Utc>> =
        sqlx::query_scalar("SELECT last_login_at FROM users WHERE id = $1")
            .bind(alice.id())
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert!(last_login.is_none());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_deleted_user_token_rejected() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.create_user("Alice").await.unwrap();

    let (status, _) = ctx
        .request(Method::GET, "/api/validate", Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    User::soft_delete(&ctx.db, alice.id()).await.unwrap();

    let (status, _) = ctx
        .request(Method::GET, "/api/validate", Some(&alice.token), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_owner_member_scenario() {
    let ctx = TestContext::new().await.unwrap();
    let a = ctx.create_user("Alice").await.unwrap();
    let b = ctx.create_user("Bob").await.unwrap();
    let c = ctx.create_user("Carol").await.unwrap();

    let project_id = ctx.create_project(&a, "Launch").await;

    let (_, validate) = ctx
        .request(Method::GET, "/api/validate", Some(&a.token), None)
        .await;
    assert_eq!(validate["projects"][0]["role"], "OWNER");

    ctx.add_member(&a, project_id, &b).await;

    let (status, created) = ctx
        .request(
            Method::POST,
            &format!("/api/projects/{}/tasks", project_id),
            Some(&b.token),
            Some(json!({ "title": "Write release notes" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["task"]["status"], "TODO");
    assert_eq!(created["task"]["priority"], "MEDIUM");
    assert_eq!(created["task"]["creator_id"], b.id().to_string());

    let task_id = created["task"]["id"].as_str().unwrap();

    let (status, assigned) = ctx
        .request(
            Method::PUT,
            &format!("/api/tasks/{}/assign", task_id),
            Some(&b.token),
            Some(json!({ "user_id": b.id() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["task"]["assignees"][0]["user"]["name"], "Bob");

    let (status, updated) = ctx
        .request(
            Method::PUT,
            &format!("/api/tasks/{}", task_id),
            Some(&a.token),
            Some(json!({ "status": "DONE" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["task"]["status"], "DONE");

    let (status, json) = ctx
        .request(
            Method::GET,
            &format!("/api/projects/{}", project_id),
            Some(&c.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_non_member_is_forbidden_everywhere() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_user("Owner").await.unwrap();
    let outsider = ctx.create_user("Outsider").await.unwrap();

    let project_id = ctx.create_project(&owner, "Private").await;
    let task_id = ctx.create_task(&owner, project_id, "Secret").await;

    let calls = [
        (Method::GET, format!("/api/projects/{}", project_id), None),
        (
            Method::PUT,
            format!("/api/projects/{}", project_id),
            Some(json!({ "name": "Mine now" })),
        ),
        (Method::DELETE, format!("/api/projects/{}", project_id), None),
        (Method::GET, format!("/api/projects/{}/tasks", project_id), None),
        (
            Method::POST,
            format!("/api/projects/{}/tasks", project_id),
            Some(json!({ "title": "Sneaky" })),
        ),
        (Method::GET, format!("/api/tasks/{}", task_id), None),
        (
            Method::PUT,
            format!("/api/tasks/{}", task_id),
            Some(json!({ "status": "DONE" })),
        ),
        (Method::DELETE, format!("/api/tasks/{}", task_id), None),
    ];

    for (method, uri, body) in calls {
        let (status, _) = ctx
            .request(method.clone(), &uri, Some(&outsider.token), body)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
    }

    let (_, list) = ctx
        .request(Method::GET, "/api/projects", Some(&outsider.token), None)
        .await;
    assert_eq!(list["projects"].as_array().unwrap().len(), 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_non_member_is_forbidden_before_body_validation() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_user("Owner").await.unwrap();
    let outsider = ctx.create_user("Outsider").await.unwrap();

    let project_id = ctx.create_project(&owner, "Private").await;
    let task_id = ctx.create_task(&owner, project_id, "Secret").await;
    let long_title = "x".repeat(201);

    let calls = [
        (
            Method::POST,
            format!("/api/projects/{}/tasks", project_id),
            json!({ "title": long_title }),
        ),
        (
            Method::PUT,
            format!("/api/tasks/{}", task_id),
            json!({ "title": long_title }),
        ),
        (
            Method::PUT,
            format!("/api/projects/{}", project_id),
            json!({ "name": "" }),
        ),
    ];

    for (method, uri, body) in calls {
        let (status, _) = ctx
            .request(method.clone(), &uri, Some(&outsider.token), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN, "outsider {} {}", method, uri);

        let (status, json) = ctx
            .request(method.clone(), &uri, Some(&owner.token), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "owner {} {}", method, uri);
        assert_eq!(json["error"], "validation_error");
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_add_member_is_an_upsert() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_user("Owner").await.unwrap();
    let member = ctx.create_user("Member").await.unwrap();

    let project_id = ctx.create_project(&owner, "Upsert").await;

    ctx.add_member(&owner, project_id, &member).await;
    ctx.add_member(&owner, project_id, &member).await;

    let (status, json) = ctx
        .request(
            Method::POST,
            &format!("/api/projects/{}/members", project_id),
            Some(&owner.token),
            Some(json!({ "user_id": member.id(), "role": "OWNER" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["member"]["role"], "OWNER");

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND user_id = $2",
    )
    .bind(project_id)
    .bind(member.id())
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(rows, 1);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_member_management_rules() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_user("Owner").await.unwrap();
    let member = ctx.create_user("Member").await.unwrap();
    let other = ctx.create_user("Other").await.unwrap();

    let project_id = ctx.create_project(&owner, "Rules").await;
    ctx.add_member(&owner, project_id, &member).await;
    ctx.add_member(&owner, project_id, &other).await;

    // A plain member cannot remove anyone
    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/api/projects/{}/members/{}", project_id, other.id()),
            Some(&member.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Nobody removes the owner, not even the owner
    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/api/projects/{}/members/{}", project_id, owner.id()),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner keeps the OWNER role
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/api/projects/{}/members", project_id),
            Some(&owner.token),
            Some(json!({ "user_id": owner.id(), "role": "MEMBER" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown target user
    let (status, _) = ctx
        .request(
            Method::POST,
            &format!("/api/projects/{}/members", project_id),
            Some(&owner.token),
            Some(json!({ "user_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/api/projects/{}/members/{}", project_id, other.id()),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/api/projects/{}/members/{}", project_id, other.id()),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_assign_is_idempotent_and_unassign_is_noop() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_user("Owner").await.unwrap();
    let member = ctx.create_user("Member").await.unwrap();
    let outsider = ctx.create_user("Outsider").await.unwrap();

    let project_id = ctx.create_project(&owner, "Assign").await;
    ctx.add_member(&owner, project_id, &member).await;
    let task_id = ctx.create_task(&owner, project_id, "Review").await;
    let assign_uri = format!("/api/tasks/{}/assign", task_id);
    let unassign_uri = format!("/api/tasks/{}/unassign", task_id);

    for _ in 0..2 {
        let (status, _) = ctx
            .request(
                Method::PUT,
                &assign_uri,
                Some(&owner.token),
                Some(json!({ "user_id": member.id(), "user_ids": [member.id(), owner.id()] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task_assignees WHERE task_id = $1")
        .bind(task_id)
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(rows, 2);

    // Only project members can be assigned
    let (status, _) = ctx
        .request(
            Method::PUT,
            &assign_uri,
            Some(&owner.token),
            Some(json!({ "user_id": outsider.id() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .request(
            Method::PUT,
            &assign_uri,
            Some(&owner.token),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = ctx
        .request(
            Method::PUT,
            &unassign_uri,
            Some(&member.token),
            Some(json!({ "user_id": outsider.id() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["task"]["assignees"].as_array().unwrap().len(), 2);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_assignee_may_only_change_status() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_user("Owner").await.unwrap();
    let assignee = ctx.create_user("Assignee").await.unwrap();
    let bystander = ctx.create_user("Bystander").await.unwrap();

    let project_id = ctx.create_project(&owner, "Policy").await;
    ctx.add_member(&owner, project_id, &assignee).await;
    ctx.add_member(&owner, project_id, &bystander).await;
    let task_id = ctx.create_task(&owner, project_id, "Ship it").await;
    let task_uri = format!("/api/tasks/{}", task_id);

    let (status, _) = ctx
        .request(
            Method::PUT,
            &format!("/api/tasks/{}/assign", task_id),
            Some(&owner.token),
            Some(json!({ "user_id": assignee.id() })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = ctx
        .request(
            Method::PUT,
            &task_uri,
            Some(&assignee.token),
            Some(json!({ "status": "DOING" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["task"]["status"], "DOING");

    let (status, _) = ctx
        .request(
            Method::PUT,
            &task_uri,
            Some(&assignee.token),
            Some(json!({ "status": "DONE", "title": "Renamed" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(
            Method::PUT,
            &task_uri,
            Some(&bystander.token),
            Some(json!({ "status": "DONE" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(Method::PUT, &task_uri, Some(&owner.token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .request(Method::DELETE, &task_uri, Some(&assignee.token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .request(Method::DELETE, &task_uri, Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .request(Method::GET, &task_uri, Some(&owner.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_soft_deleted_project_hides_tasks() {
    let ctx = TestContext::new().await.unwrap();
    let owner = ctx.create_user("Owner").await.unwrap();

    let kept = ctx.create_project(&owner, "Kept").await;
    let gone = ctx.create_project(&owner, "Gone").await;
    let task_id = ctx.create_task(&owner, gone, "Orphan").await;

    let (status, _) = ctx
        .request(
            Method::DELETE,
            &format!("/api/projects/{}", gone),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = ctx
        .request(Method::GET, "/api/projects", Some(&owner.token), None)
        .await;
    let ids: Vec<&str> = list["projects"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![kept.to_string()]);

    let (status, _) = ctx
        .request(
            Method::GET,
            &format!("/api/projects/{}", gone),
            Some(&owner.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The task row survives but cannot be reached or revived
    for (method, body) in [
        (Method::GET, None),
        (Method::PUT, Some(json!({ "status": "DONE" }))),
    ] {
        let (status, _) = ctx
            .request(method, &format!("/api/tasks/{}", task_id), Some(&owner.token), body)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL database"]
async fn test_cookie_authentication() {
    let ctx = TestContext::new().await.unwrap();
    let alice = ctx.create_user("Alice").await.unwrap();

    let request = axum::http::Request::builder()
        .uri("/api/projects")
        .header(header::COOKIE, format!("Authorization={}", alice.token))
        .body(axum::body::Body::empty())
        .unwrap();

    use tower::Service as _;
    let response = ctx.app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    ctx.cleanup().await.unwrap();
}
