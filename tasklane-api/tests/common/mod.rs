/// Common test utilities for integration tests
///
/// Requires a PostgreSQL database: set `DATABASE_URL` and `JWT_SECRET` (or a
/// `.env` file) and run `cargo test -- --ignored`.
///
/// - Database setup (migrations) and cleanup
/// - Test user creation with ready-made tokens
/// - Request helpers returning status and JSON body

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Mutex;
use tasklane_api::app::{build_router, AppState};
use tasklane_api::config::Config;
use tasklane_shared::auth::jwt::{create_token, Claims};
use tasklane_shared::auth::password::hash_password;
use tasklane_shared::db::migrations::run_migrations;
use tasklane_shared::models::user::{CreateUser, User};
use tower::Service as _;
use uuid::Uuid;

/// Password of every user created by [`TestContext::create_user`]
pub const TEST_PASSWORD: &str = "Test-Passw0rd!";

/// A registered user plus a valid token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.user.id
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    created_users: Mutex<Vec<Uuid>>,
}

impl TestContext {
    /// Connects, applies migrations and builds the router
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db = PgPool::connect(&config.database.url).await?;
        run_migrations(&db).await?;

        let state = AppState::new(db.clone(), config.clone());
        let app = build_router(state);

        Ok(TestContext {
            db,
            app,
            config,
            created_users: Mutex::new(Vec::new()),
        })
    }

    /// Creates a user directly in the database and signs a token for it
    pub async fn create_user(&self, name: &str) -> anyhow::Result<TestUser> {
        let user = User::create(
            &self.db,
            CreateUser {
                name: name.to_string(),
                email: unique_email(name),
                password_hash: hash_password(TEST_PASSWORD)?,
            },
        )
        .await?;

        let token = create_token(&Claims::new(user.id), &self.config.jwt.secret)?;

        if let Ok(mut created) = self.created_users.lock() {
            created.push(user.id);
        }

        Ok(TestUser { user, token })
    }

    /// Registers a user id created through the API so cleanup removes it
    pub fn track_user(&self, user_id: Uuid) {
        if let Ok(mut created) = self.created_users.lock() {
            created.push(user_id);
        }
    }

    /// Sends a request and returns status and parsed JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.send(method, uri, token, body).await;
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    /// Sends a request and returns the raw response
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.app.clone().call(request).await.unwrap()
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, owner: &TestUser, name: &str) -> Uuid {
        let (status, json) = self
            .request(
                Method::POST,
                "/api/projects",
                Some(&owner.token),
                Some(serde_json::json!({ "name": name })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", json);
        json["project"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Adds `member` to `project_id` as MEMBER through the API
    pub async fn add_member(&self, owner: &TestUser, project_id: Uuid, member: &TestUser) {
        let (status, json) = self
            .request(
                Method::POST,
                &format!("/api/projects/{}/members", project_id),
                Some(&owner.token),
                Some(serde_json::json!({ "user_id": member.id() })),
            )
            .await;

        assert_eq!(status, StatusCode::OK, "add member failed: {}", json);
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, creator: &TestUser, project_id: Uuid, title: &str) -> Uuid {
        let (status, json) = self
            .request(
                Method::POST,
                &format!("/api/projects/{}/tasks", project_id),
                Some(&creator.token),
                Some(serde_json::json!({ "title": title })),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", json);
        json["task"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Removes every row created by this context
    pub async fn cleanup(&self) -> anyhow::Result<()> {
        let ids: Vec<Uuid> = match self.created_users.lock() {
            Ok(created) => created.clone(),
            Err(_) => return Ok(()),
        };

        sqlx::query("DELETE FROM tasks WHERE creator_id = ANY($1)")
            .bind(&ids)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM projects WHERE owner_id = ANY($1)")
            .bind(&ids)
            .execute(&self.db)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}

/// Email no other test run will use
pub fn unique_email(name: &str) -> String {
    format!(
        "{}-{}@example.com",
        name.to_lowercase().replace(' ', "-"),
        Uuid::new_v4()
    )
}
