//! Integration tests for the discussions backend.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    async fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let (state, temp_dir) = test_state(customize).await;
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register a user and return (access token, refresh token, user id).
    async fn register(&self, username: &str) -> (String, String, String) {
        let resp = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": "password123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        (
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_discussion(&self, token: &str, starting_number: f64) -> Value {
        let resp = self
            .client
            .post(self.url("/api/discussions"))
            .bearer_auth(token)
            .json(&json!({ "startingNumber": starting_number }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn post_operation(&self, token: &str, payload: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(self.url("/api/operations"))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }

    async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = StatusCode::from_u16(resp.status().as_u16()).unwrap();
        (status, resp.json().await.unwrap())
    }
}

async fn test_state(customize: impl FnOnce(&mut Config)) -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");

    let pool = init_database(&db_path).await.expect("Failed to init DB");

    let mut config = Config {
        db_path,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        access_token_secret: "test-access-secret".to_string(),
        refresh_token_secret: "test-refresh-secret".to_string(),
        bcrypt_cost: 4,
        ..Config::default()
    };
    customize(&mut config);

    (AppState::new(Repository::new(pool), config), temp_dir)
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_router_rejects_anonymous_create() {
    let (state, _temp_dir) = test_state(|_| {}).await;
    let app = create_router(state);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/discussions")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"startingNumber": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_end_to_end_branching() {
    let fixture = TestFixture::new().await;
    let (token, _, user_id) = fixture.register("alice").await;

    let discussion = fixture.create_discussion(&token, 10.0).await;
    let discussion_id = discussion["id"].as_str().unwrap();
    assert_eq!(discussion["startingNumber"], 10.0);
    assert_eq!(discussion["authorId"], user_id.as_str());
    assert_eq!(discussion["author"]["username"], "alice");
    assert_eq!(discussion["operations"], json!([]));

    // A: root operation
    let (status, body) = fixture
        .post_operation(
            &token,
            json!({ "type": "add", "rightOperand": 5, "discussionId": discussion_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let a = &body["data"];
    assert_eq!(a["leftOperand"], 10.0);
    assert_eq!(a["result"], 15.0);
    assert_eq!(a["type"], "add");
    assert!(a["parentOperationId"].is_null());
    let a_id = a["id"].as_str().unwrap().to_string();

    // B: child of A
    let (status, body) = fixture
        .post_operation(
            &token,
            json!({ "type": "multiply", "rightOperand": 3, "parentOperationId": a_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let b = &body["data"];
    assert_eq!(b["leftOperand"], 15.0);
    assert_eq!(b["result"], 45.0);
    assert!(b["discussionId"].is_null());
    // The created operation is returned bare, without its anchors embedded
    assert!(b.get("parentOperation").is_none());
    assert!(b.get("discussion").is_none());
    let b_id = b["id"].as_str().unwrap().to_string();

    // C: divide by zero under A is rejected
    let (status, body) = fixture
        .post_operation(
            &token,
            json!({ "type": "divide", "rightOperand": 0, "parentOperationId": a_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "DIVISION_BY_ZERO");

    // D: second branch off A
    let (status, body) = fixture
        .post_operation(
            &token,
            json!({ "type": "subtract", "rightOperand": 20, "parentOperationId": a_id }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let d_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["result"], -5.0);

    // Tree view: A -> [B, D], no trace of C
    let (status, body) = fixture
        .get_json(&format!("/api/discussions/{}", discussion_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    let roots = body["data"]["operations"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["id"], a_id.as_str());
    let children = roots[0]["childOperations"].as_array().unwrap();
    let child_ids: Vec<&str> = children.iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(child_ids, vec![b_id.as_str(), d_id.as_str()]);
    assert_eq!(children[0]["childOperations"], json!([]));
    assert_eq!(children[0]["author"]["username"], "alice");
}

#[tokio::test]
async fn test_missing_anchor_persists_nothing() {
    let fixture = TestFixture::new().await;
    let (token, _, _) = fixture.register("bob").await;
    let discussion = fixture.create_discussion(&token, 1.0).await;

    let (status, body) = fixture
        .post_operation(&token, json!({ "type": "add", "rightOperand": 1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MISSING_ANCHOR");

    let (_, body) = fixture
        .get_json(&format!("/api/discussions/{}", discussion["id"].as_str().unwrap()))
        .await;
    assert_eq!(body["data"]["operations"], json!([]));
}

#[tokio::test]
async fn test_operation_error_codes() {
    let fixture = TestFixture::new().await;
    let (token, _, _) = fixture.register("carol").await;
    let discussion = fixture.create_discussion(&token, 3.0).await;
    let discussion_id = discussion["id"].as_str().unwrap();

    let cases = [
        (
            json!({ "type": "add", "rightOperand": 1, "discussionId": "no-such-discussion" }),
            StatusCode::NOT_FOUND,
            "DISCUSSION_NOT_FOUND",
        ),
        (
            json!({ "type": "add", "rightOperand": 1, "parentOperationId": "no-such-op" }),
            StatusCode::NOT_FOUND,
            "PARENT_NOT_FOUND",
        ),
        (
            json!({ "type": "power", "rightOperand": 2, "discussionId": discussion_id }),
            StatusCode::BAD_REQUEST,
            "INVALID_OPERATION_TYPE",
        ),
        (
            json!({ "type": "add", "rightOperand": "two", "discussionId": discussion_id }),
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
        ),
        (
            json!({ "type": "add", "discussionId": discussion_id }),
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
        ),
    ];

    for (payload, expected_status, expected_code) in cases {
        let (status, body) = fixture.post_operation(&token, payload.clone()).await;
        assert_eq!(status, expected_status, "payload: {}", payload);
        assert_eq!(body["error"]["code"], expected_code, "payload: {}", payload);
    }
}

#[tokio::test]
async fn test_both_anchors_strict_by_default() {
    let fixture = TestFixture::new().await;
    let (token, _, _) = fixture.register("dave").await;
    let discussion = fixture.create_discussion(&token, 2.0).await;
    let discussion_id = discussion["id"].as_str().unwrap();

    let (_, body) = fixture
        .post_operation(
            &token,
            json!({ "type": "add", "rightOperand": 3, "discussionId": discussion_id }),
        )
        .await;
    let root_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = fixture
        .post_operation(
            &token,
            json!({
                "type": "multiply",
                "rightOperand": 10,
                "discussionId": discussion_id,
                "parentOperationId": root_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_both_anchors_parent_wins_in_compatible_mode() {
    let fixture = TestFixture::with_config(|config| config.strict_anchors = false).await;
    let (token, _, _) = fixture.register("erin").await;
    let discussion = fixture.create_discussion(&token, 2.0).await;
    let discussion_id = discussion["id"].as_str().unwrap();

    let (_, body) = fixture
        .post_operation(
            &token,
            json!({ "type": "add", "rightOperand": 3, "discussionId": discussion_id }),
        )
        .await;
    let root_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = fixture
        .post_operation(
            &token,
            json!({
                "type": "multiply",
                "rightOperand": 10,
                "discussionId": discussion_id,
                "parentOperationId": root_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["leftOperand"], 5.0);
    assert_eq!(body["data"]["result"], 50.0);

    // Still nested under the parent, not listed as a second root
    let (_, body) = fixture
        .get_json(&format!("/api/discussions/{}", discussion_id))
        .await;
    let roots = body["data"]["operations"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["childOperations"].as_array().unwrap().len(), 1);

    // A parent from another discussion is rejected, and nothing lands in either tree
    let other = fixture.create_discussion(&token, 7.0).await;
    let other_id = other["id"].as_str().unwrap();
    let (status, body) = fixture
        .post_operation(
            &token,
            json!({
                "type": "add",
                "rightOperand": 1,
                "discussionId": other_id,
                "parentOperationId": root_id
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");

    let (_, body) = fixture.get_json(&format!("/api/discussions/{}", other_id)).await;
    assert_eq!(body["data"]["operations"], json!([]));
    let (_, body) = fixture
        .get_json(&format!("/api/discussions/{}", discussion_id))
        .await;
    assert_eq!(
        body["data"]["operations"][0]["childOperations"]
            .as_array()
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_create_requires_auth_but_reads_do_not() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/discussions"))
        .json(&json!({ "startingNumber": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHENTICATED");

    let resp = fixture
        .client
        .post(fixture.url("/api/operations"))
        .bearer_auth("forged.token.value")
        .json(&json!({ "type": "add", "rightOperand": 1, "discussionId": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let (status, body) = fixture.get_json("/api/discussions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_discussions_listed_newest_first() {
    let fixture = TestFixture::new().await;
    let (token, _, _) = fixture.register("frank").await;

    let first = fixture.create_discussion(&token, 1.0).await;
    let second = fixture.create_discussion(&token, 2.0).await;

    let (status, body) = fixture.get_json("/api/discussions").await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], second["id"]);
    assert_eq!(listed[1]["id"], first["id"]);
}

#[tokio::test]
async fn test_get_unknown_discussion() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/discussions/non-existent-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "DISCUSSION_NOT_FOUND");
}

#[tokio::test]
async fn test_discussion_validation() {
    let fixture = TestFixture::new().await;
    let (token, _, _) = fixture.register("grace").await;

    let resp = fixture
        .client
        .post(fixture.url("/api/discussions"))
        .bearer_auth(&token)
        .json(&json!({ "startingNumber": "ten" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_register_login_refresh() {
    let fixture = TestFixture::new().await;
    let (_, refresh_token, user_id) = fixture.register("heidi").await;

    // Duplicate username
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "username": "heidi", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Too-short username
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/register"))
        .json(&json!({ "username": "hi", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Wrong password
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "username": "heidi", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Correct login
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "username": "heidi", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["id"], user_id.as_str());
    assert!(body["data"]["user"].get("passwordHash").is_none());
    let login_token = body["data"]["accessToken"].as_str().unwrap().to_string();
    fixture.create_discussion(&login_token, 4.0).await;

    // Refresh
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/refresh"))
        .json(&json!({ "refreshToken": refresh_token }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let refreshed = body["data"]["accessToken"].as_str().unwrap().to_string();
    fixture.create_discussion(&refreshed, 5.0).await;

    // Missing refresh token
    let resp = fixture
        .client
        .post(fixture.url("/api/auth/refresh"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}
