use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use vlesync_server::{build_router, AppState, ErrorBody};
use vlesync_store::{
    CourseRoleRow, CourseRow, DirectoryReader, DirectoryStore, GroupMemberRow, GroupRow,
    StoreError, StoreResult,
};
use vlesync_sync::{BasicCredentials, DirectoryConfig, Reconciler};

fn credentials() -> BasicCredentials {
    BasicCredentials::new("vle", "s3cret")
}

fn state_for(reader: Arc<dyn DirectoryReader>) -> AppState {
    AppState {
        reconciler: Arc::new(Reconciler::new(reader, DirectoryConfig::default())),
        credentials: Some(credentials()),
    }
}

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_test_server(state: AppState) -> String {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

fn seeded_store() -> DirectoryStore {
    let store = DirectoryStore::open_in_memory().unwrap();
    let course = store.insert_course("id001", "Course 001").unwrap();
    let group = store.insert_group(course, "g001", "Group 001").unwrap();
    let student = store.insert_role("student").unwrap();
    let tutor = store.insert_role("tutor").unwrap();
    let alice = store.insert_user("alice").unwrap();
    let bob = store.insert_user("bob").unwrap();
    store.assign_role(course, alice, student).unwrap();
    store.assign_role(course, alice, tutor).unwrap();
    store.assign_role(course, bob, student).unwrap();
    store.add_group_member(group, bob).unwrap();
    store
}

/// Reader whose every query fails.
struct BrokenReader;

impl DirectoryReader for BrokenReader {
    fn course_idnumber(&self, _course_id: i64) -> StoreResult<String> {
        Err(StoreError::LockPoisoned)
    }
    fn active_username(&self, _user_id: i64) -> StoreResult<String> {
        Err(StoreError::LockPoisoned)
    }
    fn role_id(&self, _shortname: &str) -> StoreResult<Option<i64>> {
        Err(StoreError::LockPoisoned)
    }
    fn synchronizable_courses(&self, _site_course_id: i64) -> StoreResult<Vec<CourseRow>> {
        Err(StoreError::LockPoisoned)
    }
    fn synchronizable_groups(&self, _site_course_id: i64) -> StoreResult<Vec<GroupRow>> {
        Err(StoreError::LockPoisoned)
    }
    fn course_role_rows(
        &self,
        _site_course_id: i64,
        _student_role: &str,
        _tutor_role: &str,
    ) -> StoreResult<Vec<CourseRoleRow>> {
        Err(StoreError::LockPoisoned)
    }
    fn synchronizable_group_members(&self, _site_course_id: i64) -> StoreResult<Vec<GroupMemberRow>> {
        Err(StoreError::LockPoisoned)
    }
}

// ── Authentication ───────────────────────────────────────────────

#[tokio::test]
async fn missing_credentials_are_challenged() {
    let base = spawn_test_server(state_for(Arc::new(seeded_store()))).await;
    let resp = reqwest::get(format!("{}/", base)).await.unwrap();

    assert_eq!(resp.status(), 401);
    let challenge = resp
        .headers()
        .get("www-authenticate")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(challenge, "Basic realm=\"vlesync\"");

    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error_message, "Unauthorized");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let base = spawn_test_server(state_for(Arc::new(seeded_store()))).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/", base))
        .basic_auth("vle", Some("wrong"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    assert!(resp.headers().contains_key("www-authenticate"));
}

#[tokio::test]
async fn non_basic_scheme_is_rejected() {
    let base = spawn_test_server(state_for(Arc::new(seeded_store()))).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/", base))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn unconfigured_credentials_reject_everything() {
    let mut state = state_for(Arc::new(seeded_store()));
    state.credentials = None;
    let base = spawn_test_server(state).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/", base))
        .basic_auth("vle", Some("s3cret"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
}

// ── Snapshot ─────────────────────────────────────────────────────

#[tokio::test]
async fn authorized_request_returns_snapshot() {
    let base = spawn_test_server(state_for(Arc::new(seeded_store()))).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/", base))
        .basic_auth("vle", Some("s3cret"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.contains("application/json"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "course_kv_store": [
                { "vle_course_id": "id001", "name": "Course 001" }
            ],
            "group_kv_store": [
                { "vle_course_id": "id001", "vle_group_id": "g001", "name": "Group 001" }
            ],
            "course_member": [
                { "username": "alice", "vle_course_id": "id001", "is_tutor": true },
                { "username": "bob", "vle_course_id": "id001", "is_tutor": false }
            ],
            "group_member": [
                { "username": "bob", "vle_course_id": "id001", "vle_group_id": "g001" }
            ],
        })
    );
}

#[tokio::test]
async fn empty_directory_returns_empty_collections() {
    let store = DirectoryStore::open_in_memory().unwrap();
    let base = spawn_test_server(state_for(Arc::new(store))).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/", base))
        .basic_auth("vle", Some("s3cret"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    for key in ["course_kv_store", "group_kv_store", "course_member", "group_member"] {
        assert_eq!(body[key], json!([]), "{key} should be empty");
    }
}

#[tokio::test]
async fn store_failure_returns_500_with_message() {
    let base = spawn_test_server(state_for(Arc::new(BrokenReader))).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/", base))
        .basic_auth("vle", Some("s3cret"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.error_message, "store lock poisoned");
}

// ── Routing ──────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_route_returns_404() {
    let base = spawn_test_server(state_for(Arc::new(seeded_store()))).await;
    let resp = reqwest::Client::new()
        .get(format!("{}/api/v1/nonexistent", base))
        .basic_auth("vle", Some("s3cret"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn post_to_snapshot_is_not_allowed() {
    let base = spawn_test_server(state_for(Arc::new(seeded_store()))).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/", base))
        .basic_auth("vle", Some("s3cret"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 405);
}
