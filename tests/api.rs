//! End-to-end tests driving the full router over an in-memory database

use agora::{
    api::{self, AppState},
    config::Config,
    db,
};
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

struct TestApp {
    server: TestServer,
    _uploads: TempDir,
}

async fn app() -> TestApp {
    let uploads = TempDir::new().unwrap();
    let mut config = Config::default();
    config.upload.path = uploads.path().to_path_buf();
    config.upload.max_file_size = 1024;

    let pool = db::create_test_pool().await.unwrap();
    db::migrations::run_migrations(&pool).await.unwrap();

    let state = AppState::new(pool, &config).unwrap();
    let server = TestServer::new(api::build_router(state, &config)).unwrap();
    TestApp {
        server,
        _uploads: uploads,
    }
}

impl TestApp {
    /// Register a member and return `(token, member body)`
    async fn register(&self, username: &str) -> (String, Value) {
        let res = self
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "email": format!("{}@example.com", username),
                "username": username,
                "password": "correct horse",
            }))
            .await;
        res.assert_status(StatusCode::CREATED);
        let body: Value = res.json();
        (body["token"].as_str().unwrap().to_string(), body["member"].clone())
    }

    async fn login(&self, username: &str, role: &str) -> String {
        let res = self
            .server
            .post("/api/v1/auth/login")
            .json(&json!({
                "email": format!("{}@example.com", username),
                "password": "correct horse",
                "role": role,
            }))
            .await;
        res.assert_status_ok();
        res.json::<Value>()["token"].as_str().unwrap().to_string()
    }

    async fn create_post(&self, token: &str, title: &str) -> i64 {
        let res = self
            .server
            .post("/api/v1/posts")
            .authorization_bearer(token)
            .json(&json!({ "title": title, "body": "Some body text" }))
            .await;
        res.assert_status(StatusCode::CREATED);
        res.json::<Value>()["id"].as_i64().unwrap()
    }

    /// Register `username` and make them a moderator, returning a moderator token
    async fn moderator(&self, admin_token: &str, username: &str) -> String {
        let (_, member) = self.register(username).await;
        self.server
            .post("/api/v1/admin/moderators")
            .authorization_bearer(admin_token)
            .json(&json!({ "user_id": member["user_id"] }))
            .await
            .assert_status(StatusCode::CREATED);
        self.login(username, "moderator").await
    }
}

#[tokio::test]
async fn missing_or_bad_token_is_unauthorized() {
    let app = app().await;

    let res = app.server.get("/api/v1/posts").await;
    res.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(res.json::<Value>()["error"]["code"], "UNAUTHORIZED");

    app.server
        .get("/api/v1/posts")
        .authorization_bearer("not-a-token")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_me_logout() {
    let app = app().await;
    let (token, member) = app.register("alice").await;
    assert_eq!(member["username"], "alice");
    assert_eq!(member["status"], "active");

    let me: Value = app.server.get("/api/v1/auth/me").authorization_bearer(&token).await.json();
    assert_eq!(me["actor_type"], "member");
    assert_eq!(me["id"], member["id"]);

    app.server
        .post("/api/v1/auth/logout")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .get("/api/v1/auth/me")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let app = app().await;
    app.register("alice").await;

    let dup = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "alice@example.com", "username": "other", "password": "correct horse" }))
        .await;
    dup.assert_status(StatusCode::CONFLICT);
    assert_eq!(dup.json::<Value>()["error"]["code"], "CONFLICT");

    app.server
        .post("/api/v1/auth/register")
        .json(&json!({ "email": "bob@example.com", "username": "bob", "password": "short" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_rate_limit() {
    let app = app().await;
    app.register("alice").await;

    for _ in 0..5 {
        app.server
            .post("/api/v1/auth/login")
            .json(&json!({ "email": "alice@example.com", "password": "wrong password" }))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    let res = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "alice@example.com", "password": "correct horse" }))
        .await;
    res.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = res.json();
    assert_eq!(body["error"]["code"], "RATE_LIMIT");
    let retry_after = body["error"]["details"]["retry_after"].as_i64().unwrap();
    assert!(retry_after > 14 * 60 && retry_after <= 15 * 60);
}

#[tokio::test]
async fn guests_read_but_do_not_write() {
    let app = app().await;
    let (alice, _) = app.register("alice").await;
    app.create_post(&alice, "Hello").await;

    let res = app.server.post("/api/v1/auth/guest").await;
    res.assert_status(StatusCode::CREATED);
    let guest = res.json::<Value>()["token"].as_str().unwrap().to_string();

    let page: Value = app.server.get("/api/v1/posts").authorization_bearer(&guest).await.json();
    assert_eq!(page["total"], 1);

    app.server
        .post("/api/v1/posts")
        .authorization_bearer(&guest)
        .json(&json!({ "title": "Nope", "body": "Nope" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let me: Value = app.server.get("/api/v1/auth/me").authorization_bearer(&guest).await.json();
    assert_eq!(me["actor_type"], "guest");
}

#[tokio::test]
async fn post_listing_is_paginated_and_hides_deleted() {
    let app = app().await;
    let (alice, _) = app.register("alice").await;
    let mut ids = Vec::new();
    for i in 0..3 {
        ids.push(app.create_post(&alice, &format!("Post {}", i)).await);
    }

    app.server
        .delete(&format!("/api/v1/posts/{}", ids[0]))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let page: Value = app
        .server
        .get("/api/v1/posts")
        .add_query_param("page", 1)
        .add_query_param("page_size", 1)
        .authorization_bearer(&alice)
        .await
        .json();
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);
    assert_eq!(page["page_size"], 1);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["items"][0]["title"], "Post 2");

    app.server
        .get(&format!("/api/v1/posts/{}", ids[0]))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comment_edit_and_history() {
    let app = app().await;
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let post_id = app.create_post(&alice, "Discuss").await;

    let res = app
        .server
        .post(&format!("/api/v1/posts/{}/comments", post_id))
        .authorization_bearer(&bob)
        .json(&json!({ "content": "First!" }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let comment_id = res.json::<Value>()["id"].as_i64().unwrap();

    // Someone else cannot edit
    app.server
        .put(&format!("/api/v1/comments/{}", comment_id))
        .authorization_bearer(&alice)
        .json(&json!({ "content": "hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Forbidden words are rejected
    app.server
        .put(&format!("/api/v1/comments/{}", comment_id))
        .authorization_bearer(&bob)
        .json(&json!({ "content": "this is a SCAM" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let updated: Value = app
        .server
        .put(&format!("/api/v1/comments/{}", comment_id))
        .authorization_bearer(&bob)
        .json(&json!({ "content": "Second thoughts" }))
        .await
        .json();
    assert_eq!(updated["content"], "Second thoughts");
    assert!(updated["edited_at"].is_string());

    let history: Value = app
        .server
        .get(&format!("/api/v1/comments/{}/history", comment_id))
        .authorization_bearer(&bob)
        .await
        .json();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["previous_content"], "First!");

    app.server
        .get(&format!("/api/v1/comments/{}/history", comment_id))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    // Alice was notified about the comment on her post
    let inbox: Value = app
        .server
        .get("/api/v1/notifications")
        .authorization_bearer(&alice)
        .await
        .json();
    assert_eq!(inbox["unread_count"], 1);
    assert_eq!(inbox["items"][0]["kind"], "post_comment");
}

#[tokio::test]
async fn report_and_resolve() {
    let app = app().await;
    let (admin, _) = app.register("root").await;
    let moderator = app.moderator(&admin, "mod").await;
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;
    let post_id = app.create_post(&alice, "Questionable").await;

    app.server
        .post("/api/v1/reports")
        .authorization_bearer(&bob)
        .json(&json!({ "post_id": post_id, "comment_id": 1, "reason": "both" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let res = app
        .server
        .post("/api/v1/reports")
        .authorization_bearer(&bob)
        .json(&json!({ "post_id": post_id, "reason": "off topic" }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let report_id = res.json::<Value>()["id"].as_i64().unwrap();

    app.server
        .post("/api/v1/reports")
        .authorization_bearer(&bob)
        .json(&json!({ "post_id": post_id, "reason": "again" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    // Members cannot reach moderation routes
    app.server
        .get("/api/v1/moderation/reports")
        .authorization_bearer(&bob)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let pending: Value = app
        .server
        .get("/api/v1/moderation/reports")
        .add_query_param("status", "pending")
        .authorization_bearer(&moderator)
        .await
        .json();
    assert_eq!(pending["total"], 1);

    let resolved: Value = app
        .server
        .put(&format!("/api/v1/moderation/reports/{}", report_id))
        .authorization_bearer(&moderator)
        .json(&json!({ "status": "resolved", "note": "locked the thread" }))
        .await
        .json();
    assert_eq!(resolved["status"], "resolved");

    app.server
        .put(&format!("/api/v1/moderation/reports/{}", report_id))
        .authorization_bearer(&moderator)
        .json(&json!({ "status": "dismissed" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let audit: Value = app
        .server
        .get("/api/v1/admin/audit-logs")
        .add_query_param("action", "report.resolve")
        .authorization_bearer(&app.login("root", "administrator").await)
        .await
        .json();
    assert_eq!(audit["total"], 1);
}

#[tokio::test]
async fn ban_lifecycle() {
    let app = app().await;
    let (admin, _) = app.register("root").await;
    let moderator = app.moderator(&admin, "mod").await;
    let (bob, bob_member) = app.register("bob").await;

    for hours in [0i64, 876_001, 9_000_000_000_000] {
        app.server
            .post("/api/v1/moderation/bans")
            .authorization_bearer(&moderator)
            .json(&json!({ "member_id": bob_member["id"], "reason": "spam", "duration_hours": hours }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    let res = app
        .server
        .post("/api/v1/moderation/bans")
        .authorization_bearer(&moderator)
        .json(&json!({ "member_id": bob_member["id"], "reason": "spamming", "duration_hours": 24 }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let ban_id = res.json::<Value>()["id"].as_i64().unwrap();

    // Existing sessions are gone and new logins are refused
    app.server
        .get("/api/v1/posts")
        .authorization_bearer(&bob)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": "bob@example.com", "password": "correct horse" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post("/api/v1/moderation/bans")
        .authorization_bearer(&moderator)
        .json(&json!({ "member_id": bob_member["id"], "reason": "again" }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let active: Value = app
        .server
        .get("/api/v1/moderation/bans")
        .add_query_param("active_only", "true")
        .authorization_bearer(&moderator)
        .await
        .json();
    assert_eq!(active["total"], 1);

    app.server
        .delete(&format!("/api/v1/moderation/bans/{}", ban_id))
        .authorization_bearer(&moderator)
        .await
        .assert_status_ok();
    app.server
        .delete(&format!("/api/v1/moderation/bans/{}", ban_id))
        .authorization_bearer(&moderator)
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.login("bob", "member").await;
}

#[tokio::test]
async fn admin_manages_members_and_moderators() {
    let app = app().await;
    let (first, _) = app.register("root").await;
    let admin = app.login("root", "administrator").await;
    let (bob, bob_member) = app.register("bob").await;

    // A member token is not an administrator token, even for the first user
    app.server
        .get("/api/v1/admin/members")
        .authorization_bearer(&first)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let members: Value = app
        .server
        .get("/api/v1/admin/members")
        .authorization_bearer(&admin)
        .await
        .json();
    assert_eq!(members["total"], 2);

    app.server
        .put(&format!("/api/v1/admin/members/{}/status", bob_member["id"]))
        .authorization_bearer(&admin)
        .json(&json!({ "status": "suspended" }))
        .await
        .assert_status_ok();
    app.server
        .get("/api/v1/posts")
        .authorization_bearer(&bob)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let res = app
        .server
        .post("/api/v1/admin/moderators")
        .authorization_bearer(&admin)
        .json(&json!({ "user_id": bob_member["user_id"] }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let moderator_id = res.json::<Value>()["id"].as_i64().unwrap();

    app.server
        .post("/api/v1/admin/moderators")
        .authorization_bearer(&admin)
        .json(&json!({ "user_id": bob_member["user_id"] }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let moderator = app.login("bob", "moderator").await;
    app.server
        .delete(&format!("/api/v1/admin/moderators/{}", moderator_id))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .get("/api/v1/moderation/reports")
        .authorization_bearer(&moderator)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn moderation_lock_and_remove() {
    let app = app().await;
    let (admin, _) = app.register("root").await;
    let moderator = app.moderator(&admin, "mod").await;
    let (alice, _) = app.register("alice").await;
    let post_id = app.create_post(&alice, "Heated").await;

    let locked: Value = app
        .server
        .put(&format!("/api/v1/moderation/posts/{}/lock", post_id))
        .authorization_bearer(&moderator)
        .json(&json!({ "locked": true }))
        .await
        .json();
    assert_eq!(locked["is_locked"], true);

    app.server
        .post(&format!("/api/v1/posts/{}/comments", post_id))
        .authorization_bearer(&alice)
        .json(&json!({ "content": "one more thing" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .delete(&format!("/api/v1/moderation/posts/{}", post_id))
        .authorization_bearer(&moderator)
        .json(&json!({ "reason": "flame war" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let inbox: Value = app
        .server
        .get("/api/v1/notifications")
        .add_query_param("unread_only", "true")
        .authorization_bearer(&alice)
        .await
        .json();
    assert_eq!(inbox["total"], 2);
    assert_eq!(inbox["items"][0]["kind"], "post_removed");

    app.server
        .put("/api/v1/notifications/read-all")
        .authorization_bearer(&alice)
        .await
        .assert_status_ok();
    let inbox: Value = app
        .server
        .get("/api/v1/notifications")
        .authorization_bearer(&alice)
        .await
        .json();
    assert_eq!(inbox["unread_count"], 0);
    assert_eq!(inbox["total"], 2);
}

#[tokio::test]
async fn attachment_upload_and_serve() {
    let app = app().await;
    let (alice, _) = app.register("alice").await;
    let post_id = app.create_post(&alice, "With picture").await;

    let form = MultipartForm::new()
        .add_text("post_id", post_id.to_string())
        .add_part(
            "file",
            Part::bytes(b"hello attachment".to_vec())
                .file_name("note.txt")
                .mime_type("text/plain"),
        );
    let res = app
        .server
        .post("/api/v1/attachments")
        .authorization_bearer(&alice)
        .multipart(form)
        .await;
    res.assert_status(StatusCode::CREATED);
    let body: Value = res.json();
    assert_eq!(body["file_name"], "note.txt");

    let url = body["url"].as_str().unwrap().to_string();
    app.server.get(&url).await.assert_status(StatusCode::UNAUTHORIZED);

    let served = app.server.get(&url).authorization_bearer(&alice).await;
    served.assert_status_ok();
    assert_eq!(served.text(), "hello attachment");
    assert_eq!(served.header("content-type"), "text/plain");

    let listed: Value = app
        .server
        .get(&format!("/api/v1/posts/{}/attachments", post_id))
        .authorization_bearer(&alice)
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let bad = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; 8]).file_name("tool.exe").mime_type("application/x-msdownload"),
    );
    app.server
        .post("/api/v1/attachments")
        .authorization_bearer(&alice)
        .multipart(bad)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_attachment_file_is_not_served() {
    let app = app().await;
    let (alice, _) = app.register("alice").await;
    let (bob, _) = app.register("bob").await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"secret".to_vec()).file_name("secret.txt").mime_type("text/plain"),
    );
    let body: Value = app
        .server
        .post("/api/v1/attachments")
        .authorization_bearer(&alice)
        .multipart(form)
        .await
        .json();
    let url = body["url"].as_str().unwrap().to_string();

    app.server.get(&url).authorization_bearer(&bob).await.assert_status_ok();

    app.server
        .delete(&format!("/api/v1/attachments/{}", body["id"]))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    app.server
        .get(&format!("/api/v1/attachments/{}", body["id"]))
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::NOT_FOUND);
    for token in [&alice, &bob] {
        app.server
            .get(&url)
            .authorization_bearer(token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }
    app.server.get(&url).await.assert_status(StatusCode::UNAUTHORIZED);

    // Names that were never stored are not looked up on disk
    app.server
        .get("/uploads/..%2Fagora.db")
        .authorization_bearer(&alice)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
