/// HTTP integration tests
///
/// Exercise the full router (auth middleware, handlers, services, realtime
/// delivery) against the in-memory store.

mod common;

use axum::http::{header, Method, Request, StatusCode};
use common::{TestContext, PASSWORD};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

#[tokio::test]
async fn test_signup_login_refresh() {
    let ctx = TestContext::new();
    let ada = ctx.signup("Ada").await;

    let (status, me) = ctx.get("/api/users/me", &ada.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ada.email.as_str());
    assert!(me.get("passwordHash").is_none());

    let (status, session) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ADA@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(session["accessToken"].is_string());

    let (status, _) = ctx
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ada.email, "password": "Wr0ng-Password!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, refreshed) = ctx
        .request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refreshToken": ada.refresh_token })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["user"]["id"], ada.id.to_string());

    // An access token is not a refresh token
    let (status, _) = ctx
        .request(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refreshToken": ada.access_token })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signup_rejections() {
    let ctx = TestContext::new();
    ctx.signup("Ada").await;

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({ "name": "Ada Again", "email": "ada@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, body) = ctx
        .request(
            Method::POST,
            "/api/auth/signup",
            None,
            Some(json!({ "name": "Bob", "email": "not-an-email", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let (status, body) = ctx.request(Method::GET, "/api/boards", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx.get("/api/boards", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_board_flow() {
    let ctx = TestContext::new();
    let ada = ctx.signup("Ada").await;

    let board_id = ctx.board(&ada, "Alpha").await;
    let todo = ctx.list(&ada, &board_id, "Todo").await;
    let done = ctx.list(&ada, &board_id, "Done").await;
    let task_id = ctx.task(&ada, &todo, "Write tests").await;

    let (status, moved) = ctx
        .put(
            &format!("/api/tasks/{}/move", task_id),
            &ada.access_token,
            json!({ "targetListId": done, "position": 512.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["listId"], done.as_str());
    assert_eq!(moved["boardId"], board_id.as_str());

    let (status, detail) = ctx.get(&format!("/api/boards/{}", board_id), &ada.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["owner"]["id"], ada.id.to_string());
    let lists = detail["lists"].as_array().unwrap();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[0]["title"], "Todo");
    assert_eq!(lists[0]["position"], 1024.0);
    assert!(lists[0]["tasks"].as_array().unwrap().is_empty());
    assert_eq!(lists[1]["tasks"][0]["id"], task_id.as_str());

    let (status, overview) = ctx.get("/api/boards", &ada.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview.as_array().unwrap().len(), 1);

    let (status, activity) = ctx
        .get(&format!("/api/activity/{}", board_id), &ada.access_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = activity["activities"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["TASK_MOVED", "TASK_CREATED", "LIST_CREATED", "LIST_CREATED", "BOARD_CREATED"]
    );
    assert_eq!(activity["activities"][0]["user"]["name"], "Ada");
    assert_eq!(activity["pagination"]["total"], 5);

    let (status, body) = ctx
        .delete(&format!("/api/lists/{}", done), &ada.access_token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["boardId"], board_id.as_str());

    let (status, _) = ctx.get(&format!("/api/tasks/{}", task_id), &ada.access_token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_membership_and_ownership() {
    let ctx = TestContext::new();
    let ada = ctx.signup("Ada").await;
    let bob = ctx.signup("Bob").await;
    let board_id = ctx.board(&ada, "Alpha").await;

    let (status, body) = ctx.get(&format!("/api/boards/{}", board_id), &bob.access_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = ctx
        .get(&format!("/api/boards/{}", Uuid::new_v4()), &bob.access_token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, found) = ctx.get("/api/users/search?q=bob", &ada.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found[0]["id"], bob.id.to_string());

    let members_uri = format!("/api/boards/{}/members", board_id);
    let (status, member) = ctx
        .post(&members_uri, &ada.access_token, json!({ "userId": bob.id }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(member["user"]["name"], "Bob");

    let (status, _) = ctx
        .post(&members_uri, &ada.access_token, json!({ "userId": bob.id }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Members may edit, only the owner may delete
    let (status, _) = ctx
        .put(
            &format!("/api/boards/{}", board_id),
            &bob.access_token,
            json!({ "title": "Beta" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.delete(&format!("/api/boards/{}", board_id), &bob.access_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .delete(&format!("{}/{}", members_uri, ada.id), &ada.access_token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .delete(&format!("{}/{}", members_uri, bob.id), &ada.access_token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = ctx.get(&format!("/api/boards/{}", board_id), &bob.access_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx.delete(&format!("/api/boards/{}", board_id), &ada.access_token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Board deleted successfully");
}

#[tokio::test]
async fn test_task_input_validation() {
    let ctx = TestContext::new();
    let ada = ctx.signup("Ada").await;
    let board_id = ctx.board(&ada, "Alpha").await;
    let list_id = ctx.list(&ada, &board_id, "Todo").await;
    let task_id = ctx.task(&ada, &list_id, "Ship").await;

    let (status, body) = ctx
        .post(
            "/api/tasks",
            &ada.access_token,
            json!({ "listId": list_id, "title": "Ship", "priority": "critical" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_input");

    let (status, body) = ctx
        .post(
            "/api/tasks",
            &ada.access_token,
            json!({ "listId": list_id, "title": "x".repeat(300) }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = ctx
        .put(
            &format!("/api/tasks/{}", task_id),
            &ada.access_token,
            json!({ "title": "x".repeat(201) }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .put(
            &format!("/api/tasks/{}/move", task_id),
            &ada.access_token,
            json!({ "listId": list_id, "position": 10.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .put(
            &format!("/api/tasks/{}/move", task_id),
            &ada.access_token,
            json!({ "targetListId": list_id, "position": -1.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = ctx
        .put(
            &format!("/api/tasks/{}/move", task_id),
            &ada.access_token,
            json!({ "targetListId": Uuid::new_v4(), "position": 10.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, assigned) = ctx
        .put(
            &format!("/api/tasks/{}/assign", task_id),
            &ada.access_token,
            json!({ "assigneeId": ada.id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(assigned["assigneeId"], ada.id.to_string());

    let (status, cleared) = ctx
        .put(
            &format!("/api/tasks/{}/assign", task_id),
            &ada.access_token,
            json!({ "assigneeId": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(cleared["assigneeId"].is_null());
}

#[tokio::test]
async fn test_task_search_envelope() {
    let ctx = TestContext::new();
    let ada = ctx.signup("Ada").await;
    let board_id = ctx.board(&ada, "Alpha").await;
    let list_id = ctx.list(&ada, &board_id, "Todo").await;
    for i in 0..3 {
        ctx.task(&ada, &list_id, &format!("Release {}", i)).await;
    }
    ctx.task(&ada, &list_id, "Unrelated").await;

    let (status, body) = ctx
        .get(
            &format!("/api/tasks/search/{}?q=release&limit=2&page=2", board_id),
            &ada.access_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["pagination"],
        json!({ "page": 2, "limit": 2, "total": 3, "totalPages": 2 })
    );

    // Unparseable paging falls back to defaults
    let (status, body) = ctx
        .get(
            &format!("/api/tasks/search/{}?q=release&page=abc", board_id),
            &ada.access_token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["page"], 1);
    assert_eq!(body["pagination"]["limit"], 20);
}

#[tokio::test]
async fn test_mutations_reach_other_members_only() {
    let ctx = TestContext::new();
    let ada = ctx.signup("Ada").await;
    let bob = ctx.signup("Bob").await;
    let board_id = ctx.board(&ada, "Alpha").await;
    ctx.post(
        &format!("/api/boards/{}/members", board_id),
        &ada.access_token,
        json!({ "userId": bob.id }),
    )
    .await;
    let list_id = ctx.list(&ada, &board_id, "Todo").await;
    let board: Uuid = board_id.parse().unwrap();

    let (ada_tx, mut ada_rx) = mpsc::channel(16);
    let ada_conn = ctx.registry.register(ada.id, ada_tx);
    ctx.registry.join(ada_conn, board);
    let (bob_tx, mut bob_rx) = mpsc::channel(16);
    let bob_conn = ctx.registry.register(bob.id, bob_tx);
    ctx.registry.join(bob_conn, board);

    let task_id = ctx.task(&ada, &list_id, "Ship").await;

    let frame = tokio::time::timeout(Duration::from_secs(1), bob_rx.recv())
        .await
        .expect("event should arrive")
        .expect("channel open");
    let frame: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(frame["event"], "task:created");
    assert_eq!(frame["data"]["id"], task_id.as_str());

    assert!(ada_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_websocket_handshake_requires_token() {
    let ctx = TestContext::new();
    let ada = ctx.signup("Ada").await;

    let (status, _) = ctx.request(Method::GET, "/api/ws", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .request(Method::GET, "/api/ws?token=garbage", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Valid credentials but a plain GET: nothing to upgrade
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/ws?token={}", ada.access_token))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let ctx = TestContext::new();

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::X_CONTENT_TYPE_OPTIONS).unwrap(),
        "nosniff"
    );

    let (_, body) = ctx.request(Method::GET, "/health", None, None).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}
