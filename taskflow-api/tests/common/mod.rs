/// Common test utilities for integration tests
///
/// Builds the full router over the in-memory store with in-process event
/// delivery, so the HTTP surface can be exercised without PostgreSQL or
/// Redis. Requests go through `tower::ServiceExt::oneshot`.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskflow_api::app::{build_router, AppState};
use taskflow_api::config::Config;
use taskflow_shared::realtime::{ConnectionRegistry, LocalPublisher};
use taskflow_shared::store::MemoryStore;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Corr3ct-Horse!";

/// Test context containing the router and the pieces behind it
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub registry: ConnectionRegistry,
}

/// A signed-up user
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Configuration equivalent to a minimal `.env`
pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgresql://localhost/taskflow_test"),
        ("JWT_SECRET", "test-access-secret-that-is-long-enough"),
        ("JWT_REFRESH_SECRET", "test-refresh-secret-that-is-long-enough"),
    ]);
    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test configuration should be valid")
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = ConnectionRegistry::new();
        let events = Arc::new(LocalPublisher::new(registry.clone()));
        let state = AppState::new(store.clone(), events, registry.clone(), test_config());

        Self {
            app: build_router(state),
            store,
            registry,
        }
    }

    /// Sends a request and returns the status and parsed JSON body
    /// (`Value::Null` for an empty body)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Signs up `name` with email `<name>@example.com`
    pub async fn signup(&self, name: &str) -> TestUser {
        let email = format!("{}@example.com", name.to_lowercase());
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/signup",
                None,
                Some(serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": PASSWORD,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "signup failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email,
            access_token: body["accessToken"].as_str().unwrap().to_string(),
            refresh_token: body["refreshToken"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a board owned by `user` and returns its id
    pub async fn board(&self, user: &TestUser, title: &str) -> String {
        let (status, body) = self
            .post("/api/boards", &user.access_token, serde_json::json!({ "title": title }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "board create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Creates a list on `board_id` and returns its id
    pub async fn list(&self, user: &TestUser, board_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                "/api/lists",
                &user.access_token,
                serde_json::json!({ "boardId": board_id, "title": title }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "list create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Creates a task on `list_id` and returns its id
    pub async fn task(&self, user: &TestUser, list_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                "/api/tasks",
                &user.access_token,
                serde_json::json!({ "listId": list_id, "title": title }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "task create failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}
