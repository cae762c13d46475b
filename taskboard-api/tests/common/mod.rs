//! Shared fixtures for API tests
//!
//! The router runs over `MemoryStore` and `MemoryCache`, so these tests need
//! neither Postgres nor Redis.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_shared::auth::password::HashCost;
use taskboard_shared::cache::MemoryCache;
use taskboard_shared::config::Config;
use taskboard_shared::models::{Role, User};
use taskboard_shared::service::{Registration, Services};
use taskboard_shared::store::MemoryStore;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

/// Test context containing the router and handles on its backends
pub struct TestContext {
    pub app: axum::Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub cache: Arc<MemoryCache>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Context with extra environment variables on top of the defaults
    pub fn with_env(overrides: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = [
            ("DATABASE_URL", "postgres://unused/taskboard"),
            ("REDIS_URL", "redis://unused:6379"),
            ("JWT_SECRET", "api-test-secret-that-is-32-chars!!"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        for (k, v) in overrides {
            vars.insert(k.to_string(), v.to_string());
        }
        let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();

        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new());

        let mut services = Services::new(store.clone(), cache.clone(), &config);
        services.accounts = services.accounts.with_hash_cost(HashCost::Minimal);

        let state = AppState::from_services(store.clone(), cache.clone(), services, config);
        let app = build_router(state.clone());

        Self {
            app,
            state,
            store,
            cache,
        }
    }

    /// Registers a user with `role` and returns it with an access token
    pub async fn user(&self, role: Role) -> (User, String) {
        let email = format!("{}-{}@taskboard.test", role, uuid::Uuid::new_v4());
        let user = self
            .state
            .accounts
            .register(Registration {
                email: email.clone(),
                password: PASSWORD.to_string(),
                name: format!("{} user", role),
                role: Some(role),
            })
            .await
            .unwrap();
        let session = self.state.accounts.login(&email, PASSWORD).await.unwrap();
        (user, session.token)
    }

    /// Sends a request and returns the raw response
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Sends a raw JSON-typed body and decodes the response
    pub async fn send_raw(&self, method: &str, uri: &str, token: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Sends a request and decodes the JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, token, body).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
