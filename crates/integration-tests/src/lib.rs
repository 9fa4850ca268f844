//! Integration test support for shopcart.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests over the in-memory store
//! cargo test -p shopcart-integration-tests
//!
//! # Also exercise the PostgreSQL store (migrations are applied automatically)
//! SHOPCART_TEST_DATABASE_URL=postgres://localhost/shopcart_test \
//!     cargo test -p shopcart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_lifecycle` - Service-level cart and order flows
//! - `http_api` - The axum router driven with `tower::ServiceExt::oneshot`
//! - `postgres_store` - `PgStore` against a real database

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;

use shopcart_core::Actor;
use shopcart_server::config::ServerConfig;
use shopcart_server::db::{MemoryStore, Store};
use shopcart_server::models::User;
use shopcart_server::services::AuthService;
use shopcart_server::state::AppState;

/// Environment variable naming the database for `PgStore` tests.
pub const TEST_DATABASE_ENV: &str = "SHOPCART_TEST_DATABASE_URL";

/// The full application over a fresh in-memory store.
pub struct TestApp {
    router: Router,
    store: Arc<dyn Store>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Build the app over an empty [`MemoryStore`] with default config.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Build the app over `store`.
    #[must_use]
    pub fn with_store(store: Arc<dyn Store>) -> Self {
        let state = AppState::new(ServerConfig::default(), Arc::clone(&store));
        Self {
            router: shopcart_server::app(state),
            store,
        }
    }

    /// The store backing the app.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Send a raw request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Send a JSON request and decode the JSON response.
    ///
    /// Non-JSON bodies decode to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("valid request");

        let response = self.send(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register a customer through the API and return a session token.
    pub async fn customer(&self, username: &str) -> String {
        let (status, _) = self
            .post(
                "/users",
                None,
                json!({ "username": username, "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registering {username}");
        self.login(username, "secret123").await
    }

    /// Create an admin directly in the store and return a session token.
    pub async fn admin(&self, username: &str) -> String {
        AuthService::new(self.store())
            .register_with_role(username, "secret123", true)
            .await
            .expect("admin registration");
        self.login(username, "secret123").await
    }

    /// Log in through the API and return the session token.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post(
                "/users/login",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "logging in {username}: {body}");
        body["token"]
            .as_str()
            .expect("token in login response")
            .to_owned()
    }

    /// Create a catalog item as `admin_token` and return its ID.
    pub async fn item(&self, admin_token: &str, name: &str, price: &str) -> i64 {
        let (status, body) = self
            .post(
                "/items",
                Some(admin_token),
                json!({ "name": name, "price": price }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "creating {name}: {body}");
        body["id"].as_i64().expect("item id")
    }
}

/// Register a user straight into `store`, returning the user and their actor.
pub async fn register(store: &dyn Store, username: &str, admin: bool) -> (User, Actor) {
    let user = AuthService::new(store)
        .register_with_role(username, "secret123", admin)
        .await
        .expect("registration");
    let actor = user.actor();
    (user, actor)
}
