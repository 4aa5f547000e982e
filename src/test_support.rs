//! Helpers shared by the router-level tests.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::FromRef,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use crate::app::build_app;
use crate::auth::repo_types::User;
use crate::auth::services::{register_user, JwtKeys, Role};
use crate::state::AppState;
use crate::storage::memory::MemoryStore;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub memory: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        let (state, memory) = AppState::fake();
        Self {
            router: build_app(state.clone()),
            state,
            memory,
        }
    }
}

pub async fn create_user(state: &AppState, email: &str, password: &str) -> User {
    register_user(state.store.as_ref(), email, password, "", Role::Regular)
        .await
        .expect("test user")
}

pub fn token_for(state: &AppState, user: &User) -> String {
    JwtKeys::from_ref(state).sign(user.id).expect("sign token")
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    router.clone().oneshot(request).await.expect("infallible")
}

pub async fn body_json(res: Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
