//! Staff-only account administration.

use axum::{extract::State, middleware, routing::get, Json, Router};
use tracing::instrument;

use crate::auth::dto::AdminUserRow;
use crate::auth::middleware::{require_auth, require_staff, AuthUser};
use crate::error::{method_not_allowed, ApiResult};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users).fallback(method_not_allowed))
        .route_layer(middleware::from_fn(require_staff))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip_all, fields(staff_id = auth.0.id))]
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<AdminUserRow>>> {
    let users = state.store.list_users().await?;
    tracing::debug!(count = users.len(), "listing users");
    Ok(Json(users.into_iter().map(AdminUserRow::from).collect()))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::test_support::{body_json, create_user, send, token_for, TestApp};

    #[tokio::test]
    async fn requires_authentication() {
        let app = TestApp::new();
        let res = send(&app.router, Method::GET, "/admin/users", None, None).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn regular_users_are_forbidden() {
        let app = TestApp::new();
        let user = create_user(&app.state, "normal_user@example.com", "iamPassw0rd").await;
        let token = token_for(&app.state, &user);
        let res = send(&app.router, Method::GET, "/admin/users", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn staff_sees_all_users() {
        let app = TestApp::new();
        let admin = create_user(&app.state, "admin_user@example.com", "iamPassw0rd").await;
        app.memory.promote_to_staff(admin.id);
        let user = create_user(&app.state, "normal_user@example.com", "iamPassw0rd").await;

        let token = token_for(&app.state, &admin);
        let res = send(&app.router, Method::GET, "/admin/users", Some(&token), None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .any(|r| r["email"] == user.email && r["is_staff"] == false));
        assert!(rows.iter().all(|r| r.get("password_hash").is_none()));
    }
}
