use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{CreateUserRequest, PublicUser, TokenRequest, TokenResponse, UpdateUserRequest},
        middleware::{require_auth, AuthUser},
        services::{self, authenticate, register_user, validate_account_fields, JwtKeys, Role},
    },
    error::{method_not_allowed, ApiResult, FieldErrors},
    extract::ApiJson,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/create", post(create_user).fallback(method_not_allowed))
        .route("/user/token", post(create_token).fallback(method_not_allowed))
}

pub fn me_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/user/me",
            get(get_me)
                .patch(patch_me)
                .put(put_me)
                .fallback(method_not_allowed),
        )
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<PublicUser>)> {
    let mut errors = FieldErrors::default();
    if payload.email.trim().is_empty() {
        errors.add("email", "This field is required.");
    }
    if payload.password.is_empty() {
        errors.add("password", "This field is required.");
    }
    if errors.is_empty() {
        validate_account_fields(
            &mut errors,
            Some(&payload.email),
            Some(&payload.password),
            Some(&payload.name),
        );
    }
    errors.into_result()?;

    let user = register_user(
        state.store.as_ref(),
        &payload.email,
        &payload.password,
        &payload.name,
        Role::Regular,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let mut errors = FieldErrors::default();
    match payload.email.as_deref() {
        None => errors.add("email", "This field is required."),
        Some(e) if e.trim().is_empty() => errors.add("email", "This field may not be blank."),
        Some(_) => {}
    }
    match payload.password.as_deref() {
        None => errors.add("password", "This field is required."),
        Some("") => errors.add("password", "This field may not be blank."),
        Some(_) => {}
    }
    errors.into_result()?;

    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let user = authenticate(state.store.as_ref(), &email, &password).await?;

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> ApiResult<Json<PublicUser>> {
    Ok(Json(user.into()))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn patch_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    let user = services::update_user(state.store.as_ref(), user, payload, false).await?;
    Ok(Json(user.into()))
}

#[instrument(skip_all, fields(user_id = user.id))]
pub async fn put_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<PublicUser>> {
    let user = services::update_user(state.store.as_ref(), user, payload, true).await?;
    Ok(Json(user.into()))
}
