use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{RecipeDetail, RecipePayload, RecipeSummary, TagResponse};
use super::services::{merge_payload, recipe_from_payload};
use crate::{
    auth::middleware::{require_auth, AuthUser},
    error::{method_not_allowed, ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    state::AppState,
};

// --- routers ---

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/recipe/recipes",
            get(list_recipes)
                .post(create_recipe)
                .fallback(method_not_allowed),
        )
        .route(
            "/recipe/recipes/:id",
            get(get_recipe)
                .patch(patch_recipe)
                .put(put_recipe)
                .delete(delete_recipe)
                .fallback(method_not_allowed),
        )
}

/// Tags are read-only over HTTP.
pub fn tag_routes() -> Router<AppState> {
    Router::new().route("/recipe/tags", get(list_tags).fallback(method_not_allowed))
}

pub fn scoped_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(recipe_routes())
        .merge(tag_routes())
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

// --- handlers ---

#[instrument(skip_all, fields(user_id = auth.0.id))]
pub async fn list_recipes(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<RecipeSummary>>> {
    let recipes = state.store.list_recipes(auth.owner()).await?;
    Ok(Json(recipes.iter().map(RecipeSummary::from).collect()))
}

#[instrument(skip_all, fields(user_id = auth.0.id, recipe_id = id))]
pub async fn get_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<RecipeDetail>> {
    let recipe = state
        .store
        .get_recipe(auth.owner(), id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(recipe.into()))
}

#[instrument(skip_all, fields(user_id = auth.0.id))]
pub async fn create_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> ApiResult<(StatusCode, Json<RecipeDetail>)> {
    let new_recipe = recipe_from_payload(payload)?;
    let recipe = state.store.create_recipe(auth.owner(), new_recipe).await?;
    info!(recipe_id = recipe.id, "recipe created");
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

#[instrument(skip_all, fields(user_id = auth.0.id, recipe_id = id))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> ApiResult<Json<RecipeDetail>> {
    let owner = auth.owner();
    let current = state
        .store
        .get_recipe(owner, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let merged = merge_payload(&current, payload)?;
    let recipe = state
        .store
        .save_recipe(owner, id, merged)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!("recipe updated");
    Ok(Json(recipe.into()))
}

#[instrument(skip_all, fields(user_id = auth.0.id, recipe_id = id))]
pub async fn put_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<RecipePayload>,
) -> ApiResult<Json<RecipeDetail>> {
    let owner = auth.owner();
    // 404 wins over payload errors for recipes the caller cannot see.
    if state.store.get_recipe(owner, id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let replacement = recipe_from_payload(payload)?;
    let recipe = state
        .store
        .save_recipe(owner, id, replacement)
        .await?
        .ok_or(ApiError::NotFound)?;
    info!("recipe replaced");
    Ok(Json(recipe.into()))
}

#[instrument(skip_all, fields(user_id = auth.0.id, recipe_id = id))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if !state.store.delete_recipe(auth.owner(), id).await? {
        return Err(ApiError::NotFound);
    }
    info!("recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(user_id = auth.0.id))]
pub async fn list_tags(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<TagResponse>>> {
    let tags = state.store.list_tags(auth.owner()).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}
