use sqlx::PgPool;

use super::repo_types::{NewRecipe, Owner, Recipe, Tag};
use crate::storage::StoreResult;

pub async fn list_recipes(db: &PgPool, owner: Owner) -> StoreResult<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, time_minutes, price, description, link
          FROM recipes
         WHERE user_id = $1
         ORDER BY id DESC
        "#,
    )
    .bind(owner.user_id())
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get_recipe(db: &PgPool, owner: Owner, id: i64) -> StoreResult<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, time_minutes, price, description, link
          FROM recipes
         WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(owner.user_id())
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert_recipe(db: &PgPool, owner: Owner, recipe: &NewRecipe) -> StoreResult<Recipe> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, title, time_minutes, price, description, link
        "#,
    )
    .bind(owner.user_id())
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.description)
    .bind(&recipe.link)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// user_id is never part of the SET list; ownership stays with the creator.
pub async fn update_recipe(
    db: &PgPool,
    owner: Owner,
    id: i64,
    recipe: &NewRecipe,
) -> StoreResult<Option<Recipe>> {
    let row = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
           SET title = $3, time_minutes = $4, price = $5, description = $6, link = $7
         WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, time_minutes, price, description, link
        "#,
    )
    .bind(id)
    .bind(owner.user_id())
    .bind(&recipe.title)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.description)
    .bind(&recipe.link)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete_recipe(db: &PgPool, owner: Owner, id: i64) -> StoreResult<bool> {
    let res = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner.user_id())
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

pub async fn list_tags(db: &PgPool, owner: Owner) -> StoreResult<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, user_id, name
          FROM tags
         WHERE user_id = $1
         ORDER BY name COLLATE "C" DESC, id DESC
        "#,
    )
    .bind(owner.user_id())
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_tag(db: &PgPool, owner: Owner, name: &str) -> StoreResult<Tag> {
    let row = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name
        "#,
    )
    .bind(owner.user_id())
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(row)
}
