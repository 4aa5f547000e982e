use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::auth::repo_types::{NewUser, User};
use crate::config::AppConfig;
use crate::recipes::repo;
use crate::recipes::repo_types::{NewRecipe, Owner, Recipe, Tag};
use crate::storage::{Store, StoreError, StoreResult};

/// Postgres-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and applies the embedded migrations.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;
        tracing::info!("database migrations applied");

        Ok(Self { pool })
    }
}

/// Maps a unique-constraint failure to [`StoreError::Duplicate`].
pub(crate) fn unique_violation_as(field: &'static str) -> impl Fn(sqlx::Error) -> StoreError {
    move |e| match e {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => StoreError::Duplicate(field),
        other => StoreError::Database(other),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        User::create(&self.pool, &user).await
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        User::find_by_id(&self.pool, id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        User::find_by_email(&self.pool, email).await
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        User::save(&self.pool, user).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        User::list_all(&self.pool).await
    }

    async fn list_recipes(&self, owner: Owner) -> StoreResult<Vec<Recipe>> {
        repo::list_recipes(&self.pool, owner).await
    }

    async fn get_recipe(&self, owner: Owner, id: i64) -> StoreResult<Option<Recipe>> {
        repo::get_recipe(&self.pool, owner, id).await
    }

    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> StoreResult<Recipe> {
        repo::insert_recipe(&self.pool, owner, &recipe).await
    }

    async fn save_recipe(
        &self,
        owner: Owner,
        id: i64,
        recipe: NewRecipe,
    ) -> StoreResult<Option<Recipe>> {
        repo::update_recipe(&self.pool, owner, id, &recipe).await
    }

    async fn delete_recipe(&self, owner: Owner, id: i64) -> StoreResult<bool> {
        repo::delete_recipe(&self.pool, owner, id).await
    }

    async fn list_tags(&self, owner: Owner) -> StoreResult<Vec<Tag>> {
        repo::list_tags(&self.pool, owner).await
    }

    async fn create_tag(&self, owner: Owner, name: &str) -> StoreResult<Tag> {
        repo::insert_tag(&self.pool, owner, name).await
    }
}
