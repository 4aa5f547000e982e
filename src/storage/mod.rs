use async_trait::async_trait;
use thiserror::Error;

use crate::auth::repo_types::{NewUser, User};
use crate::recipes::repo_types::{NewRecipe, Owner, Recipe, Tag};

#[cfg(test)]
pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write; carries the offending field.
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence seam for users, recipes and tags.
///
/// Recipe and tag operations take an [`Owner`] and must never read or write
/// rows belonging to anyone else.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Persists email, name and password hash of an existing user.
    async fn save_user(&self, user: &User) -> StoreResult<User>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Newest first.
    async fn list_recipes(&self, owner: Owner) -> StoreResult<Vec<Recipe>>;
    async fn get_recipe(&self, owner: Owner, id: i64) -> StoreResult<Option<Recipe>>;
    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> StoreResult<Recipe>;
    /// Overwrites the editable fields of `id`; `None` if it is not the owner's.
    async fn save_recipe(
        &self,
        owner: Owner,
        id: i64,
        recipe: NewRecipe,
    ) -> StoreResult<Option<Recipe>>;
    /// Returns whether a row was removed.
    async fn delete_recipe(&self, owner: Owner, id: i64) -> StoreResult<bool>;

    /// Name descending, byte-wise.
    async fn list_tags(&self, owner: Owner) -> StoreResult<Vec<Tag>>;
    async fn create_tag(&self, owner: Owner, name: &str) -> StoreResult<Tag>;
}
