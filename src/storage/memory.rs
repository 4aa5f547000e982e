use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{Store, StoreError, StoreResult};
use crate::auth::repo_types::{NewUser, User};
use crate::recipes::repo_types::{NewRecipe, Owner, Recipe, Tag};

/// In-process store used by the test suite. Mirrors the ordering and
/// uniqueness rules of the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    recipes: Vec<Recipe>,
    tags: Vec<Tag>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    fn tables(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn recipe_exists(&self, id: i64) -> bool {
        self.tables().recipes.iter().any(|r| r.id == id)
    }

    pub fn recipe_by_id(&self, id: i64) -> Option<Recipe> {
        self.tables().recipes.iter().find(|r| r.id == id).cloned()
    }

    pub fn user_exists(&self, email: &str) -> bool {
        self.tables().users.iter().any(|u| u.email == email)
    }

    pub fn deactivate(&self, user_id: i64) {
        if let Some(u) = self.tables().users.iter_mut().find(|u| u.id == user_id) {
            u.is_active = false;
        }
    }

    pub fn promote_to_staff(&self, user_id: i64) {
        if let Some(u) = self.tables().users.iter_mut().find(|u| u.id == user_id) {
            u.is_staff = true;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables();
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let row = User {
            id: t.next_id(),
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.tables().users.iter().find(|u| u.email == email).cloned())
    }

    async fn save_user(&self, user: &User) -> StoreResult<User> {
        let mut t = self.tables();
        if t.users.iter().any(|u| u.id != user.id && u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let row = t
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        row.email = user.email.clone();
        row.name = user.name.clone();
        row.password_hash = user.password_hash.clone();
        Ok(row.clone())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables().users.clone())
    }

    async fn list_recipes(&self, owner: Owner) -> StoreResult<Vec<Recipe>> {
        let mut rows: Vec<Recipe> = self
            .tables()
            .recipes
            .iter()
            .filter(|r| r.user_id == owner.user_id())
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn get_recipe(&self, owner: Owner, id: i64) -> StoreResult<Option<Recipe>> {
        Ok(self
            .tables()
            .recipes
            .iter()
            .find(|r| r.id == id && r.user_id == owner.user_id())
            .cloned())
    }

    async fn create_recipe(&self, owner: Owner, recipe: NewRecipe) -> StoreResult<Recipe> {
        let mut t = self.tables();
        let row = Recipe {
            id: t.next_id(),
            user_id: owner.user_id(),
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            description: recipe.description,
            link: recipe.link,
        };
        t.recipes.push(row.clone());
        Ok(row)
    }

    async fn save_recipe(
        &self,
        owner: Owner,
        id: i64,
        recipe: NewRecipe,
    ) -> StoreResult<Option<Recipe>> {
        let mut t = self.tables();
        let Some(row) = t
            .recipes
            .iter_mut()
            .find(|r| r.id == id && r.user_id == owner.user_id())
        else {
            return Ok(None);
        };
        row.title = recipe.title;
        row.time_minutes = recipe.time_minutes;
        row.price = recipe.price;
        row.description = recipe.description;
        row.link = recipe.link;
        Ok(Some(row.clone()))
    }

    async fn delete_recipe(&self, owner: Owner, id: i64) -> StoreResult<bool> {
        let mut t = self.tables();
        let before = t.recipes.len();
        t.recipes
            .retain(|r| !(r.id == id && r.user_id == owner.user_id()));
        Ok(t.recipes.len() != before)
    }

    async fn list_tags(&self, owner: Owner) -> StoreResult<Vec<Tag>> {
        let mut rows: Vec<Tag> = self
            .tables()
            .tags
            .iter()
            .filter(|t| t.user_id == owner.user_id())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.name
                .as_bytes()
                .cmp(a.name.as_bytes())
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn create_tag(&self, owner: Owner, name: &str) -> StoreResult<Tag> {
        let mut t = self.tables();
        let row = Tag {
            id: t.next_id(),
            user_id: owner.user_id(),
            name: name.to_string(),
        };
        t.tags.push(row.clone());
        Ok(row)
    }
}
