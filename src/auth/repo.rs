use crate::auth::repo_types::{NewUser, User};
use crate::db::unique_violation_as;
use crate::storage::StoreResult;
use sqlx::PgPool;

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, created_at";

impl User {
    /// Find a user by exact (already normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Insert a new user with an already hashed password.
    pub async fn create(db: &PgPool, new: &NewUser) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, password_hash, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new.email)
        .bind(&new.name)
        .bind(&new.password_hash)
        .bind(new.is_staff)
        .bind(new.is_superuser)
        .fetch_one(db)
        .await
        .map_err(unique_violation_as("email"))?;
        Ok(user)
    }

    pub async fn save(db: &PgPool, user: &User) -> StoreResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = $2, name = $3, password_hash = $4
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(db)
        .await
        .map_err(unique_violation_as("email"))?;
        Ok(user)
    }

    pub async fn list_all(db: &PgPool) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"
        ))
        .fetch_all(db)
        .await?;
        Ok(users)
    }
}
