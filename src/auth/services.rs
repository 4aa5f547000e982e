use std::time::Duration;

use argon2::{
    password_hash::{Error as PasswordHashError, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, warn};

use crate::auth::claims::Claims;
use crate::auth::dto::UpdateUserRequest;
use crate::auth::repo_types::{NewUser, User};
use crate::config::JwtConfig;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::state::AppState;
use crate::storage::Store;

pub const MIN_PASSWORD_LEN: usize = 5;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;

const BAD_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";
const MISSING_EMAIL: &str = "Users must have an email address.";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Lower-cases the domain part and keeps the local part as given.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Argon2 PHC string for `plain` under a fresh random salt.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!(error = %e, "password hashing failed");
            anyhow::anyhow!("password hashing failed: {e}")
        })
}

/// `Ok(false)` on a mismatch. Errors only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored_hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!("malformed password hash: {e}")
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("password verification failed: {e}")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Regular,
    Superuser,
}

/// Builds an insertable user: rejects an empty email, normalizes it and
/// hashes the password.
pub fn build_new_user(email: &str, password: &str, name: &str, role: Role) -> ApiResult<NewUser> {
    if email.trim().is_empty() {
        return Err(ApiError::invalid("email", MISSING_EMAIL));
    }
    let password_hash = hash_password(password)?;
    let elevated = role == Role::Superuser;
    Ok(NewUser {
        email: normalize_email(email),
        name: name.to_string(),
        password_hash,
        is_staff: elevated,
        is_superuser: elevated,
    })
}

/// Field checks applied to account payloads at the HTTP boundary.
pub fn validate_account_fields(
    errors: &mut FieldErrors,
    email: Option<&str>,
    password: Option<&str>,
    name: Option<&str>,
) {
    if let Some(email) = email {
        if email.trim().is_empty() {
            errors.add("email", "This field may not be blank.");
        } else if email.chars().count() > MAX_EMAIL_LEN {
            errors.add(
                "email",
                format!("Ensure this field has no more than {MAX_EMAIL_LEN} characters."),
            );
        } else if !is_valid_email(email.trim()) {
            errors.add("email", "Enter a valid email address.");
        }
    }
    if let Some(password) = password {
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Ensure this field has at least {MIN_PASSWORD_LEN} characters."),
            );
        }
    }
    if let Some(name) = name {
        if name.chars().count() > MAX_NAME_LEN {
            errors.add(
                "name",
                format!("Ensure this field has no more than {MAX_NAME_LEN} characters."),
            );
        }
    }
}

/// Creates an account after checking the normalized email is free. The
/// password is only hashed once the email is known to be available.
pub async fn register_user(
    store: &dyn Store,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> ApiResult<User> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(ApiError::invalid("email", MISSING_EMAIL));
    }
    if store.find_user_by_email(&email).await?.is_some() {
        warn!(%email, "email already registered");
        return Err(ApiError::invalid("email", "user with this email already exists."));
    }
    let new_user = build_new_user(&email, password, name, role)?;
    let user = store.create_user(new_user).await?;
    info!(user_id = user.id, email = %user.email, ?role, "user created");
    Ok(user)
}

/// Resolves `(email, password)` to an active user. Every failure reports the
/// same message so the caller cannot tell which part was wrong.
pub async fn authenticate(store: &dyn Store, email: &str, password: &str) -> ApiResult<User> {
    let rejected = || ApiError::invalid("non_field_errors", BAD_CREDENTIALS);

    if password.is_empty() {
        return Err(rejected());
    }
    let Some(user) = store.find_user_by_email(&normalize_email(email)).await? else {
        warn!("token requested for unknown email");
        return Err(rejected());
    };
    if !user.is_active {
        warn!(user_id = user.id, "token requested for inactive user");
        return Err(rejected());
    }
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = user.id, "token requested with invalid password");
        return Err(rejected());
    }
    Ok(user)
}

/// Applies supplied fields to `user` and persists it. `full` enforces the
/// fields a complete replacement requires.
pub async fn update_user(
    store: &dyn Store,
    mut user: User,
    changes: UpdateUserRequest,
    full: bool,
) -> ApiResult<User> {
    let mut errors = FieldErrors::default();
    if full {
        if changes.email.is_none() {
            errors.add("email", "This field is required.");
        }
        if changes.password.is_none() {
            errors.add("password", "This field is required.");
        }
    }
    validate_account_fields(
        &mut errors,
        changes.email.as_deref(),
        changes.password.as_deref(),
        changes.name.as_deref(),
    );
    errors.into_result()?;

    if let Some(email) = changes.email {
        let email = normalize_email(&email);
        if email != user.email {
            if store.find_user_by_email(&email).await?.is_some() {
                return Err(ApiError::invalid("email", "user with this email already exists."));
            }
            user.email = email;
        }
    }
    if let Some(name) = changes.name {
        user.name = name;
    } else if full {
        user.name.clear();
    }
    if let Some(password) = changes.password {
        user.password_hash = hash_password(&password)?;
    }

    let saved = store.save_user(&user).await?;
    info!(user_id = saved.id, "user updated");
    Ok(saved)
}

/// Signing and verification keys plus token parameters.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.max(0) as u64) * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn sign(&self, user_id: i64) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}


#[cfg(test)]
mod credential_tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    #[tokio::test]
    async fn signup_salts_each_stored_hash() {
        let store = MemoryStore::default();
        let first = register_user(&store, "one@example.com", "shared-pass", "", Role::Regular)
            .await
            .unwrap();
        let second = register_user(&store, "two@example.com", "shared-pass", "", Role::Regular)
            .await
            .unwrap();
        assert!(first.password_hash.starts_with("$argon2"));
        assert_ne!(first.password_hash, second.password_hash);
        assert!(verify_password("shared-pass", &second.password_hash).unwrap());
    }

    #[tokio::test]
    async fn password_change_replaces_login_secret() {
        let store = MemoryStore::default();
        let user = register_user(&store, "me@example.com", "old-secret", "", Role::Regular)
            .await
            .unwrap();
        let changes = UpdateUserRequest {
            password: Some("new-secret".into()),
            ..Default::default()
        };
        update_user(&store, user, changes, false).await.unwrap();

        assert!(authenticate(&store, "me@example.com", "old-secret").await.is_err());
        assert!(authenticate(&store, "me@example.com", "new-secret").await.is_ok());
    }

    #[tokio::test]
    async fn unreadable_stored_hash_is_internal_on_login() {
        let store = MemoryStore::default();
        let mut user = register_user(&store, "me@example.com", "a-secret", "", Role::Regular)
            .await
            .unwrap();
        user.password_hash = "not-a-phc-string".into();
        store.save_user(&user).await.unwrap();

        let err = authenticate(&store, "me@example.com", "a-secret").await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}


#[cfg(test)]
mod jwt_tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::from(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        })
    }

    #[test]
    fn sign_and_verify_token() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let token = keys.sign(42).expect("sign");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.sign(7).expect("sign");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_other_secret() {
        let keys = make_keys("secret-a", "iss", "aud");
        let other = make_keys("secret-b", "iss", "aud");
        let token = keys.sign(7).expect("sign");
        assert!(other.verify(&token).is_err());
        assert!(keys.verify("not-a-token").is_err());
    }
}
