use crate::Result;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use scrypt::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use serde::{Deserialize, Serialize};
use sqlx::{self, PgPool};

pub const USERNAME_MAX_LENGTH: usize = 150;

const LIST_NEWEST_FIRST: &str = "SELECT * FROM users ORDER BY created_at DESC, user_id DESC";
const LIST_BY_USERNAME: &str = "SELECT * FROM users ORDER BY username";

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub user_id: i64,
    pub username: String,

    #[serde(skip_serializing)]
    pub password_hash: String,

    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.username)
    }
}

#[cfg(not(test))]
fn scrypt_params() -> Params {
    return Params::recommended();
}

// Recommended params take seconds per hash in unoptimized builds.
#[cfg(test)]
fn scrypt_params() -> Params {
    return Params::new(4, 8, 1, 32).unwrap_or_else(|_| Params::recommended());
}

lazy_static! {
    /// Checked when a login names no account, so it costs the same as a wrong password.
    static ref DUMMY_PASSWORD_HASH: Option<String> = hash_password("not a bingo password").ok();
}

/// Blocks for a few hundred milliseconds, see [`hash_password_blocking`].
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hashed = Scrypt
        .hash_password_customized(password.as_bytes(), None, None, scrypt_params(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?
        .to_string();

    return Ok(hashed);
}

pub async fn hash_password_blocking(password: &str) -> Result<String> {
    let password = password.to_string();

    return tokio::task::spawn_blocking(move || hash_password(&password)).await?;
}

fn verify_hash(password_hash: &str, candidate: &str) -> bool {
    let Ok(hashed) = PasswordHash::new(password_hash) else {
        return false;
    };

    return Scrypt
        .verify_password(candidate.as_bytes(), &hashed)
        .is_ok();
}

impl User {
    pub fn verify_password(&self, candidate: &str) -> bool {
        return verify_hash(&self.password_hash, candidate);
    }

    /// The staff account `found` when `candidate` is its password. Runs one
    /// scrypt check whether or not an account was found.
    pub fn check_login(found: Option<Self>, candidate: &str) -> Option<Self> {
        let Some(user) = found else {
            if let Some(dummy) = DUMMY_PASSWORD_HASH.as_deref() {
                verify_hash(dummy, candidate);
            }

            return None;
        };

        let verified = user.verify_password(candidate);

        return (verified && user.is_staff).then_some(user);
    }

    pub async fn find_by_id(db: &PgPool, user_id: i64) -> Result<Option<Self>> {
        let found: Option<Self> = sqlx::query_as("SELECT * FROM users WHERE user_id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;

        return Ok(found);
    }

    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<Self>> {
        let found: Option<Self> =
            sqlx::query_as("SELECT * FROM users WHERE username = $1 LIMIT 1")
                .bind(username)
                .fetch_optional(db)
                .await?;

        return Ok(found);
    }

    /// Newest first.
    pub async fn list(db: &PgPool) -> Result<Vec<Self>> {
        let users: Vec<Self> = sqlx::query_as(LIST_NEWEST_FIRST).fetch_all(db).await?;

        return Ok(users);
    }

    pub async fn list_by_username(db: &PgPool) -> Result<Vec<Self>> {
        let users: Vec<Self> = sqlx::query_as(LIST_BY_USERNAME).fetch_all(db).await?;

        return Ok(users);
    }

    pub async fn create(db: &PgPool, username: &str, password: &str, is_staff: bool) -> Result<Self> {
        let password_hash = hash_password_blocking(password).await?;

        let user: Self = sqlx::query_as(
            "INSERT INTO users (username, password_hash, is_staff) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(username)
        .bind(&password_hash)
        .bind(is_staff)
        .fetch_one(db)
        .await?;

        tracing::info!(user_id = user.user_id, "Created user {}", user.username);

        return Ok(user);
    }

    /// A `None` password keeps the current hash.
    pub async fn update(
        db: &PgPool,
        user_id: i64,
        username: &str,
        is_staff: bool,
        password: Option<&str>,
    ) -> Result<Option<Self>> {
        let password_hash = match password {
            Some(password) => Some(hash_password_blocking(password).await?),
            None => None,
        };

        let updated: Option<Self> = sqlx::query_as(
            r#"
UPDATE users
SET username = $2,
    is_staff = $3,
    password_hash = COALESCE($4, password_hash)
WHERE user_id = $1
RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(is_staff)
        .bind(password_hash)
        .fetch_optional(db)
        .await?;

        return Ok(updated);
    }

    pub async fn delete(db: &PgPool, user_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(db)
            .await?;

        return Ok(res.rows_affected() > 0);
    }

    /// Creates the account, or promotes it to staff and resets its password when it exists.
    pub async fn ensure_staff(db: &PgPool, username: &str, password: &str) -> Result<Self> {
        let Some(existing) = Self::find_by_username(db, username).await? else {
            return Self::create(db, username, password, true).await;
        };

        let user = Self::update(db, existing.user_id, username, true, Some(password))
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {username} disappeared during update"))?;

        tracing::info!(user_id = user.user_id, "Promoted {} to staff", user.username);

        return Ok(user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_password(password: &str) -> User {
        User {
            user_id: 1,
            username: "caller".to_string(),
            password_hash: hash_password(password).unwrap(),
            is_staff: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn passwords_verify_against_their_hash_only() {
        let user = user_with_password("b-10 under the n");

        assert!(user.password_hash.starts_with("$scrypt$"));
        assert!(user.verify_password("b-10 under the n"));
        assert!(!user.verify_password("o-75"));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let mut user = user_with_password("free");
        user.password_hash = "not a phc string".to_string();

        assert!(!user.verify_password("free"));
    }

    #[tokio::test]
    async fn background_hashes_verify() {
        let hashed = hash_password_blocking("g-52 on the g").await.unwrap();

        assert!(hashed.starts_with("$scrypt$"));
        assert!(verify_hash(&hashed, "g-52 on the g"));
    }

    #[test]
    fn login_needs_a_staff_account_and_its_password() {
        let staff = user_with_password("b-10 under the n");

        let user = User::check_login(Some(staff.clone()), "b-10 under the n");
        assert_eq!(user.map(|user| user.user_id), Some(1));

        assert!(User::check_login(Some(staff), "o-75").is_none());

        let mut player = user_with_password("free");
        player.is_staff = false;
        assert!(User::check_login(Some(player), "free").is_none());
    }

    #[test]
    fn unknown_accounts_still_check_a_hash() {
        assert!(DUMMY_PASSWORD_HASH.is_some());
        assert!(User::check_login(None, "not a bingo password").is_none());
    }

    #[test]
    fn admin_list_is_newest_first() {
        assert!(LIST_NEWEST_FIRST.ends_with("ORDER BY created_at DESC, user_id DESC"));
        assert!(LIST_BY_USERNAME.ends_with("ORDER BY username"));
    }

    #[test]
    fn display_is_username() {
        let user = User {
            user_id: 7,
            username: "host".to_string(),
            password_hash: String::new(),
            is_staff: false,
            created_at: Utc::now(),
        };

        assert_eq!(user.to_string(), "host");
    }
}
