//! Generated CRUD pages for the bingo models.
//!
//! Each model gets a [`ModelAdmin`] describing how to list, render, validate
//! and save it. Registering it with an [`AdminSite`] mounts its pages.

mod forms;
pub use forms::*;

mod site;
pub use site::*;

mod users;
pub use users::*;

mod game_sets;
pub use game_sets::*;

mod squares;
pub use squares::*;

mod game_instances;
pub use game_instances::*;

mod game_cards;
pub use game_cards::*;

mod game_events;
pub use game_events::*;

use crate::{models::User, Result};

use std::{fmt::Display, str::FromStr};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::PgPool;

/// One line on a model's list page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRow {
    pub key: String,
    pub label: String,
}

impl AdminRow {
    pub fn new(key: impl Display, label: impl Display) -> Self {
        return Self {
            key: key.to_string(),
            label: label.to_string(),
        };
    }
}

#[async_trait]
pub trait ModelAdmin: Send + Sync + 'static {
    type Key: FromStr + Display + Send + Sync;
    /// Raw submitted values, all strings.
    type Form: DeserializeOwned + Send + Sync;
    /// A form that passed validation.
    type Valid: Send;

    const SLUG: &'static str;
    const NAME: &'static str;
    const NAME_PLURAL: &'static str;

    async fn rows(db: &PgPool) -> Result<Vec<AdminRow>>;

    /// Initial values for the add page.
    fn initial(user: &User) -> Self::Form;

    /// Current values for the change page, `None` when the key doesn't exist.
    async fn load(db: &PgPool, key: &Self::Key) -> Result<Option<Self::Form>>;

    async fn fields(
        db: &PgPool,
        key: Option<&Self::Key>,
        form: &Self::Form,
        errors: &FieldErrors,
    ) -> Result<Vec<FormField>>;

    /// `key` is `None` when adding.
    async fn validate(
        db: &PgPool,
        key: Option<&Self::Key>,
        user: &User,
        form: &Self::Form,
    ) -> Result<std::result::Result<Self::Valid, FieldErrors>>;

    async fn create(db: &PgPool, valid: Self::Valid) -> Result<Self::Key>;

    /// `false` when the key doesn't exist.
    async fn update(db: &PgPool, key: &Self::Key, valid: Self::Valid) -> Result<bool>;

    /// Display label of one record, `None` when the key doesn't exist.
    async fn describe(db: &PgPool, key: &Self::Key) -> Result<Option<String>>;

    /// What else goes away through cascades when the record is deleted.
    async fn related(_db: &PgPool, _key: &Self::Key) -> Result<Vec<String>> {
        return Ok(vec![]);
    }

    async fn delete(db: &PgPool, key: &Self::Key) -> Result<bool>;
}

/// Choices for a user foreign key.
pub(crate) async fn user_choices(db: &PgPool) -> Result<Vec<(String, String)>> {
    let users = User::list_by_username(db).await?;

    return Ok(users
        .into_iter()
        .map(|user| (user.user_id.to_string(), user.to_string()))
        .collect());
}

/// Rejects keys that parse but point at nothing.
pub(crate) async fn check_user(
    db: &PgPool,
    errors: &mut FieldErrors,
    field: &'static str,
    user_id: Option<i64>,
) -> Result<()> {
    if let Some(user_id) = user_id {
        if User::find_by_id(db, user_id).await?.is_none() {
            errors.add(field, INVALID_CHOICE);
        }
    }

    return Ok(());
}

/// `"3 squares"`, `"1 square"`.
pub(crate) fn count_label(count: i64, singular: &str, plural: &str) -> String {
    let noun = if count == 1 { singular } else { plural };

    return format!("{count} {noun}");
}

/// Labels for the non-zero counts, in order.
pub(crate) fn related_counts(counts: &[(i64, &str, &str)]) -> Vec<String> {
    return counts
        .iter()
        .filter(|(count, _, _)| *count > 0)
        .map(|(count, singular, plural)| count_label(*count, singular, plural))
        .collect();
}

#[cfg(test)]
pub(crate) fn test_staff() -> User {
    User {
        user_id: 7,
        username: "host".to_string(),
        password_hash: String::new(),
        is_staff: true,
        created_at: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_pick_singular_or_plural() {
        assert_eq!(count_label(1, "square", "squares"), "1 square");
        assert_eq!(count_label(24, "square", "squares"), "24 squares");
    }

    #[test]
    fn related_counts_skip_zeroes() {
        let labels = related_counts(&[
            (0, "game set", "game sets"),
            (3, "game", "games"),
            (1, "game card", "game cards"),
        ]);

        assert_eq!(labels, vec!["3 games", "1 game card"]);
    }
}
