use crate::Result;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{self, PgPool};

pub const GAME_SET_NAME_MAX_LENGTH: usize = 1000;
pub const FREE_SPACE_MAX_LENGTH: usize = 1000;
pub const DEFAULT_FREE_SPACE: &str = "Free";

const DISPLAY_NAME_LENGTH: usize = 45;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameSet {
    pub game_set_id: i64,
    pub name: String,
    pub author_id: i64,
    pub created_date: DateTime<Utc>,

    pub free_space: String,
    pub allow_free_space: bool,
    pub ordered_columns: bool,
}

#[derive(Debug, Clone)]
pub struct NewGameSet {
    pub name: String,
    pub author_id: i64,
    /// `None` means now.
    pub created_date: Option<DateTime<Utc>>,

    pub free_space: String,
    pub allow_free_space: bool,
    pub ordered_columns: bool,
}

impl NewGameSet {
    pub fn new(name: impl Into<String>, author_id: i64) -> Self {
        return Self {
            name: name.into(),
            author_id,
            created_date: None,

            free_space: DEFAULT_FREE_SPACE.to_string(),
            allow_free_space: true,
            ordered_columns: true,
        };
    }
}

/// Short label for a game set name: at most 45 characters, marked with `...` when cut.
pub fn game_set_label(name: &str) -> String {
    if name.chars().count() <= DISPLAY_NAME_LENGTH {
        return name.trim_end().to_string();
    }

    let head: String = name.chars().take(DISPLAY_NAME_LENGTH).collect();

    return format!("{}...", head.trim_end());
}

impl std::fmt::Display for GameSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", game_set_label(&self.name))
    }
}

impl GameSet {
    pub async fn find_by_id(db: &PgPool, game_set_id: i64) -> Result<Option<Self>> {
        let found: Option<Self> =
            sqlx::query_as("SELECT * FROM game_sets WHERE game_set_id = $1 LIMIT 1")
                .bind(game_set_id)
                .fetch_optional(db)
                .await?;

        return Ok(found);
    }

    pub async fn list(db: &PgPool) -> Result<Vec<Self>> {
        let game_sets: Vec<Self> =
            sqlx::query_as("SELECT * FROM game_sets ORDER BY created_date DESC, game_set_id DESC")
                .fetch_all(db)
                .await?;

        return Ok(game_sets);
    }

    pub async fn count_by_author(db: &PgPool, author_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM game_sets WHERE author_id = $1")
                .bind(author_id)
                .fetch_one(db)
                .await?;

        return Ok(count);
    }

    pub async fn create(db: &PgPool, new: &NewGameSet) -> Result<Self> {
        let game_set: Self = sqlx::query_as(
            r#"
INSERT INTO game_sets (name, author_id, created_date, free_space, allow_free_space, ordered_columns)
VALUES ($1, $2, COALESCE($3, NOW()), $4, $5, $6)
RETURNING *
            "#,
        )
        .bind(&new.name)
        .bind(new.author_id)
        .bind(new.created_date)
        .bind(&new.free_space)
        .bind(new.allow_free_space)
        .bind(new.ordered_columns)
        .fetch_one(db)
        .await?;

        tracing::debug!(game_set_id = game_set.game_set_id, "Created game set");

        return Ok(game_set);
    }

    pub async fn update(db: &PgPool, game_set_id: i64, new: &NewGameSet) -> Result<Option<Self>> {
        let updated: Option<Self> = sqlx::query_as(
            r#"
UPDATE game_sets
SET name = $2,
    author_id = $3,
    created_date = COALESCE($4, created_date),
    free_space = $5,
    allow_free_space = $6,
    ordered_columns = $7
WHERE game_set_id = $1
RETURNING *
            "#,
        )
        .bind(game_set_id)
        .bind(&new.name)
        .bind(new.author_id)
        .bind(new.created_date)
        .bind(&new.free_space)
        .bind(new.allow_free_space)
        .bind(new.ordered_columns)
        .fetch_optional(db)
        .await?;

        return Ok(updated);
    }

    /// Squares, game instances, and everything hanging off those go with it.
    pub async fn delete(db: &PgPool, game_set_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM game_sets WHERE game_set_id = $1")
            .bind(game_set_id)
            .execute(db)
            .await?;

        return Ok(res.rows_affected() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game_set(name: &str) -> GameSet {
        let new = NewGameSet::new(name, 1);

        GameSet {
            game_set_id: 1,
            name: new.name,
            author_id: new.author_id,
            created_date: Utc::now(),
            free_space: new.free_space,
            allow_free_space: new.allow_free_space,
            ordered_columns: new.ordered_columns,
        }
    }

    #[test]
    fn new_game_sets_use_model_defaults() {
        let new = NewGameSet::new("Office Bingo", 3);

        assert_eq!(new.free_space, "Free");
        assert!(new.allow_free_space);
        assert!(new.ordered_columns);
        assert!(new.created_date.is_none());
    }

    #[test]
    fn short_names_display_unchanged() {
        assert_eq!(game_set("Office Bingo").to_string(), "Office Bingo");
    }

    #[test]
    fn exactly_45_characters_has_no_ellipsis() {
        let name = "x".repeat(45);

        assert_eq!(game_set(&name).to_string(), name);
    }

    #[test]
    fn long_names_are_cut_at_45_characters() {
        let name = format!("{}{}", "a".repeat(45), "bcdef");

        assert_eq!(game_set(&name).to_string(), format!("{}...", "a".repeat(45)));
    }

    #[test]
    fn trailing_whitespace_at_the_cut_is_trimmed() {
        // 40 chars, 5 spaces, then more text
        let name = format!("{}     tail of the name", "b".repeat(40));

        assert_eq!(game_set(&name).to_string(), format!("{}...", "b".repeat(40)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let name = "é".repeat(46);

        assert_eq!(game_set(&name).to_string(), format!("{}...", "é".repeat(45)));
    }
}
