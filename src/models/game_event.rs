use super::{square_label, Column};

use crate::Result;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{self, PgPool};
use uuid::Uuid;

// Nothing ties square_id to the game set of game_uuid; an event can mark
// a square from any set.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameEvent {
    pub game_event_id: i64,
    pub game_uuid: Uuid,
    pub square_id: i64,
    pub time_marked: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameEventWithSquare {
    #[sqlx(flatten)]
    pub event: GameEvent,

    pub square_value: String,
    pub square_column: Option<Column>,
    pub ordered_columns: bool,
}

#[derive(Debug, Clone)]
pub struct NewGameEvent {
    pub game_uuid: Uuid,
    pub square_id: i64,
    pub time_marked: Option<DateTime<Utc>>,
}

impl std::fmt::Display for GameEventWithSquare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Event in Game {} - Square '{}' marked.",
            self.event.game_uuid,
            square_label(&self.square_value, self.square_column, self.ordered_columns),
        )
    }
}

// ordered_columns comes from the square's own set, not the game's.
const SELECT_WITH_SQUARE: &str = r#"
SELECT game_events.*,
    squares.value AS square_value,
    squares.column_letter AS square_column,
    game_sets.ordered_columns
FROM game_events
INNER JOIN squares ON squares.square_id = game_events.square_id
INNER JOIN game_sets ON game_sets.game_set_id = squares.game_set_id
"#;

impl GameEvent {
    pub async fn find_by_id(db: &PgPool, game_event_id: i64) -> Result<Option<Self>> {
        let found: Option<Self> =
            sqlx::query_as("SELECT * FROM game_events WHERE game_event_id = $1 LIMIT 1")
                .bind(game_event_id)
                .fetch_optional(db)
                .await?;

        return Ok(found);
    }

    pub async fn find_with_square(
        db: &PgPool,
        game_event_id: i64,
    ) -> Result<Option<GameEventWithSquare>> {
        let query = format!("{SELECT_WITH_SQUARE} WHERE game_events.game_event_id = $1 LIMIT 1");

        let found: Option<GameEventWithSquare> = sqlx::query_as(&query)
            .bind(game_event_id)
            .fetch_optional(db)
            .await?;

        return Ok(found);
    }

    pub async fn list_with_square(db: &PgPool) -> Result<Vec<GameEventWithSquare>> {
        let query = format!(
            "{SELECT_WITH_SQUARE} ORDER BY game_events.time_marked DESC, game_events.game_event_id DESC"
        );

        let events: Vec<GameEventWithSquare> = sqlx::query_as(&query).fetch_all(db).await?;

        return Ok(events);
    }

    pub async fn count_for_game(db: &PgPool, game_uuid: Uuid) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM game_events WHERE game_uuid = $1")
                .bind(game_uuid)
                .fetch_one(db)
                .await?;

        return Ok(count);
    }

    pub async fn count_for_square(db: &PgPool, square_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM game_events WHERE square_id = $1")
                .bind(square_id)
                .fetch_one(db)
                .await?;

        return Ok(count);
    }

    pub async fn create(db: &PgPool, new: &NewGameEvent) -> Result<Self> {
        let event: Self = sqlx::query_as(
            r#"
INSERT INTO game_events (game_uuid, square_id, time_marked)
VALUES ($1, $2, COALESCE($3, NOW()))
RETURNING *
            "#,
        )
        .bind(new.game_uuid)
        .bind(new.square_id)
        .bind(new.time_marked)
        .fetch_one(db)
        .await?;

        tracing::debug!(
            game_event_id = event.game_event_id,
            game_uuid = %event.game_uuid,
            square_id = event.square_id,
            "Square marked"
        );

        return Ok(event);
    }

    pub async fn update(db: &PgPool, game_event_id: i64, new: &NewGameEvent) -> Result<Option<Self>> {
        let updated: Option<Self> = sqlx::query_as(
            r#"
UPDATE game_events
SET game_uuid = $2,
    square_id = $3,
    time_marked = COALESCE($4, time_marked)
WHERE game_event_id = $1
RETURNING *
            "#,
        )
        .bind(game_event_id)
        .bind(new.game_uuid)
        .bind(new.square_id)
        .bind(new.time_marked)
        .fetch_optional(db)
        .await?;

        return Ok(updated);
    }

    pub async fn delete(db: &PgPool, game_event_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM game_events WHERE game_event_id = $1")
            .bind(game_event_id)
            .execute(db)
            .await?;

        return Ok(res.rows_affected() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(column: Option<Column>, ordered_columns: bool) -> GameEventWithSquare {
        GameEventWithSquare {
            event: GameEvent {
                game_event_id: 9,
                game_uuid: Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8").unwrap(),
                square_id: 4,
                time_marked: Utc::now(),
            },
            square_value: "I-22".to_string(),
            square_column: column,
            ordered_columns,
        }
    }

    #[test]
    fn display_names_game_and_square_without_set() {
        assert_eq!(
            event(Some(Column::I), true).to_string(),
            "Event in Game a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8 - Square 'I - 'I-22'' marked."
        );
    }

    #[test]
    fn display_skips_column_for_random_sets() {
        assert_eq!(
            event(Some(Column::I), false).to_string(),
            "Event in Game a1a2a3a4-b1b2-c1c2-d1d2-d3d4d5d6d7d8 - Square ''I-22'' marked."
        );
    }
}
