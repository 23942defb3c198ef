use super::game_set_label;

use crate::Result;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{self, PgPool};
use uuid::Uuid;

pub const DEFAULT_PLAYER_COUNT: i32 = 1;

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameInstance {
    pub game_uuid: Uuid,
    pub game_set_id: i64,
    pub admin_id: i64,

    pub player_count: i32,
    pub game_created: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameInstanceWithSummary {
    #[sqlx(flatten)]
    pub game: GameInstance,

    pub game_set_name: String,
    pub admin_username: String,
}

#[derive(Debug, Clone)]
pub struct NewGameInstance {
    pub game_set_id: i64,
    pub admin_id: i64,
    pub player_count: i32,
    pub game_created: Option<DateTime<Utc>>,
}

impl std::fmt::Display for GameInstanceWithSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Game using '{}', created on {} by {}.",
            game_set_label(&self.game_set_name),
            self.game.game_created.format("%Y-%m-%d %H:%M:%S%:z"),
            self.admin_username,
        )
    }
}

const SELECT_WITH_SUMMARY: &str = r#"
SELECT game_instances.*, game_sets.name AS game_set_name, users.username AS admin_username
FROM game_instances
INNER JOIN game_sets ON game_sets.game_set_id = game_instances.game_set_id
INNER JOIN users ON users.user_id = game_instances.admin_id
"#;

impl GameInstance {
    pub async fn find_by_uuid(db: &PgPool, game_uuid: Uuid) -> Result<Option<Self>> {
        let found: Option<Self> =
            sqlx::query_as("SELECT * FROM game_instances WHERE game_uuid = $1 LIMIT 1")
                .bind(game_uuid)
                .fetch_optional(db)
                .await?;

        return Ok(found);
    }

    pub async fn find_with_summary(
        db: &PgPool,
        game_uuid: Uuid,
    ) -> Result<Option<GameInstanceWithSummary>> {
        let query = format!("{SELECT_WITH_SUMMARY} WHERE game_instances.game_uuid = $1 LIMIT 1");

        let found: Option<GameInstanceWithSummary> = sqlx::query_as(&query)
            .bind(game_uuid)
            .fetch_optional(db)
            .await?;

        return Ok(found);
    }

    pub async fn list_with_summary(db: &PgPool) -> Result<Vec<GameInstanceWithSummary>> {
        let query = format!("{SELECT_WITH_SUMMARY} ORDER BY game_instances.game_created DESC");

        let games: Vec<GameInstanceWithSummary> = sqlx::query_as(&query).fetch_all(db).await?;

        return Ok(games);
    }

    pub async fn count_for_game_set(db: &PgPool, game_set_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM game_instances WHERE game_set_id = $1")
                .bind(game_set_id)
                .fetch_one(db)
                .await?;

        return Ok(count);
    }

    pub async fn count_by_admin(db: &PgPool, admin_id: i64) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM game_instances WHERE admin_id = $1")
                .bind(admin_id)
                .fetch_one(db)
                .await?;

        return Ok(count);
    }

    pub async fn create(db: &PgPool, new: &NewGameInstance) -> Result<Self> {
        let game_uuid = Uuid::new_v4();

        let game: Self = sqlx::query_as(
            r#"
INSERT INTO game_instances (game_uuid, game_set_id, admin_id, player_count, game_created)
VALUES ($1, $2, $3, $4, COALESCE($5, NOW()))
RETURNING *
            "#,
        )
        .bind(game_uuid)
        .bind(new.game_set_id)
        .bind(new.admin_id)
        .bind(new.player_count)
        .bind(new.game_created)
        .fetch_one(db)
        .await?;

        tracing::info!(%game_uuid, game_set_id = game.game_set_id, "Created game instance");

        return Ok(game);
    }

    /// The uuid itself is never rewritten.
    pub async fn update(
        db: &PgPool,
        game_uuid: Uuid,
        new: &NewGameInstance,
    ) -> Result<Option<Self>> {
        let updated: Option<Self> = sqlx::query_as(
            r#"
UPDATE game_instances
SET game_set_id = $2,
    admin_id = $3,
    player_count = $4,
    game_created = COALESCE($5, game_created)
WHERE game_uuid = $1
RETURNING *
            "#,
        )
        .bind(game_uuid)
        .bind(new.game_set_id)
        .bind(new.admin_id)
        .bind(new.player_count)
        .bind(new.game_created)
        .fetch_optional(db)
        .await?;

        return Ok(updated);
    }

    pub async fn delete(db: &PgPool, game_uuid: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM game_instances WHERE game_uuid = $1")
            .bind(game_uuid)
            .execute(db)
            .await?;

        return Ok(res.rows_affected() > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    #[test]
    fn display_names_set_time_and_admin() {
        let game = GameInstanceWithSummary {
            game: GameInstance {
                game_uuid: Uuid::nil(),
                game_set_id: 2,
                admin_id: 1,
                player_count: DEFAULT_PLAYER_COUNT,
                game_created: Utc.with_ymd_and_hms(2024, 3, 9, 18, 5, 0).unwrap(),
            },
            game_set_name: "Friday Night".to_string(),
            admin_username: "host".to_string(),
        };

        assert_eq!(
            game.to_string(),
            "Game using 'Friday Night', created on 2024-03-09 18:05:00+00:00 by host."
        );
    }
}
