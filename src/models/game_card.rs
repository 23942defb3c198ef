use crate::Result;

use serde::{Deserialize, Serialize};
use sqlx::{self, PgPool};
use uuid::Uuid;

pub const PLAYER_NAME_MAX_LENGTH: usize = 64;
pub const DEFAULT_PLAYER_NAME: &str = "Player";

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct GameCard {
    pub game_card_uuid: Uuid,
    pub game_uuid: Uuid,

    /// Unset when the player isn't a registered user.
    pub owner_id: Option<i64>,
    pub player_name: String,
}

#[derive(Debug, Clone)]
pub struct NewGameCard {
    pub game_uuid: Uuid,
    pub owner_id: Option<i64>,
    pub player_name: String,
}

impl std::fmt::Display for GameCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Bingo Card - {}", self.game_card_uuid)
    }
}

impl GameCard {
    pub async fn find_by_uuid(db: &PgPool, game_card_uuid: Uuid) -> Result<Option<Self>> {
        let found: Option<Self> =
            sqlx::query_as("SELECT * FROM game_cards WHERE game_card_uuid = $1 LIMIT 1")
                .bind(game_card_uuid)
                .fetch_optional(db)
                .await?;

        return Ok(found);
    }

    pub async fn list(db: &PgPool) -> Result<Vec<Self>> {
        let cards: Vec<Self> = sqlx::query_as(
            r#"
SELECT game_cards.*
FROM game_cards
INNER JOIN game_instances ON game_instances.game_uuid = game_cards.game_uuid
ORDER BY game_instances.game_created DESC, game_cards.player_name
            "#,
        )
        .fetch_all(db)
        .await?;

        return Ok(cards);
    }

    pub async fn count_for_game(db: &PgPool, game_uuid: Uuid) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM game_cards WHERE game_uuid = $1")
            .bind(game_uuid)
            .fetch_one(db)
            .await?;

        return Ok(count);
    }

    pub async fn count_by_owner(db: &PgPool, owner_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM game_cards WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(db)
            .await?;

        return Ok(count);
    }

    pub async fn create(db: &PgPool, new: &NewGameCard) -> Result<Self> {
        let card: Self = sqlx::query_as(
            r#"
INSERT INTO game_cards (game_card_uuid, game_uuid, owner_id, player_name)
VALUES ($1, $2, $3, $4)
RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.game_uuid)
        .bind(new.owner_id)
        .bind(&new.player_name)
        .fetch_one(db)
        .await?;

        tracing::debug!(game_card_uuid = %card.game_card_uuid, game_uuid = %card.game_uuid, "Created game card");

        return Ok(card);
    }

    pub async fn update(db: &PgPool, game_card_uuid: Uuid, new: &NewGameCard) -> Result<Option<Self>> {
        let updated: Option<Self> = sqlx::query_as(
            r#"
UPDATE game_cards
SET game_uuid = $2,
    owner_id = $3,
    player_name = $4
WHERE game_card_uuid = $1
RETURNING *
            "#,
        )
        .bind(game_card_uuid)
        .bind(new.game_uuid)
        .bind(new.owner_id)
        .bind(&new.player_name)
        .fetch_optional(db)
        .await?;

        return Ok(updated);
    }

    pub async fn delete(db: &PgPool, game_card_uuid: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM game_cards WHERE game_card_uuid = $1")
            .bind(game_card_uuid)
            .execute(db)
            .await?;

        return Ok(res.rows_affected() > 0);
    }
}
