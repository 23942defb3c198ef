use super::game_set_label;

use crate::Result;

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    self,
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    PgPool, Postgres,
};

pub const SQUARE_VALUE_MAX_LENGTH: usize = 1000;

/// Bingo column a square sorts into when its set uses ordered columns.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    B,
    I,
    N,
    G,
    O,
}

impl Column {
    pub const ALL: [Column; 5] = [Column::B, Column::I, Column::N, Column::G, Column::O];

    pub fn as_str(&self) -> &'static str {
        return match self {
            Column::B => "B",
            Column::I => "I",
            Column::N => "N",
            Column::G => "G",
            Column::O => "O",
        };
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColumnError(pub String);

impl fmt::Display for ParseColumnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} is not one of B, I, N, G, O", self.0)
    }
}

impl std::error::Error for ParseColumnError {}

impl FromStr for Column {
    type Err = ParseColumnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        return match s {
            "B" => Ok(Column::B),
            "I" => Ok(Column::I),
            "N" => Ok(Column::N),
            "G" => Ok(Column::G),
            "O" => Ok(Column::O),
            other => Err(ParseColumnError(other.to_string())),
        };
    }
}

impl sqlx::Type<Postgres> for Column {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, Postgres> for Column {
    fn decode(value: PgValueRef<'r>) -> std::result::Result<Self, BoxDynError> {
        let raw = <&str as sqlx::Decode<Postgres>>::decode(value)?;

        return Ok(raw.trim().parse()?);
    }
}

impl<'q> sqlx::Encode<'q, Postgres> for Column {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> IsNull {
        <&str as sqlx::Encode<Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Square {
    pub square_id: i64,
    pub value: String,

    #[sqlx(rename = "column_letter")]
    pub column: Option<Column>,

    pub author_id: i64,
    pub created_date: DateTime<Utc>,
    pub game_set_id: i64,
}

/// A square joined with the parts of its game set that its label needs.
#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct SquareWithGameSet {
    #[sqlx(flatten)]
    pub square: Square,

    pub game_set_name: String,
    pub ordered_columns: bool,
}

#[derive(Debug, Clone)]
pub struct NewSquare {
    pub value: String,
    pub column: Option<Column>,
    pub author_id: i64,
    pub created_date: Option<DateTime<Utc>>,
    pub game_set_id: i64,
}

/// `{col}'{value}'`, where `{col}` is `"B - "` style only for ordered sets.
pub fn square_label(value: &str, column: Option<Column>, ordered_columns: bool) -> String {
    let col_format = match column {
        Some(column) if ordered_columns => format!("{column} - "),
        _ => String::new(),
    };

    return format!("{col_format}'{value}'");
}

impl SquareWithGameSet {
    pub fn label(&self, with_game_set: bool) -> String {
        let label = square_label(&self.square.value, self.square.column, self.ordered_columns);

        if !with_game_set {
            return label;
        }

        return format!("{label} in '{}'", game_set_label(&self.game_set_name));
    }
}

impl fmt::Display for SquareWithGameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label(true))
    }
}

const SELECT_WITH_GAME_SET: &str = r#"
SELECT squares.*, game_sets.name AS game_set_name, game_sets.ordered_columns
FROM squares
INNER JOIN game_sets ON game_sets.game_set_id = squares.game_set_id
"#;

impl Square {
    pub async fn find_by_id(db: &PgPool, square_id: i64) -> Result<Option<Self>> {
        let found: Option<Self> =
            sqlx::query_as("SELECT * FROM squares WHERE square_id = $1 LIMIT 1")
                .bind(square_id)
                .fetch_optional(db)
                .await?;

        return Ok(found);
    }

    pub async fn find_with_game_set(db: &PgPool, square_id: i64) -> Result<Option<SquareWithGameSet>> {
        let query = format!("{SELECT_WITH_GAME_SET} WHERE squares.square_id = $1 LIMIT 1");

        let found: Option<SquareWithGameSet> = sqlx::query_as(&query)
            .bind(square_id)
            .fetch_optional(db)
            .await?;

        return Ok(found);
    }

    pub async fn list_with_game_set(db: &PgPool) -> Result<Vec<SquareWithGameSet>> {
        let query = format!(
            "{SELECT_WITH_GAME_SET} ORDER BY squares.created_date DESC, squares.square_id DESC"
        );

        let squares: Vec<SquareWithGameSet> = sqlx::query_as(&query).fetch_all(db).await?;

        return Ok(squares);
    }

    pub async fn count_for_game_set(db: &PgPool, game_set_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM squares WHERE game_set_id = $1")
            .bind(game_set_id)
            .fetch_one(db)
            .await?;

        return Ok(count);
    }

    pub async fn count_by_author(db: &PgPool, author_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM squares WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(db)
            .await?;

        return Ok(count);
    }

    pub async fn create(db: &PgPool, new: &NewSquare) -> Result<Self> {
        let square: Self = sqlx::query_as(
            r#"
INSERT INTO squares (value, column_letter, author_id, created_date, game_set_id)
VALUES ($1, $2, $3, COALESCE($4, NOW()), $5)
RETURNING *
            "#,
        )
        .bind(&new.value)
        .bind(new.column)
        .bind(new.author_id)
        .bind(new.created_date)
        .bind(new.game_set_id)
        .fetch_one(db)
        .await?;

        tracing::debug!(square_id = square.square_id, game_set_id = square.game_set_id, "Created square");

        return Ok(square);
    }

    pub async fn update(db: &PgPool, square_id: i64, new: &NewSquare) -> Result<Option<Self>> {
        let updated: Option<Self> = sqlx::query_as(
            r#"
UPDATE squares
SET value = $2,
    column_letter = $3,
    author_id = $4,
    created_date = COALESCE($5, created_date),
    game_set_id = $6
WHERE square_id = $1
RETURNING *
            "#,
        )
        .bind(square_id)
        .bind(&new.value)
        .bind(new.column)
        .bind(new.author_id)
        .bind(new.created_date)
        .bind(new.game_set_id)
        .fetch_optional(db)
        .await?;

        return Ok(updated);
    }

    pub async fn delete(db: &PgPool, square_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM squares WHERE square_id = $1")
            .bind(square_id)
            .execute(db)
            .await?;

        return Ok(res.rows_affected() > 0);
    }
}
