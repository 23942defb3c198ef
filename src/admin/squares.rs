use super::{
    changed_timestamp, check_user, count_label, format_timestamp, user_choices, AdminRow,
    FieldErrors, FormField, ModelAdmin, INVALID_CHOICE,
};

use crate::{
    models::{Column, GameEvent, GameSet, NewSquare, Square, User, SQUARE_VALUE_MAX_LENGTH},
    Result,
};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

pub struct SquareAdmin;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SquareForm {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub column: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_date: String,
    #[serde(default)]
    pub game_set: String,
}

pub(crate) async fn game_set_choices(db: &PgPool) -> Result<Vec<(String, String)>> {
    let game_sets = GameSet::list(db).await?;

    return Ok(game_sets
        .iter()
        .map(|game_set| (game_set.game_set_id.to_string(), game_set.to_string()))
        .collect());
}

/// Everything that can be checked without the database.
fn parse_form(user: &User, form: &SquareForm, errors: &mut FieldErrors) -> Option<NewSquare> {
    let value = errors.text("value", &form.value, SQUARE_VALUE_MAX_LENGTH);
    let column = errors.choice::<Column>("column", &form.column);
    let author_id = errors
        .choice::<i64>("author", &form.author)
        .map(|author_id| author_id.unwrap_or(user.user_id));
    let created_date = errors.timestamp("created_date", &form.created_date);
    let game_set_id = errors.key::<i64>("game_set", &form.game_set);

    let (Some(column), Some(author_id), Some(created_date), Some(game_set_id)) =
        (column, author_id, created_date, game_set_id)
    else {
        return None;
    };

    if !errors.is_empty() {
        return None;
    }

    return Some(NewSquare {
        value,
        column,
        author_id,
        created_date,
        game_set_id,
    });
}

#[async_trait]
impl ModelAdmin for SquareAdmin {
    type Key = i64;
    type Form = SquareForm;
    type Valid = NewSquare;

    const SLUG: &'static str = "squares";
    const NAME: &'static str = "square";
    const NAME_PLURAL: &'static str = "squares";

    async fn rows(db: &PgPool) -> Result<Vec<AdminRow>> {
        let squares = Square::list_with_game_set(db).await?;

        return Ok(squares
            .iter()
            .map(|square| AdminRow::new(square.square.square_id, square))
            .collect());
    }

    fn initial(user: &User) -> SquareForm {
        return SquareForm {
            author: user.user_id.to_string(),
            ..Default::default()
        };
    }

    async fn load(db: &PgPool, key: &i64) -> Result<Option<SquareForm>> {
        let Some(square) = Square::find_by_id(db, *key).await? else {
            return Ok(None);
        };

        return Ok(Some(SquareForm {
            value: square.value,
            column: square
                .column
                .map(|column| column.to_string())
                .unwrap_or_default(),
            author: square.author_id.to_string(),
            created_date: format_timestamp(&square.created_date),
            game_set: square.game_set_id.to_string(),
        }));
    }

    async fn fields(
        db: &PgPool,
        _key: Option<&i64>,
        form: &SquareForm,
        errors: &FieldErrors,
    ) -> Result<Vec<FormField>> {
        let columns = Column::ALL
            .iter()
            .map(|column| (column.to_string(), column.to_string()))
            .collect();

        let fields = vec![
            FormField::text("value", "Value", &form.value, SQUARE_VALUE_MAX_LENGTH)
                .with_help("What's on the square, e.g. \"Customer spills drink\" or \"B-10\"."),
            FormField::select("column", "Column", &form.column, columns, Some("---------")),
            FormField::select("author", "Author", &form.author, user_choices(db).await?, None),
            FormField::datetime("created_date", "Created date", &form.created_date)
                .with_help("UTC. Leave blank for now."),
            FormField::select(
                "game_set",
                "Game set",
                &form.game_set,
                game_set_choices(db).await?,
                Some("---------"),
            ),
        ];

        return Ok(fields
            .into_iter()
            .map(|field| field.with_errors(errors))
            .collect());
    }

    async fn validate(
        db: &PgPool,
        key: Option<&i64>,
        user: &User,
        form: &SquareForm,
    ) -> Result<std::result::Result<NewSquare, FieldErrors>> {
        let mut errors = FieldErrors::new();

        let Some(mut square) = parse_form(user, form, &mut errors) else {
            return Ok(Err(errors));
        };

        check_user(db, &mut errors, "author", Some(square.author_id)).await?;

        if GameSet::find_by_id(db, square.game_set_id).await?.is_none() {
            errors.add("game_set", INVALID_CHOICE);
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        if let Some(key) = key {
            if let Some(existing) = Square::find_by_id(db, *key).await? {
                square.created_date = changed_timestamp(square.created_date, &existing.created_date);
            }
        }

        return Ok(Ok(square));
    }

    async fn create(db: &PgPool, valid: NewSquare) -> Result<i64> {
        let square = Square::create(db, &valid).await?;

        return Ok(square.square_id);
    }

    async fn update(db: &PgPool, key: &i64, valid: NewSquare) -> Result<bool> {
        let updated = Square::update(db, *key, &valid).await?;

        return Ok(updated.is_some());
    }

    async fn describe(db: &PgPool, key: &i64) -> Result<Option<String>> {
        let square = Square::find_with_game_set(db, *key).await?;

        return Ok(square.map(|square| square.to_string()));
    }

    async fn related(db: &PgPool, key: &i64) -> Result<Vec<String>> {
        let events = GameEvent::count_for_square(db, *key).await?;

        if events == 0 {
            return Ok(vec![]);
        }

        return Ok(vec![count_label(events, "game event", "game events")]);
    }

    async fn delete(db: &PgPool, key: &i64) -> Result<bool> {
        return Square::delete(db, *key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::admin::{test_staff, REQUIRED};

    fn form(column: &str, game_set: &str) -> SquareForm {
        SquareForm {
            value: "Customer spills drink".to_string(),
            column: column.to_string(),
            game_set: game_set.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn columns_are_bingo_letters() {
        let mut errors = FieldErrors::new();
        let square = parse_form(&test_staff(), &form("N", "3"), &mut errors).unwrap();

        assert_eq!(square.column, Some(Column::N));
        assert_eq!(square.game_set_id, 3);

        let mut errors = FieldErrors::new();
        assert!(parse_form(&test_staff(), &form("X", "3"), &mut errors).is_none());
        assert_eq!(errors.get("column"), Some(INVALID_CHOICE));

        let mut errors = FieldErrors::new();
        assert!(parse_form(&test_staff(), &form("b", "3"), &mut errors).is_none());
        assert_eq!(errors.get("column"), Some(INVALID_CHOICE));
    }

    #[test]
    fn column_is_optional() {
        let mut errors = FieldErrors::new();
        let square = parse_form(&test_staff(), &form("", "3"), &mut errors).unwrap();

        assert_eq!(square.column, None);
    }

    #[test]
    fn blank_author_is_the_current_user() {
        let mut errors = FieldErrors::new();
        let square = parse_form(&test_staff(), &form("B", "3"), &mut errors).unwrap();

        assert_eq!(square.author_id, test_staff().user_id);
        assert_eq!(square.created_date, None);
    }

    #[test]
    fn game_set_is_required() {
        let mut errors = FieldErrors::new();

        assert!(parse_form(&test_staff(), &form("B", ""), &mut errors).is_none());
        assert_eq!(errors.get("game_set"), Some(REQUIRED));
    }
}
