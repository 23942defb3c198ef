use super::{
    changed_timestamp, check_user, checkbox, format_timestamp, related_counts, user_choices,
    AdminRow, FieldErrors, FormField, ModelAdmin,
};

use crate::{
    models::{
        GameInstance, GameSet, NewGameSet, Square, User, DEFAULT_FREE_SPACE,
        FREE_SPACE_MAX_LENGTH, GAME_SET_NAME_MAX_LENGTH,
    },
    Result,
};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

pub struct GameSetAdmin;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameSetForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_date: String,
    #[serde(default)]
    pub free_space: String,
    pub allow_free_space: Option<String>,
    pub ordered_columns: Option<String>,
}

fn parse_form(user: &User, form: &GameSetForm, errors: &mut FieldErrors) -> Option<NewGameSet> {
    let name = errors.text("name", &form.name, GAME_SET_NAME_MAX_LENGTH);
    let author_id = errors
        .choice::<i64>("author", &form.author)
        .map(|author_id| author_id.unwrap_or(user.user_id));
    let created_date = errors.timestamp("created_date", &form.created_date);
    let free_space = errors.text("free_space", &form.free_space, FREE_SPACE_MAX_LENGTH);

    let (Some(author_id), Some(created_date)) = (author_id, created_date) else {
        return None;
    };

    if !errors.is_empty() {
        return None;
    }

    return Some(NewGameSet {
        name,
        author_id,
        created_date,
        free_space,
        allow_free_space: checkbox(&form.allow_free_space),
        ordered_columns: checkbox(&form.ordered_columns),
    });
}

#[async_trait]
impl ModelAdmin for GameSetAdmin {
    type Key = i64;
    type Form = GameSetForm;
    type Valid = NewGameSet;

    const SLUG: &'static str = "game-sets";
    const NAME: &'static str = "game set";
    const NAME_PLURAL: &'static str = "game sets";

    async fn rows(db: &PgPool) -> Result<Vec<AdminRow>> {
        let game_sets = GameSet::list(db).await?;

        return Ok(game_sets
            .iter()
            .map(|game_set| AdminRow::new(game_set.game_set_id, game_set))
            .collect());
    }

    fn initial(user: &User) -> GameSetForm {
        return GameSetForm {
            author: user.user_id.to_string(),
            free_space: DEFAULT_FREE_SPACE.to_string(),
            allow_free_space: Some("on".to_string()),
            ordered_columns: Some("on".to_string()),
            ..Default::default()
        };
    }

    async fn load(db: &PgPool, key: &i64) -> Result<Option<GameSetForm>> {
        let Some(game_set) = GameSet::find_by_id(db, *key).await? else {
            return Ok(None);
        };

        return Ok(Some(GameSetForm {
            name: game_set.name,
            author: game_set.author_id.to_string(),
            created_date: format_timestamp(&game_set.created_date),
            free_space: game_set.free_space,
            allow_free_space: game_set.allow_free_space.then(|| "on".to_string()),
            ordered_columns: game_set.ordered_columns.then(|| "on".to_string()),
        }));
    }

    async fn fields(
        db: &PgPool,
        _key: Option<&i64>,
        form: &GameSetForm,
        errors: &FieldErrors,
    ) -> Result<Vec<FormField>> {
        let fields = vec![
            FormField::text("name", "Name", &form.name, GAME_SET_NAME_MAX_LENGTH),
            FormField::select("author", "Author", &form.author, user_choices(db).await?, None),
            FormField::datetime("created_date", "Created date", &form.created_date)
                .with_help("UTC. Leave blank for now."),
            FormField::text("free_space", "Free space", &form.free_space, FREE_SPACE_MAX_LENGTH)
                .with_help("Text shown on the free space."),
            FormField::checkbox(
                "allow_free_space",
                "Allow free space",
                checkbox(&form.allow_free_space),
            ),
            FormField::checkbox(
                "ordered_columns",
                "Ordered columns",
                checkbox(&form.ordered_columns),
            )
            .with_help("Sort squares into their B/I/N/G/O column instead of a random order."),
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
        form: &GameSetForm,
    ) -> Result<std::result::Result<NewGameSet, FieldErrors>> {
        let mut errors = FieldErrors::new();

        let Some(mut game_set) = parse_form(user, form, &mut errors) else {
            return Ok(Err(errors));
        };

        check_user(db, &mut errors, "author", Some(game_set.author_id)).await?;

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        if let Some(key) = key {
            if let Some(existing) = GameSet::find_by_id(db, *key).await? {
                game_set.created_date =
                    changed_timestamp(game_set.created_date, &existing.created_date);
            }
        }

        return Ok(Ok(game_set));
    }

    async fn create(db: &PgPool, valid: NewGameSet) -> Result<i64> {
        let game_set = GameSet::create(db, &valid).await?;

        return Ok(game_set.game_set_id);
    }

    async fn update(db: &PgPool, key: &i64, valid: NewGameSet) -> Result<bool> {
        let updated = GameSet::update(db, *key, &valid).await?;

        return Ok(updated.is_some());
    }

    async fn describe(db: &PgPool, key: &i64) -> Result<Option<String>> {
        let game_set = GameSet::find_by_id(db, *key).await?;

        return Ok(game_set.map(|game_set| game_set.to_string()));
    }

    async fn related(db: &PgPool, key: &i64) -> Result<Vec<String>> {
        let squares = Square::count_for_game_set(db, *key).await?;
        let games = GameInstance::count_for_game_set(db, *key).await?;

        return Ok(related_counts(&[
            (squares, "square", "squares"),
            (games, "game", "games"),
        ]));
    }

    async fn delete(db: &PgPool, key: &i64) -> Result<bool> {
        return GameSet::delete(db, *key).await;
    }
}
