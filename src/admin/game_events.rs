use super::{
    changed_timestamp, format_timestamp, game_instance_choices, AdminRow, FieldErrors, FormField,
    ModelAdmin, INVALID_CHOICE,
};

use crate::{
    models::{GameEvent, GameInstance, NewGameEvent, Square, User},
    Result,
};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

pub struct GameEventAdmin;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameEventForm {
    #[serde(default)]
    pub game_instance: String,
    #[serde(default)]
    pub square_marked: String,
    #[serde(default)]
    pub time_marked: String,
}

async fn square_choices(db: &PgPool) -> Result<Vec<(String, String)>> {
    let squares = Square::list_with_game_set(db).await?;

    return Ok(squares
        .iter()
        .map(|square| (square.square.square_id.to_string(), square.to_string()))
        .collect());
}

fn parse_form(form: &GameEventForm, errors: &mut FieldErrors) -> Option<NewGameEvent> {
    let game_uuid = errors.key::<Uuid>("game_instance", &form.game_instance);
    let square_id = errors.key::<i64>("square_marked", &form.square_marked);
    let time_marked = errors.timestamp("time_marked", &form.time_marked);

    let (Some(game_uuid), Some(square_id), Some(time_marked)) = (game_uuid, square_id, time_marked)
    else {
        return None;
    };

    return Some(NewGameEvent {
        game_uuid,
        square_id,
        time_marked,
    });
}

#[async_trait]
impl ModelAdmin for GameEventAdmin {
    type Key = i64;
    type Form = GameEventForm;
    type Valid = NewGameEvent;

    const SLUG: &'static str = "game-events";
    const NAME: &'static str = "game event";
    const NAME_PLURAL: &'static str = "game events";

    async fn rows(db: &PgPool) -> Result<Vec<AdminRow>> {
        let events = GameEvent::list_with_square(db).await?;

        return Ok(events
            .iter()
            .map(|event| AdminRow::new(event.event.game_event_id, event))
            .collect());
    }

    fn initial(_user: &User) -> GameEventForm {
        return GameEventForm::default();
    }

    async fn load(db: &PgPool, key: &i64) -> Result<Option<GameEventForm>> {
        let Some(event) = GameEvent::find_by_id(db, *key).await? else {
            return Ok(None);
        };

        return Ok(Some(GameEventForm {
            game_instance: event.game_uuid.to_string(),
            square_marked: event.square_id.to_string(),
            time_marked: format_timestamp(&event.time_marked),
        }));
    }

    async fn fields(
        db: &PgPool,
        _key: Option<&i64>,
        form: &GameEventForm,
        errors: &FieldErrors,
    ) -> Result<Vec<FormField>> {
        let fields = vec![
            FormField::select(
                "game_instance",
                "Game instance",
                &form.game_instance,
                game_instance_choices(db).await?,
                Some("---------"),
            ),
            // Any square is accepted, even one outside the game's set.
            FormField::select(
                "square_marked",
                "Square marked",
                &form.square_marked,
                square_choices(db).await?,
                Some("---------"),
            ),
            FormField::datetime("time_marked", "Time marked", &form.time_marked)
                .with_help("UTC. Leave blank for now."),
        ];

        return Ok(fields
            .into_iter()
            .map(|field| field.with_errors(errors))
            .collect());
    }

    async fn validate(
        db: &PgPool,
        key: Option<&i64>,
        _user: &User,
        form: &GameEventForm,
    ) -> Result<std::result::Result<NewGameEvent, FieldErrors>> {
        let mut errors = FieldErrors::new();

        let Some(mut event) = parse_form(form, &mut errors) else {
            return Ok(Err(errors));
        };

        if GameInstance::find_by_uuid(db, event.game_uuid).await?.is_none() {
            errors.add("game_instance", INVALID_CHOICE);
        }

        if Square::find_by_id(db, event.square_id).await?.is_none() {
            errors.add("square_marked", INVALID_CHOICE);
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        if let Some(key) = key {
            if let Some(existing) = GameEvent::find_by_id(db, *key).await? {
                event.time_marked = changed_timestamp(event.time_marked, &existing.time_marked);
            }
        }

        return Ok(Ok(event));
    }

    async fn create(db: &PgPool, valid: NewGameEvent) -> Result<i64> {
        let event = GameEvent::create(db, &valid).await?;

        return Ok(event.game_event_id);
    }

    async fn update(db: &PgPool, key: &i64, valid: NewGameEvent) -> Result<bool> {
        let updated = GameEvent::update(db, *key, &valid).await?;

        return Ok(updated.is_some());
    }

    async fn describe(db: &PgPool, key: &i64) -> Result<Option<String>> {
        let event = GameEvent::find_with_square(db, *key).await?;

        return Ok(event.map(|event| event.to_string()));
    }

    async fn delete(db: &PgPool, key: &i64) -> Result<bool> {
        return GameEvent::delete(db, *key).await;
    }
}
