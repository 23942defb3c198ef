use super::{
    changed_timestamp, check_user, format_timestamp, game_set_choices, related_counts,
    user_choices, AdminRow, FieldErrors, FormField, ModelAdmin, INVALID_CHOICE,
};

use crate::{
    models::{
        GameCard, GameEvent, GameInstance, GameSet, NewGameInstance, User, DEFAULT_PLAYER_COUNT,
    },
    Result,
};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

pub struct GameInstanceAdmin;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameInstanceForm {
    #[serde(default)]
    pub game_set: String,
    #[serde(default)]
    pub admin: String,
    #[serde(default)]
    pub player_count: String,
    #[serde(default)]
    pub game_created: String,
}

pub(crate) async fn game_instance_choices(db: &PgPool) -> Result<Vec<(String, String)>> {
    let games = GameInstance::list_with_summary(db).await?;

    return Ok(games
        .iter()
        .map(|game| (game.game.game_uuid.to_string(), game.to_string()))
        .collect());
}

fn parse_form(
    user: &User,
    form: &GameInstanceForm,
    errors: &mut FieldErrors,
) -> Option<NewGameInstance> {
    let game_set_id = errors.key::<i64>("game_set", &form.game_set);
    let admin_id = errors
        .choice::<i64>("admin", &form.admin)
        .map(|admin_id| admin_id.unwrap_or(user.user_id));
    let player_count = errors.integer("player_count", &form.player_count);
    let game_created = errors.timestamp("game_created", &form.game_created);

    let (Some(game_set_id), Some(admin_id), Some(player_count), Some(game_created)) =
        (game_set_id, admin_id, player_count, game_created)
    else {
        return None;
    };

    return Some(NewGameInstance {
        game_set_id,
        admin_id,
        player_count,
        game_created,
    });
}

#[async_trait]
impl ModelAdmin for GameInstanceAdmin {
    type Key = Uuid;
    type Form = GameInstanceForm;
    type Valid = NewGameInstance;

    const SLUG: &'static str = "game-instances";
    const NAME: &'static str = "game instance";
    const NAME_PLURAL: &'static str = "game instances";

    async fn rows(db: &PgPool) -> Result<Vec<AdminRow>> {
        let games = GameInstance::list_with_summary(db).await?;

        return Ok(games
            .iter()
            .map(|game| AdminRow::new(game.game.game_uuid, game))
            .collect());
    }

    fn initial(user: &User) -> GameInstanceForm {
        return GameInstanceForm {
            admin: user.user_id.to_string(),
            player_count: DEFAULT_PLAYER_COUNT.to_string(),
            ..Default::default()
        };
    }

    async fn load(db: &PgPool, key: &Uuid) -> Result<Option<GameInstanceForm>> {
        let Some(game) = GameInstance::find_by_uuid(db, *key).await? else {
            return Ok(None);
        };

        return Ok(Some(GameInstanceForm {
            game_set: game.game_set_id.to_string(),
            admin: game.admin_id.to_string(),
            player_count: game.player_count.to_string(),
            game_created: format_timestamp(&game.game_created),
        }));
    }

    async fn fields(
        db: &PgPool,
        key: Option<&Uuid>,
        form: &GameInstanceForm,
        errors: &FieldErrors,
    ) -> Result<Vec<FormField>> {
        let mut fields = vec![];

        if let Some(key) = key {
            fields.push(FormField::readonly("game_uuid", "Game uuid", &key.to_string()));
        }

        fields.extend([
            FormField::select(
                "game_set",
                "Game set",
                &form.game_set,
                game_set_choices(db).await?,
                Some("---------"),
            ),
            FormField::select("admin", "Admin", &form.admin, user_choices(db).await?, None),
            FormField::number("player_count", "Player count", &form.player_count),
            FormField::datetime("game_created", "Game created", &form.game_created)
                .with_help("UTC. Leave blank for now."),
        ]);

        return Ok(fields
            .into_iter()
            .map(|field| field.with_errors(errors))
            .collect());
    }

    async fn validate(
        db: &PgPool,
        key: Option<&Uuid>,
        user: &User,
        form: &GameInstanceForm,
    ) -> Result<std::result::Result<NewGameInstance, FieldErrors>> {
        let mut errors = FieldErrors::new();

        let Some(mut game) = parse_form(user, form, &mut errors) else {
            return Ok(Err(errors));
        };

        if GameSet::find_by_id(db, game.game_set_id).await?.is_none() {
            errors.add("game_set", INVALID_CHOICE);
        }

        check_user(db, &mut errors, "admin", Some(game.admin_id)).await?;

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        if let Some(key) = key {
            if let Some(existing) = GameInstance::find_by_uuid(db, *key).await? {
                game.game_created = changed_timestamp(game.game_created, &existing.game_created);
            }
        }

        return Ok(Ok(game));
    }

    async fn create(db: &PgPool, valid: NewGameInstance) -> Result<Uuid> {
        let game = GameInstance::create(db, &valid).await?;

        return Ok(game.game_uuid);
    }

    async fn update(db: &PgPool, key: &Uuid, valid: NewGameInstance) -> Result<bool> {
        let updated = GameInstance::update(db, *key, &valid).await?;

        return Ok(updated.is_some());
    }

    async fn describe(db: &PgPool, key: &Uuid) -> Result<Option<String>> {
        let game = GameInstance::find_with_summary(db, *key).await?;

        return Ok(game.map(|game| game.to_string()));
    }

    async fn related(db: &PgPool, key: &Uuid) -> Result<Vec<String>> {
        let cards = GameCard::count_for_game(db, *key).await?;
        let events = GameEvent::count_for_game(db, *key).await?;

        return Ok(related_counts(&[
            (cards, "game card", "game cards"),
            (events, "game event", "game events"),
        ]));
    }

    async fn delete(db: &PgPool, key: &Uuid) -> Result<bool> {
        return GameInstance::delete(db, *key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::admin::{test_staff, REQUIRED};

    fn form(game_set: &str, player_count: &str) -> GameInstanceForm {
        GameInstanceForm {
            game_set: game_set.to_string(),
            player_count: player_count.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn add_page_starts_from_defaults() {
        let form = GameInstanceAdmin::initial(&test_staff());

        assert_eq!(form.admin, "7");
        assert_eq!(form.player_count, DEFAULT_PLAYER_COUNT.to_string());
    }

    #[test]
    fn player_count_must_be_a_whole_number() {
        let mut errors = FieldErrors::new();
        let game = parse_form(&test_staff(), &form("2", "12"), &mut errors).unwrap();

        assert_eq!(game.player_count, 12);
        assert_eq!(game.admin_id, 7);

        let mut errors = FieldErrors::new();
        assert!(parse_form(&test_staff(), &form("2", "twelve"), &mut errors).is_none());
        assert_eq!(errors.get("player_count"), Some("Enter a whole number."));

        let mut errors = FieldErrors::new();
        assert!(parse_form(&test_staff(), &form("2", "99999999999"), &mut errors).is_none());
        assert_eq!(errors.get("player_count"), Some("Enter a whole number."));
    }

    #[test]
    fn game_set_is_required() {
        let mut errors = FieldErrors::new();

        assert!(parse_form(&test_staff(), &form("", "1"), &mut errors).is_none());
        assert_eq!(errors.get("game_set"), Some(REQUIRED));
    }
}
