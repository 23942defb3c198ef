use super::{
    check_user, game_instance_choices, user_choices, AdminRow, FieldErrors, FormField, ModelAdmin,
    INVALID_CHOICE,
};

use crate::{
    models::{
        GameCard, GameInstance, NewGameCard, User, DEFAULT_PLAYER_NAME, PLAYER_NAME_MAX_LENGTH,
    },
    Result,
};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

pub struct GameCardAdmin;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameCardForm {
    #[serde(default)]
    pub game_instance: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub player_name: String,
}

fn parse_form(form: &GameCardForm, errors: &mut FieldErrors) -> Option<NewGameCard> {
    let game_uuid = errors.key::<Uuid>("game_instance", &form.game_instance);
    let owner_id = errors.choice::<i64>("owner", &form.owner);
    let player_name = errors.text("player_name", &form.player_name, PLAYER_NAME_MAX_LENGTH);

    let (Some(game_uuid), Some(owner_id)) = (game_uuid, owner_id) else {
        return None;
    };

    if !errors.is_empty() {
        return None;
    }

    return Some(NewGameCard {
        game_uuid,
        owner_id,
        player_name,
    });
}

#[async_trait]
impl ModelAdmin for GameCardAdmin {
    type Key = Uuid;
    type Form = GameCardForm;
    type Valid = NewGameCard;

    const SLUG: &'static str = "game-cards";
    const NAME: &'static str = "game card";
    const NAME_PLURAL: &'static str = "game cards";

    async fn rows(db: &PgPool) -> Result<Vec<AdminRow>> {
        let cards = GameCard::list(db).await?;

        return Ok(cards
            .iter()
            .map(|card| AdminRow::new(card.game_card_uuid, card))
            .collect());
    }

    fn initial(_user: &User) -> GameCardForm {
        return GameCardForm {
            player_name: DEFAULT_PLAYER_NAME.to_string(),
            ..Default::default()
        };
    }

    async fn load(db: &PgPool, key: &Uuid) -> Result<Option<GameCardForm>> {
        let Some(card) = GameCard::find_by_uuid(db, *key).await? else {
            return Ok(None);
        };

        return Ok(Some(GameCardForm {
            game_instance: card.game_uuid.to_string(),
            owner: card
                .owner_id
                .map(|owner_id| owner_id.to_string())
                .unwrap_or_default(),
            player_name: card.player_name,
        }));
    }

    async fn fields(
        db: &PgPool,
        key: Option<&Uuid>,
        form: &GameCardForm,
        errors: &FieldErrors,
    ) -> Result<Vec<FormField>> {
        let mut fields = vec![];

        if let Some(key) = key {
            fields.push(FormField::readonly(
                "game_card_uuid",
                "Game card uuid",
                &key.to_string(),
            ));
        }

        fields.extend([
            FormField::select(
                "game_instance",
                "Game instance",
                &form.game_instance,
                game_instance_choices(db).await?,
                Some("---------"),
            ),
            FormField::select(
                "owner",
                "Owner",
                &form.owner,
                user_choices(db).await?,
                Some("---------"),
            )
            .with_help("Leave empty for players without an account."),
            FormField::text(
                "player_name",
                "Player name",
                &form.player_name,
                PLAYER_NAME_MAX_LENGTH,
            ),
        ]);

        return Ok(fields
            .into_iter()
            .map(|field| field.with_errors(errors))
            .collect());
    }

    async fn validate(
        db: &PgPool,
        _key: Option<&Uuid>,
        _user: &User,
        form: &GameCardForm,
    ) -> Result<std::result::Result<NewGameCard, FieldErrors>> {
        let mut errors = FieldErrors::new();

        let Some(card) = parse_form(form, &mut errors) else {
            return Ok(Err(errors));
        };

        if GameInstance::find_by_uuid(db, card.game_uuid).await?.is_none() {
            errors.add("game_instance", INVALID_CHOICE);
        }

        check_user(db, &mut errors, "owner", card.owner_id).await?;

        if !errors.is_empty() {
            return Ok(Err(errors));
        }

        return Ok(Ok(card));
    }

    async fn create(db: &PgPool, valid: NewGameCard) -> Result<Uuid> {
        let card = GameCard::create(db, &valid).await?;

        return Ok(card.game_card_uuid);
    }

    async fn update(db: &PgPool, key: &Uuid, valid: NewGameCard) -> Result<bool> {
        let updated = GameCard::update(db, *key, &valid).await?;

        return Ok(updated.is_some());
    }

    async fn describe(db: &PgPool, key: &Uuid) -> Result<Option<String>> {
        let card = GameCard::find_by_uuid(db, *key).await?;

        return Ok(card.map(|card| card.to_string()));
    }

    async fn delete(db: &PgPool, key: &Uuid) -> Result<bool> {
        return GameCard::delete(db, *key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::admin::{test_staff, REQUIRED};

    const GAME: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    #[test]
    fn owner_is_optional() {
        let mut form = GameCardAdmin::initial(&test_staff());
        form.game_instance = GAME.to_string();

        let mut errors = FieldErrors::new();
        let card = parse_form(&form, &mut errors).unwrap();

        assert_eq!(card.owner_id, None);
        assert_eq!(card.player_name, DEFAULT_PLAYER_NAME);
        assert_eq!(card.game_uuid.to_string(), GAME);
    }

    #[test]
    fn game_instance_is_required() {
        let form = GameCardAdmin::initial(&test_staff());

        let mut errors = FieldErrors::new();
        assert!(parse_form(&form, &mut errors).is_none());
        assert_eq!(errors.get("game_instance"), Some(REQUIRED));
    }

    #[test]
    fn player_name_is_bounded() {
        let form = GameCardForm {
            game_instance: GAME.to_string(),
            owner: "7".to_string(),
            player_name: "p".repeat(PLAYER_NAME_MAX_LENGTH + 1),
        };

        let mut errors = FieldErrors::new();
        assert!(parse_form(&form, &mut errors).is_none());
        assert!(errors.get("player_name").is_some());
    }
}
