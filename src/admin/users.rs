use super::{count_label, related_counts, AdminRow, FieldErrors, FormField, ModelAdmin};

use crate::{
    models::{GameCard, GameInstance, GameSet, Square, User, USERNAME_MAX_LENGTH},
    Result,
};

use async_trait::async_trait;
use serde::Deserialize;
use sqlx::PgPool;

const MIN_PASSWORD_LENGTH: usize = 8;

pub struct UserAdmin;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub is_staff: Option<String>,
}

pub struct ValidUser {
    username: String,
    password: Option<String>,
    is_staff: bool,
}

/// `adding` makes the password required.
fn parse_form(adding: bool, form: &UserForm, errors: &mut FieldErrors) -> Option<ValidUser> {
    let username = errors.text("username", &form.username, USERNAME_MAX_LENGTH);

    let password = match form.password.as_str() {
        "" if adding => {
            errors.add("password", super::REQUIRED);
            None
        }
        "" => None,
        password if password.chars().count() < MIN_PASSWORD_LENGTH => {
            errors.add(
                "password",
                format!("This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."),
            );
            None
        }
        password => Some(password.to_string()),
    };

    if !errors.is_empty() {
        return None;
    }

    return Some(ValidUser {
        username,
        password,
        is_staff: super::checkbox(&form.is_staff),
    });
}

/// Records that cascade with a user, listed on its delete page.
fn owned_records(game_sets: i64, squares: i64, games: i64, cards: i64) -> Vec<String> {
    let mut related = related_counts(&[
        (squares, "square", "squares"),
        (games, "game", "games"),
        (cards, "game card", "game cards"),
    ]);

    if game_sets > 0 {
        related.insert(
            0,
            format!(
                "{} and every square, game, card and event under them",
                count_label(game_sets, "game set", "game sets")
            ),
        );
    }

    return related;
}

#[async_trait]
impl ModelAdmin for UserAdmin {
    type Key = i64;
    type Form = UserForm;
    type Valid = ValidUser;

    const SLUG: &'static str = "users";
    const NAME: &'static str = "user";
    const NAME_PLURAL: &'static str = "users";

    async fn rows(db: &PgPool) -> Result<Vec<AdminRow>> {
        let users = User::list(db).await?;

        return Ok(users
            .iter()
            .map(|user| AdminRow::new(user.user_id, user))
            .collect());
    }

    fn initial(_user: &User) -> UserForm {
        return UserForm::default();
    }

    async fn load(db: &PgPool, key: &i64) -> Result<Option<UserForm>> {
        let Some(user) = User::find_by_id(db, *key).await? else {
            return Ok(None);
        };

        return Ok(Some(UserForm {
            username: user.username,
            password: String::new(),
            is_staff: user.is_staff.then(|| "on".to_string()),
        }));
    }

    async fn fields(
        _db: &PgPool,
        key: Option<&i64>,
        form: &UserForm,
        errors: &FieldErrors,
    ) -> Result<Vec<FormField>> {
        let password_help = if key.is_some() {
            "Leave blank to keep the current password."
        } else {
            ""
        };

        let fields = vec![
            FormField::text("username", "Username", &form.username, USERNAME_MAX_LENGTH),
            FormField::password("password", "Password").with_help(password_help),
            FormField::checkbox("is_staff", "Staff status", super::checkbox(&form.is_staff))
                .with_help("Designates whether the user can log into this admin site."),
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
        form: &UserForm,
    ) -> Result<std::result::Result<ValidUser, FieldErrors>> {
        let mut errors = FieldErrors::new();

        let Some(valid) = parse_form(key.is_none(), form, &mut errors) else {
            return Ok(Err(errors));
        };

        let taken = User::find_by_username(db, &valid.username).await?;

        if taken.is_some_and(|other| Some(&other.user_id) != key) {
            errors.add("username", "A user with that username already exists.");
            return Ok(Err(errors));
        }

        return Ok(Ok(valid));
    }

    async fn create(db: &PgPool, valid: ValidUser) -> Result<i64> {
        let password = valid
            .password
            .ok_or_else(|| anyhow::anyhow!("A new user needs a password"))?;

        let user = User::create(db, &valid.username, &password, valid.is_staff).await?;

        return Ok(user.user_id);
    }

    async fn update(db: &PgPool, key: &i64, valid: ValidUser) -> Result<bool> {
        let updated = User::update(
            db,
            *key,
            &valid.username,
            valid.is_staff,
            valid.password.as_deref(),
        )
        .await?;

        return Ok(updated.is_some());
    }

    async fn describe(db: &PgPool, key: &i64) -> Result<Option<String>> {
        let user = User::find_by_id(db, *key).await?;

        return Ok(user.map(|user| user.to_string()));
    }

    async fn related(db: &PgPool, key: &i64) -> Result<Vec<String>> {
        let game_sets = GameSet::count_by_author(db, *key).await?;
        let squares = Square::count_by_author(db, *key).await?;
        let games = GameInstance::count_by_admin(db, *key).await?;
        let cards = GameCard::count_by_owner(db, *key).await?;

        return Ok(owned_records(game_sets, squares, games, cards));
    }

    async fn delete(db: &PgPool, key: &i64) -> Result<bool> {
        return User::delete(db, *key).await;
    }
}
