use super::utils;

use crate::{
    admin::{AdminEntry, AdminRow, FieldErrors, FormField, ModelAdmin},
    models::User,
    prelude::*,
};

use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

pub fn add_model_routes<M: ModelAdmin>(router: Router<AppState>) -> Router<AppState> {
    let base = list_url::<M>();

    return router
        .route(&base, get(list::<M>))
        .route(&format!("{base}/add"), get(add_form::<M>).post(add::<M>))
        .route(
            &format!("{base}/:key/change"),
            get(change_form::<M>).post(change::<M>),
        )
        .route(
            &format!("{base}/:key/delete"),
            get(delete_form::<M>).post(delete::<M>),
        );
}

pub fn add_admin_index(router: Router<AppState>, entries: Vec<AdminEntry>) -> Router<AppState> {
    return router
        .route("/admin", get(index))
        .layer(Extension(Arc::new(entries)));
}

fn list_url<M: ModelAdmin>() -> String {
    return format!("/admin/{}", M::SLUG);
}

fn parse_key<M: ModelAdmin>(raw: &str) -> Option<M::Key> {
    return raw.parse().ok();
}

fn not_found<M: ModelAdmin>() -> Response {
    return (
        StatusCode::NOT_FOUND,
        format!("That {} doesn't exist. Perhaps it was deleted?", M::NAME),
    )
        .into_response();
}

fn csrf_failed() -> Response {
    return (StatusCode::FORBIDDEN, "CSRF verification failed").into_response();
}

/// Submitted model form plus the token guarding it.
#[derive(Debug, Deserialize)]
struct CsrfForm<F> {
    #[serde(default)]
    csrf_token: String,

    #[serde(flatten)]
    fields: F,
}

/// What every admin page shows around its content.
struct Page {
    user: User,
    csrf_token: String,
    flash: String,
}

impl Page {
    fn new(session: &Session, user: User) -> Result<Self> {
        return Ok(Self {
            user,
            csrf_token: utils::csrf_token(session)?,
            flash: utils::take_flash(session)?,
        });
    }
}

#[derive(Template)]
#[template(path = "admin/index.html")]
struct IndexTemplate {
    page: Page,
    entries: Vec<AdminEntry>,
}

async fn index(
    uri: Uri,
    session: Session,
    State(state): State<AppState>,
    Extension(entries): Extension<Arc<Vec<AdminEntry>>>,
) -> Result<Response> {
    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    return Ok(IndexTemplate {
        page: Page::new(&session, user)?,
        entries: entries.as_ref().clone(),
    }
    .into_response());
}

#[derive(Template)]
#[template(path = "admin/list.html")]
struct ListTemplate {
    page: Page,
    slug: &'static str,
    name: &'static str,
    name_plural: &'static str,
    rows: Vec<AdminRow>,
}

async fn list<M: ModelAdmin>(
    uri: Uri,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    let rows = M::rows(&state.db).await?;

    return Ok(ListTemplate {
        page: Page::new(&session, user)?,
        slug: M::SLUG,
        name: M::NAME,
        name_plural: M::NAME_PLURAL,
        rows,
    }
    .into_response());
}

#[derive(Template)]
#[template(path = "admin/form.html")]
struct FormTemplate {
    page: Page,
    slug: &'static str,
    title: String,
    /// Empty on the add page.
    key: String,
    fields: Vec<FormField>,
}

fn render_form<M: ModelAdmin>(
    status: StatusCode,
    page: Page,
    key: Option<&M::Key>,
    fields: Vec<FormField>,
) -> Response {
    let (title, key) = match key {
        Some(key) => (format!("Change {}", M::NAME), key.to_string()),
        None => (format!("Add {}", M::NAME), String::new()),
    };

    return (
        status,
        FormTemplate {
            page,
            slug: M::SLUG,
            title,
            key,
            fields,
        },
    )
        .into_response();
}

async fn add_form<M: ModelAdmin>(
    uri: Uri,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    let form = M::initial(&user);
    let fields = M::fields(&state.db, None, &form, &FieldErrors::new()).await?;

    return Ok(render_form::<M>(
        StatusCode::OK,
        Page::new(&session, user)?,
        None,
        fields,
    ));
}

async fn add<M: ModelAdmin>(
    uri: Uri,
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<CsrfForm<M::Form>>,
) -> Result<Response> {
    if !utils::csrf_matches(&session, &body.csrf_token)? {
        return Ok(csrf_failed());
    }

    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    let valid = match M::validate(&state.db, None, &user, &body.fields).await? {
        Ok(valid) => valid,
        Err(errors) => {
            tracing::debug!("Rejected new {}: {errors:?}", M::NAME);

            let fields = M::fields(&state.db, None, &body.fields, &errors).await?;

            return Ok(render_form::<M>(
                StatusCode::BAD_REQUEST,
                Page::new(&session, user)?,
                None,
                fields,
            ));
        }
    };

    let key = M::create(&state.db, valid).await?;

    tracing::info!(user = %user.username, "Added {} {key}", M::NAME);

    let label = M::describe(&state.db, &key).await?.unwrap_or_default();
    utils::set_flash(&session, format!("The {} \"{label}\" was added successfully.", M::NAME))?;

    return Ok(Redirect::to(&list_url::<M>()).into_response());
}

async fn change_form<M: ModelAdmin>(
    uri: Uri,
    Path(key): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let Some(key) = parse_key::<M>(&key) else {
        return Ok(not_found::<M>());
    };

    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    let Some(form) = M::load(&state.db, &key).await? else {
        return Ok(not_found::<M>());
    };

    let fields = M::fields(&state.db, Some(&key), &form, &FieldErrors::new()).await?;

    return Ok(render_form::<M>(
        StatusCode::OK,
        Page::new(&session, user)?,
        Some(&key),
        fields,
    ));
}

async fn change<M: ModelAdmin>(
    uri: Uri,
    Path(key): Path<String>,
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<CsrfForm<M::Form>>,
) -> Result<Response> {
    let Some(key) = parse_key::<M>(&key) else {
        return Ok(not_found::<M>());
    };

    if !utils::csrf_matches(&session, &body.csrf_token)? {
        return Ok(csrf_failed());
    }

    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    let valid = match M::validate(&state.db, Some(&key), &user, &body.fields).await? {
        Ok(valid) => valid,
        Err(errors) => {
            tracing::debug!("Rejected change to {} {key}: {errors:?}", M::NAME);

            let fields = M::fields(&state.db, Some(&key), &body.fields, &errors).await?;

            return Ok(render_form::<M>(
                StatusCode::BAD_REQUEST,
                Page::new(&session, user)?,
                Some(&key),
                fields,
            ));
        }
    };

    if !M::update(&state.db, &key, valid).await? {
        return Ok(not_found::<M>());
    }

    tracing::info!(user = %user.username, "Changed {} {key}", M::NAME);

    let label = M::describe(&state.db, &key).await?.unwrap_or_default();
    utils::set_flash(&session, format!("The {} \"{label}\" was changed successfully.", M::NAME))?;

    return Ok(Redirect::to(&list_url::<M>()).into_response());
}

#[derive(Template)]
#[template(path = "admin/delete.html")]
struct DeleteTemplate {
    page: Page,
    slug: &'static str,
    name: &'static str,
    key: String,
    label: String,
    related: Vec<String>,
}

async fn delete_form<M: ModelAdmin>(
    uri: Uri,
    Path(key): Path<String>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let Some(key) = parse_key::<M>(&key) else {
        return Ok(not_found::<M>());
    };

    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    let Some(label) = M::describe(&state.db, &key).await? else {
        return Ok(not_found::<M>());
    };

    let related = M::related(&state.db, &key).await?;

    return Ok(DeleteTemplate {
        page: Page::new(&session, user)?,
        slug: M::SLUG,
        name: M::NAME,
        key: key.to_string(),
        label,
        related,
    }
    .into_response());
}

async fn delete<M: ModelAdmin>(
    uri: Uri,
    Path(key): Path<String>,
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<utils::CsrfOnly>,
) -> Result<Response> {
    let Some(key) = parse_key::<M>(&key) else {
        return Ok(not_found::<M>());
    };

    if !utils::csrf_matches(&session, &body.csrf_token)? {
        return Ok(csrf_failed());
    }

    let Some(user) = utils::find_staff(&state, &session).await? else {
        return Ok(utils::login_redirect(uri.path()));
    };

    let label = M::describe(&state.db, &key).await?.unwrap_or_default();

    if !M::delete(&state.db, &key).await? {
        return Ok(not_found::<M>());
    }

    tracing::info!(user = %user.username, "Deleted {} {key}", M::NAME);

    utils::set_flash(&session, format!("The {} \"{label}\" was deleted successfully.", M::NAME))?;

    return Ok(Redirect::to(&list_url::<M>()).into_response());
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::admin::GameSetAdmin;

    use chrono::Utc;

    fn page() -> Page {
        Page {
            user: User {
                user_id: 1,
                username: "host".to_string(),
                password_hash: String::new(),
                is_staff: true,
                created_at: Utc::now(),
            },
            csrf_token: "tok3n".to_string(),
            flash: String::new(),
        }
    }

    #[test]
    fn keys_parse_by_model_key_type() {
        use crate::admin::{GameCardAdmin, SquareAdmin};

        assert_eq!(parse_key::<SquareAdmin>("12"), Some(12));
        assert_eq!(parse_key::<SquareAdmin>("abc"), None);
        assert!(parse_key::<GameCardAdmin>("67e55044-10b1-426f-9247-bb680e5fe0c8").is_some());
        assert!(parse_key::<GameCardAdmin>("12").is_none());
    }

    #[test]
    fn missing_records_are_not_found() {
        let response = not_found::<GameSetAdmin>();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn list_links_each_row_to_its_pages() {
        let html = ListTemplate {
            page: page(),
            slug: "game-sets",
            name: "game set",
            name_plural: "game sets",
            rows: vec![AdminRow::new(3, "Office <Bingo>")],
        }
        .render()
        .unwrap();

        assert!(html.contains(r#"href="/admin/game-sets/3/change""#));
        assert!(html.contains(r#"href="/admin/game-sets/3/delete""#));
        assert!(html.contains("Office &lt;Bingo&gt;"));
        assert!(html.contains("1 game set</p>"));
    }

    #[test]
    fn invalid_forms_keep_their_status() {
        let mut errors = FieldErrors::new();
        errors.add("name", crate::admin::REQUIRED);

        let fields = vec![
            FormField::text("name", "Name", "", 1000).with_errors(&errors),
            FormField::checkbox("ordered_columns", "Ordered columns", true),
        ];

        let response = render_form::<GameSetAdmin>(StatusCode::BAD_REQUEST, page(), None, fields);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn form_template_marks_invalid_fields() {
        let mut errors = FieldErrors::new();
        errors.add("name", crate::admin::REQUIRED);

        let html = FormTemplate {
            page: page(),
            slug: "game-sets",
            title: "Add game set".to_string(),
            key: String::new(),
            fields: vec![
                FormField::text("name", "Name", "", 1000).with_errors(&errors),
                FormField::checkbox("ordered_columns", "Ordered columns", true),
            ],
        }
        .render()
        .unwrap();

        assert!(html.contains("This field is required."));
        assert!(html.contains(r#"maxlength="1000""#));
        assert!(html.contains(" checked"));
        assert!(html.contains(r#"value="tok3n""#));
        assert!(html.contains(r#"action="/admin/game-sets/add""#));
    }

    #[test]
    fn delete_page_lists_cascades() {
        let html = DeleteTemplate {
            page: page(),
            slug: "game-sets",
            name: "game set",
            key: "3".to_string(),
            label: "Office Bingo".to_string(),
            related: vec!["24 squares".to_string()],
        }
        .render()
        .unwrap();

        assert!(html.contains("Office Bingo"));
        assert!(html.contains("24 squares"));
        assert!(html.contains(r#"action="/admin/game-sets/3/delete""#));
    }
}
