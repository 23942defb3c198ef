use super::utils;

use crate::{models::User, prelude::*};

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    return router
        .route("/admin/login", get(login_form).post(login))
        .route("/admin/logout", post(logout));
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    csrf_token: String,
    next: String,
    username: String,
    error: String,
}

#[derive(Deserialize)]
struct LoginParams {
    next: Option<String>,
}

async fn login_form(
    Query(params): Query<LoginParams>,
    session: Session,
    State(state): State<AppState>,
) -> Result<Response> {
    let next = params.next.unwrap_or_default();

    if utils::find_staff(&state, &session).await?.is_some() {
        return Ok(Redirect::to(utils::safe_next(&next)).into_response());
    }

    return Ok(LoginTemplate {
        csrf_token: utils::csrf_token(&session)?,
        next,
        username: String::new(),
        error: String::new(),
    }
    .into_response());
}

#[derive(Deserialize)]
struct LoginForm {
    #[serde(default)]
    csrf_token: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    next: String,
}

async fn login(
    session: Session,
    State(state): State<AppState>,
    Form(body): Form<LoginForm>,
) -> Result<Response> {
    if !utils::csrf_matches(&session, &body.csrf_token)? {
        return Ok((StatusCode::FORBIDDEN, "CSRF verification failed").into_response());
    }

    let username = body.username.trim().to_string();
    let found = User::find_by_username(&state.db, &username).await?;

    // password hashing is CPU bound
    let password = body.password;
    let user = tokio::task::spawn_blocking(move || User::check_login(found, &password)).await?;

    let Some(user) = user else {
        tracing::warn!(%username, "Failed admin login");

        return Ok((
            StatusCode::UNAUTHORIZED,
            LoginTemplate {
                csrf_token: utils::csrf_token(&session)?,
                next: body.next,
                username,
                error: "Please enter the correct username and password for a staff account."
                    .to_string(),
            },
        )
            .into_response());
    };

    utils::login(&session, &user)?;

    tracing::info!(user_id = user.user_id, "{} logged in", user.username);

    return Ok(Redirect::to(utils::safe_next(&body.next)).into_response());
}

async fn logout(session: Session, Form(body): Form<utils::CsrfOnly>) -> Result<Response> {
    if !utils::csrf_matches(&session, &body.csrf_token)? {
        return Ok((StatusCode::FORBIDDEN, "CSRF verification failed").into_response());
    }

    utils::logout(&session)?;

    return Ok(Redirect::to("/admin/login").into_response());
}
