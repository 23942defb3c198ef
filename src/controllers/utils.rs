use crate::{models::User, prelude::*};

use axum::response::{IntoResponse, Redirect, Response};
use nanoid::nanoid;
use serde::Deserialize;
use tower_sessions::Session;

const SESSION_USER_ID: &str = "user_id";
const SESSION_CSRF_TOKEN: &str = "csrf_token";
const SESSION_FLASH: &str = "flash";

/// Body of a form that carries nothing but its CSRF token.
#[derive(Debug, Deserialize)]
pub struct CsrfOnly {
    #[serde(default)]
    pub csrf_token: String,
}

/// Logged-in staff user, if any. Non-staff sessions count as anonymous.
pub async fn find_staff(state: &AppState, session: &Session) -> Result<Option<User>> {
    let Some(user_id) = session.get::<i64>(SESSION_USER_ID)? else {
        return Ok(None);
    };

    let user = User::find_by_id(&state.db, user_id).await?;

    return Ok(user.filter(|user| user.is_staff));
}

pub fn login(session: &Session, user: &User) -> Result {
    session.insert(SESSION_USER_ID, user.user_id)?;

    // fresh token for the authenticated session
    session.insert(SESSION_CSRF_TOKEN, nanoid!())?;

    return Ok(());
}

pub fn logout(session: &Session) -> Result {
    session.remove::<i64>(SESSION_USER_ID)?;
    session.remove::<String>(SESSION_CSRF_TOKEN)?;

    return Ok(());
}

pub fn csrf_token(session: &Session) -> Result<String> {
    if let Some(token) = session.get::<String>(SESSION_CSRF_TOKEN)? {
        return Ok(token);
    }

    let token = nanoid!();
    session.insert(SESSION_CSRF_TOKEN, &token)?;

    return Ok(token);
}

pub fn csrf_matches(session: &Session, submitted: &str) -> Result<bool> {
    let expected = session.get::<String>(SESSION_CSRF_TOKEN)?;

    return Ok(expected.is_some_and(|expected| !submitted.is_empty() && expected == submitted));
}

pub fn set_flash(session: &Session, message: impl Into<String>) -> Result {
    session.insert(SESSION_FLASH, message.into())?;

    return Ok(());
}

pub fn take_flash(session: &Session) -> Result<String> {
    let flash = session.remove::<String>(SESSION_FLASH)?;

    return Ok(flash.unwrap_or_default());
}

/// Only same-site absolute paths are followed after login. Browsers read a
/// leading `/\` like `//`, and a `Location` header only takes visible ASCII.
pub fn safe_next(next: &str) -> &str {
    let same_site = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && next.chars().all(|c| c.is_ascii_graphic());

    if same_site {
        return next;
    }

    return "/admin";
}

pub fn login_redirect(next: &str) -> Response {
    return Redirect::to(&format!("/admin/login?next={}", safe_next(next))).into_response();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_next_rejects_offsite_targets() {
        assert_eq!(safe_next("/admin/squares"), "/admin/squares");
        assert_eq!(safe_next("https://example.com"), "/admin");
        assert_eq!(safe_next("//example.com"), "/admin");
        assert_eq!(safe_next("/\\example.com"), "/admin");
        assert_eq!(safe_next("/admin\\squares"), "/admin");
        assert_eq!(safe_next(""), "/admin");
    }

    #[test]
    fn safe_next_rejects_header_breaking_targets() {
        assert_eq!(safe_next("/admin\n"), "/admin");
        assert_eq!(safe_next("/admin\r\nSet-Cookie: x=1"), "/admin");
        assert_eq!(safe_next("/admin\t"), "/admin");
        assert_eq!(safe_next("/admin/caf\u{e9}"), "/admin");
    }

    #[test]
    fn redirects_to_rejected_targets_do_not_panic() {
        let response = Redirect::to(safe_next("/admin\n")).into_response();

        assert_eq!(response.headers()["location"], "/admin");

        let response = login_redirect("/admin/squares");

        assert_eq!(
            response.headers()["location"],
            "/admin/login?next=/admin/squares"
        );
    }
}
