use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::models::{AppState, SessionUser};
use crate::services::{is_project_admin, panel_allowed, SESSION_COOKIE};

pub fn session_id_from_jar(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn current_user(state: &AppState, jar: &CookieJar) -> Option<SessionUser> {
    let sid = session_id_from_jar(jar)?;
    state.session(&sid)
}

pub fn take_flash_messages(state: &AppState, jar: &CookieJar) -> Vec<String> {
    let sid = match session_id_from_jar(jar) {
        Some(s) => s,
        None => return vec![],
    };
    let mut fs = state.flash_store.lock().unwrap();
    fs.remove(&sid).unwrap_or_default()
}

/// Queue a message for the next rendered page of this session.
pub fn flash(state: &AppState, jar: &CookieJar, msg: impl Into<String>) {
    if let Some(sid) = session_id_from_jar(jar) {
        state.push_flash(&sid, msg);
    }
}

#[derive(Default)]
pub struct TemplateGlobals {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
}

pub fn build_template_globals(state: &AppState, jar: &CookieJar) -> TemplateGlobals {
    let current_user = current_user(state, jar);
    let flash_messages = take_flash_messages(state, jar);
    let has_flash_messages = !flash_messages.is_empty();
    TemplateGlobals {
        current_user,
        identity_host: crate::utils::hostname_from_url(&state.settings.keystone_url),
        base_url: state.settings.public_base_url.clone(),
        flash_messages,
        has_flash_messages,
    }
}

pub fn plain_html<S: AsRef<str>>(s: S) -> Response {
    Html(format!("<!DOCTYPE html><html><body><p>{}</p></body></html>", s.as_ref())).into_response()
}

pub fn render_template<T: askama::Template>(t: T) -> Response {
    match t.render() {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            tracing::error!(%e, "Template render error");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// The session behind this request, or a redirect to the login page.
pub fn require_user(state: &AppState, jar: &CookieJar) -> Result<SessionUser, Response> {
    current_user(state, jar).ok_or_else(|| Redirect::to("/login").into_response())
}

/// Users who administer no project at all are sent back to the overview.
pub async fn ensure_panel_access(state: &AppState, jar: &CookieJar, user: &SessionUser) -> Option<Redirect> {
    if panel_allowed(state.identity.as_ref(), user).await {
        return None;
    }
    flash(state, jar, "You are not a Project Admin on any project.");
    Some(Redirect::to("/overview"))
}

pub async fn ensure_project_admin(
    state: &AppState,
    jar: &CookieJar,
    user: &SessionUser,
    project_id: &str,
) -> Option<Redirect> {
    if is_project_admin(state.identity.as_ref(), user, project_id).await {
        return None;
    }
    flash(state, jar, "You are not authorized to administer that project.");
    Some(Redirect::to("/project_admin"))
}
