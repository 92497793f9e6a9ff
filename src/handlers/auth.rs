use axum::{
    extract::{Form, Path, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;

use crate::error::DashboardError;
use crate::models::{AppState, SessionUser};
use crate::services::session_service::{end_session, replace_session_user, start_session};
use crate::services::SESSION_COOKIE;
use crate::templates::LoginTemplate;

use super::helpers::{build_template_globals, current_user, flash, render_template, require_user, session_id_from_jar, TemplateGlobals};

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

fn login_page(state: &AppState, jar: &CookieJar, error: Option<String>) -> axum::response::Response {
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(state, jar);
    render_template(LoginTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        error,
    })
}

pub async fn login_get(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if current_user(&state, &jar).is_some() {
        return Redirect::to("/").into_response();
    }
    login_page(&state, &jar, None)
}

/// Password login, then scope the token to the user's first project so
/// every page has an active project to work on.
async fn sign_in(state: &AppState, username: &str, password: &str) -> Result<SessionUser, DashboardError> {
    let user = state.identity.authenticate(username, password, None).await?;
    if user.project_id.is_some() {
        return Ok(user);
    }
    let projects = match state.identity.user_projects(&user.token, &user.user_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(%e, username, "Could not list projects after login");
            return Ok(user);
        }
    };
    for project in &projects {
        match state.identity.rescope(&user.token, &project.id).await {
            Ok(scoped) => return Ok(scoped),
            Err(e) => tracing::warn!(%e, project_id = %project.id, "Could not scope token to project"),
        }
    }
    Ok(user)
}

pub async fn login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let username = form.username.trim();
    match sign_in(&state, username, &form.password).await {
        Ok(user) => {
            let sid = start_session(&state, user);
            let mut cookie = Cookie::new(SESSION_COOKIE, sid);
            cookie.set_path("/");
            cookie.set_http_only(true);
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Err(DashboardError::Unauthorized) => {
            tracing::info!(username, "Rejected login");
            login_page(&state, &jar, Some("Invalid credentials".into()))
        }
        Err(e) => {
            tracing::error!(%e, "Identity service unavailable during login");
            login_page(&state, &jar, Some("Unable to reach the identity service.".into()))
        }
    }
}

pub async fn logout_post(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(sid) = session_id_from_jar(&jar) {
        end_session(&state, &sid);
    }
    let mut expired = Cookie::new(SESSION_COOKIE, "");
    expired.set_path("/");
    let cleared = jar.remove(expired);
    (cleared, Redirect::to("/login")).into_response()
}

pub async fn root_get(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if current_user(&state, &jar).is_some() {
        return Redirect::to("/overview").into_response();
    }
    Redirect::to("/login").into_response()
}

/// Rescope the session token to another project.
pub async fn switch_project(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let sid = match session_id_from_jar(&jar) {
        Some(s) => s,
        None => return Redirect::to("/login").into_response(),
    };
    match state.identity.rescope(&user.token, &project_id).await {
        Ok(scoped) => {
            let name = scoped.project_name.clone();
            replace_session_user(&state, &sid, scoped);
            tracing::info!(username = %user.username, project_id = %project_id, "Switched active project");
            flash(&state, &jar, format!("Switched to project \"{}\".", name));
        }
        Err(e) => {
            tracing::warn!(%e, project_id = %project_id, "Project switch failed");
            flash(&state, &jar, "Unable to switch to that project.");
        }
    }
    Redirect::to("/overview").into_response()
}
