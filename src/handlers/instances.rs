use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::models::{AppState, SessionUser};
use crate::services::{get_lease, instance_rows, set_lease};
use crate::templates::InstancesTemplate;

use super::helpers::{build_template_globals, flash, plain_html, render_template, require_user, TemplateGlobals};

/// Role allowed to edit lease expirations.
const LEASE_EDITOR_ROLE: &str = "admin";

#[derive(Deserialize)]
pub struct LeaseForm {
    pub expires: String,
}

#[derive(Serialize)]
struct LeaseView {
    instance_id: String,
    expires: Option<String>,
}

fn can_set_lease(user: &SessionUser) -> bool {
    user.has_role(LEASE_EDITOR_ROLE)
}

pub async fn instances_get(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let rows = match instance_rows(&state, &user).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(%e, project_id = user.active_project(), "Unable to retrieve instances");
            flash(&state, &jar, "Unable to retrieve instances.");
            Vec::new()
        }
    };
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(&state, &jar);
    render_template(InstancesTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        rows: &rows,
        can_set_lease: can_set_lease(&user),
    })
}

pub async fn lease_get(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(instance_id): Path<String>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let expires = get_lease(
        state.leases.as_ref(),
        &instance_id,
        user.active_project(),
        &state.settings.region,
    )
    .await;
    Json(LeaseView { instance_id, expires }).into_response()
}

pub async fn lease_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(instance_id): Path<String>,
    Form(form): Form<LeaseForm>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if !can_set_lease(&user) {
        return (StatusCode::FORBIDDEN, plain_html("You are not allowed to change instance leases.")).into_response();
    }
    let servers = match state.compute.list_servers(&user.token, user.active_project()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(%e, "Unable to retrieve instances");
            flash(&state, &jar, "Unable to retrieve instances.");
            return Redirect::to("/instances").into_response();
        }
    };
    let server = match servers.iter().find(|s| s.id == instance_id) {
        Some(s) => s,
        None => return (StatusCode::NOT_FOUND, plain_html("Instance not found")).into_response(),
    };
    if !state.settings.is_leased_flavor(&server.flavor_name) {
        flash(&state, &jar, format!("Instance \"{}\" does not use a leased flavor.", server.name));
        return Redirect::to("/instances").into_response();
    }
    let written = set_lease(
        state.leases.as_ref(),
        &instance_id,
        user.active_project(),
        &state.settings.region,
        form.expires.trim(),
    )
    .await;
    if written {
        flash(&state, &jar, format!("Lease for \"{}\" updated.", server.name));
    } else {
        flash(&state, &jar, "Unable to set the instance lease.");
    }
    Redirect::to("/instances").into_response()
}
