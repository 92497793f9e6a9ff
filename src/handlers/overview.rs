use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use axum_extra::extract::cookie::CookieJar;

use crate::models::AppState;
use crate::services::QuotaAggregator;
use crate::templates::OverviewTemplate;

use super::helpers::{build_template_globals, flash, render_template, require_user, TemplateGlobals};

pub async fn overview_get(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if user.project_id.is_none() {
        flash(&state, &jar, "No active project. Switch to a project to see its quotas.");
    }
    let summary = QuotaAggregator::from_state(&state)
        .aggregate(user.active_project(), &user.token)
        .await;
    let rows = summary.rows();
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(&state, &jar);
    render_template(OverviewTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        project_name: user.project_name.clone(),
        rows: &rows,
    })
}

/// Flat limit/usage mapping for scripts and the overview charts.
pub async fn quotas_json(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let summary = QuotaAggregator::from_state(&state)
        .aggregate(user.active_project(), &user.token)
        .await;
    Json(summary).into_response()
}
