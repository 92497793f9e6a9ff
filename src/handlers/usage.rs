use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use futures_util::TryStreamExt;
use serde::Deserialize;

use crate::models::{AppState, GraphFormat, GraphQuery, TimeWindow, INSTANCE_QUERIES, PROJECT_QUERIES};
use crate::services::{instance_query, project_query};
use crate::templates::{UsageTemplate, UsageWarningTemplate};

use super::helpers::{build_template_globals, flash, render_template, require_user, TemplateGlobals};

#[derive(Deserialize, Default)]
pub struct TabParams {
    #[serde(default)]
    pub tab: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct GraphParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
}

impl GraphParams {
    /// Window and format, both optional with `7d` / `json` defaults.
    pub fn window_and_format(&self) -> Option<(TimeWindow, GraphFormat)> {
        let window = match self.from.as_deref() {
            None | Some("") => TimeWindow::Week,
            Some(w) => TimeWindow::parse(w)?,
        };
        let format = match self.format.as_deref() {
            None | Some("") => GraphFormat::Json,
            Some(f) => GraphFormat::parse(f)?,
        };
        Some((window, format))
    }
}

fn status_text(status: StatusCode, msg: &'static str) -> Response {
    (status, msg).into_response()
}

/// Forward one render request and stream the upstream body back untouched.
async fn proxy_render(state: &AppState, query: &GraphQuery, window: TimeWindow, format: GraphFormat) -> Response {
    let url = match state.graphite.render_url(window, format, query) {
        Ok(u) => u,
        Err(e) => {
            tracing::error!(%e, "Cannot build render URL");
            return status_text(StatusCode::INTERNAL_SERVER_ERROR, "Usage data is not configured.");
        }
    };
    let resp = match state.graphite.fetch(&url).await {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%e, "Usage data request failed");
            return status_text(StatusCode::BAD_GATEWAY, "Unable to retrieve usage data.");
        }
    };
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| match format {
            GraphFormat::Json => "application/json".to_string(),
            GraphFormat::Csv => "text/csv".to_string(),
        });
    let stream = resp
        .bytes_stream()
        .inspect_err(|e| tracing::warn!(%e, "Usage data stream interrupted"));
    ([(header::CONTENT_TYPE, content_type)], Body::from_stream(stream)).into_response()
}

pub async fn usage_get(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<TabParams>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let tab = match params.tab.as_deref() {
        Some("instances") => "instances",
        _ => "project",
    };
    let instances = if tab == "instances" {
        match state.compute.list_servers(&user.token, user.active_project()).await {
            Ok(mut servers) => {
                servers.sort_by(|a, b| a.name.cmp(&b.name));
                servers
            }
            Err(e) => {
                tracing::error!(%e, "Unable to retrieve instances");
                flash(&state, &jar, "Unable to retrieve instances.");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(&state, &jar);
    render_template(UsageTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        tab: tab.to_string(),
        windows: TimeWindow::all(),
        project_queries: PROJECT_QUERIES,
        instance_queries: INSTANCE_QUERIES,
        instances: &instances,
    })
}

pub async fn project_data(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<GraphParams>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let (window, format) = match params.window_and_format() {
        Some(wf) => wf,
        None => return status_text(StatusCode::BAD_REQUEST, "Unsupported period or format."),
    };
    let key = params.query.as_deref().unwrap_or("");
    let query = match project_query(key, user.active_project()) {
        Some(q) => q,
        None => return status_text(StatusCode::NOT_FOUND, "Unknown usage query."),
    };
    tracing::debug!(key, window = window.as_str(), "Project usage query");
    proxy_render(&state, &query, window, format).await
}

pub async fn instance_data(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<GraphParams>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    let (window, format) = match params.window_and_format() {
        Some(wf) => wf,
        None => return status_text(StatusCode::BAD_REQUEST, "Unsupported period or format."),
    };
    let instance_id = params.instance.as_deref().unwrap_or("");
    let key = params.query.as_deref().unwrap_or("");
    let query = match instance_query(key, user.active_project(), instance_id) {
        Some(q) => q,
        None => return status_text(StatusCode::NOT_FOUND, "Unknown usage query."),
    };
    let servers = match state.compute.list_servers(&user.token, user.active_project()).await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(%e, "Unable to verify instance ownership");
            return status_text(StatusCode::BAD_GATEWAY, "Unable to retrieve instances.");
        }
    };
    if !servers.iter().any(|s| s.id == instance_id) {
        return status_text(StatusCode::NOT_FOUND, "Instance not found.");
    }
    tracing::debug!(key, instance_id, window = window.as_str(), "Instance usage query");
    proxy_render(&state, &query, window, format).await
}

pub async fn usage_warning(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(&state, &jar);
    render_template(UsageWarningTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    })
}
