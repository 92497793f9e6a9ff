use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::error::{DashboardError, Result};
use crate::models::{member_rows, role_columns, AppState, ProjectInput, Role, RoleColumn, RoleMatrix, SessionUser, User};
use crate::services::{
    add_initial_members, admin_projects, create_project, desired_from_form, filter_projects, inline_update, update_members,
    update_project_info, usage_csv, InlineField, QuotaAggregator,
};
use crate::templates::{ProjectAdminDetailTemplate, ProjectAdminIndexTemplate, ProjectFormTemplate, ProjectUsageTemplate};
use crate::utils::{form_value, parse_flag, parse_urlencoded_body};

use super::helpers::{
    build_template_globals, ensure_panel_access, ensure_project_admin, flash, plain_html, render_template,
    require_user, TemplateGlobals,
};

#[derive(Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct UsageParams {
    #[serde(default)]
    pub format: Option<String>,
}

/// Everything the membership form offers, sorted for display.
async fn load_roles_and_users(state: &AppState, user: &SessionUser) -> Result<(Vec<Role>, Vec<User>)> {
    let mut roles = state.identity.role_list(&user.token).await?;
    let mut users = state.identity.user_list(&user.token, None).await?;
    roles.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok((roles, users))
}

struct ProjectForm<'a> {
    heading: String,
    action: String,
    input: ProjectInput,
    lock_enabled: bool,
    columns: &'a [RoleColumn],
    error: Option<String>,
}

fn render_project_form(state: &AppState, jar: &CookieJar, form: ProjectForm<'_>) -> Response {
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(state, jar);
    render_template(ProjectFormTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        heading: form.heading,
        action: form.action,
        name: form.input.name,
        description: form.input.description,
        enabled: form.input.enabled,
        lock_enabled: form.lock_enabled,
        columns: form.columns,
        error: form.error,
    })
}

fn project_input_from_form(form: &std::collections::HashMap<String, Vec<String>>) -> ProjectInput {
    let enabled = form.get("enabled").and_then(|v| v.first()).map(String::as_str);
    ProjectInput {
        name: form_value(form, "name").trim().to_string(),
        description: form_value(form, "description").to_string(),
        enabled: parse_flag(enabled, false),
        domain_id: None,
    }
}

pub async fn index_get(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<FilterParams>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_panel_access(&state, &jar, &user).await {
        return r.into_response();
    }
    let (projects, problem) = admin_projects(state.identity.as_ref(), &user).await;
    if let Some(msg) = problem {
        flash(&state, &jar, msg);
    }
    let projects = filter_projects(projects, params.q.as_deref());
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(&state, &jar);
    render_template(ProjectAdminIndexTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        projects: &projects,
        query: params.q.unwrap_or_default(),
    })
}

pub async fn create_get(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_panel_access(&state, &jar, &user).await {
        return r.into_response();
    }
    let (roles, users) = match load_roles_and_users(&state, &user).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(%e, "Unable to retrieve roles or users");
            flash(&state, &jar, "Unable to retrieve user and role information.");
            return Redirect::to("/project_admin").into_response();
        }
    };
    // The creator starts out with the default member role.
    let mut initial = RoleMatrix::new();
    if let Some(role) = roles.iter().find(|r| r.name == state.settings.default_member_role) {
        initial.insert(&role.id, &user.user_id);
    }
    let columns = role_columns(&roles, &users, &initial);
    render_project_form(
        &state,
        &jar,
        ProjectForm {
            heading: "Create Project".into(),
            action: "/project_admin/create".into(),
            input: ProjectInput {
                enabled: true,
                ..ProjectInput::default()
            },
            lock_enabled: false,
            columns: &columns,
            error: None,
        },
    )
}

pub async fn create_post(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_panel_access(&state, &jar, &user).await {
        return r.into_response();
    }
    let form = parse_urlencoded_body(&body);
    let input = project_input_from_form(&form);
    let (roles, users) = match load_roles_and_users(&state, &user).await {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(%e, "Unable to retrieve roles or users");
            flash(&state, &jar, "Unable to retrieve user and role information.");
            return Redirect::to("/project_admin").into_response();
        }
    };
    let desired = desired_from_form(&form, &roles);

    let project = match create_project(state.identity.as_ref(), &user, &input).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(%e, name = %input.name, "Project creation failed");
            let message = match e {
                DashboardError::Conflict(m) | DashboardError::InvalidInput(m) => m,
                other => format!("Unable to create project \"{}\": {}", input.name, other.user_message()),
            };
            let columns = role_columns(&roles, &users, &desired);
            return render_project_form(
                &state,
                &jar,
                ProjectForm {
                    heading: "Create Project".into(),
                    action: "/project_admin/create".into(),
                    input,
                    lock_enabled: false,
                    columns: &columns,
                    error: Some(message),
                },
            );
        }
    };
    tracing::info!(project_id = %project.id, name = %project.name, "Project created");

    match add_initial_members(state.identity.as_ref(), &user.token, &project.id, &desired).await {
        Ok(_) => flash(&state, &jar, format!("Created new project \"{}\".", project.name)),
        Err(e) => {
            tracing::error!(source = %e.source, project_id = %project.id, "Initial membership incomplete");
            flash(&state, &jar, e.to_string());
        }
    }
    Redirect::to("/project_admin").into_response()
}

pub async fn detail_get(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_project_admin(&state, &jar, &user, &project_id).await {
        return r.into_response();
    }
    let project = match state.identity.project_get(&user.token, &project_id).await {
        Ok(p) => p,
        Err(DashboardError::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, plain_html("Project not found")).into_response()
        }
        Err(e) => {
            tracing::error!(%e, project_id = %project_id, "Unable to retrieve project");
            flash(&state, &jar, "Unable to retrieve project information.");
            return Redirect::to("/project_admin").into_response();
        }
    };
    let (roles, users) = match load_roles_and_users(&state, &user).await {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Role or user list unavailable");
            flash(&state, &jar, "Unable to retrieve user and role information.");
            (Vec::new(), Vec::new())
        }
    };
    let matrix = match state.identity.project_users_roles(&user.token, &project_id).await {
        Ok(map) => RoleMatrix::from_user_roles(&map),
        Err(e) => {
            tracing::warn!(%e, project_id = %project_id, "Unable to retrieve project members");
            flash(&state, &jar, "Unable to retrieve project members.");
            RoleMatrix::new()
        }
    };
    let members = member_rows(&roles, &users, &matrix);
    let columns = role_columns(&roles, &users, &matrix);
    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(&state, &jar);
    render_template(ProjectAdminDetailTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        project: &project,
        is_current_project: user.is_active_project(&project_id),
        members: &members,
        columns: &columns,
    })
}

pub async fn update_get(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_project_admin(&state, &jar, &user, &project_id).await {
        return r.into_response();
    }
    let project = match state.identity.project_get(&user.token, &project_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(%e, project_id = %project_id, "Unable to retrieve project");
            flash(&state, &jar, "Unable to retrieve project information.");
            return Redirect::to("/project_admin").into_response();
        }
    };
    let loaded = load_roles_and_users(&state, &user).await;
    let members = state.identity.project_users_roles(&user.token, &project_id).await;
    let ((roles, users), matrix) = match (loaded, members) {
        (Ok(ru), Ok(map)) => (ru, RoleMatrix::from_user_roles(&map)),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(%e, project_id = %project_id, "Unable to load membership form");
            flash(&state, &jar, "Unable to retrieve project members.");
            return Redirect::to("/project_admin").into_response();
        }
    };
    let columns = role_columns(&roles, &users, &matrix);
    let lock_enabled = user.is_active_project(&project_id);
    render_project_form(
        &state,
        &jar,
        ProjectForm {
            heading: format!("Edit Project: {}", project.name),
            action: format!("/project_admin/{}/update", project_id),
            input: ProjectInput {
                name: project.name,
                description: project.description,
                enabled: project.enabled,
                domain_id: None,
            },
            lock_enabled,
            columns: &columns,
            error: None,
        },
    )
}

pub async fn update_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(project_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_project_admin(&state, &jar, &user, &project_id).await {
        return r.into_response();
    }
    let form = parse_urlencoded_body(&body);
    let input = project_input_from_form(&form);

    let project = match update_project_info(state.identity.as_ref(), &user, &project_id, input).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(%e, project_id = %project_id, "Project info update failed");
            let message = match e {
                DashboardError::Conflict(m) | DashboardError::InvalidInput(m) => m,
                other => format!("Unable to modify project: {}", other.user_message()),
            };
            flash(&state, &jar, message);
            return Redirect::to(&format!("/project_admin/{}/update", project_id)).into_response();
        }
    };

    let roles = match state.identity.role_list(&user.token).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(%e, "Unable to retrieve roles");
            flash(&state, &jar, "Unable to retrieve user and role information.");
            return Redirect::to("/project_admin").into_response();
        }
    };
    let desired = desired_from_form(&form, &roles);
    match update_members(state.identity.as_ref(), &user, &project_id, &desired, &roles).await {
        Ok(outcome) => {
            for warning in outcome.warnings {
                flash(&state, &jar, warning);
            }
            flash(&state, &jar, format!("Modified project \"{}\".", project.name));
        }
        Err(e) => {
            tracing::error!(source = %e.source, project_id = %project_id, remaining = e.remaining, "Membership update incomplete");
            flash(&state, &jar, e.to_string());
        }
    }
    Redirect::to("/project_admin").into_response()
}

pub async fn inline_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(project_id): Path<String>,
    body: Bytes,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_project_admin(&state, &jar, &user, &project_id).await {
        return r.into_response();
    }
    let form = parse_urlencoded_body(&body);
    let field = match InlineField::parse(form_value(&form, "field")) {
        Some(f) => f,
        None => return (StatusCode::BAD_REQUEST, plain_html("Unknown field")).into_response(),
    };
    match inline_update(state.identity.as_ref(), &user, &project_id, field, form_value(&form, "value")).await {
        Ok(project) => flash(&state, &jar, format!("Updated project \"{}\".", project.name)),
        Err(e) => {
            tracing::warn!(%e, project_id = %project_id, "Inline project update failed");
            flash(&state, &jar, e.user_message());
        }
    }
    Redirect::to(&format!("/project_admin/{}", project_id)).into_response()
}

pub async fn usage_get(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(project_id): Path<String>,
    Query(params): Query<UsageParams>,
) -> impl IntoResponse {
    let user = match require_user(&state, &jar) {
        Ok(u) => u,
        Err(r) => return r,
    };
    if let Some(r) = ensure_project_admin(&state, &jar, &user, &project_id).await {
        return r.into_response();
    }
    let project = match state.identity.project_get(&user.token, &project_id).await {
        Ok(p) => p,
        Err(DashboardError::NotFound(_)) => {
            return (StatusCode::NOT_FOUND, plain_html("Project not found")).into_response()
        }
        Err(e) => {
            tracing::error!(%e, project_id = %project_id, "Unable to retrieve project");
            flash(&state, &jar, "Unable to retrieve project information.");
            return Redirect::to("/project_admin").into_response();
        }
    };
    let summary = QuotaAggregator::from_state(&state).aggregate(&project_id, &user.token).await;
    let rows = summary.rows();
    let servers = match state.compute.list_servers(&user.token, &project_id).await {
        Ok(mut servers) => {
            servers.sort_by(|a, b| a.name.cmp(&b.name));
            servers
        }
        Err(e) => {
            tracing::warn!(%e, project_id = %project_id, "Unable to retrieve project instances");
            flash(&state, &jar, "Unable to retrieve instances.");
            Vec::new()
        }
    };

    if params.format.as_deref() == Some("csv") {
        let disposition = format!("attachment; filename=\"{}_usage.csv\"", project.id);
        return (
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            usage_csv(&project.name, &rows, &servers),
        )
            .into_response();
    }

    let TemplateGlobals {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
    } = build_template_globals(&state, &jar);
    render_template(ProjectUsageTemplate {
        current_user,
        identity_host,
        base_url,
        flash_messages,
        has_flash_messages,
        project: &project,
        rows: &rows,
        servers: &servers,
    })
}
