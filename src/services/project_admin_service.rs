use crate::api::IdentityApi;
use crate::config::PROJECT_ADMIN_ROLE;
use crate::error::{DashboardError, Result};
use crate::models::{Project, ProjectInput, QuotaRow, Server, SessionUser};

pub const NAME_TAKEN_MESSAGE: &str = "This name is already taken.";

/// True iff `user` holds the `Project Admin` role on `project_id`.
pub async fn is_project_admin(identity: &dyn IdentityApi, user: &SessionUser, project_id: &str) -> bool {
    match identity.roles_for_user(&user.token, &user.user_id, project_id).await {
        Ok(roles) => roles.iter().any(|r| r.name == PROJECT_ADMIN_ROLE),
        Err(e) => {
            tracing::warn!(%e, project_id, user_id = %user.user_id, "Role lookup failed");
            false
        }
    }
}

/// Projects on which `user` is a project admin, plus a message to flash
/// when the project list itself could not be read.
pub async fn admin_projects(identity: &dyn IdentityApi, user: &SessionUser) -> (Vec<Project>, Option<String>) {
    let projects = match identity.user_projects(&user.token, &user.user_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(%e, user_id = %user.user_id, "Unable to retrieve project list");
            return (Vec::new(), Some("Unable to retrieve project information.".to_string()));
        }
    };
    let mut allowed = Vec::new();
    for project in projects {
        match identity.roles_for_user(&user.token, &user.user_id, &project.id).await {
            Ok(roles) if roles.iter().any(|r| r.name == PROJECT_ADMIN_ROLE) => allowed.push(project),
            Ok(_) => {}
            Err(e) => tracing::warn!(%e, project_id = %project.id, "Skipping project with unreadable roles"),
        }
    }
    allowed.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    (allowed, None)
}

/// The panel shows when the user administers at least one project.
pub async fn panel_allowed(identity: &dyn IdentityApi, user: &SessionUser) -> bool {
    let projects = match identity.user_projects(&user.token, &user.user_id).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(%e, user_id = %user.user_id, "Unable to retrieve project list");
            return false;
        }
    };
    for project in projects {
        if is_project_admin(identity, user, &project.id).await {
            return true;
        }
    }
    false
}

/// Case-insensitive substring match on the project name.
pub fn filter_projects(projects: Vec<Project>, query: Option<&str>) -> Vec<Project> {
    let needle = match query.map(str::trim) {
        Some(q) if !q.is_empty() => q.to_lowercase(),
        _ => return projects,
    };
    projects
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

/// Save name, description and enabled flag. The project the user is logged
/// into is always kept enabled.
pub async fn update_project_info(
    identity: &dyn IdentityApi,
    user: &SessionUser,
    project_id: &str,
    mut input: ProjectInput,
) -> Result<Project> {
    if user.is_active_project(project_id) && !input.enabled {
        tracing::info!(project_id, "Refusing to disable the active project");
        input.enabled = true;
    }
    validate_name(&input.name)?;
    identity
        .project_update(&user.token, project_id, &input)
        .await
        .map_err(name_conflict)
}

/// Create a project after validating its name. A name clash becomes
/// [`NAME_TAKEN_MESSAGE`].
pub async fn create_project(identity: &dyn IdentityApi, user: &SessionUser, input: &ProjectInput) -> Result<Project> {
    validate_name(&input.name)?;
    identity
        .project_create(&user.token, input)
        .await
        .map_err(name_conflict)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineField {
    Name,
    Description,
}

impl InlineField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "name" => Some(InlineField::Name),
            "description" => Some(InlineField::Description),
            _ => None,
        }
    }
}

/// Single-cell edit from the project table. A name conflict reported by the
/// identity service becomes [`NAME_TAKEN_MESSAGE`].
pub async fn inline_update(
    identity: &dyn IdentityApi,
    user: &SessionUser,
    project_id: &str,
    field: InlineField,
    value: &str,
) -> Result<Project> {
    let current = identity.project_get(&user.token, project_id).await?;
    let mut input = ProjectInput {
        name: current.name,
        description: current.description,
        enabled: current.enabled || user.is_active_project(project_id),
        domain_id: None,
    };
    match field {
        InlineField::Name => {
            validate_name(value)?;
            input.name = value.trim().to_string();
        }
        InlineField::Description => input.description = value.to_string(),
    }
    identity
        .project_update(&user.token, project_id, &input)
        .await
        .map_err(name_conflict)
}

fn name_conflict(e: DashboardError) -> DashboardError {
    match e {
        DashboardError::Conflict(_) => DashboardError::Conflict(NAME_TAKEN_MESSAGE.to_string()),
        other => other,
    }
}

fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DashboardError::InvalidInput("Project name is required.".into()));
    }
    if name.chars().count() > 64 {
        return Err(DashboardError::InvalidInput("Project name must be at most 64 characters.".into()));
    }
    Ok(())
}

/// Quote a CSV field when it carries a separator, quote or line break.
fn csv_field(raw: &str) -> String {
    if raw.contains(|c: char| matches!(c, ',' | '"' | '\n' | '\r')) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// Usage report for one project: the limit summary followed by its instances.
pub fn usage_csv(project_name: &str, rows: &[QuotaRow], servers: &[Server]) -> String {
    let mut out = format!("Usage Report For Project:,{}\n\n", csv_field(project_name));
    out.push_str("Resource,Used,Limit,Percent\n");
    for row in rows {
        out.push_str(&format!("{},{},{},{}\n", csv_field(row.label), row.used, row.limit, row.percent));
    }
    out.push_str("\nInstance,ID,Flavor,Status\n");
    for server in servers {
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_field(&server.name),
            csv_field(&server.id),
            csv_field(&server.flavor_name),
            csv_field(&server.status)
        ));
    }
    out
}
