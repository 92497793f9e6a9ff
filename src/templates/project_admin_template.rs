use askama::Template;
use crate::models::{MemberRow, Project, QuotaRow, RoleColumn, Server, SessionUser};

#[derive(Template)]
#[template(path = "project_admin_index.html")]
pub struct ProjectAdminIndexTemplate<'a> {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub projects: &'a [Project],
    pub query: String,
}

#[derive(Template)]
#[template(path = "project_admin_detail.html")]
pub struct ProjectAdminDetailTemplate<'a> {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub project: &'a Project,
    pub is_current_project: bool,
    pub members: &'a [MemberRow],
    pub columns: &'a [RoleColumn],
}

/// Shared by project creation and the combined info + members edit.
#[derive(Template)]
#[template(path = "project_admin_form.html")]
pub struct ProjectFormTemplate<'a> {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub heading: String,
    pub action: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub lock_enabled: bool,
    pub columns: &'a [RoleColumn],
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "project_admin_usage.html")]
pub struct ProjectUsageTemplate<'a> {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub project: &'a Project,
    pub rows: &'a [QuotaRow],
    pub servers: &'a [Server],
}
