use askama::Template;
use crate::models::{QueryOption, Server, SessionUser, TimeWindow};

#[derive(Template)]
#[template(path = "usage.html")]
pub struct UsageTemplate<'a> {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub tab: String,
    pub windows: &'a [TimeWindow],
    pub project_queries: &'a [QueryOption],
    pub instance_queries: &'a [QueryOption],
    pub instances: &'a [Server],
}

#[derive(Template)]
#[template(path = "usage_warning.html")]
pub struct UsageWarningTemplate {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
}
