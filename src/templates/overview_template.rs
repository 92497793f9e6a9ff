use askama::Template;
use crate::models::{QuotaRow, SessionUser};

#[derive(Template)]
#[template(path = "overview.html")]
pub struct OverviewTemplate<'a> {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub project_name: String,
    pub rows: &'a [QuotaRow],
}
