use askama::Template;
use crate::models::SessionUser;

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub error: Option<String>,
}
