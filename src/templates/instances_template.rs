use askama::Template;
use crate::models::{InstanceRow, SessionUser};

#[derive(Template)]
#[template(path = "instances.html")]
pub struct InstancesTemplate<'a> {
    pub current_user: Option<SessionUser>,
    pub identity_host: String,
    pub base_url: String,
    pub flash_messages: Vec<String>,
    pub has_flash_messages: bool,
    pub rows: &'a [InstanceRow],
    pub can_set_lease: bool,
}
