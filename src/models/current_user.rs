use serde::{Deserialize, Serialize};

/// Identity attached to a dashboard session, as returned by the token call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionUser {
    pub user_id: String,
    pub username: String,
    /// Active project. `None` for an unscoped token.
    pub project_id: Option<String>,
    #[serde(default)]
    pub project_name: String,
    /// Role names held on the active project.
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(skip_serializing)]
    pub token: String,
}

impl SessionUser {
    pub fn active_project(&self) -> &str {
        self.project_id.as_deref().unwrap_or("")
    }

    pub fn is_active_project(&self, project_id: &str) -> bool {
        self.project_id.as_deref() == Some(project_id)
    }

    /// Case-insensitive check of the role names on the active project.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(name))
    }
}
