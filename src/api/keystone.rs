use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use urlencoding::encode;

use super::client::{expect_success, json_call, send};
use crate::error::{DashboardError, Result};
use crate::models::{Project, ProjectInput, Role, SessionUser, User};

const SERVICE: &str = "identity";

/// Operations the dashboard needs from the identity service.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    /// Password login, optionally scoped to a project.
    async fn authenticate(&self, username: &str, password: &str, project_id: Option<&str>) -> Result<SessionUser>;

    /// Exchange a token for one scoped to `project_id`.
    async fn rescope(&self, token: &str, project_id: &str) -> Result<SessionUser>;

    async fn user_projects(&self, token: &str, user_id: &str) -> Result<Vec<Project>>;

    async fn roles_for_user(&self, token: &str, user_id: &str, project_id: &str) -> Result<Vec<Role>>;

    async fn role_list(&self, token: &str) -> Result<Vec<Role>>;

    async fn user_list(&self, token: &str, domain_id: Option<&str>) -> Result<Vec<User>>;

    /// Current assignments on a project as user id → role ids.
    async fn project_users_roles(&self, token: &str, project_id: &str) -> Result<BTreeMap<String, BTreeSet<String>>>;

    async fn add_project_user_role(&self, token: &str, project_id: &str, user_id: &str, role_id: &str) -> Result<()>;

    async fn remove_project_user_role(&self, token: &str, project_id: &str, user_id: &str, role_id: &str) -> Result<()>;

    async fn project_get(&self, token: &str, project_id: &str) -> Result<Project>;

    async fn project_create(&self, token: &str, input: &ProjectInput) -> Result<Project>;

    async fn project_update(&self, token: &str, project_id: &str, input: &ProjectInput) -> Result<Project>;
}

/// Keystone v3 client.
#[derive(Clone)]
pub struct KeystoneClient {
    client: reqwest::Client,
    base_url: String,
}

impl KeystoneClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        KeystoneClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call(&self, method: Method, path: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        json_call(&self.client, SERVICE, method, &self.url(path), Some(token), body).await
    }

    async fn issue_token(&self, body: Value) -> Result<SessionUser> {
        let resp = send(&self.client, Method::POST, &self.url("/auth/tokens"), None, Some(&body), None).await?;
        let resp = expect_success(SERVICE, resp).await?;
        let token = resp
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .ok_or(DashboardError::Unauthorized)?;
        let payload: Value = resp.json().await?;
        parse_token(&payload, token)
    }

    /// Reachability check used by `check-config`.
    pub async fn check_reachable(&self) -> Result<()> {
        let resp = send(&self.client, Method::GET, &self.base_url, None, None, None).await?;
        expect_success(SERVICE, resp).await.map(|_| ())
    }
}

#[async_trait]
impl IdentityApi for KeystoneClient {
    async fn authenticate(&self, username: &str, password: &str, project_id: Option<&str>) -> Result<SessionUser> {
        let mut body = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": username,
                            "domain": {"id": "default"},
                            "password": password
                        }
                    }
                }
            }
        });
        if let Some(p) = project_id {
            body["auth"]["scope"] = json!({"project": {"id": p}});
        }
        self.issue_token(body).await
    }

    async fn rescope(&self, token: &str, project_id: &str) -> Result<SessionUser> {
        let body = json!({
            "auth": {
                "identity": {"methods": ["token"], "token": {"id": token}},
                "scope": {"project": {"id": project_id}}
            }
        });
        self.issue_token(body).await
    }

    async fn user_projects(&self, token: &str, user_id: &str) -> Result<Vec<Project>> {
        let payload = self.call(Method::GET, &format!("/users/{}/projects", encode(user_id)), token, None).await?;
        Ok(parse_list(&payload, "projects", parse_project))
    }

    async fn roles_for_user(&self, token: &str, user_id: &str, project_id: &str) -> Result<Vec<Role>> {
        let path = format!("/projects/{}/users/{}/roles", encode(project_id), encode(user_id));
        let payload = self.call(Method::GET, &path, token, None).await?;
        Ok(parse_list(&payload, "roles", parse_role))
    }

    async fn role_list(&self, token: &str) -> Result<Vec<Role>> {
        let payload = self.call(Method::GET, "/roles", token, None).await?;
        Ok(parse_list(&payload, "roles", parse_role))
    }

    async fn user_list(&self, token: &str, domain_id: Option<&str>) -> Result<Vec<User>> {
        let path = match domain_id {
            Some(d) if !d.is_empty() => format!("/users?domain_id={}", encode(d)),
            _ => "/users".to_string(),
        };
        let payload = self.call(Method::GET, &path, token, None).await?;
        Ok(parse_list(&payload, "users", parse_user))
    }

    async fn project_users_roles(&self, token: &str, project_id: &str) -> Result<BTreeMap<String, BTreeSet<String>>> {
        let path = format!("/role_assignments?scope.project.id={}", encode(project_id));
        let payload = self.call(Method::GET, &path, token, None).await?;
        Ok(parse_role_assignments(&payload))
    }

    async fn add_project_user_role(&self, token: &str, project_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        let path = format!("/projects/{}/users/{}/roles/{}", encode(project_id), encode(user_id), encode(role_id));
        self.call(Method::PUT, &path, token, None).await.map(|_| ())
    }

    async fn remove_project_user_role(&self, token: &str, project_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        let path = format!("/projects/{}/users/{}/roles/{}", encode(project_id), encode(user_id), encode(role_id));
        self.call(Method::DELETE, &path, token, None).await.map(|_| ())
    }

    async fn project_get(&self, token: &str, project_id: &str) -> Result<Project> {
        let payload = self.call(Method::GET, &format!("/projects/{}", encode(project_id)), token, None).await?;
        payload
            .get("project")
            .and_then(parse_project)
            .ok_or_else(|| DashboardError::NotFound(format!("project {}", project_id)))
    }

    async fn project_create(&self, token: &str, input: &ProjectInput) -> Result<Project> {
        let body = json!({ "project": input });
        let payload = self.call(Method::POST, "/projects", token, Some(&body)).await?;
        payload
            .get("project")
            .and_then(parse_project)
            .ok_or_else(|| DashboardError::InvalidInput("identity service returned no project".into()))
    }

    async fn project_update(&self, token: &str, project_id: &str, input: &ProjectInput) -> Result<Project> {
        let body = json!({
            "project": {
                "name": input.name,
                "description": input.description,
                "enabled": input.enabled
            }
        });
        let payload = self.call(Method::PATCH, &format!("/projects/{}", encode(project_id)), token, Some(&body)).await?;
        payload
            .get("project")
            .and_then(parse_project)
            .ok_or_else(|| DashboardError::NotFound(format!("project {}", project_id)))
    }
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn parse_list<T>(payload: &Value, key: &str, parse: fn(&Value) -> Option<T>) -> Vec<T> {
    payload
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(parse).collect())
        .unwrap_or_default()
}

fn parse_project(v: &Value) -> Option<Project> {
    let id = str_field(v, "id")?;
    Some(Project {
        name: str_field(v, "name").unwrap_or_else(|| id.clone()),
        description: str_field(v, "description").unwrap_or_default(),
        enabled: v.get("enabled").and_then(|e| e.as_bool()).unwrap_or(true),
        domain_id: str_field(v, "domain_id"),
        id,
    })
}

fn parse_role(v: &Value) -> Option<Role> {
    let id = str_field(v, "id")?;
    Some(Role {
        name: str_field(v, "name").unwrap_or_else(|| id.clone()),
        id,
    })
}

fn parse_user(v: &Value) -> Option<User> {
    let id = str_field(v, "id")?;
    Some(User {
        name: str_field(v, "name").unwrap_or_else(|| id.clone()),
        id,
    })
}

/// Group assignments are skipped; only direct user grants count.
pub fn parse_role_assignments(payload: &Value) -> BTreeMap<String, BTreeSet<String>> {
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    if let Some(arr) = payload.get("role_assignments").and_then(|v| v.as_array()) {
        for entry in arr {
            let user = entry.get("user").and_then(|u| str_field(u, "id"));
            let role = entry.get("role").and_then(|r| str_field(r, "id"));
            if let (Some(user), Some(role)) = (user, role) {
                map.entry(user).or_default().insert(role);
            }
        }
    }
    map
}

pub fn parse_token(payload: &Value, token: String) -> Result<SessionUser> {
    let body = payload.get("token").ok_or(DashboardError::Unauthorized)?;
    let user = body.get("user").ok_or(DashboardError::Unauthorized)?;
    let user_id = str_field(user, "id").ok_or(DashboardError::Unauthorized)?;
    let project = body.get("project");
    let roles = body
        .get("roles")
        .and_then(|r| r.as_array())
        .map(|arr| arr.iter().filter_map(|r| str_field(r, "name")).collect())
        .unwrap_or_default();
    Ok(SessionUser {
        username: str_field(user, "name").unwrap_or_else(|| user_id.clone()),
        user_id,
        project_id: project.and_then(|p| str_field(p, "id")),
        project_name: project.and_then(|p| str_field(p, "name")).unwrap_or_default(),
        roles,
        token,
    })
}
