#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use rac_dashboard::api::{ComputeApi, GraphiteClient, IdentityApi, ObjectStoreClient};
use rac_dashboard::config::Settings;
use rac_dashboard::db::MemoryStore;
use rac_dashboard::models::{Project, ProjectInput, Role, Server, SessionUser, User};
use rac_dashboard::{AppState, DashboardError, Result};

pub const ADMIN_ROLE_ID: &str = "role-admin";
pub const MEMBER_ROLE_ID: &str = "role-member";
pub const PROJECT_ADMIN_ROLE_ID: &str = "role-project-admin";

pub fn roles() -> Vec<Role> {
    vec![
        Role { id: ADMIN_ROLE_ID.into(), name: "admin".into() },
        Role { id: MEMBER_ROLE_ID.into(), name: "_member_".into() },
        Role { id: PROJECT_ADMIN_ROLE_ID.into(), name: "Project Admin".into() },
    ]
}

pub fn session_user(user_id: &str, project_id: &str) -> SessionUser {
    SessionUser {
        user_id: user_id.into(),
        username: format!("{}-name", user_id),
        project_id: Some(project_id.into()),
        project_name: format!("{}-name", project_id),
        roles: vec!["admin".into()],
        token: format!("token-{}", user_id),
    }
}

/// In-memory identity service. Role assignments are (project → user → role ids).
#[derive(Default)]
pub struct FakeIdentity {
    pub projects: Mutex<Vec<Project>>,
    pub assignments: Mutex<BTreeMap<String, BTreeMap<String, BTreeSet<String>>>>,
    pub users: Vec<User>,
    pub passwords: HashMap<String, (String, SessionUser)>,
    /// Successful role writes allowed before every further write fails.
    pub write_budget: Mutex<Option<usize>>,
    pub writes: Mutex<Vec<String>>,
    pub fail_assignment_read: bool,
}

impl FakeIdentity {
    pub fn new() -> Self {
        FakeIdentity {
            users: vec![
                User { id: "alice".into(), name: "alice".into() },
                User { id: "bob".into(), name: "bob".into() },
                User { id: "carol".into(), name: "carol".into() },
            ],
            ..FakeIdentity::default()
        }
    }

    pub fn add_project(&self, id: &str, name: &str) {
        self.projects.lock().unwrap().push(Project {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            enabled: true,
            domain_id: None,
        });
    }

    pub fn grant(&self, project_id: &str, user_id: &str, role_id: &str) {
        self.assignments
            .lock()
            .unwrap()
            .entry(project_id.into())
            .or_default()
            .entry(user_id.into())
            .or_default()
            .insert(role_id.into());
    }

    pub fn has(&self, project_id: &str, user_id: &str, role_id: &str) -> bool {
        self.assignments
            .lock()
            .unwrap()
            .get(project_id)
            .and_then(|m| m.get(user_id))
            .map(|r| r.contains(role_id))
            .unwrap_or(false)
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.projects.lock().unwrap().iter().find(|p| p.id == id).cloned()
    }

    fn spend_write(&self, entry: String) -> Result<()> {
        let mut budget = self.write_budget.lock().unwrap();
        if let Some(left) = budget.as_mut() {
            if *left == 0 {
                return Err(DashboardError::Status {
                    service: "identity",
                    status: 500,
                    body: "write failed".into(),
                });
            }
            *left -= 1;
        }
        self.writes.lock().unwrap().push(entry);
        Ok(())
    }
}

#[async_trait]
impl IdentityApi for FakeIdentity {
    async fn authenticate(&self, username: &str, password: &str, _project_id: Option<&str>) -> Result<SessionUser> {
        match self.passwords.get(username) {
            Some((expected, user)) if expected == password => Ok(user.clone()),
            _ => Err(DashboardError::Unauthorized),
        }
    }

    async fn rescope(&self, token: &str, project_id: &str) -> Result<SessionUser> {
        let project = self
            .project(project_id)
            .ok_or_else(|| DashboardError::NotFound(project_id.into()))?;
        let user_id = token.trim_start_matches("token-");
        let mut user = session_user(user_id, project_id);
        user.project_name = project.name;
        Ok(user)
    }

    async fn user_projects(&self, _token: &str, user_id: &str) -> Result<Vec<Project>> {
        let assignments = self.assignments.lock().unwrap();
        Ok(self
            .projects
            .lock()
            .unwrap()
            .iter()
            .filter(|p| assignments.get(&p.id).map(|m| m.contains_key(user_id)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn roles_for_user(&self, _token: &str, user_id: &str, project_id: &str) -> Result<Vec<Role>> {
        let assignments = self.assignments.lock().unwrap();
        let held = assignments.get(project_id).and_then(|m| m.get(user_id)).cloned().unwrap_or_default();
        Ok(roles().into_iter().filter(|r| held.contains(&r.id)).collect())
    }

    async fn role_list(&self, _token: &str) -> Result<Vec<Role>> {
        Ok(roles())
    }

    async fn user_list(&self, _token: &str, _domain_id: Option<&str>) -> Result<Vec<User>> {
        Ok(self.users.clone())
    }

    async fn project_users_roles(&self, _token: &str, project_id: &str) -> Result<BTreeMap<String, BTreeSet<String>>> {
        if self.fail_assignment_read {
            return Err(DashboardError::Status {
                service: "identity",
                status: 503,
                body: String::new(),
            });
        }
        Ok(self.assignments.lock().unwrap().get(project_id).cloned().unwrap_or_default())
    }

    async fn add_project_user_role(&self, _token: &str, project_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.spend_write(format!("add {} {} {}", project_id, user_id, role_id))?;
        self.grant(project_id, user_id, role_id);
        Ok(())
    }

    async fn remove_project_user_role(&self, _token: &str, project_id: &str, user_id: &str, role_id: &str) -> Result<()> {
        self.spend_write(format!("remove {} {} {}", project_id, user_id, role_id))?;
        if let Some(users) = self.assignments.lock().unwrap().get_mut(project_id) {
            if let Some(held) = users.get_mut(user_id) {
                held.remove(role_id);
                if held.is_empty() {
                    users.remove(user_id);
                }
            }
        }
        Ok(())
    }

    async fn project_get(&self, _token: &str, project_id: &str) -> Result<Project> {
        self.project(project_id)
            .ok_or_else(|| DashboardError::NotFound(format!("project {}", project_id)))
    }

    async fn project_create(&self, _token: &str, input: &ProjectInput) -> Result<Project> {
        let mut projects = self.projects.lock().unwrap();
        if projects.iter().any(|p| p.name == input.name) {
            return Err(DashboardError::Conflict("duplicate project name".into()));
        }
        let project = Project {
            id: format!("p-{}", projects.len() + 1),
            name: input.name.clone(),
            description: input.description.clone(),
            enabled: input.enabled,
            domain_id: None,
        };
        projects.push(project.clone());
        Ok(project)
    }

    async fn project_update(&self, _token: &str, project_id: &str, input: &ProjectInput) -> Result<Project> {
        let mut projects = self.projects.lock().unwrap();
        if projects.iter().any(|p| p.id != project_id && p.name == input.name) {
            return Err(DashboardError::Conflict("duplicate project name".into()));
        }
        let project = projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .ok_or_else(|| DashboardError::NotFound(format!("project {}", project_id)))?;
        project.name = input.name.clone();
        project.description = input.description.clone();
        project.enabled = input.enabled;
        Ok(project.clone())
    }
}

/// Compute service listing a fixed set of servers per project.
#[derive(Default)]
pub struct FakeCompute {
    pub servers: HashMap<String, Vec<Server>>,
}

impl FakeCompute {
    pub fn with_server(mut self, project_id: &str, id: &str, name: &str, flavor: &str) -> Self {
        self.servers.entry(project_id.into()).or_default().push(Server {
            id: id.into(),
            name: name.into(),
            status: "ACTIVE".into(),
            flavor_name: flavor.into(),
        });
        self
    }
}

#[async_trait]
impl ComputeApi for FakeCompute {
    async fn list_servers(&self, _token: &str, project_id: &str) -> Result<Vec<Server>> {
        Ok(self.servers.get(project_id).cloned().unwrap_or_default())
    }
}

pub struct TestContext {
    pub state: AppState,
    pub identity: Arc<FakeIdentity>,
    pub store: Arc<MemoryStore>,
}

pub fn build_state(
    identity: FakeIdentity,
    compute: FakeCompute,
    swift_url: Option<&str>,
    graphite_url: &str,
    settings: Settings,
) -> TestContext {
    let client = reqwest::Client::new();
    let identity = Arc::new(identity);
    let store = Arc::new(MemoryStore::new());
    let state = AppState {
        sessions: Arc::new(Mutex::new(HashMap::new())),
        flash_store: Arc::new(Mutex::new(HashMap::new())),
        identity: identity.clone(),
        compute: Arc::new(compute),
        leases: store.clone(),
        quotas: store.clone(),
        object_store: ObjectStoreClient::new(client.clone(), swift_url),
        graphite: GraphiteClient::new(client.clone(), graphite_url, Duration::from_secs(2)),
        client,
        settings: Arc::new(settings),
    };
    TestContext { state, identity, store }
}

/// Register a session and return the matching `Cookie` header value.
pub fn login(state: &AppState, user: SessionUser) -> String {
    let sid = format!("sid-{}", user.user_id);
    state.sessions.lock().unwrap().insert(sid.clone(), user);
    format!("session_id={}", sid)
}

/// Serve `app` on an ephemeral local port.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A local port with nothing listening on it.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
