use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::client::json_call;
use crate::error::Result;
use crate::models::Server;

#[async_trait]
pub trait ComputeApi: Send + Sync {
    /// Servers visible to the token's project.
    async fn list_servers(&self, token: &str, project_id: &str) -> Result<Vec<Server>>;
}

#[derive(Clone)]
pub struct NovaClient {
    client: reqwest::Client,
    base_url: String,
}

impl NovaClient {
    /// `base_url` may contain a `{project_id}` placeholder for deployments
    /// that still put the tenant in the compute endpoint.
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        NovaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint_for(&self, project_id: &str) -> String {
        self.base_url.replace("{project_id}", project_id)
    }
}

#[async_trait]
impl ComputeApi for NovaClient {
    async fn list_servers(&self, token: &str, project_id: &str) -> Result<Vec<Server>> {
        let url = format!("{}/servers/detail", self.endpoint_for(project_id));
        let payload = json_call(&self.client, "compute", Method::GET, &url, Some(token), None).await?;
        Ok(parse_servers(&payload))
    }
}

pub fn parse_servers(payload: &Value) -> Vec<Server> {
    let mut servers = Vec::new();
    if let Some(arr) = payload.get("servers").and_then(|v| v.as_array()) {
        for s in arr {
            let id = match s.get("id").and_then(|v| v.as_str()) {
                Some(id) => id.to_string(),
                None => continue,
            };
            let name = s.get("name").and_then(|v| v.as_str()).unwrap_or(&id).to_string();
            let status = s.get("status").and_then(|v| v.as_str()).unwrap_or("UNKNOWN").to_string();
            // microversion 2.47+ embeds the flavor; older ones only give its id
            let flavor_name = s
                .get("flavor")
                .and_then(|f| {
                    f.get("original_name")
                        .or_else(|| f.get("name"))
                        .or_else(|| f.get("id"))
                })
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            servers.push(Server { id, name, status, flavor_name });
        }
    }
    servers
}
