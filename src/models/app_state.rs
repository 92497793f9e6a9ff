use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::graphite::GraphiteClient;
use crate::api::keystone::{IdentityApi, KeystoneClient};
use crate::api::nova::{ComputeApi, NovaClient};
use crate::api::swift::ObjectStoreClient;
use crate::config::Settings;
use crate::db::{LeaseStore, MemoryStore, MySqlStore, QuotaTables};
use crate::error::Result;
use crate::models::current_user::SessionUser;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<Mutex<HashMap<String, SessionUser>>>,
    pub flash_store: Arc<Mutex<HashMap<String, Vec<String>>>>,
    pub client: reqwest::Client,
    pub identity: Arc<dyn IdentityApi>,
    pub compute: Arc<dyn ComputeApi>,
    pub leases: Arc<dyn LeaseStore>,
    pub quotas: Arc<dyn QuotaTables>,
    pub object_store: ObjectStoreClient,
    pub graphite: GraphiteClient,
}

impl AppState {
    /// Wire the real service clients. Without a database host the lease and
    /// quota tables live in memory.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("racdash/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let (leases, quotas) = if settings.database.host.is_some() {
            let store = Arc::new(MySqlStore::connect_lazy(&settings.database)?);
            let leases: Arc<dyn LeaseStore> = store.clone();
            let quotas: Arc<dyn QuotaTables> = store;
            (leases, quotas)
        } else {
            tracing::warn!("RAC_MYSQL_HOST not set; leases and quotas are kept in memory");
            let store = Arc::new(MemoryStore::new());
            let leases: Arc<dyn LeaseStore> = store.clone();
            let quotas: Arc<dyn QuotaTables> = store;
            (leases, quotas)
        };
        Ok(AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            flash_store: Arc::new(Mutex::new(HashMap::new())),
            identity: Arc::new(KeystoneClient::new(client.clone(), &settings.keystone_url)),
            compute: Arc::new(NovaClient::new(client.clone(), &settings.nova_url)),
            leases,
            quotas,
            object_store: ObjectStoreClient::new(client.clone(), settings.swift_url.as_deref()),
            graphite: GraphiteClient::new(client.clone(), &settings.graphite_url, settings.graphite_timeout),
            client,
            settings: Arc::new(settings),
        })
    }

    pub fn session(&self, sid: &str) -> Option<SessionUser> {
        self.sessions.lock().unwrap().get(sid).cloned()
    }

    pub fn push_flash(&self, sid: &str, msg: impl Into<String>) {
        let mut flashes = self.flash_store.lock().unwrap();
        flashes.entry(sid.to_string()).or_default().push(msg.into());
    }
}
