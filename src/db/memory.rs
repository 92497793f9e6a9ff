use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use super::{LeaseStore, QuotaTables};
use crate::error::Result;
use crate::models::LeaseKey;

/// In-process store with the same upsert and summing semantics as MySQL.
#[derive(Default)]
pub struct MemoryStore {
    leases: Mutex<HashMap<LeaseKey, NaiveDateTime>>,
    quotas: Mutex<HashMap<String, BTreeMap<String, i64>>>,
    usage: Mutex<HashMap<String, BTreeMap<String, i64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_quota(&self, project_id: &str, resource: &str, quota: i64) {
        self.quotas
            .lock()
            .unwrap()
            .entry(project_id.to_string())
            .or_default()
            .insert(resource.to_string(), quota);
    }

    /// Adds a `resource_usage` row; rows for the same resource are summed.
    pub fn add_usage(&self, project_id: &str, resource: &str, in_use: i64) {
        *self
            .usage
            .lock()
            .unwrap()
            .entry(project_id.to_string())
            .or_default()
            .entry(resource.to_string())
            .or_insert(0) += in_use;
    }

    pub fn lease_count(&self) -> usize {
        self.leases.lock().unwrap().len()
    }
}

#[async_trait]
impl LeaseStore for MemoryStore {
    async fn fetch_lease(&self, key: &LeaseKey) -> Result<Option<NaiveDateTime>> {
        Ok(self.leases.lock().unwrap().get(key).copied())
    }

    async fn upsert_lease(&self, key: &LeaseKey, expires_at: NaiveDateTime) -> Result<()> {
        self.leases.lock().unwrap().insert(key.clone(), expires_at);
        Ok(())
    }
}

#[async_trait]
impl QuotaTables for MemoryStore {
    async fn quota_overrides(&self, project_id: &str) -> Result<BTreeMap<String, i64>> {
        Ok(self.quotas.lock().unwrap().get(project_id).cloned().unwrap_or_default())
    }

    async fn usage_totals(&self, project_id: &str) -> Result<BTreeMap<String, i64>> {
        Ok(self.usage.lock().unwrap().get(project_id).cloned().unwrap_or_default())
    }
}
