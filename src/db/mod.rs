//! Relational store for leases and per-project quota data.
//!
//! Production uses [`MySqlStore`]; [`MemoryStore`] backs tests and
//! deployments without a database host.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::LeaseKey;

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait LeaseStore: Send + Sync {
    async fn fetch_lease(&self, key: &LeaseKey) -> Result<Option<NaiveDateTime>>;

    /// Insert or replace the expiration for `key`.
    async fn upsert_lease(&self, key: &LeaseKey, expires_at: NaiveDateTime) -> Result<()>;
}

#[async_trait]
pub trait QuotaTables: Send + Sync {
    /// Rows of the `quotas` table for a project, keyed by resource.
    async fn quota_overrides(&self, project_id: &str) -> Result<BTreeMap<String, i64>>;

    /// Summed `in_use` per resource from `resource_usage`.
    async fn usage_totals(&self, project_id: &str) -> Result<BTreeMap<String, i64>>;
}
