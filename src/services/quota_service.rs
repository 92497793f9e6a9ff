use std::collections::BTreeMap;

use crate::api::graphite::sample_from_end;
use crate::api::{GraphiteClient, ObjectStoreClient};
use crate::config::{DEFAULT_OBJECT_QUOTA_MB, DEFAULT_QUOTAS};
use crate::db::QuotaTables;
use crate::models::quota::{find_resource, OBJECT_STORAGE_RESOURCE};
use crate::models::{AppState, GraphFormat, QuotaSummary, TimeWindow, QUOTA_RESOURCES};
use crate::services::usage_graph_service::object_storage_usage_query;

const BYTES_PER_MB: i64 = 1024 * 1024;

/// Best-effort merge of quota defaults, the override table, the usage table
/// and the object store into one flat summary. Each source is queried on its
/// own; a failing source degrades to its default instead of failing the page.
pub struct QuotaAggregator<'a> {
    pub tables: &'a dyn QuotaTables,
    pub object_store: &'a ObjectStoreClient,
    pub graphite: &'a GraphiteClient,
    pub sample_offset: usize,
}

impl<'a> QuotaAggregator<'a> {
    pub fn from_state(state: &'a AppState) -> Self {
        QuotaAggregator {
            tables: state.quotas.as_ref(),
            object_store: &state.object_store,
            graphite: &state.graphite,
            sample_offset: state.settings.swift_usage_sample_offset,
        }
    }

    pub async fn aggregate(&self, project_id: &str, token: &str) -> QuotaSummary {
        let overrides = match self.tables.quota_overrides(project_id).await {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(%e, project_id, "Quota override lookup failed; using defaults");
                BTreeMap::new()
            }
        };
        let usage = match self.tables.usage_totals(project_id).await {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(%e, project_id, "Usage lookup failed; reporting zero usage");
                BTreeMap::new()
            }
        };

        let mut summary = QuotaSummary::new();
        for (resource, limit) in merge_limits(&overrides) {
            if let Some(r) = find_resource(&resource) {
                summary.set(r.limit_key, limit);
                summary.set(r.usage_key, usage.get(&resource).copied().unwrap_or(0));
            }
        }

        if let Some(object) = find_resource(OBJECT_STORAGE_RESOURCE) {
            // An unscoped session has no storage account to look up.
            let (quota, used) = if project_id.is_empty() {
                tracing::debug!("No active project; skipping object storage lookups");
                (0, 0)
            } else {
                let quota = object_storage_quota_mb(self.object_store, token, project_id).await;
                let used = object_storage_usage_mb(
                    self.graphite,
                    self.object_store.is_enabled(),
                    project_id,
                    self.sample_offset,
                )
                .await;
                (quota, used)
            };
            summary.set(object.limit_key, quota);
            summary.set(object.usage_key, used);
        }
        summary
    }
}

/// Defaults overlaid with the override rows. Object storage is excluded:
/// its limit comes from the account metadata.
pub fn merge_limits(overrides: &BTreeMap<String, i64>) -> BTreeMap<String, i64> {
    let mut limits: BTreeMap<String, i64> = DEFAULT_QUOTAS
        .iter()
        .map(|(name, limit)| (name.to_string(), *limit))
        .collect();
    for (resource, quota) in overrides {
        let known = QUOTA_RESOURCES.iter().any(|r| r.resource == resource);
        if known && resource != OBJECT_STORAGE_RESOURCE {
            limits.insert(resource.clone(), *quota);
        } else {
            tracing::debug!(resource = %resource, "Ignoring override for unknown resource");
        }
    }
    limits
}

/// Account quota in MB. 0 when the service is disabled or the HEAD fails;
/// the fixed default when the account carries no quota.
pub async fn object_storage_quota_mb(store: &ObjectStoreClient, token: &str, project_id: &str) -> i64 {
    if !store.is_enabled() {
        return 0;
    }
    match store.account_quota_bytes(token, project_id).await {
        Ok(Some(bytes)) => bytes / BYTES_PER_MB,
        Ok(None) => DEFAULT_OBJECT_QUOTA_MB,
        Err(e) => {
            tracing::warn!(%e, project_id, "Object storage quota lookup failed");
            0
        }
    }
}

/// Stored bytes in MB read from the 7 day account-size series. Every
/// failure mode reports 0.
pub async fn object_storage_usage_mb(
    graphite: &GraphiteClient,
    enabled: bool,
    project_id: &str,
    sample_offset: usize,
) -> i64 {
    if !enabled {
        return 0;
    }
    let query = object_storage_usage_query(project_id);
    let url = match graphite.render_url(TimeWindow::Week, GraphFormat::Json, &query) {
        Ok(u) => u,
        Err(e) => {
            tracing::warn!(%e, "Cannot build object storage usage query");
            return 0;
        }
    };
    match graphite.fetch_json(&url).await {
        Ok(payload) => match sample_from_end(&payload, sample_offset) {
            Some(value) => {
                let usage = value as i64;
                if usage > 0 {
                    usage / BYTES_PER_MB
                } else {
                    0
                }
            }
            None => 0,
        },
        Err(e) => {
            tracing::warn!(%e, project_id, "Object storage usage query failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_used_when_no_override_row() {
        let limits = merge_limits(&BTreeMap::new());
        assert_eq!(limits.get("cores"), Some(&20));
        assert_eq!(limits.get("ram"), Some(&51200));
    }

    #[test]
    fn override_row_wins_over_default() {
        let mut overrides = BTreeMap::new();
        overrides.insert("cores".to_string(), 64);
        let limits = merge_limits(&overrides);
        assert_eq!(limits.get("cores"), Some(&64));
        assert_eq!(limits.get("instances"), Some(&10));
    }

    #[test]
    fn unknown_and_object_overrides_are_ignored() {
        let mut overrides = BTreeMap::new();
        overrides.insert("widgets".to_string(), 5);
        overrides.insert(OBJECT_STORAGE_RESOURCE.to_string(), 5);
        let limits = merge_limits(&overrides);
        assert!(!limits.contains_key("widgets"));
        assert!(!limits.contains_key(OBJECT_STORAGE_RESOURCE));
    }
}
