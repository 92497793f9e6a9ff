use crate::db::LeaseStore;
use crate::error::Result;
use crate::models::{format_lease_timestamp, parse_lease_timestamp, AppState, InstanceRow, LeaseKey, SessionUser};

/// Formatted expiration for an instance, or `None` when there is no lease
/// or the store cannot be read.
pub async fn get_lease(store: &dyn LeaseStore, instance_id: &str, project_id: &str, region: &str) -> Option<String> {
    let key = LeaseKey::new(instance_id, project_id, region);
    match store.fetch_lease(&key).await {
        Ok(found) => found.map(|ts| format_lease_timestamp(&ts)),
        Err(e) => {
            tracing::error!(%e, instance_id, project_id, region, "Failed to read instance lease");
            None
        }
    }
}

/// Upsert an expiration. Returns whether the write happened; parse and
/// store failures are logged and swallowed.
pub async fn set_lease(store: &dyn LeaseStore, instance_id: &str, project_id: &str, region: &str, timestamp: &str) -> bool {
    let expires_at = match parse_lease_timestamp(timestamp) {
        Some(ts) => ts,
        None => {
            tracing::warn!(timestamp, "Unrecognised lease timestamp");
            return false;
        }
    };
    let key = LeaseKey::new(instance_id, project_id, region);
    match store.upsert_lease(&key, expires_at).await {
        Ok(()) => {
            tracing::info!(instance_id, project_id, region, %expires_at, "Instance lease updated");
            true
        }
        Err(e) => {
            tracing::error!(%e, instance_id, project_id, region, "Failed to write instance lease");
            false
        }
    }
}

/// Servers of the active project, with lease expirations for leased flavors.
pub async fn instance_rows(state: &AppState, user: &SessionUser) -> Result<Vec<InstanceRow>> {
    let project_id = user.active_project();
    let servers = state.compute.list_servers(&user.token, project_id).await?;
    let mut rows = Vec::with_capacity(servers.len());
    for server in servers {
        let leased = state.settings.is_leased_flavor(&server.flavor_name);
        let lease = if leased {
            get_lease(state.leases.as_ref(), &server.id, project_id, &state.settings.region).await
        } else {
            None
        };
        rows.push(InstanceRow {
            id: server.id,
            name: server.name,
            status: server.status,
            flavor_name: server.flavor_name,
            leased,
            lease,
        });
    }
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(rows)
}
