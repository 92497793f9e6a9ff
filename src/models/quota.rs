use std::collections::BTreeMap;

use serde::Serialize;

/// Resource name as stored in the quota tables, with the flat keys it is
/// reported under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaResource {
    pub resource: &'static str,
    pub label: &'static str,
    pub limit_key: &'static str,
    pub usage_key: &'static str,
}

pub const OBJECT_STORAGE_RESOURCE: &str = "object_mb";

pub const QUOTA_RESOURCES: &[QuotaResource] = &[
    QuotaResource { resource: "instances", label: "Instances", limit_key: "maxTotalInstances", usage_key: "totalInstancesUsed" },
    QuotaResource { resource: "cores", label: "VCPUs", limit_key: "maxTotalCores", usage_key: "totalCoresUsed" },
    QuotaResource { resource: "ram", label: "RAM (MB)", limit_key: "maxTotalRAMSize", usage_key: "totalRAMUsed" },
    QuotaResource { resource: "volumes", label: "Volumes", limit_key: "maxTotalVolumes", usage_key: "totalVolumesUsed" },
    QuotaResource { resource: "gigabytes", label: "Volume Storage (GB)", limit_key: "maxTotalVolumeGigabytes", usage_key: "totalGigabytesUsed" },
    QuotaResource { resource: "snapshots", label: "Volume Snapshots", limit_key: "maxTotalSnapshots", usage_key: "totalSnapshotsUsed" },
    QuotaResource { resource: "floating_ips", label: "Floating IPs", limit_key: "maxTotalFloatingIps", usage_key: "totalFloatingIpsUsed" },
    QuotaResource { resource: "security_groups", label: "Security Groups", limit_key: "maxSecurityGroups", usage_key: "totalSecurityGroupsUsed" },
    QuotaResource { resource: OBJECT_STORAGE_RESOURCE, label: "Object Storage (MB)", limit_key: "maxObjectStorageMB", usage_key: "totalObjectStorageMBUsed" },
];

pub fn find_resource(resource: &str) -> Option<&'static QuotaResource> {
    QUOTA_RESOURCES.iter().find(|r| r.resource == resource)
}

/// Flat mapping of limit and usage names to numbers for one project.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QuotaSummary {
    values: BTreeMap<String, i64>,
}

impl QuotaSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }

    pub fn limit(&self, resource: &str) -> Option<i64> {
        find_resource(resource).and_then(|r| self.get(r.limit_key))
    }

    pub fn usage(&self, resource: &str) -> Option<i64> {
        find_resource(resource).and_then(|r| self.get(r.usage_key))
    }

    pub fn as_map(&self) -> &BTreeMap<String, i64> {
        &self.values
    }

    /// Rows for the overview page, in catalog order.
    pub fn rows(&self) -> Vec<QuotaRow> {
        QUOTA_RESOURCES
            .iter()
            .map(|r| {
                let limit = self.get(r.limit_key).unwrap_or(0);
                let used = self.get(r.usage_key).unwrap_or(0);
                let percent = if limit > 0 {
                    ((used as f64 / limit as f64) * 100.0).round().min(100.0) as i64
                } else {
                    0
                };
                QuotaRow {
                    label: r.label,
                    used,
                    limit,
                    percent,
                }
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct QuotaRow {
    pub label: &'static str,
    pub used: i64,
    pub limit: i64,
    pub percent: i64,
}
