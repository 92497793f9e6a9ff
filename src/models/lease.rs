use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Display format for lease expirations, e.g. `Jan 01, 2030 12:00 PM`.
pub const LEASE_DISPLAY_FORMAT: &str = "%b %d, %Y %I:%M %p";

const ACCEPTED_FORMATS: &[&str] = &[
    LEASE_DISPLAY_FORMAT,
    "%B %d, %Y %I:%M %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Composite key of the `instance_leases` table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeaseKey {
    pub instance_id: String,
    pub project_id: String,
    pub region: String,
}

impl LeaseKey {
    pub fn new(instance_id: &str, project_id: &str, region: &str) -> Self {
        LeaseKey {
            instance_id: instance_id.to_string(),
            project_id: project_id.to_string(),
            region: region.to_string(),
        }
    }
}

/// Parse a user-supplied expiration in any of the accepted layouts.
pub fn parse_lease_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ACCEPTED_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc())
}

pub fn format_lease_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(LEASE_DISPLAY_FORMAT).to_string()
}
