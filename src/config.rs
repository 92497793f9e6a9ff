use std::collections::BTreeSet;
use std::env;
use std::path::Path;
use std::time::Duration;

// Default configuration constants
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_KEYSTONE_URL: &str = "http://localhost:5000/v3";
pub const DEFAULT_NOVA_URL: &str = "http://localhost:8774/v2.1";
pub const DEFAULT_GRAPHITE_URL: &str = "http://localhost:8081";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_MYSQL_DATABASE: &str = "rac_information";
pub const DEFAULT_REGION: &str = "RegionOne";
pub const DEFAULT_MEMBER_ROLE: &str = "_member_";
pub const DEFAULT_GRAPHITE_TIMEOUT_SECS: u64 = 7;
pub const DEFAULT_SWIFT_USAGE_SAMPLE_OFFSET: usize = 3;

/// Role name that grants access to the project administration pages.
pub const PROJECT_ADMIN_ROLE: &str = "Project Admin";

/// Limit used for a resource when the override table has no row for it.
pub const DEFAULT_QUOTAS: &[(&str, i64)] = &[
    ("instances", 10),
    ("cores", 20),
    ("ram", 51200),
    ("volumes", 10),
    ("gigabytes", 1000),
    ("snapshots", 10),
    ("floating_ips", 10),
    ("security_groups", 10),
];

/// Object storage quota (MB) reported when the account carries no quota header.
pub const DEFAULT_OBJECT_QUOTA_MB: i64 = 1_048_576;

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        dotenvy::from_path(Path::new(path)).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

pub fn get_keystone_url() -> String {
    sanitize_base_url(&env::var("KEYSTONE_URL").unwrap_or_else(|_| DEFAULT_KEYSTONE_URL.to_string()))
}

pub fn get_nova_url() -> String {
    sanitize_base_url(&env::var("NOVA_URL").unwrap_or_else(|_| DEFAULT_NOVA_URL.to_string()))
}

/// Object storage endpoint. `None` means the service is disabled.
pub fn get_swift_url() -> Option<String> {
    let raw = env::var("SWIFT_URL").unwrap_or_default();
    if raw.trim().is_empty() {
        None
    } else {
        Some(sanitize_base_url(&raw))
    }
}

pub fn get_graphite_url() -> String {
    sanitize_base_url(&env::var("GRAPHITE_URL").unwrap_or_else(|_| DEFAULT_GRAPHITE_URL.to_string()))
}

pub fn get_graphite_timeout() -> Duration {
    let secs = env::var("GRAPHITE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_GRAPHITE_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

pub fn get_swift_usage_sample_offset() -> usize {
    env::var("RAC_SWIFT_USAGE_SAMPLE_OFFSET")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_SWIFT_USAGE_SAMPLE_OFFSET)
}

pub fn get_public_base_url() -> String {
    sanitize_base_url(&env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string()))
}

pub fn get_region() -> String {
    env::var("RAC_REGION")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REGION.to_string())
}

pub fn get_default_member_role() -> String {
    env::var("RAC_DEFAULT_MEMBER_ROLE")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_MEMBER_ROLE.to_string())
}

pub fn get_leased_flavors() -> BTreeSet<String> {
    let raw = env::var("RAC_LEASED_FLAVORS").unwrap_or_default();
    let mut set = BTreeSet::new();
    if !raw.trim().is_empty() {
        for name in raw.split(',') {
            let t = name.trim();
            if !t.is_empty() {
                set.insert(t.to_string());
            }
        }
    }
    set
}

/// MySQL connection settings. `host` is `None` when no database is configured.
#[derive(Clone, Debug, Default)]
pub struct DatabaseSettings {
    pub host: Option<String>,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub fn get_database_settings() -> DatabaseSettings {
    let host = env::var("RAC_MYSQL_HOST")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    DatabaseSettings {
        host,
        username: env::var("RAC_MYSQL_USERNAME").unwrap_or_default(),
        password: env::var("RAC_MYSQL_PASSWORD").unwrap_or_default(),
        database: env::var("RAC_MYSQL_DATABASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MYSQL_DATABASE.to_string()),
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub keystone_url: String,
    pub nova_url: String,
    pub swift_url: Option<String>,
    pub graphite_url: String,
    pub graphite_timeout: Duration,
    pub swift_usage_sample_offset: usize,
    pub public_base_url: String,
    pub region: String,
    pub default_member_role: String,
    pub leased_flavors: BTreeSet<String>,
    pub database: DatabaseSettings,
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            keystone_url: get_keystone_url(),
            nova_url: get_nova_url(),
            swift_url: get_swift_url(),
            graphite_url: get_graphite_url(),
            graphite_timeout: get_graphite_timeout(),
            swift_usage_sample_offset: get_swift_usage_sample_offset(),
            public_base_url: get_public_base_url(),
            region: get_region(),
            default_member_role: get_default_member_role(),
            leased_flavors: get_leased_flavors(),
            database: get_database_settings(),
        }
    }

    pub fn is_leased_flavor(&self, flavor_name: &str) -> bool {
        self.leased_flavors.contains(flavor_name)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            keystone_url: DEFAULT_KEYSTONE_URL.to_string(),
            nova_url: DEFAULT_NOVA_URL.to_string(),
            swift_url: None,
            graphite_url: DEFAULT_GRAPHITE_URL.to_string(),
            graphite_timeout: Duration::from_secs(DEFAULT_GRAPHITE_TIMEOUT_SECS),
            swift_usage_sample_offset: DEFAULT_SWIFT_USAGE_SAMPLE_OFFSET,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
            region: DEFAULT_REGION.to_string(),
            default_member_role: DEFAULT_MEMBER_ROLE.to_string(),
            leased_flavors: BTreeSet::new(),
            database: DatabaseSettings {
                database: DEFAULT_MYSQL_DATABASE.to_string(),
                ..DatabaseSettings::default()
            },
        }
    }
}

pub fn sanitize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_PUBLIC_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
