use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use super::{LeaseStore, QuotaTables};
use crate::config::DatabaseSettings;
use crate::error::{DashboardError, Result};
use crate::models::LeaseKey;

const DEFAULT_MYSQL_PORT: u16 = 3306;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS instance_leases (
        instance_id VARCHAR(64) NOT NULL,
        project_id VARCHAR(64) NOT NULL,
        region VARCHAR(64) NOT NULL,
        expiration_date DATETIME NOT NULL,
        UNIQUE KEY instance_project_region (instance_id, project_id, region)
    )",
    "CREATE TABLE IF NOT EXISTS quotas (
        project_id VARCHAR(64) NOT NULL,
        resource VARCHAR(64) NOT NULL,
        quota BIGINT NOT NULL,
        UNIQUE KEY project_resource (project_id, resource)
    )",
    "CREATE TABLE IF NOT EXISTS resource_usage (
        project_id VARCHAR(64) NOT NULL,
        resource VARCHAR(64) NOT NULL,
        in_use BIGINT NOT NULL DEFAULT 0
    )",
];

/// MySQL-backed store. The pool connects lazily, so a database outage only
/// surfaces as per-query errors.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn connect_lazy(settings: &DatabaseSettings) -> Result<Self> {
        let raw_host = settings
            .host
            .as_deref()
            .ok_or_else(|| DashboardError::Config("RAC_MYSQL_HOST is not set".into()))?;
        let (host, port) = split_host_port(raw_host);
        let options = MySqlConnectOptions::new()
            .host(host)
            .port(port)
            .username(&settings.username)
            .password(&settings.password)
            .database(&settings.database);
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);
        Ok(MySqlStore { pool })
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Create the lease and quota tables when they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for MySqlStore {
    async fn fetch_lease(&self, key: &LeaseKey) -> Result<Option<NaiveDateTime>> {
        let row = sqlx::query_scalar::<_, NaiveDateTime>(
            "SELECT expiration_date FROM instance_leases WHERE instance_id = ? AND project_id = ? AND region = ?",
        )
        .bind(&key.instance_id)
        .bind(&key.project_id)
        .bind(&key.region)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn upsert_lease(&self, key: &LeaseKey, expires_at: NaiveDateTime) -> Result<()> {
        sqlx::query(
            "INSERT INTO instance_leases (instance_id, project_id, region, expiration_date) VALUES (?, ?, ?, ?) \
             ON DUPLICATE KEY UPDATE expiration_date = ?",
        )
        .bind(&key.instance_id)
        .bind(&key.project_id)
        .bind(&key.region)
        .bind(expires_at)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl QuotaTables for MySqlStore {
    async fn quota_overrides(&self, project_id: &str) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT resource, CAST(quota AS SIGNED) FROM quotas WHERE project_id = ?",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn usage_totals(&self, project_id: &str) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT resource, CAST(COALESCE(SUM(in_use), 0) AS SIGNED) FROM resource_usage WHERE project_id = ? GROUP BY resource",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}

fn split_host_port(raw: &str) -> (&str, u16) {
    match raw.rsplit_once(':') {
        Some((host, port)) => match port.parse::<u16>() {
            Ok(p) => (host, p),
            Err(_) => (raw, DEFAULT_MYSQL_PORT),
        },
        None => (raw, DEFAULT_MYSQL_PORT),
    }
}
