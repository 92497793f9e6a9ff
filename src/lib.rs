//! Dashboard customizations for a keystone/nova/swift cloud: per-project
//! quota and usage summaries, instance lease tracking, delegated project
//! administration and a proxy for usage graphs.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod templates;
pub mod utils;

pub use error::{DashboardError, Result};
pub use models::AppState;
pub use routes::build_router;
