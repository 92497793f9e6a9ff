pub mod auth;
pub mod helpers;
pub mod instances;
pub mod middleware;
pub mod overview;
pub mod project_admin;
pub mod usage;
