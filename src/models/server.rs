use serde::{Deserialize, Serialize};

/// Compute instance as listed for the active project.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub id: String,
    pub name: String,
    pub status: String,
    pub flavor_name: String,
}

/// Row shown on the instances page.
#[derive(Clone, Debug, Serialize)]
pub struct InstanceRow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub flavor_name: String,
    pub leased: bool,
    pub lease: Option<String>,
}
