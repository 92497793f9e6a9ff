// Clients for the external services the dashboard sits on
pub mod client;
pub mod graphite;
pub mod keystone;
pub mod nova;
pub mod swift;

pub use client::{json_call, send, set_silent};
pub use graphite::{sample_from_end, GraphiteClient};
pub use keystone::{IdentityApi, KeystoneClient};
pub use nova::{ComputeApi, NovaClient};
pub use swift::ObjectStoreClient;
