pub mod app_state;
pub mod current_user;
pub mod identity;
pub mod lease;
pub mod member_form;
pub mod quota;
pub mod role_matrix;
pub mod server;
pub mod usage_query;

pub use app_state::AppState;
pub use current_user::SessionUser;
pub use identity::{Project, ProjectInput, Role, User};
pub use lease::{LeaseKey, format_lease_timestamp, parse_lease_timestamp};
pub use member_form::{member_rows, role_columns, MemberRow, RoleColumn, UserOption};
pub use quota::{QuotaResource, QuotaRow, QuotaSummary, QUOTA_RESOURCES};
pub use role_matrix::{RoleGrant, RoleMatrix};
pub use server::{InstanceRow, Server};
pub use usage_query::{GraphFormat, GraphQuery, QueryOption, TimeWindow, INSTANCE_QUERIES, PROJECT_QUERIES};
