pub mod lease_service;
pub mod membership_service;
pub mod project_admin_service;
pub mod quota_service;
pub mod session_service;
pub mod usage_graph_service;

pub use lease_service::{get_lease, instance_rows, set_lease};
pub use membership_service::{
    add_initial_members, apply_plan, desired_from_form, reconcile_members, update_members, IncompleteMembership,
    LockoutGuard, MembershipOutcome, MembershipPlan, SELF_LOCKOUT_WARNING,
};
pub use project_admin_service::{
    admin_projects, create_project, filter_projects, inline_update, is_project_admin, panel_allowed, update_project_info, usage_csv, InlineField,
};
pub use quota_service::QuotaAggregator;
pub use session_service::{random_session_id, SESSION_COOKIE};
pub use usage_graph_service::{instance_query, object_storage_usage_query, project_query};
