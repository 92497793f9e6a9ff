// One file per page; every page extends base.html
pub mod instances_template;
pub mod login_template;
pub mod overview_template;
pub mod project_admin_template;
pub mod usage_template;

pub use instances_template::InstancesTemplate;
pub use login_template::LoginTemplate;
pub use overview_template::OverviewTemplate;
pub use project_admin_template::{ProjectAdminDetailTemplate, ProjectAdminIndexTemplate, ProjectFormTemplate, ProjectUsageTemplate};
pub use usage_template::{UsageTemplate, UsageWarningTemplate};
