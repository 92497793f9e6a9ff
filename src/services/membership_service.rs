//! Project membership reconciliation.
//!
//! The submitted role matrix is diffed against the one the identity service
//! reports, producing one add-set and one remove-set of (role, user) grants.
//! Removals that would strip the requesting user's admin role on the project
//! they are logged into are withheld.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use thiserror::Error;

use crate::api::IdentityApi;
use crate::error::DashboardError;
use crate::models::{Role, RoleGrant, RoleMatrix, SessionUser};

pub const SELF_LOCKOUT_WARNING: &str = "You cannot revoke your administrative privileges from the project you are \
currently logged into. Please switch to another project with administrative privileges or remove the \
administrative role manually via the CLI.";

const MEMBER_FIELD_PREFIX: &str = "role_";

/// Form field carrying the members of one role.
pub fn member_field_name(role_id: &str) -> String {
    format!("{}{}", MEMBER_FIELD_PREFIX, role_id)
}

/// Desired matrix from the submitted form. Only roles that exist are read;
/// every offered role appears even when nobody is selected for it.
pub fn desired_from_form(form: &HashMap<String, Vec<String>>, roles: &[Role]) -> RoleMatrix {
    let mut matrix = RoleMatrix::new();
    for role in roles {
        matrix.ensure_role(&role.id);
        if let Some(users) = form.get(&member_field_name(&role.id)) {
            for user in users {
                let user = user.trim();
                if !user.is_empty() {
                    matrix.insert(&role.id, user);
                }
            }
        }
    }
    matrix
}

/// Who is asking, and on which project, for the self-lockout check.
#[derive(Clone, Debug)]
pub struct LockoutGuard {
    pub current_user_id: String,
    pub active_project_id: Option<String>,
    pub target_project_id: String,
    pub admin_role_ids: BTreeSet<String>,
}

impl LockoutGuard {
    pub fn for_request(user: &SessionUser, target_project_id: &str, roles: &[Role]) -> Self {
        LockoutGuard {
            current_user_id: user.user_id.clone(),
            active_project_id: user.project_id.clone(),
            target_project_id: target_project_id.to_string(),
            admin_role_ids: roles.iter().filter(|r| r.is_admin()).map(|r| r.id.clone()).collect(),
        }
    }

    /// True when `user_id` is the requester, the target is their active
    /// project, and `removals` includes an admin role.
    pub fn blocks(&self, user_id: &str, removals: &BTreeSet<String>) -> bool {
        let is_current_user = user_id == self.current_user_id;
        let is_current_project = self.active_project_id.as_deref() == Some(self.target_project_id.as_str());
        let removing_admin = removals.iter().any(|r| self.admin_role_ids.contains(r));
        is_current_user && is_current_project && removing_admin
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MembershipPlan {
    pub to_add: BTreeSet<RoleGrant>,
    pub to_remove: BTreeSet<RoleGrant>,
    /// Removals skipped by the lockout guard.
    pub withheld: BTreeSet<RoleGrant>,
    pub warnings: Vec<String>,
}

impl MembershipPlan {
    pub fn change_count(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }

    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }
}

pub fn reconcile_members(current: &RoleMatrix, desired: &RoleMatrix, guard: Option<&LockoutGuard>) -> MembershipPlan {
    let mut plan = MembershipPlan::default();

    let role_ids: BTreeSet<&str> = current.role_ids().chain(desired.role_ids()).collect();
    let mut removals: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for role_id in role_ids {
        for user in desired.users_for(role_id) {
            if !current.contains(role_id, user) {
                plan.to_add.insert(RoleGrant::new(role_id, user));
            }
        }
        for user in current.users_for(role_id) {
            if !desired.contains(role_id, user) {
                removals.entry(user.to_string()).or_default().insert(role_id.to_string());
            }
        }
    }

    for (user_id, roles) in removals {
        let blocked = guard.map(|g| g.blocks(&user_id, &roles)).unwrap_or(false);
        let grants = roles.into_iter().map(|r| RoleGrant::new(r, user_id.clone()));
        if blocked {
            tracing::warn!(user_id = %user_id, "Withholding removal of own admin role on active project");
            plan.withheld.extend(grants);
            if !plan.warnings.iter().any(|w| w == SELF_LOCKOUT_WARNING) {
                plan.warnings.push(SELF_LOCKOUT_WARNING.to_string());
            }
        } else {
            plan.to_remove.extend(grants);
        }
    }
    plan
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MembershipOutcome {
    pub added: usize,
    pub removed: usize,
    pub warnings: Vec<String>,
}

/// Membership changes stopped part way. `remaining` counts the updates
/// that were not completed.
#[derive(Debug, Error)]
#[error("Failed to {action} {remaining} project members.")]
pub struct IncompleteMembership {
    pub action: &'static str,
    pub remaining: usize,
    #[source]
    pub source: DashboardError,
}

/// Issue the plan's grants then its revocations, stopping at the first failure.
pub async fn apply_plan(
    identity: &dyn IdentityApi,
    token: &str,
    project_id: &str,
    plan: &MembershipPlan,
    action: &'static str,
) -> Result<MembershipOutcome, IncompleteMembership> {
    let total = plan.change_count();
    let mut outcome = MembershipOutcome {
        warnings: plan.warnings.clone(),
        ..MembershipOutcome::default()
    };

    for grant in &plan.to_add {
        if let Err(source) = identity
            .add_project_user_role(token, project_id, &grant.user_id, &grant.role_id)
            .await
        {
            tracing::error!(%source, project_id, user_id = %grant.user_id, role_id = %grant.role_id, "Role grant failed");
            return Err(IncompleteMembership {
                action,
                remaining: total - outcome.added,
                source,
            });
        }
        outcome.added += 1;
    }
    for grant in &plan.to_remove {
        if let Err(source) = identity
            .remove_project_user_role(token, project_id, &grant.user_id, &grant.role_id)
            .await
        {
            tracing::error!(%source, project_id, user_id = %grant.user_id, role_id = %grant.role_id, "Role revoke failed");
            return Err(IncompleteMembership {
                action,
                remaining: total - outcome.added - outcome.removed,
                source,
            });
        }
        outcome.removed += 1;
    }
    tracing::info!(project_id, added = outcome.added, removed = outcome.removed, "Project membership updated");
    Ok(outcome)
}

/// Diff the submitted matrix against the project's current assignments and
/// apply it on behalf of `user`.
pub async fn update_members(
    identity: &dyn IdentityApi,
    user: &SessionUser,
    project_id: &str,
    desired: &RoleMatrix,
    roles: &[Role],
) -> Result<MembershipOutcome, IncompleteMembership> {
    let current = match identity.project_users_roles(&user.token, project_id).await {
        Ok(map) => RoleMatrix::from_user_roles(&map),
        Err(source) => {
            return Err(IncompleteMembership {
                action: "modify",
                remaining: desired.grant_count(),
                source,
            })
        }
    };
    let guard = LockoutGuard::for_request(user, project_id, roles);
    let plan = reconcile_members(&current, desired, Some(&guard));
    apply_plan(identity, &user.token, project_id, &plan, "modify").await
}

/// Grants for a freshly created project: everything in `desired` is added.
pub async fn add_initial_members(
    identity: &dyn IdentityApi,
    token: &str,
    project_id: &str,
    desired: &RoleMatrix,
) -> Result<MembershipOutcome, IncompleteMembership> {
    let plan = reconcile_members(&RoleMatrix::new(), desired, None);
    apply_plan(identity, token, project_id, &plan, "add").await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(pairs: &[(&str, &str)]) -> RoleMatrix {
        let mut m = RoleMatrix::new();
        for (role, user) in pairs {
            m.insert(role, user);
        }
        m
    }

    fn guard(active: &str, target: &str) -> LockoutGuard {
        LockoutGuard {
            current_user_id: "me".into(),
            active_project_id: Some(active.into()),
            target_project_id: target.into(),
            admin_role_ids: BTreeSet::from(["admin-id".to_string()]),
        }
    }

    #[test]
    fn diff_adds_and_removes() {
        let current = matrix(&[("member", "a"), ("member", "b"), ("admin-id", "a")]);
        let desired = matrix(&[("member", "a"), ("member", "c"), ("admin-id", "a")]);
        let plan = reconcile_members(&current, &desired, None);
        assert_eq!(plan.to_add, BTreeSet::from([RoleGrant::new("member", "c")]));
        assert_eq!(plan.to_remove, BTreeSet::from([RoleGrant::new("member", "b")]));
        assert!(plan.withheld.is_empty());
    }

    #[test]
    fn removing_own_admin_on_active_project_is_withheld() {
        let current = matrix(&[("admin-id", "me"), ("member", "me"), ("member", "x")]);
        let desired = matrix(&[]);
        let plan = reconcile_members(&current, &desired, Some(&guard("p", "p")));
        assert!(plan.to_remove.contains(&RoleGrant::new("member", "x")));
        assert!(!plan.to_remove.iter().any(|g| g.user_id == "me"));
        assert!(plan.withheld.contains(&RoleGrant::new("admin-id", "me")));
        assert_eq!(plan.warnings, vec![SELF_LOCKOUT_WARNING.to_string()]);
    }

    #[test]
    fn removing_own_admin_elsewhere_is_allowed() {
        let current = matrix(&[("admin-id", "me")]);
        let plan = reconcile_members(&current, &RoleMatrix::new(), Some(&guard("home", "other")));
        assert_eq!(plan.to_remove, BTreeSet::from([RoleGrant::new("admin-id", "me")]));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn removing_own_non_admin_role_is_allowed() {
        let current = matrix(&[("admin-id", "me"), ("member", "me")]);
        let desired = matrix(&[("admin-id", "me")]);
        let plan = reconcile_members(&current, &desired, Some(&guard("p", "p")));
        assert_eq!(plan.to_remove, BTreeSet::from([RoleGrant::new("member", "me")]));
        assert!(plan.withheld.is_empty());
    }

    #[test]
    fn form_fields_map_to_roles() {
        let roles = vec![
            Role { id: "r1".into(), name: "member".into() },
            Role { id: "r2".into(), name: "admin".into() },
        ];
        let mut form = HashMap::new();
        form.insert("role_r1".to_string(), vec!["u1".to_string(), " ".to_string()]);
        form.insert("role_unknown".to_string(), vec!["u9".to_string()]);
        let desired = desired_from_form(&form, &roles);
        assert!(desired.contains("r1", "u1"));
        assert_eq!(desired.grant_count(), 1);
        assert_eq!(desired.role_ids().count(), 2);
    }

    #[test]
    fn incomplete_message_names_remaining_count() {
        let err = IncompleteMembership {
            action: "modify",
            remaining: 3,
            source: DashboardError::Unauthorized,
        };
        assert_eq!(err.to_string(), "Failed to modify 3 project members.");
    }
}
