use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// A single role grant on a project.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RoleGrant {
    pub role_id: String,
    pub user_id: String,
}

impl RoleGrant {
    pub fn new(role_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        RoleGrant {
            role_id: role_id.into(),
            user_id: user_id.into(),
        }
    }
}

/// Role id → set of user ids, iterated in sorted order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RoleMatrix {
    roles: BTreeMap<String, BTreeSet<String>>,
}

impl RoleMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the identity service's user → roles view.
    pub fn from_user_roles(user_roles: &BTreeMap<String, BTreeSet<String>>) -> Self {
        let mut matrix = RoleMatrix::new();
        for (user_id, roles) in user_roles {
            for role_id in roles {
                matrix.insert(role_id, user_id);
            }
        }
        matrix
    }

    pub fn insert(&mut self, role_id: &str, user_id: &str) -> bool {
        self.roles
            .entry(role_id.to_string())
            .or_default()
            .insert(user_id.to_string())
    }

    /// Register a role with no members so it still shows up in iteration.
    pub fn ensure_role(&mut self, role_id: &str) {
        self.roles.entry(role_id.to_string()).or_default();
    }

    pub fn contains(&self, role_id: &str, user_id: &str) -> bool {
        self.roles
            .get(role_id)
            .map(|users| users.contains(user_id))
            .unwrap_or(false)
    }

    pub fn users_for(&self, role_id: &str) -> impl Iterator<Item = &str> {
        self.roles
            .get(role_id)
            .into_iter()
            .flat_map(|users| users.iter().map(String::as_str))
    }

    pub fn role_ids(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Every (role, user) pair, sorted by role then user.
    pub fn grants(&self) -> impl Iterator<Item = RoleGrant> + '_ {
        self.roles
            .iter()
            .flat_map(|(role, users)| users.iter().map(move |u| RoleGrant::new(role.clone(), u.clone())))
    }

    /// Roles held by one user.
    pub fn roles_of(&self, user_id: &str) -> BTreeSet<String> {
        self.roles
            .iter()
            .filter(|(_, users)| users.contains(user_id))
            .map(|(role, _)| role.clone())
            .collect()
    }

    pub fn member_ids(&self) -> BTreeSet<String> {
        self.roles.values().flatten().cloned().collect()
    }

    pub fn grant_count(&self) -> usize {
        self.roles.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.grant_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_user_roles_inverts_mapping() {
        let mut user_roles = BTreeMap::new();
        user_roles.insert("alice".to_string(), BTreeSet::from(["r1".to_string(), "r2".to_string()]));
        user_roles.insert("bob".to_string(), BTreeSet::from(["r2".to_string()]));
        let matrix = RoleMatrix::from_user_roles(&user_roles);
        assert!(matrix.contains("r1", "alice"));
        assert!(matrix.contains("r2", "bob"));
        assert!(!matrix.contains("r1", "bob"));
        assert_eq!(matrix.grant_count(), 3);
        assert_eq!(matrix.roles_of("alice").len(), 2);
    }

    #[test]
    fn grants_iterate_in_sorted_order() {
        let mut matrix = RoleMatrix::new();
        matrix.insert("r2", "zed");
        matrix.insert("r1", "bob");
        matrix.insert("r2", "amy");
        let grants: Vec<RoleGrant> = matrix.grants().collect();
        assert_eq!(
            grants,
            vec![
                RoleGrant::new("r1", "bob"),
                RoleGrant::new("r2", "amy"),
                RoleGrant::new("r2", "zed"),
            ]
        );
    }

    #[test]
    fn empty_role_is_listed_but_has_no_members() {
        let mut matrix = RoleMatrix::new();
        matrix.ensure_role("r9");
        assert_eq!(matrix.role_ids().collect::<Vec<_>>(), vec!["r9"]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.users_for("r9").count(), 0);
    }
}
