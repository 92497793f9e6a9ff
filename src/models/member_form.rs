use serde::Serialize;

use crate::models::{Role, RoleMatrix, User};
use crate::services::membership_service::member_field_name;

#[derive(Clone, Debug, Serialize)]
pub struct UserOption {
    pub id: String,
    pub name: String,
    pub selected: bool,
}

/// One role of the membership form: a multi-select over every user.
#[derive(Clone, Debug, Serialize)]
pub struct RoleColumn {
    pub role_id: String,
    pub role_name: String,
    pub field: String,
    pub options: Vec<UserOption>,
}

/// A project member and the role names they hold, for the detail page.
#[derive(Clone, Debug, Serialize)]
pub struct MemberRow {
    pub user_id: String,
    pub user_name: String,
    pub roles: String,
}

pub fn role_columns(roles: &[Role], users: &[User], matrix: &RoleMatrix) -> Vec<RoleColumn> {
    roles
        .iter()
        .map(|role| RoleColumn {
            role_id: role.id.clone(),
            role_name: role.name.clone(),
            field: member_field_name(&role.id),
            options: users
                .iter()
                .map(|u| UserOption {
                    id: u.id.clone(),
                    name: u.name.clone(),
                    selected: matrix.contains(&role.id, &u.id),
                })
                .collect(),
        })
        .collect()
}

/// Members of `matrix` with their role names joined. Unknown ids are shown raw.
pub fn member_rows(roles: &[Role], users: &[User], matrix: &RoleMatrix) -> Vec<MemberRow> {
    let mut rows: Vec<MemberRow> = matrix
        .member_ids()
        .into_iter()
        .map(|user_id| {
            let user_name = users
                .iter()
                .find(|u| u.id == user_id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| user_id.clone());
            let names: Vec<String> = matrix
                .roles_of(&user_id)
                .into_iter()
                .map(|rid| {
                    roles
                        .iter()
                        .find(|r| r.id == rid)
                        .map(|r| r.name.clone())
                        .unwrap_or(rid)
                })
                .collect();
            MemberRow {
                user_id,
                user_name,
                roles: names.join(", "),
            }
        })
        .collect();
    rows.sort_by(|a, b| a.user_name.to_lowercase().cmp(&b.user_name.to_lowercase()));
    rows
}
