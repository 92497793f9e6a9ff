mod common;

use std::collections::HashMap;

use rac_dashboard::models::{ProjectInput, RoleMatrix};
use rac_dashboard::services::membership_service::member_field_name;
use rac_dashboard::services::project_admin_service::NAME_TAKEN_MESSAGE;
use rac_dashboard::services::{
    add_initial_members, admin_projects, create_project, desired_from_form, inline_update, panel_allowed,
    update_members, update_project_info, InlineField, SELF_LOCKOUT_WARNING,
};
use rac_dashboard::DashboardError;

use common::{roles, session_user, FakeIdentity, ADMIN_ROLE_ID, MEMBER_ROLE_ID, PROJECT_ADMIN_ROLE_ID};

fn matrix(pairs: &[(&str, &str)]) -> RoleMatrix {
    let mut m = RoleMatrix::new();
    for r in roles() {
        m.ensure_role(&r.id);
    }
    for (role, user) in pairs {
        m.insert(role, user);
    }
    m
}

fn identity_with_project() -> FakeIdentity {
    let identity = FakeIdentity::new();
    identity.add_project("p1", "Physics");
    identity.add_project("p2", "Chemistry");
    identity.grant("p1", "alice", ADMIN_ROLE_ID);
    identity.grant("p1", "alice", PROJECT_ADMIN_ROLE_ID);
    identity.grant("p1", "bob", MEMBER_ROLE_ID);
    identity
}

#[tokio::test]
async fn test_update_members_applies_adds_and_removes() {
    let identity = identity_with_project();
    let alice = session_user("alice", "p1");
    let desired = matrix(&[
        (ADMIN_ROLE_ID, "alice"),
        (PROJECT_ADMIN_ROLE_ID, "alice"),
        (MEMBER_ROLE_ID, "carol"),
    ]);

    let outcome = update_members(&identity, &alice, "p1", &desired, &roles()).await.unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.removed, 1);
    assert!(outcome.warnings.is_empty());
    assert!(identity.has("p1", "carol", MEMBER_ROLE_ID));
    assert!(!identity.has("p1", "bob", MEMBER_ROLE_ID));
    assert!(identity.has("p1", "alice", ADMIN_ROLE_ID));
}

#[tokio::test]
async fn test_unchanged_matrix_issues_no_writes() {
    let identity = identity_with_project();
    let alice = session_user("alice", "p1");
    let desired = matrix(&[
        (ADMIN_ROLE_ID, "alice"),
        (PROJECT_ADMIN_ROLE_ID, "alice"),
        (MEMBER_ROLE_ID, "bob"),
    ]);

    let outcome = update_members(&identity, &alice, "p1", &desired, &roles()).await.unwrap();
    assert_eq!((outcome.added, outcome.removed), (0, 0));
    assert!(identity.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_removing_own_admin_role_on_active_project_is_withheld() {
    let identity = identity_with_project();
    let alice = session_user("alice", "p1");
    // Alice drops every role of her own and bob's membership.
    let desired = matrix(&[]);

    let outcome = update_members(&identity, &alice, "p1", &desired, &roles()).await.unwrap();

    assert_eq!(outcome.warnings, vec![SELF_LOCKOUT_WARNING.to_string()]);
    assert!(identity.has("p1", "alice", ADMIN_ROLE_ID));
    assert!(identity.has("p1", "alice", PROJECT_ADMIN_ROLE_ID));
    assert!(!identity.has("p1", "bob", MEMBER_ROLE_ID));
    assert_eq!(outcome.removed, 1);
}

#[tokio::test]
async fn test_own_admin_role_can_be_removed_from_another_project() {
    let identity = identity_with_project();
    identity.grant("p2", "alice", ADMIN_ROLE_ID);
    let alice = session_user("alice", "p1");

    let outcome = update_members(&identity, &alice, "p2", &matrix(&[]), &roles()).await.unwrap();

    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.removed, 1);
    assert!(!identity.has("p2", "alice", ADMIN_ROLE_ID));
}

#[tokio::test]
async fn test_failed_write_reports_remaining_updates() {
    let identity = identity_with_project();
    *identity.write_budget.lock().unwrap() = Some(1);
    let alice = session_user("alice", "p1");
    // Two adds and one removal; only the first add succeeds.
    let desired = matrix(&[
        (ADMIN_ROLE_ID, "alice"),
        (PROJECT_ADMIN_ROLE_ID, "alice"),
        (MEMBER_ROLE_ID, "carol"),
        (ADMIN_ROLE_ID, "bob"),
    ]);

    let err = update_members(&identity, &alice, "p1", &desired, &roles()).await.unwrap_err();

    assert_eq!(err.action, "modify");
    assert_eq!(err.remaining, 2);
    assert_eq!(err.to_string(), "Failed to modify 2 project members.");
    assert_eq!(identity.writes.lock().unwrap().len(), 1);
    // Processing stops at the first failure, so bob keeps his membership.
    assert!(identity.has("p1", "bob", MEMBER_ROLE_ID));
}

#[tokio::test]
async fn test_unreadable_assignments_abort_before_writing() {
    let identity = FakeIdentity {
        fail_assignment_read: true,
        ..identity_with_project()
    };
    let alice = session_user("alice", "p1");
    let desired = matrix(&[(ADMIN_ROLE_ID, "alice"), (MEMBER_ROLE_ID, "carol")]);

    let err = update_members(&identity, &alice, "p1", &desired, &roles()).await.unwrap_err();
    assert_eq!(err.remaining, 2);
    assert!(identity.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_form_fields_drive_the_desired_matrix() {
    let mut form: HashMap<String, Vec<String>> = HashMap::new();
    form.insert(member_field_name(MEMBER_ROLE_ID), vec!["bob".into(), "carol".into(), " ".into()]);
    form.insert(member_field_name("role-unknown"), vec!["alice".into()]);

    let desired = desired_from_form(&form, &roles());
    assert_eq!(desired.grant_count(), 2);
    assert!(desired.contains(MEMBER_ROLE_ID, "carol"));
    assert_eq!(desired.role_ids().count(), roles().len());
}

#[tokio::test]
async fn test_new_project_with_initial_members() {
    let identity = identity_with_project();
    let alice = session_user("alice", "p1");
    let input = ProjectInput {
        name: "Biology".into(),
        description: "wet lab".into(),
        enabled: true,
        domain_id: None,
    };

    let project = create_project(&identity, &alice, &input).await.unwrap();
    let desired = matrix(&[(MEMBER_ROLE_ID, "alice"), (MEMBER_ROLE_ID, "bob")]);
    let outcome = add_initial_members(&identity, &alice.token, &project.id, &desired).await.unwrap();

    assert_eq!(outcome.added, 2);
    assert!(identity.has(&project.id, "bob", MEMBER_ROLE_ID));
}

#[tokio::test]
async fn test_initial_member_failure_counts_remaining() {
    let identity = identity_with_project();
    *identity.write_budget.lock().unwrap() = Some(0);
    let desired = matrix(&[(MEMBER_ROLE_ID, "alice"), (MEMBER_ROLE_ID, "bob")]);

    let err = add_initial_members(&identity, "token-alice", "p2", &desired).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to add 2 project members.");
}

#[tokio::test]
async fn test_duplicate_project_name_is_reported_as_taken() {
    let identity = identity_with_project();
    let alice = session_user("alice", "p1");
    let input = ProjectInput {
        name: "Chemistry".into(),
        ..ProjectInput::default()
    };

    match create_project(&identity, &alice, &input).await {
        Err(DashboardError::Conflict(msg)) => assert_eq!(msg, NAME_TAKEN_MESSAGE),
        other => panic!("expected conflict, got {:?}", other.map(|p| p.id)),
    }
    match inline_update(&identity, &alice, "p1", InlineField::Name, "Chemistry").await {
        Err(e) => assert_eq!(e.user_message(), NAME_TAKEN_MESSAGE),
        Ok(_) => panic!("rename should collide"),
    }
}

#[tokio::test]
async fn test_active_project_cannot_be_disabled() {
    let identity = identity_with_project();
    let alice = session_user("alice", "p1");
    let input = ProjectInput {
        name: "Physics".into(),
        description: "updated".into(),
        enabled: false,
        domain_id: None,
    };

    let saved = update_project_info(&identity, &alice, "p1", input.clone()).await.unwrap();
    assert!(saved.enabled);
    assert_eq!(saved.description, "updated");

    let other = update_project_info(&identity, &alice, "p2", ProjectInput { name: "Chemistry".into(), ..input })
        .await
        .unwrap();
    assert!(!other.enabled);
}

#[tokio::test]
async fn test_inline_description_edit_keeps_other_fields() {
    let identity = identity_with_project();
    let alice = session_user("alice", "p1");

    let saved = inline_update(&identity, &alice, "p1", InlineField::Description, "optics")
        .await
        .unwrap();
    assert_eq!(saved.name, "Physics");
    assert_eq!(saved.description, "optics");

    let blank = inline_update(&identity, &alice, "p1", InlineField::Name, "  ").await;
    assert!(matches!(blank, Err(DashboardError::InvalidInput(_))));
}

#[tokio::test]
async fn test_admin_projects_only_lists_administered_projects() {
    let identity = identity_with_project();
    identity.grant("p2", "alice", MEMBER_ROLE_ID);
    let alice = session_user("alice", "p1");
    let bob = session_user("bob", "p1");

    let (projects, flash) = admin_projects(&identity, &alice).await;
    assert!(flash.is_none());
    assert_eq!(projects.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["p1"]);

    assert!(panel_allowed(&identity, &alice).await);
    assert!(!panel_allowed(&identity, &bob).await);
}
