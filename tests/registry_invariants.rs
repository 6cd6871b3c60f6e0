//! Exercises the Registry's identity-uniqueness and cascade invariants (spec §4.2)
//! across entity kinds through the public [`RegistryState`] API, not just within a
//! single module's own unit tests.

use gatehouse::registry::actor::ActorFilter;
use gatehouse::registry::group::GroupEdit;
use gatehouse::registry::role::RoleEdit;
use gatehouse::registry::target::TargetFilter;
use gatehouse::registry::RegistryState;

#[test]
fn identity_tuples_are_case_insensitive_across_all_kinds() {
    let mut state = RegistryState::default();
    state.add_target("MainDB", "DB").unwrap();
    assert!(state.add_target("maindb", "db").is_err());

    state.add_actor("Alice", "Email").unwrap();
    assert!(state.add_actor("alice", "email").is_err());

    state.add_group("Admins", None).unwrap();
    assert!(state.add_group("admins", None).is_err());

    state.add_role("Owner", None).unwrap();
    assert!(state.add_role("owner", None).is_err());
}

#[test]
fn display_form_survives_canonicalization() {
    let mut state = RegistryState::default();
    state.add_actor("Alice", "Email").unwrap();
    let actor = state.get_actors(&ActorFilter { name: Some("alice".into()), type_: Some("EMAIL".into()) }).remove(0);
    assert_eq!(actor.name_display, "Alice");
    assert_eq!(actor.type_display, "Email");
    assert_eq!(actor.name, "alice");
}

#[test]
fn group_role_mutual_cascade_on_removal() {
    let mut state = RegistryState::default();
    state.add_group("g1", None).unwrap();
    state.add_group("g2", None).unwrap();
    state.add_role("r1", None).unwrap();
    state.modify_role("r1", RoleEdit { add_groups: vec!["g1".into(), "g2".into()], ..Default::default() }).unwrap();
    state.modify_group("g1", GroupEdit { add_roles: vec!["r1".into()], ..Default::default() }).unwrap();

    state.remove_group("g1").unwrap();
    let r1 = state.get_roles(&Default::default()).into_iter().find(|r| r.name == "r1").unwrap();
    assert!(!r1.granted_to.contains("g1"));
    assert!(r1.granted_to.contains("g2"));

    state.remove_role("r1").unwrap();
    let g2 = state.get_groups(&Default::default()).into_iter().find(|g| g.name == "g2").unwrap();
    assert!(!g2.roles.contains("r1"));
}

#[test]
fn removing_target_or_actor_never_touches_groups_or_policies() {
    let mut state = RegistryState::default();
    state.add_group("g1", None).unwrap();
    state
        .modify_group("g1", GroupEdit { add_members: vec![("alice".into(), "email".into())], ..Default::default() })
        .unwrap();
    state.add_target("maindb", "db").unwrap();
    state.remove_target("maindb", "db").unwrap();

    let g1 = state.get_groups(&Default::default()).into_iter().find(|g| g.name == "g1").unwrap();
    assert!(g1.members.contains(&("alice".to_string(), "email".to_string())));
    assert!(state.get_targets(&TargetFilter::default()).is_empty());
}
