//! Builds an evaluation context from a raw check request (spec §4.4, component C4).
//!
//! Pure with respect to I/O: everything it needs comes out of a single
//! [`RegistryState`] snapshot, so it never suspends (spec §5: "the pure evaluation path
//! ... performs no I/O and must not suspend").

use crate::registry::{NameTypeKey, RegistryState};
use crate::value::canonical;
use fnv::FnvHasher;
use std::collections::{HashMap, HashSet};
use std::hash::Hasher;

pub const MEMBER_OF_KEY: &str = "member-of";
pub const HAS_ROLE_KEY: &str = "has-role";

/// Immutable snapshot handed to C5/C6. Owned by the single check in progress and
/// discarded afterwards (spec §3: "Ownership & lifecycle").
#[derive(Debug, Clone)]
pub struct CheckContext {
    pub actor_name: String,
    pub actor_type: String,
    pub actor_attributes: HashMap<String, HashSet<String>>,
    pub env_attributes: HashMap<String, HashSet<String>>,
    pub target_name: String,
    pub target_type: String,
    pub target_action: String,
    pub target_attributes: HashMap<String, HashSet<String>>,
    pub target_actions: HashSet<String>,
    pub bucket: i32,
}

/// Deterministic `[0, 99]` bucket derived from canonical actor identity (spec §3). Uses
/// a fixed-seed FNV hash so the result is stable across calls and across processes,
/// unlike `std`'s randomized `DefaultHasher`.
pub fn bucket_for(actor_name_canonical: &str, actor_type_canonical: &str) -> i32 {
    let mut hasher = FnvHasher::default();
    hasher.write(actor_name_canonical.as_bytes());
    hasher.write(&[0]);
    hasher.write(actor_type_canonical.as_bytes());
    (hasher.finish() % 100) as i32
}

/// Raw inputs a PEP supplies for one check (spec §6: `CheckRequest`).
#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    pub actor_name: String,
    pub actor_type: String,
    /// Attributes the PEP asserts directly on the actor (e.g. from a token claim).
    /// Takes precedence over stored attributes on key conflict (spec §9, Open
    /// Question: "PEP wins").
    pub actor_attributes: HashMap<String, HashSet<String>>,
    pub env_attributes: HashMap<String, HashSet<String>>,
    pub target_name: String,
    pub target_type: String,
    pub target_action: String,
}

/// Enriches a raw request into a [`CheckContext`] (spec §4.4, steps 1-6).
///
/// Never fails (spec §7: "Enrichment never fails"): an unregistered actor or target is
/// simply treated as empty.
pub fn enrich(state: &RegistryState, req: &CheckRequest) -> CheckContext {
    let actor_key: NameTypeKey = (canonical(&req.actor_name), canonical(&req.actor_type));

    // Step 1: merge stored actor attributes under request-supplied ones (PEP wins).
    let mut attributes = state
        .actors
        .get(&actor_key)
        .map(|a| a.attributes.clone())
        .unwrap_or_default();
    for (k, values) in &req.actor_attributes {
        attributes.insert(canonical(k), values.iter().map(|v| canonical(v)).collect());
    }

    // Steps 2-3: one-level group/role expansion (spec §4.4: "not recursively granted").
    let member_groups: HashSet<String> = state
        .actor_groups
        .get(&actor_key)
        .cloned()
        .unwrap_or_default();

    let mut roles = HashSet::new();
    for role in state.roles.values() {
        if role.granted_to.iter().any(|g| member_groups.contains(g)) {
            roles.insert(role.name.clone());
        }
    }

    attributes.insert(MEMBER_OF_KEY.to_string(), member_groups);
    attributes.insert(HAS_ROLE_KEY.to_string(), roles);

    // Step 4.
    let bucket = bucket_for(&actor_key.0, &actor_key.1);

    // Step 5: target lookup; absent target means empty attributes/actions.
    let target_key: NameTypeKey = (canonical(&req.target_name), canonical(&req.target_type));
    let (target_attributes, target_actions) = match state.targets.get(&target_key) {
        Some(t) => (t.attributes.clone(), t.actions.clone()),
        None => (HashMap::new(), HashSet::new()),
    };

    let env_attributes = req
        .env_attributes
        .iter()
        .map(|(k, values)| (canonical(k), values.iter().map(|v| canonical(v)).collect()))
        .collect();

    CheckContext {
        actor_name: actor_key.0,
        actor_type: actor_key.1,
        actor_attributes: attributes,
        env_attributes,
        target_name: target_key.0,
        target_type: target_key.1,
        target_action: canonical(&req.target_action),
        target_attributes,
        target_actions,
        bucket,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::group::GroupEdit;
    use crate::registry::role::RoleEdit;

    #[test]
    fn bucket_is_stable_and_in_range() {
        let b1 = bucket_for("alice", "email");
        let b2 = bucket_for("alice", "email");
        assert_eq!(b1, b2);
        assert!((0..100).contains(&b1));
    }

    #[test]
    fn bucket_depends_on_both_name_and_type() {
        assert_ne!(bucket_for("alice", "email"), bucket_for("alice", "phone"));
    }

    #[test]
    fn unregistered_actor_and_target_enrich_to_empty() {
        let state = RegistryState::default();
        let ctx = enrich(
            &state,
            &CheckRequest {
                actor_name: "bob".into(),
                actor_type: "email".into(),
                target_name: "maindb".into(),
                target_type: "db".into(),
                target_action: "read".into(),
                ..Default::default()
            },
        );
        assert!(ctx.target_attributes.is_empty());
        assert!(ctx.target_actions.is_empty());
        assert!(ctx.actor_attributes.get(MEMBER_OF_KEY).unwrap().is_empty());
        assert!(ctx.actor_attributes.get(HAS_ROLE_KEY).unwrap().is_empty());
    }

    #[test]
    fn pep_supplied_attribute_wins_over_stored() {
        let mut state = RegistryState::default();
        state.add_actor("alice", "email").unwrap();
        state
            .modify_actor(
                "alice",
                "email",
                crate::registry::actor::ActorAttrEdit {
                    add_attributes: vec![("team".into(), vec!["payments".into()])],
                    ..Default::default()
                },
            )
            .unwrap();

        let mut req_attrs = HashMap::new();
        req_attrs.insert("team".to_string(), HashSet::from(["growth".to_string()]));
        let ctx = enrich(
            &state,
            &CheckRequest {
                actor_name: "alice".into(),
                actor_type: "email".into(),
                actor_attributes: req_attrs,
                ..Default::default()
            },
        );
        assert_eq!(ctx.actor_attributes.get("team").unwrap(), &HashSet::from(["growth".to_string()]));
    }

    #[test]
    fn group_and_role_expansion_is_one_level() {
        let mut state = RegistryState::default();
        state.add_group("g1", None).unwrap();
        state.add_role("r1", None).unwrap();
        state
            .modify_group(
                "g1",
                GroupEdit { add_members: vec![("alice".into(), "email".into())], add_roles: vec![], ..Default::default() },
            )
            .unwrap();
        state.modify_role("r1", RoleEdit { add_groups: vec!["g1".into()], ..Default::default() }).unwrap();

        let ctx = enrich(
            &state,
            &CheckRequest { actor_name: "alice".into(), actor_type: "email".into(), ..Default::default() },
        );
        assert!(ctx.actor_attributes.get(MEMBER_OF_KEY).unwrap().contains("g1"));
        assert!(ctx.actor_attributes.get(HAS_ROLE_KEY).unwrap().contains("r1"));

        let ctx_bob = enrich(
            &state,
            &CheckRequest { actor_name: "bob".into(), actor_type: "email".into(), ..Default::default() },
        );
        assert!(ctx_bob.actor_attributes.get(HAS_ROLE_KEY).unwrap().is_empty());
    }
}
