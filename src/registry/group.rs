//! Group CRUD (spec §4.2) — `(name, description?, members, roles)`.
//!
//! Invariant: each role name in `roles` references a Role that exists at write time
//! (spec §3). Removing a Group cascades: it is pulled out of every Role's
//! `granted_to` (spec §4.2).

use super::{Group, NameTypeKey, RegistryState};
use crate::error::{GateError, GateResult};
use crate::value::canonical;

#[derive(Debug, Clone, Default)]
pub struct GroupEdit {
    pub add_members: Vec<NameTypeKey>,
    pub remove_members: Vec<NameTypeKey>,
    pub add_roles: Vec<String>,
    pub remove_roles: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    pub name: Option<String>,
    /// Canonical `(actor_name, actor_type)` the group must have as a member.
    pub member: Option<NameTypeKey>,
    /// Canonical role name the group must carry.
    pub role_name: Option<String>,
}

impl RegistryState {
    pub fn add_group(&mut self, name: &str, description: Option<String>) -> GateResult<Group> {
        if name.is_empty() {
            return Err(GateError::invalid("group name must be non-empty"));
        }
        let key = canonical(name);
        if self.groups.contains_key(&key) {
            return Err(GateError::exists(format!("group {} already exists", name)));
        }
        let group = Group {
            name: key.clone(),
            name_display: name.to_string(),
            description,
            members: Default::default(),
            roles: Default::default(),
        };
        self.groups.insert(key.clone(), group.clone());
        self.reindex_actor_groups();
        Ok(group)
    }

    pub fn modify_group(&mut self, name: &str, edit: GroupEdit) -> GateResult<Group> {
        let key = canonical(name);
        // Validate role references before mutating anything (spec §4.2: Modify fails
        // atomically with ReferenceMissing; the Registry stays unchanged).
        for role in &edit.add_roles {
            if !self.roles.contains_key(&canonical(role)) {
                return Err(GateError::reference_missing(format!("role {} does not exist", role)));
            }
        }
        let group = self
            .groups
            .get_mut(&key)
            .ok_or_else(|| GateError::not_found(format!("group {} not found", name)))?;
        for member in edit.add_members {
            group.members.insert((canonical(&member.0), canonical(&member.1)));
        }
        for member in edit.remove_members {
            group.members.remove(&(canonical(&member.0), canonical(&member.1)));
        }
        for role in &edit.add_roles {
            group.roles.insert(canonical(role));
        }
        for role in &edit.remove_roles {
            group.roles.remove(&canonical(role));
        }
        if let Some(desc) = edit.description {
            group.description = Some(desc);
        }
        let result = group.clone();

        // Keep the Role side of the relation in sync: a group's roles is the inverse
        // view of each role's granted_to set (mirrors modify_role's symmetric update
        // of the Group side).
        for role_name in &edit.add_roles {
            if let Some(r) = self.roles.get_mut(&canonical(role_name)) {
                r.granted_to.insert(key.clone());
            }
        }
        for role_name in &edit.remove_roles {
            if let Some(r) = self.roles.get_mut(&canonical(role_name)) {
                r.granted_to.remove(&key);
            }
        }
        self.reindex_actor_groups();
        Ok(result)
    }

    pub fn remove_group(&mut self, name: &str) -> GateResult<Group> {
        let key = canonical(name);
        let group = self.groups.remove(&key).ok_or_else(|| GateError::not_found(format!("group {} not found", name)))?;
        // Cascade: drop this group from every role's granted_to (spec §4.2).
        for role in self.roles.values_mut() {
            role.granted_to.remove(&key);
        }
        self.reindex_actor_groups();
        Ok(group)
    }

    pub fn get_groups(&self, filter: &GroupFilter) -> Vec<Group> {
        self.groups
            .values()
            .filter(|g| filter.name.as_ref().map_or(true, |n| g.name == canonical(n)))
            .filter(|g| {
                filter.member.as_ref().map_or(true, |m| {
                    g.members.contains(&(canonical(&m.0), canonical(&m.1)))
                })
            })
            .filter(|g| filter.role_name.as_ref().map_or(true, |r| g.roles.contains(&canonical(r))))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_nonexistent_role_fails_and_leaves_group_unchanged() {
        let mut state = RegistryState::default();
        state.add_group("g1", None).unwrap();
        let err = state
            .modify_group("g1", GroupEdit { add_roles: vec!["nosuch".into()], ..Default::default() })
            .unwrap_err();
        assert!(matches!(err, GateError::ReferenceMissing(_)));
        let g = state.get_groups(&GroupFilter { name: Some("g1".into()), ..Default::default() }).remove(0);
        assert!(g.roles.is_empty());
    }

    #[test]
    fn adding_role_after_it_exists_succeeds() {
        let mut state = RegistryState::default();
        state.add_group("g1", None).unwrap();
        state.add_role("r1", None).unwrap();
        state.modify_group("g1", GroupEdit { add_roles: vec!["r1".into()], ..Default::default() }).unwrap();
    }

    #[test]
    fn removing_group_cascades_out_of_role_grants() {
        let mut state = RegistryState::default();
        state.add_group("g1", None).unwrap();
        state.add_role("r1", None).unwrap();
        state.modify_role("r1", super::super::role::RoleEdit { add_groups: vec!["g1".into()], ..Default::default() }).unwrap();
        state.remove_group("g1").unwrap();
        let r = state.get_roles(&super::super::role::RoleFilter { name: Some("r1".into()), ..Default::default() }).remove(0);
        assert!(!r.granted_to.contains("g1"));
    }

    #[test]
    fn adding_role_via_modify_group_also_updates_role_granted_to() {
        let mut state = RegistryState::default();
        state.add_group("g1", None).unwrap();
        state.add_role("r1", None).unwrap();
        state.modify_group("g1", GroupEdit { add_roles: vec!["r1".into()], ..Default::default() }).unwrap();
        let r = state.get_roles(&super::super::role::RoleFilter { name: Some("r1".into()), ..Default::default() }).remove(0);
        assert!(r.granted_to.contains("g1"));

        state.modify_group("g1", GroupEdit { remove_roles: vec!["r1".into()], ..Default::default() }).unwrap();
        let r = state.get_roles(&super::super::role::RoleFilter { name: Some("r1".into()), ..Default::default() }).remove(0);
        assert!(!r.granted_to.contains("g1"));
    }

    #[test]
    fn member_index_reflects_group_membership() {
        let mut state = RegistryState::default();
        state.add_group("g1", None).unwrap();
        state
            .modify_group(
                "g1",
                GroupEdit { add_members: vec![("alice".into(), "email".into())], ..Default::default() },
            )
            .unwrap();
        let groups = state.actor_groups.get(&("alice".into(), "email".into())).cloned().unwrap_or_default();
        assert!(groups.contains("g1"));
    }
}
