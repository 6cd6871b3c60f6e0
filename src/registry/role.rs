//! Role CRUD (spec §4.2) — `(name, description?, granted_to)`.
//!
//! Mirror image of [`super::group`]: a Role's `granted_to` set references Groups that
//! must exist at write time. Removing a Role cascades out of every Group's `roles`.

use super::{RegistryState, Role};
use crate::error::{GateError, GateResult};
use crate::value::canonical;

#[derive(Debug, Clone, Default)]
pub struct RoleEdit {
    pub add_groups: Vec<String>,
    pub remove_groups: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RoleFilter {
    pub name: Option<String>,
    /// Canonical group name the role must be granted to.
    pub group_name: Option<String>,
}

impl RegistryState {
    pub fn add_role(&mut self, name: &str, description: Option<String>) -> GateResult<Role> {
        if name.is_empty() {
            return Err(GateError::invalid("role name must be non-empty"));
        }
        let key = canonical(name);
        if self.roles.contains_key(&key) {
            return Err(GateError::exists(format!("role {} already exists", name)));
        }
        let role = Role {
            name: key.clone(),
            name_display: name.to_string(),
            description,
            granted_to: Default::default(),
        };
        self.roles.insert(key, role.clone());
        Ok(role)
    }

    pub fn modify_role(&mut self, name: &str, edit: RoleEdit) -> GateResult<Role> {
        let key = canonical(name);
        for group in &edit.add_groups {
            if !self.groups.contains_key(&canonical(group)) {
                return Err(GateError::reference_missing(format!("group {} does not exist", group)));
            }
        }
        let role = self
            .roles
            .get_mut(&key)
            .ok_or_else(|| GateError::not_found(format!("role {} not found", name)))?;
        for group in &edit.add_groups {
            role.granted_to.insert(canonical(group));
        }
        for group in &edit.remove_groups {
            role.granted_to.remove(&canonical(group));
        }
        if let Some(desc) = edit.description {
            role.description = Some(desc);
        }
        let result = role.clone();

        // Keep the Group side of the relation (and therefore actor_groups) consistent:
        // a role's granted_to is the inverse view of each group's roles set.
        for group_name in &edit.add_groups {
            if let Some(g) = self.groups.get_mut(&canonical(group_name)) {
                g.roles.insert(key.clone());
            }
        }
        for group_name in &edit.remove_groups {
            if let Some(g) = self.groups.get_mut(&canonical(group_name)) {
                g.roles.remove(&key);
            }
        }
        Ok(result)
    }

    pub fn remove_role(&mut self, name: &str) -> GateResult<Role> {
        let key = canonical(name);
        let role = self.roles.remove(&key).ok_or_else(|| GateError::not_found(format!("role {} not found", name)))?;
        for group in self.groups.values_mut() {
            group.roles.remove(&key);
        }
        Ok(role)
    }

    pub fn get_roles(&self, filter: &RoleFilter) -> Vec<Role> {
        self.roles
            .values()
            .filter(|r| filter.name.as_ref().map_or(true, |n| r.name == canonical(n)))
            .filter(|r| filter.group_name.as_ref().map_or(true, |g| r.granted_to.contains(&canonical(g))))
            .cloned()
            .collect()
    }
}
