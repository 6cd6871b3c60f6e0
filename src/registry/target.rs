//! Target CRUD (spec §4.2) — `(name, type, actions, attributes)`.

use super::{NameTypeKey, RegistryState, Target};
use crate::error::{GateError, GateResult};
use crate::value::canonical;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct TargetAttrEdit {
    pub add_actions: Vec<String>,
    pub remove_actions: Vec<String>,
    pub add_attributes: Vec<(String, Vec<String>)>,
    pub remove_attributes: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone, Default)]
pub struct TargetFilter {
    pub name: Option<String>,
    pub type_: Option<String>,
}

impl RegistryState {
    pub fn add_target(&mut self, name: &str, type_: &str) -> GateResult<Target> {
        if name.is_empty() || type_.is_empty() {
            return Err(GateError::invalid("target name and type must be non-empty"));
        }
        let key: NameTypeKey = (canonical(name), canonical(type_));
        if self.targets.contains_key(&key) {
            return Err(GateError::exists(format!("target {}/{} already exists", type_, name)));
        }
        let target = Target {
            name: key.0.clone(),
            name_display: name.to_string(),
            type_: key.1.clone(),
            type_display: type_.to_string(),
            actions: HashSet::new(),
            attributes: Default::default(),
        };
        self.targets.insert(key, target.clone());
        Ok(target)
    }

    pub fn modify_target(&mut self, name: &str, type_: &str, edit: TargetAttrEdit) -> GateResult<Target> {
        let key: NameTypeKey = (canonical(name), canonical(type_));
        let target = self
            .targets
            .get_mut(&key)
            .ok_or_else(|| GateError::not_found(format!("target {}/{} not found", type_, name)))?;
        for action in edit.add_actions {
            target.actions.insert(canonical(&action));
        }
        for action in edit.remove_actions {
            target.actions.remove(&canonical(&action));
        }
        for (k, values) in edit.add_attributes {
            let entry = target.attributes.entry(canonical(&k)).or_default();
            for v in values {
                entry.insert(canonical(&v));
            }
        }
        for (k, values) in edit.remove_attributes {
            let key_c = canonical(&k);
            if let Some(set) = target.attributes.get_mut(&key_c) {
                for v in values {
                    set.remove(&canonical(&v));
                }
                if set.is_empty() {
                    target.attributes.remove(&key_c);
                }
            }
        }
        Ok(target.clone())
    }

    pub fn remove_target(&mut self, name: &str, type_: &str) -> GateResult<Target> {
        let key: NameTypeKey = (canonical(name), canonical(type_));
        self.targets
            .remove(&key)
            .ok_or_else(|| GateError::not_found(format!("target {}/{} not found", type_, name)))
    }

    pub fn get_targets(&self, filter: &TargetFilter) -> Vec<Target> {
        self.targets
            .values()
            .filter(|t| filter.name.as_ref().map_or(true, |n| t.name == canonical(n)))
            .filter(|t| filter.type_.as_ref().map_or(true, |ty| t.type_ == canonical(ty)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_duplicate_fails() {
        let mut state = RegistryState::default();
        state.add_target("maindb", "db").unwrap();
        let err = state.add_target("MainDB", "DB").unwrap_err();
        assert!(matches!(err, GateError::AlreadyExists(_)));
    }

    #[test]
    fn modify_merges_and_empties_key_on_last_removal() {
        let mut state = RegistryState::default();
        state.add_target("maindb", "db").unwrap();
        state
            .modify_target(
                "maindb",
                "db",
                TargetAttrEdit { add_attributes: vec![("env".into(), vec!["prod".into()])], ..Default::default() },
            )
            .unwrap();
        let t = state.get_targets(&TargetFilter::default()).remove(0);
        assert!(t.attributes.get("env").unwrap().contains("prod"));

        state
            .modify_target(
                "maindb",
                "db",
                TargetAttrEdit { remove_attributes: vec![("env".into(), vec!["prod".into()])], ..Default::default() },
            )
            .unwrap();
        let t = state.get_targets(&TargetFilter::default()).remove(0);
        assert!(!t.attributes.contains_key("env"));
    }

    #[test]
    fn removing_absent_value_is_silently_ignored() {
        let mut state = RegistryState::default();
        state.add_target("maindb", "db").unwrap();
        state
            .modify_target(
                "maindb",
                "db",
                TargetAttrEdit { remove_attributes: vec![("env".into(), vec!["prod".into()])], ..Default::default() },
            )
            .unwrap();
    }
}
