//! Actor CRUD (spec §4.2) — `(name, type, attributes)`.
//!
//! An actor the PEP asserts but that is absent here is legal for checks (spec §3); this
//! module only governs *registered* actors, which carry stored attributes merged into
//! enrichment (spec §4.4).

use super::{Actor, NameTypeKey, RegistryState};
use crate::error::{GateError, GateResult};
use crate::value::canonical;

#[derive(Debug, Clone, Default)]
pub struct ActorAttrEdit {
    pub add_attributes: Vec<(String, Vec<String>)>,
    pub remove_attributes: Vec<(String, Vec<String>)>,
}

#[derive(Debug, Clone, Default)]
pub struct ActorFilter {
    pub name: Option<String>,
    pub type_: Option<String>,
}

impl RegistryState {
    pub fn add_actor(&mut self, name: &str, type_: &str) -> GateResult<Actor> {
        if name.is_empty() || type_.is_empty() {
            return Err(GateError::invalid("actor name and type must be non-empty"));
        }
        let key: NameTypeKey = (canonical(name), canonical(type_));
        if self.actors.contains_key(&key) {
            return Err(GateError::exists(format!("actor {}/{} already exists", type_, name)));
        }
        let actor = Actor {
            name: key.0.clone(),
            name_display: name.to_string(),
            type_: key.1.clone(),
            type_display: type_.to_string(),
            attributes: Default::default(),
        };
        self.actors.insert(key, actor.clone());
        Ok(actor)
    }

    pub fn modify_actor(&mut self, name: &str, type_: &str, edit: ActorAttrEdit) -> GateResult<Actor> {
        let key: NameTypeKey = (canonical(name), canonical(type_));
        let actor = self
            .actors
            .get_mut(&key)
            .ok_or_else(|| GateError::not_found(format!("actor {}/{} not found", type_, name)))?;
        for (k, values) in edit.add_attributes {
            let entry = actor.attributes.entry(canonical(&k)).or_default();
            for v in values {
                entry.insert(canonical(&v));
            }
        }
        for (k, values) in edit.remove_attributes {
            let key_c = canonical(&k);
            if let Some(set) = actor.attributes.get_mut(&key_c) {
                for v in values {
                    set.remove(&canonical(&v));
                }
                if set.is_empty() {
                    actor.attributes.remove(&key_c);
                }
            }
        }
        Ok(actor.clone())
    }

    pub fn remove_actor(&mut self, name: &str, type_: &str) -> GateResult<Actor> {
        let key: NameTypeKey = (canonical(name), canonical(type_));
        self.actors
            .remove(&key)
            .ok_or_else(|| GateError::not_found(format!("actor {}/{} not found", type_, name)))
    }

    pub fn get_actors(&self, filter: &ActorFilter) -> Vec<Actor> {
        self.actors
            .values()
            .filter(|a| filter.name.as_ref().map_or(true, |n| a.name == canonical(n)))
            .filter(|a| filter.type_.as_ref().map_or(true, |ty| a.type_ == canonical(ty)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_actor_is_simply_absent() {
        let state = RegistryState::default();
        assert!(state.get_actors(&ActorFilter { name: Some("bob".into()), type_: Some("email".into()) }).is_empty());
    }

    #[test]
    fn modify_missing_actor_is_not_found() {
        let mut state = RegistryState::default();
        let err = state.modify_actor("bob", "email", ActorAttrEdit::default()).unwrap_err();
        assert!(matches!(err, GateError::NotFound(_)));
    }
}
