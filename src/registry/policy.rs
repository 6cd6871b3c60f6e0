//! Policy CRUD (spec §4.2, §4.3) — rules are replaced whole, keyed by name.
//!
//! Resolved Open Question: Modify is a full-rule replacement rather than a field-level
//! merge (unlike Target/Actor/Group/Role attribute edits) because a `PolicyRule`'s
//! sub-checks are a single coherent predicate — merging pieces of two different rules
//! would produce a rule nobody authored. See DESIGN.md.

use super::{Decision, PolicyRule, RegistryState};
use crate::error::{GateError, GateResult};
use crate::value::canonical;

#[derive(Debug, Clone, Default)]
pub struct PolicyFilter {
    pub name: Option<String>,
    pub decision: Option<Decision>,
}

impl RegistryState {
    pub fn add_policy(&mut self, rule: PolicyRule) -> GateResult<PolicyRule> {
        if rule.name.is_empty() {
            return Err(GateError::invalid("policy name must be non-empty"));
        }
        let key = canonical(&rule.name);
        if self.policies.contains_key(&key) {
            return Err(GateError::exists(format!("policy {} already exists", rule.name)));
        }
        let mut stored = rule;
        stored.name = key.clone();
        self.policies.insert(key, stored.clone());
        Ok(stored)
    }

    pub fn modify_policy(&mut self, name: &str, rule: PolicyRule) -> GateResult<PolicyRule> {
        let key = canonical(name);
        if !self.policies.contains_key(&key) {
            return Err(GateError::not_found(format!("policy {} not found", name)));
        }
        let mut stored = rule;
        stored.name = key.clone();
        self.policies.insert(key, stored.clone());
        Ok(stored)
    }

    pub fn remove_policy(&mut self, name: &str) -> GateResult<PolicyRule> {
        let key = canonical(name);
        self.policies.remove(&key).ok_or_else(|| GateError::not_found(format!("policy {} not found", name)))
    }

    pub fn get_policies(&self, filter: &PolicyFilter) -> Vec<PolicyRule> {
        self.policies
            .values()
            .filter(|p| filter.name.as_ref().map_or(true, |n| p.name == canonical(n)))
            .filter(|p| filter.decision.map_or(true, |d| p.decision == d))
            .cloned()
            .collect()
    }
}
