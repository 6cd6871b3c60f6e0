//! Combines per-rule decisions under the precedence rule into a final verdict (spec
//! §4.5, component C6).
//!
//! Direct translation of clarium's `evaluator.rs` deny-then-allow two-pass shape
//! (`deny()`/`allow_all()` early-return), generalized from its action/resource-glob
//! loop to iterating [`PolicyRule`]s matched via [`crate::rules::rule_matches`].

use crate::enrich::CheckContext;
use crate::registry::model::Decision;
use crate::registry::PolicyRule;
use crate::rules::rule_matches;

/// Resolves a final decision from every policy in `policies` (spec §4.5):
/// any matching `DENY` wins; else any matching `ALLOW` wins; else implicit deny.
/// Iteration order never affects the result (spec §8: reordering policies is a no-op).
pub fn resolve<'a>(policies: impl IntoIterator<Item = &'a PolicyRule>, ctx: &CheckContext) -> Decision {
    let mut any_allow = false;
    for policy in policies {
        if !rule_matches(policy, ctx) {
            continue;
        }
        if policy.decision == Decision::Deny {
            return Decision::Deny;
        }
        any_allow = true;
    }
    if any_allow {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::{ActorCheck, TargetCheck};
    use std::collections::{HashMap, HashSet};

    fn bare_ctx() -> CheckContext {
        CheckContext {
            actor_name: "alice".into(),
            actor_type: "email".into(),
            actor_attributes: HashMap::new(),
            env_attributes: HashMap::new(),
            target_name: "maindb".into(),
            target_type: "db".into(),
            target_action: "read".into(),
            target_attributes: HashMap::new(),
            target_actions: HashSet::new(),
            bucket: 42,
        }
    }

    fn rule(name: &str, decision: Decision) -> PolicyRule {
        PolicyRule {
            name: name.into(),
            name_display: name.into(),
            description: None,
            actor_check: None,
            env_attribute_checks: vec![],
            target_check: None,
            decision,
        }
    }

    #[test]
    fn empty_policy_set_is_implicit_deny() {
        let policies: Vec<PolicyRule> = vec![];
        assert_eq!(resolve(&policies, &bare_ctx()), Decision::Deny);
    }

    #[test]
    fn unconstrained_allow_matches_everything() {
        let policies = vec![rule("p", Decision::Allow)];
        assert_eq!(resolve(&policies, &bare_ctx()), Decision::Allow);
    }

    #[test]
    fn explicit_deny_overrides_allow_regardless_of_order() {
        let in_order = vec![rule("allow", Decision::Allow), rule("deny", Decision::Deny)];
        let reordered = vec![rule("deny", Decision::Deny), rule("allow", Decision::Allow)];
        assert_eq!(resolve(&in_order, &bare_ctx()), Decision::Deny);
        assert_eq!(resolve(&reordered, &bare_ctx()), Decision::Deny);
    }

    #[test]
    fn non_matching_policy_is_ignored() {
        let mut deny_rule = rule("deny-wrong-actor", Decision::Deny);
        deny_rule.actor_check = Some(ActorCheck {
            name: Some(crate::value::StringCheck::is(vec!["bob".into()])),
            ..Default::default()
        });
        let mut allow_rule = rule("allow", Decision::Allow);
        allow_rule.target_check = Some(TargetCheck::default());
        let policies = vec![deny_rule, allow_rule];
        assert_eq!(resolve(&policies, &bare_ctx()), Decision::Allow);
    }
}
