//! Evaluates one policy rule's predicates against an enriched context (spec §4.3,
//! component C5).
//!
//! A rule matches iff every *present* sub-check matches; absent sub-checks are
//! vacuously true. Pure function over already-resolved data, same discipline as
//! [`crate::value`].

use crate::enrich::CheckContext;
use crate::registry::{ActorCheck, PolicyRule, TargetCheck};
use crate::value::all_kv_checks_match;

/// ActorCheck: `name`, `typestr`, `attributes`, `bucket` — all optional, ANDed (spec §4.3).
pub fn actor_matches(check: &ActorCheck, ctx: &CheckContext) -> bool {
    if let Some(name) = &check.name {
        if !name.matches(&ctx.actor_name) {
            return false;
        }
    }
    if let Some(typestr) = &check.typestr {
        if !typestr.matches(&ctx.actor_type) {
            return false;
        }
    }
    if !all_kv_checks_match(&check.attributes, &ctx.actor_attributes) {
        return false;
    }
    if let Some(bucket) = &check.bucket {
        if !bucket.matches(ctx.bucket) {
            return false;
        }
    }
    true
}

/// TargetCheck: `name`, `typestr`, `action`, `attributes`, `match_in_actor`,
/// `match_in_env` — all optional, ANDed (spec §4.3).
pub fn target_matches(check: &TargetCheck, ctx: &CheckContext) -> bool {
    if let Some(name) = &check.name {
        if !name.matches(&ctx.target_name) {
            return false;
        }
    }
    if let Some(typestr) = &check.typestr {
        if !typestr.matches(&ctx.target_type) {
            return false;
        }
    }
    if let Some(action) = &check.action {
        if !action.matches(&ctx.target_action) {
            return false;
        }
    }
    if !all_kv_checks_match(&check.attributes, &ctx.target_attributes) {
        return false;
    }
    for key in &check.match_in_actor {
        if !cross_match(key, &ctx.target_attributes, &ctx.actor_attributes) {
            return false;
        }
    }
    for key in &check.match_in_env {
        if !cross_match(key, &ctx.target_attributes, &ctx.env_attributes) {
            return false;
        }
    }
    true
}

/// A missing key on either side yields an empty set; an empty intersection fails the
/// check for that key (spec §4.3).
fn cross_match(
    key: &str,
    target_attrs: &std::collections::HashMap<String, std::collections::HashSet<String>>,
    other_attrs: &std::collections::HashMap<String, std::collections::HashSet<String>>,
) -> bool {
    let key = crate::value::canonical(key);
    let target_values = target_attrs.get(&key);
    let other_values = other_attrs.get(&key);
    match (target_values, other_values) {
        (Some(t), Some(o)) => t.intersection(o).next().is_some(),
        _ => false,
    }
}

/// Full rule match: actor check, env checks, target check all ANDed (spec §4.3 opening
/// sentence: "A rule matches an enriched context iff all present sub-checks match").
pub fn rule_matches(rule: &PolicyRule, ctx: &CheckContext) -> bool {
    if let Some(actor_check) = &rule.actor_check {
        if !actor_matches(actor_check, ctx) {
            return false;
        }
    }
    if !all_kv_checks_match(&rule.env_attribute_checks, &ctx.env_attributes) {
        return false;
    }
    if let Some(target_check) = &rule.target_check {
        if !target_matches(target_check, ctx) {
            return false;
        }
    }
    true
}
