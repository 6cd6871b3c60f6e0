//! Wire <-> domain conversions for the generated `gatehouse` proto types.
//!
//! Kept in its own module so [`super::service`] reads as request handling, not type
//! plumbing — the same split clarium's HTTP layer makes between route handlers and
//! its `dto.rs` conversion helpers.

use super::proto;
use crate::error::{GateError, GateResult};
use crate::registry::model::{
    Actor, ActorCheck, Decision, Group, PolicyRule, Role, Target, TargetCheck,
};
use crate::value::{canonical, KvCheck, NumberCheck, NumberOp, SetOp, StringCheck, StringOp};
use std::collections::{HashMap, HashSet};

pub fn attr_map_from_wire(wire: HashMap<String, proto::StringList>) -> HashMap<String, HashSet<String>> {
    wire.into_iter().map(|(k, v)| (canonical(&k), v.values.into_iter().map(|s| canonical(&s)).collect())).collect()
}

pub fn attr_map_to_wire(attrs: &HashMap<String, HashSet<String>>) -> HashMap<String, proto::StringList> {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), proto::StringList { values: v.iter().cloned().collect() }))
        .collect()
}

pub fn target_to_wire(t: &Target) -> proto::Target {
    proto::Target {
        name: t.name_display.clone(),
        r#type: t.type_display.clone(),
        actions: t.actions.iter().cloned().collect(),
        attributes: attr_map_to_wire(&t.attributes),
    }
}

pub fn actor_to_wire(a: &Actor) -> proto::Actor {
    proto::Actor { name: a.name_display.clone(), r#type: a.type_display.clone(), attributes: attr_map_to_wire(&a.attributes) }
}

pub fn group_to_wire(g: &Group) -> proto::Group {
    proto::Group {
        name: g.name_display.clone(),
        description: g.description.clone(),
        members: g.members.iter().map(|(n, t)| proto::ActorRef { name: n.clone(), r#type: t.clone() }).collect(),
        roles: g.roles.iter().cloned().collect(),
    }
}

pub fn role_to_wire(r: &Role) -> proto::Role {
    proto::Role { name: r.name_display.clone(), description: r.description.clone(), granted_to: r.granted_to.iter().cloned().collect() }
}

fn string_op_from_wire(op: i32) -> GateResult<StringOp> {
    match proto::StringOp::try_from(op) {
        Ok(proto::StringOp::StringIs) => Ok(StringOp::Is),
        Ok(proto::StringOp::StringIsNot) => Ok(StringOp::IsNot),
        Err(_) => Err(GateError::invalid("unknown StringOp")),
    }
}

fn string_op_to_wire(op: StringOp) -> i32 {
    match op {
        StringOp::Is => proto::StringOp::StringIs as i32,
        StringOp::IsNot => proto::StringOp::StringIsNot as i32,
    }
}

fn set_op_from_wire(op: i32) -> GateResult<SetOp> {
    match proto::SetOp::try_from(op) {
        Ok(proto::SetOp::SetHas) => Ok(SetOp::Has),
        Ok(proto::SetOp::SetHasNot) => Ok(SetOp::HasNot),
        Err(_) => Err(GateError::invalid("unknown SetOp")),
    }
}

fn set_op_to_wire(op: SetOp) -> i32 {
    match op {
        SetOp::Has => proto::SetOp::SetHas as i32,
        SetOp::HasNot => proto::SetOp::SetHasNot as i32,
    }
}

fn number_op_from_wire(op: i32) -> GateResult<NumberOp> {
    match proto::NumberOp::try_from(op) {
        Ok(proto::NumberOp::NumberEquals) => Ok(NumberOp::Equals),
        Ok(proto::NumberOp::NumberLessThan) => Ok(NumberOp::LessThan),
        Ok(proto::NumberOp::NumberMoreThan) => Ok(NumberOp::MoreThan),
        Err(_) => Err(GateError::invalid("unknown NumberOp")),
    }
}

fn number_op_to_wire(op: NumberOp) -> i32 {
    match op {
        NumberOp::Equals => proto::NumberOp::NumberEquals as i32,
        NumberOp::LessThan => proto::NumberOp::NumberLessThan as i32,
        NumberOp::MoreThan => proto::NumberOp::NumberMoreThan as i32,
    }
}

pub fn string_check_from_wire(w: proto::StringCheck) -> GateResult<StringCheck> {
    Ok(StringCheck::new(string_op_from_wire(w.op)?, w.values))
}

pub fn string_check_to_wire(c: &StringCheck) -> proto::StringCheck {
    proto::StringCheck { op: string_op_to_wire(c.op), values: c.values.clone() }
}

pub fn kv_check_from_wire(w: proto::KvCheck) -> GateResult<KvCheck> {
    Ok(KvCheck::new(w.key, set_op_from_wire(w.op)?, w.values))
}

pub fn kv_check_to_wire(c: &KvCheck) -> proto::KvCheck {
    proto::KvCheck { key: c.key.clone(), op: set_op_to_wire(c.op), values: c.values.clone() }
}

pub fn number_check_from_wire(w: proto::NumberCheck) -> GateResult<NumberCheck> {
    Ok(NumberCheck::new(number_op_from_wire(w.op)?, w.val))
}

pub fn number_check_to_wire(c: &NumberCheck) -> proto::NumberCheck {
    proto::NumberCheck { op: number_op_to_wire(c.op), val: c.val }
}

pub fn actor_check_from_wire(w: proto::ActorCheck) -> GateResult<ActorCheck> {
    Ok(ActorCheck {
        name: w.name.map(string_check_from_wire).transpose()?,
        typestr: w.typestr.map(string_check_from_wire).transpose()?,
        attributes: w.attributes.into_iter().map(kv_check_from_wire).collect::<GateResult<Vec<_>>>()?,
        bucket: w.bucket.map(number_check_from_wire).transpose()?,
    })
}

pub fn actor_check_to_wire(c: &ActorCheck) -> proto::ActorCheck {
    proto::ActorCheck {
        name: c.name.as_ref().map(string_check_to_wire),
        typestr: c.typestr.as_ref().map(string_check_to_wire),
        attributes: c.attributes.iter().map(kv_check_to_wire).collect(),
        bucket: c.bucket.as_ref().map(number_check_to_wire),
    }
}

pub fn target_check_from_wire(w: proto::TargetCheck) -> GateResult<TargetCheck> {
    Ok(TargetCheck {
        name: w.name.map(string_check_from_wire).transpose()?,
        typestr: w.typestr.map(string_check_from_wire).transpose()?,
        action: w.action.map(string_check_from_wire).transpose()?,
        attributes: w.attributes.into_iter().map(kv_check_from_wire).collect::<GateResult<Vec<_>>>()?,
        match_in_actor: w.match_in_actor,
        match_in_env: w.match_in_env,
    })
}

pub fn target_check_to_wire(c: &TargetCheck) -> proto::TargetCheck {
    proto::TargetCheck {
        name: c.name.as_ref().map(string_check_to_wire),
        typestr: c.typestr.as_ref().map(string_check_to_wire),
        action: c.action.as_ref().map(string_check_to_wire),
        attributes: c.attributes.iter().map(kv_check_to_wire).collect(),
        match_in_actor: c.match_in_actor.clone(),
        match_in_env: c.match_in_env.clone(),
    }
}

fn decision_from_wire(d: i32) -> GateResult<Decision> {
    match proto::Decision::try_from(d) {
        Ok(proto::Decision::Allow) => Ok(Decision::Allow),
        Ok(proto::Decision::Deny) => Ok(Decision::Deny),
        Err(_) => Err(GateError::invalid("unknown Decision")),
    }
}

fn decision_to_wire(d: Decision) -> i32 {
    match d {
        Decision::Allow => proto::Decision::Allow as i32,
        Decision::Deny => proto::Decision::Deny as i32,
    }
}

pub fn policy_from_wire(w: proto::Policy) -> GateResult<PolicyRule> {
    if w.name.is_empty() {
        return Err(GateError::invalid("policy name must be non-empty"));
    }
    Ok(PolicyRule {
        name: canonical(&w.name),
        name_display: w.name,
        description: w.description,
        actor_check: w.actor_check.map(actor_check_from_wire).transpose()?,
        env_attribute_checks: w.env_attribute_checks.into_iter().map(kv_check_from_wire).collect::<GateResult<Vec<_>>>()?,
        target_check: w.target_check.map(target_check_from_wire).transpose()?,
        decision: decision_from_wire(w.decision)?,
    })
}

pub fn policy_to_wire(p: &PolicyRule) -> proto::Policy {
    proto::Policy {
        name: p.name_display.clone(),
        description: p.description.clone(),
        actor_check: p.actor_check.as_ref().map(actor_check_to_wire),
        env_attribute_checks: p.env_attribute_checks.iter().map(kv_check_to_wire).collect(),
        target_check: p.target_check.as_ref().map(target_check_to_wire),
        decision: decision_to_wire(p.decision),
    }
}

pub fn require_non_empty(field: &str, value: &str) -> GateResult<()> {
    if value.is_empty() {
        return Err(GateError::invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_string_op_is_invalid_argument_not_a_silent_default() {
        let err = string_check_from_wire(proto::StringCheck { op: 99, values: vec![] }).unwrap_err();
        assert!(matches!(err, GateError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_set_op_is_invalid_argument_not_a_silent_default() {
        let err = kv_check_from_wire(proto::KvCheck { key: "k".into(), op: 99, values: vec![] }).unwrap_err();
        assert!(matches!(err, GateError::InvalidArgument(_)));
    }

    #[test]
    fn known_string_and_set_ops_still_round_trip() {
        let c = string_check_from_wire(proto::StringCheck { op: string_op_to_wire(StringOp::IsNot), values: vec!["x".into()] }).unwrap();
        assert_eq!(c.op, StringOp::IsNot);

        let c = kv_check_from_wire(proto::KvCheck { key: "k".into(), op: set_op_to_wire(SetOp::HasNot), values: vec!["x".into()] }).unwrap();
        assert_eq!(c.op, SetOp::HasNot);
    }
}
