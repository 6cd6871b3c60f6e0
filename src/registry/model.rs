//! Entity and policy-rule types (spec §3, §4.3).

use crate::value::{KvCheck, NumberCheck, StringCheck};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type AttrMap = HashMap<String, HashSet<String>>;

/// `(name, type, actions, attributes)` — spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub name_display: String,
    pub type_: String,
    pub type_display: String,
    pub actions: HashSet<String>,
    pub attributes: AttrMap,
}

/// `(name, type, attributes)` — spec §3. An actor absent from the Registry is legal
/// for checks (enrichment treats it as having empty attributes); this type only
/// represents *registered* actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub name_display: String,
    pub type_: String,
    pub type_display: String,
    pub attributes: AttrMap,
}

/// `(name, description?, members, roles)` — spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub name_display: String,
    pub description: Option<String>,
    /// Canonical `(actor_name, actor_type)` pairs.
    pub members: HashSet<(String, String)>,
    /// Canonical role names.
    pub roles: HashSet<String>,
}

/// `(name, description?, granted_to)` — spec §3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: String,
    pub name_display: String,
    pub description: Option<String>,
    /// Canonical group names.
    pub granted_to: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny,
}

/// All sub-checks optional and ANDed — spec §4.3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorCheck {
    pub name: Option<StringCheck>,
    pub typestr: Option<StringCheck>,
    pub attributes: Vec<KvCheck>,
    pub bucket: Option<NumberCheck>,
}

/// All sub-checks optional and ANDed — spec §4.3.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCheck {
    pub name: Option<StringCheck>,
    pub typestr: Option<StringCheck>,
    pub action: Option<StringCheck>,
    pub attributes: Vec<KvCheck>,
    pub match_in_actor: Vec<String>,
    pub match_in_env: Vec<String>,
}

/// `(name, description?, actor_check?, env_attribute_checks, target_check?, decision)`
/// — spec §3. Absent sub-checks mean "unconstrained".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    pub name_display: String,
    pub description: Option<String>,
    pub actor_check: Option<ActorCheck>,
    pub env_attribute_checks: Vec<KvCheck>,
    pub target_check: Option<TargetCheck>,
    pub decision: Decision,
}
