//! Typed attribute values and comparison primitives (spec §4.1, component C1).
//!
//! Kept small and pure on purpose: every predicate here is a plain function over
//! already-resolved data, with no I/O and no shared state, so the matcher built on top
//! (`rules.rs`) can run synchronously and be exhaustively unit tested in isolation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Case-folds a name/type/value to its canonical form. Canonical form is what's stored
/// in indexes and compared for equality; the original is kept alongside for display.
pub fn canonical(s: &str) -> String {
    s.to_ascii_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StringOp {
    Is,
    IsNot,
}

/// `StringCheck = (op, values)` — spec §4.1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringCheck {
    pub op: StringOp,
    pub values: Vec<String>,
}

impl StringCheck {
    pub fn new(op: StringOp, values: Vec<String>) -> Self {
        Self { op, values }
    }

    pub fn is(values: Vec<String>) -> Self {
        Self::new(StringOp::Is, values)
    }

    pub fn is_not(values: Vec<String>) -> Self {
        Self::new(StringOp::IsNot, values)
    }

    /// `tested` is compared against `values` after canonicalizing both sides.
    pub fn matches(&self, tested: &str) -> bool {
        let tested = canonical(tested);
        let any_eq = self.values.iter().any(|v| canonical(v) == tested);
        match self.op {
            StringOp::Is => any_eq,
            StringOp::IsNot => !any_eq,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOp {
    Has,
    HasNot,
}

/// `KvCheck = (key, op, values)` — spec §4.1. Evaluated against a multi-valued
/// attribute map (`HashMap<String, HashSet<String>>`-shaped); a missing key behaves as
/// an empty set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvCheck {
    pub key: String,
    pub op: SetOp,
    pub values: Vec<String>,
}

impl KvCheck {
    pub fn new(key: impl Into<String>, op: SetOp, values: Vec<String>) -> Self {
        Self { key: key.into(), op, values }
    }

    pub fn has(key: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(key, SetOp::Has, values)
    }

    pub fn has_not(key: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(key, SetOp::HasNot, values)
    }

    /// `attrs` maps canonical keys to canonical value sets; `self.key`/`self.values`
    /// are canonicalized on the fly so callers can build checks from raw PEP input.
    pub fn matches(&self, attrs: &std::collections::HashMap<String, HashSet<String>>) -> bool {
        let key = canonical(&self.key);
        let stored = attrs.get(&key);
        let any_present = match stored {
            None => false,
            Some(set) => self.values.iter().any(|v| set.contains(&canonical(v))),
        };
        match self.op {
            SetOp::Has => any_present,
            SetOp::HasNot => !any_present,
        }
    }
}

/// Conjunction of `KvCheck`s: all must pass (spec §4.1 — "their conjunction is implied").
pub fn all_kv_checks_match(
    checks: &[KvCheck],
    attrs: &std::collections::HashMap<String, HashSet<String>>,
) -> bool {
    checks.iter().all(|c| c.matches(attrs))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberOp {
    Equals,
    LessThan,
    MoreThan,
}

/// `NumberCheck = (op, val)` — spec §4.1, applied to a single derived integer (today:
/// `bucket`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberCheck {
    pub op: NumberOp,
    pub val: i32,
}

impl NumberCheck {
    pub fn new(op: NumberOp, val: i32) -> Self {
        Self { op, val }
    }

    pub fn matches(&self, tested: i32) -> bool {
        match self.op {
            NumberOp::Equals => tested == self.val,
            NumberOp::LessThan => tested < self.val,
            NumberOp::MoreThan => tested > self.val,
        }
    }
}

/// Parses a set of raw string values as an integer on demand; used nowhere in the
/// derived-context model today (only `bucket` is numeric) but kept as the general
/// primitive spec §4.1 describes ("a value parses a signed integer on demand and fails
/// the predicate if parsing fails").
pub fn parse_single_int(values: &HashSet<String>) -> Option<i32> {
    if values.len() != 1 {
        return None;
    }
    values.iter().next()?.parse::<i32>().ok()
}

/// Dedups and canonicalizes a raw multi-valued attribute set, matching the Registry's
/// storage invariant ("attribute values deduplicated", spec §4.2).
pub fn canonical_set<I: IntoIterator<Item = S>, S: AsRef<str>>(values: I) -> HashSet<String> {
    values.into_iter().map(|v| canonical(v.as_ref())).collect()
}
