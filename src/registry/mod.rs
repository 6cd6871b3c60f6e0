//! In-memory indexed store of Targets, Actors, Groups, Roles, and Policies with strict
//! referential invariants (spec §4.2, component C2).
//!
//! Follows the teacher's `identity/` split: a thin `mod.rs` re-exporting a small public
//! surface, with one file per concern. The concurrency discipline is the ArcSwap
//! snapshot-and-swap pattern spec §5 calls for: readers take a wait-free atomic load of
//! `RegistryState`; writers serialize on `writer_lock`, build the next state by cloning
//! and mutating a copy, and only publish it (via `commit`) after their storage driver
//! write has succeeded. A write that fails to persist simply drops its half-built
//! `RegistryState` — there is nothing to roll back because nothing was ever published.

pub mod actor;
pub mod group;
pub mod model;
pub mod policy;
pub mod role;
pub mod target;

pub use model::{Actor, ActorCheck, Decision, Group, PolicyRule, Role, Target, TargetCheck};

use arc_swap::ArcSwap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Canonical identity key for Target/Actor: `(name_canonical, type_canonical)`.
pub type NameTypeKey = (String, String);

/// The full, immutable snapshot readers observe. Every mutation clones this, mutates
/// the clone, and publishes the clone as the new snapshot.
#[derive(Debug, Clone, Default)]
pub struct RegistryState {
    pub targets: HashMap<NameTypeKey, Target>,
    pub actors: HashMap<NameTypeKey, Actor>,
    pub groups: HashMap<String, Group>,
    pub roles: HashMap<String, Role>,
    pub policies: HashMap<String, PolicyRule>,
    /// Secondary index: canonical `(actor_name, actor_type)` -> set of canonical group
    /// names the actor belongs to. Rebuilt incrementally alongside `groups` so checks
    /// never scan every group (spec §4.2: "secondary indexes needed for efficient
    /// evaluation").
    pub actor_groups: HashMap<NameTypeKey, HashSet<String>>,
}

impl RegistryState {
    pub(crate) fn reindex_actor_groups(&mut self) {
        let mut idx: HashMap<NameTypeKey, HashSet<String>> = HashMap::new();
        for group in self.groups.values() {
            for member in &group.members {
                idx.entry(member.clone()).or_default().insert(group.name.clone());
            }
        }
        self.actor_groups = idx;
    }
}

/// Thread-safe handle around `RegistryState`. Cloneable: every clone shares the same
/// underlying `ArcSwap` and writer lock.
#[derive(Clone)]
pub struct Registry {
    state: Arc<ArcSwap<RegistryState>>,
    writer_lock: Arc<Mutex<()>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryState::default())
    }
}

impl Registry {
    pub fn new(initial: RegistryState) -> Self {
        Self {
            state: Arc::new(ArcSwap::from_pointee(initial)),
            writer_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Lock-free read snapshot. Never blocks on a writer for longer than the time to
    /// swap a pointer (spec §5).
    pub fn snapshot(&self) -> Arc<RegistryState> {
        self.state.load_full()
    }

    /// Serializes with other writers, hands the caller a mutable clone of the current
    /// state plus the pure mutation's result. The caller must call `commit` (after
    /// successfully persisting) to publish the new state; dropping the guard without
    /// committing leaves the Registry unchanged.
    pub async fn begin_write(&self) -> WriteGuard<'_> {
        let guard = self.writer_lock.lock().await;
        let next = (*self.state.load_full()).clone();
        WriteGuard { _guard: guard, state: self.state.clone(), next }
    }
}

pub struct WriteGuard<'a> {
    _guard: tokio::sync::MutexGuard<'a, ()>,
    state: Arc<ArcSwap<RegistryState>>,
    pub next: RegistryState,
}

impl<'a> WriteGuard<'a> {
    /// Publish the mutated state, making it visible to every subsequent `snapshot()`
    /// call (spec §5: "a successful admin response implies the mutation is visible to
    /// every subsequent local check").
    pub fn commit(mut self) {
        self.state.store(Arc::new(std::mem::take(&mut self.next)));
    }
}
