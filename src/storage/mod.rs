//! Pluggable persistence for the [`crate::registry::RegistryState`] (spec §6, component
//! C3).
//!
//! Follows the shape of the teacher's `GitBackend` trait and its
//! `CompositeGitBackend` wrapper (`server/exec/filestore/git/{backend,composite}.rs`):
//! an object-safe, `Send + Sync` trait with a handful of verbs, boxed behind `dyn` so
//! `main.rs` can pick an implementation at startup from a single config value. A driver
//! still hands callers the whole [`Snapshot`] on `load`/`apply`, but internally addresses
//! each of the five entity kinds (see [`EntityKind`]) under its own file/key, the way
//! spec §4.6 describes, so that corruption in one kind's storage never blocks loading
//! the other four.

pub mod etcd;
pub mod file;

use crate::error::GateResult;
use crate::registry::model::{Actor, Group, PolicyRule, Role, Target};
use crate::registry::RegistryState;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// Wire-format mirror of [`RegistryState`]. `RegistryState`'s maps are keyed by tuples
/// (`(name, type)`) which JSON cannot represent as object keys, so persistence goes
/// through this flat, JSON-friendly shape instead and the secondary indexes
/// (`actor_groups`) are rebuilt on load rather than persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub targets: Vec<Target>,
    pub actors: Vec<Actor>,
    pub groups: Vec<Group>,
    pub roles: Vec<Role>,
    pub policies: Vec<PolicyRule>,
}

impl From<&RegistryState> for Snapshot {
    fn from(state: &RegistryState) -> Self {
        Snapshot {
            targets: state.targets.values().cloned().collect(),
            actors: state.actors.values().cloned().collect(),
            groups: state.groups.values().cloned().collect(),
            roles: state.roles.values().cloned().collect(),
            policies: state.policies.values().cloned().collect(),
        }
    }
}

impl From<Snapshot> for RegistryState {
    fn from(snap: Snapshot) -> Self {
        let mut state = RegistryState::default();
        for t in snap.targets {
            state.targets.insert((t.name.clone(), t.type_.clone()), t);
        }
        for a in snap.actors {
            state.actors.insert((a.name.clone(), a.type_.clone()), a);
        }
        for g in snap.groups {
            state.groups.insert(g.name.clone(), g);
        }
        for r in snap.roles {
            state.roles.insert(r.name.clone(), r);
        }
        for p in snap.policies {
            state.policies.insert(p.name.clone(), p);
        }
        state.reindex_actor_groups();
        state
    }
}

/// The five entity kinds the Registry persists. Storage drivers address each kind
/// independently (spec §4.6: "File: writes each entity kind under a path tree" / "Etcd:
/// uses a prefix per entity kind") so that damage to one kind's file/key never prevents
/// the other four from loading (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Targets,
    Actors,
    Groups,
    Roles,
    Policies,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] =
        [EntityKind::Targets, EntityKind::Actors, EntityKind::Groups, EntityKind::Roles, EntityKind::Policies];

    /// Stem shared by the file driver's file name and the etcd driver's key suffix.
    pub fn stem(self) -> &'static str {
        match self {
            EntityKind::Targets => "targets",
            EntityKind::Actors => "actors",
            EntityKind::Groups => "groups",
            EntityKind::Roles => "roles",
            EntityKind::Policies => "policies",
        }
    }
}

/// A change notification delivered by [`StorageDriver::watch`]. Single-node deployments
/// (the file driver) never produce one; a clustered etcd deployment emits one whenever
/// another node publishes a new snapshot, so this node can reload and re-swap.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    pub revision: i64,
}

/// Persistence boundary for the Registry. Mirrors `GitBackend`: a small, object-safe
/// trait so the concrete backend is chosen once at startup (spec §6) and erased behind
/// `Box<dyn StorageDriver>` everywhere else.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Load the full snapshot at startup. An empty/absent store loads as `Snapshot::default()`.
    async fn load(&self) -> GateResult<Snapshot>;

    /// Persist the full snapshot. Must be atomic from the perspective of a concurrent
    /// `load` (readers never observe a partially-written snapshot) — the file driver
    /// gets this from a temp-file-plus-rename, the etcd driver from a single `Put`.
    async fn apply(&self, snapshot: &Snapshot) -> GateResult<()>;

    /// A stream of change notifications from other writers. The file driver returns a
    /// stream that never yields (single node, spec §6: "single-node deployment is the
    /// common case"). The etcd driver watches its key prefix.
    fn watch(&self) -> BoxStream<'static, ChangeNotice>;
}
