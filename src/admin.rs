//! Administration surface (spec §6/§7, component C7): CRUD for each entity kind plus
//! `check`, delegating to the Registry (C2) and storage driver (C3).
//!
//! Every write takes the Registry's writer lock, builds the next `RegistryState` in
//! memory, persists it via the storage driver, and only then commits — on storage
//! failure the attempted state is simply dropped (spec §7: "the in-memory write was
//! rolled back"), the same pattern as clarium's filestore CRUD functions that never
//! touch the live table until their backing write has succeeded.

use crate::decision::resolve;
use crate::enrich::{enrich, CheckRequest};
use crate::error::{GateError, GateResult};
use crate::registry::actor::{ActorAttrEdit, ActorFilter};
use crate::registry::group::{GroupEdit, GroupFilter};
use crate::registry::model::{Actor, Decision, Group, PolicyRule, Role, Target};
use crate::registry::policy::PolicyFilter;
use crate::registry::role::{RoleEdit, RoleFilter};
use crate::registry::target::{TargetAttrEdit, TargetFilter};
use crate::registry::Registry;
use crate::storage::{Snapshot, StorageDriver};
use std::sync::Arc;

/// Ties a [`Registry`] to its [`StorageDriver`] and exposes the admin surface spec §6
/// names. This is the type the gRPC layer (`src/rpc.rs`) wraps directly.
#[derive(Clone)]
pub struct GateService {
    pub registry: Registry,
    storage: Arc<dyn StorageDriver>,
}

impl GateService {
    pub fn new(registry: Registry, storage: Arc<dyn StorageDriver>) -> Self {
        Self { registry, storage }
    }

    /// Loads the initial snapshot from `storage` and builds the service (spec §6:
    /// `load() -> full Registry snapshot` on startup).
    pub async fn bootstrap(storage: Arc<dyn StorageDriver>) -> GateResult<Self> {
        let snapshot = storage.load().await?;
        let registry = Registry::new(snapshot.into());
        Ok(Self::new(registry, storage))
    }

    /// Applies a remote change (from the storage driver's `watch()` stream) directly to
    /// the Registry without re-persisting it (spec §4.6: "Applies are idempotent").
    pub async fn apply_remote_snapshot(&self, snapshot: Snapshot) {
        let mut write = self.registry.begin_write().await;
        write.next = snapshot.into();
        write.commit();
    }

    async fn persist_and_commit<T>(&self, write: crate::registry::WriteGuard<'_>, result: GateResult<T>) -> GateResult<T> {
        let value = result?;
        let snapshot = Snapshot::from(&write.next);
        self.storage.apply(&snapshot).await?;
        write.commit();
        Ok(value)
    }

    // ---- Target ----

    pub async fn add_target(&self, name: &str, type_: &str) -> GateResult<Target> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.add_target(name, type_);
        self.persist_and_commit(write, result).await
    }

    pub async fn modify_target(&self, name: &str, type_: &str, edit: TargetAttrEdit) -> GateResult<Target> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.modify_target(name, type_, edit);
        self.persist_and_commit(write, result).await
    }

    pub async fn remove_target(&self, name: &str, type_: &str) -> GateResult<Target> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.remove_target(name, type_);
        self.persist_and_commit(write, result).await
    }

    pub fn get_targets(&self, filter: &TargetFilter) -> Vec<Target> {
        self.registry.snapshot().get_targets(filter)
    }

    // ---- Actor ----

    pub async fn add_actor(&self, name: &str, type_: &str) -> GateResult<Actor> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.add_actor(name, type_);
        self.persist_and_commit(write, result).await
    }

    pub async fn modify_actor(&self, name: &str, type_: &str, edit: ActorAttrEdit) -> GateResult<Actor> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.modify_actor(name, type_, edit);
        self.persist_and_commit(write, result).await
    }

    pub async fn remove_actor(&self, name: &str, type_: &str) -> GateResult<Actor> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.remove_actor(name, type_);
        self.persist_and_commit(write, result).await
    }

    pub fn get_actors(&self, filter: &ActorFilter) -> Vec<Actor> {
        self.registry.snapshot().get_actors(filter)
    }

    // ---- Group ----

    pub async fn add_group(&self, name: &str, description: Option<String>) -> GateResult<Group> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.add_group(name, description);
        self.persist_and_commit(write, result).await
    }

    pub async fn modify_group(&self, name: &str, edit: GroupEdit) -> GateResult<Group> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.modify_group(name, edit);
        self.persist_and_commit(write, result).await
    }

    pub async fn remove_group(&self, name: &str) -> GateResult<Group> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.remove_group(name);
        self.persist_and_commit(write, result).await
    }

    pub fn get_groups(&self, filter: &GroupFilter) -> Vec<Group> {
        self.registry.snapshot().get_groups(filter)
    }

    // ---- Role ----

    pub async fn add_role(&self, name: &str, description: Option<String>) -> GateResult<Role> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.add_role(name, description);
        self.persist_and_commit(write, result).await
    }

    pub async fn modify_role(&self, name: &str, edit: RoleEdit) -> GateResult<Role> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.modify_role(name, edit);
        self.persist_and_commit(write, result).await
    }

    pub async fn remove_role(&self, name: &str) -> GateResult<Role> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.remove_role(name);
        self.persist_and_commit(write, result).await
    }

    pub fn get_roles(&self, filter: &RoleFilter) -> Vec<Role> {
        self.registry.snapshot().get_roles(filter)
    }

    // ---- Policy ----

    pub async fn add_policy(&self, rule: PolicyRule) -> GateResult<PolicyRule> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.add_policy(rule);
        self.persist_and_commit(write, result).await
    }

    pub async fn modify_policy(&self, name: &str, rule: PolicyRule) -> GateResult<PolicyRule> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.modify_policy(name, rule);
        self.persist_and_commit(write, result).await
    }

    pub async fn remove_policy(&self, name: &str) -> GateResult<PolicyRule> {
        let mut write = self.registry.begin_write().await;
        let result = write.next.remove_policy(name);
        self.persist_and_commit(write, result).await
    }

    pub fn get_policies(&self, filter: &PolicyFilter) -> Vec<PolicyRule> {
        self.registry.snapshot().get_policies(filter)
    }

    // ---- Check ----

    /// `check(actor, env, target, action) -> ALLOW/DENY` (spec §1, §6). Never fails
    /// with anything but `InvalidArgument` (validated before this call at the RPC
    /// boundary) — enrichment and evaluation are total functions (spec §7).
    pub fn check(&self, req: &CheckRequest) -> Decision {
        if req.actor_name.is_empty() || req.actor_type.is_empty() {
            // Defensive: the RPC layer validates this before calling in; an empty
            // identity here can only mean a direct, malformed library call.
            return Decision::Deny;
        }
        let snapshot = self.registry.snapshot();
        let ctx = enrich(&snapshot, req);
        resolve(snapshot.policies.values(), &ctx)
    }

    pub fn validate_check_request(req: &CheckRequest) -> GateResult<()> {
        if req.actor_name.is_empty() || req.actor_type.is_empty() {
            return Err(GateError::invalid("actor name and type must be non-empty"));
        }
        if req.target_name.is_empty() || req.target_type.is_empty() {
            return Err(GateError::invalid("target name and type must be non-empty"));
        }
        if req.target_action.is_empty() {
            return Err(GateError::invalid("target action must be non-empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::{ActorCheck, Decision as Dec};
    use crate::storage::file::FileDriver;
    use crate::value::KvCheck;

    async fn service() -> (GateService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileDriver::new(dir.path()).unwrap());
        (GateService::bootstrap(storage).await.unwrap(), dir)
    }

    #[tokio::test]
    async fn implicit_deny_on_empty_registry() {
        let (svc, _dir) = service().await;
        let decision = svc.check(&CheckRequest {
            actor_name: "u".into(),
            actor_type: "email".into(),
            target_name: "maindb".into(),
            target_type: "db".into(),
            target_action: "read".into(),
            ..Default::default()
        });
        assert_eq!(decision, Dec::Deny);
    }

    #[tokio::test]
    async fn role_via_group_allows_member_only() {
        let (svc, _dir) = service().await;
        svc.add_group("g1", None).await.unwrap();
        svc.add_role("r1", None).await.unwrap();
        svc.modify_group("g1", GroupEdit { add_members: vec![("alice".into(), "email".into())], ..Default::default() })
            .await
            .unwrap();
        svc.modify_role("r1", RoleEdit { add_groups: vec!["g1".into()], ..Default::default() }).await.unwrap();
        svc.add_policy(PolicyRule {
            name: "p".into(),
            name_display: "p".into(),
            description: None,
            actor_check: Some(ActorCheck {
                attributes: vec![KvCheck::has("has-role", vec!["r1".into()])],
                ..Default::default()
            }),
            env_attribute_checks: vec![],
            target_check: None,
            decision: Dec::Allow,
        })
        .await
        .unwrap();

        let req_alice = CheckRequest {
            actor_name: "alice".into(),
            actor_type: "email".into(),
            target_name: "anything".into(),
            target_type: "t".into(),
            target_action: "a".into(),
            ..Default::default()
        };
        assert_eq!(svc.check(&req_alice), Dec::Allow);

        let req_bob = CheckRequest { actor_name: "bob".into(), ..req_alice };
        assert_eq!(svc.check(&req_bob), Dec::Deny);
    }

    #[tokio::test]
    async fn role_granted_via_modify_group_also_reaches_has_role() {
        // Same grant as `role_via_group_allows_member_only`, but via the other
        // documented CRUD path: ModifyGroup(add_roles=...) instead of
        // ModifyRole(add_groups=...). Both must produce the same has-role outcome.
        let (svc, _dir) = service().await;
        svc.add_group("g1", None).await.unwrap();
        svc.add_role("r1", None).await.unwrap();
        svc.modify_group(
            "g1",
            GroupEdit {
                add_members: vec![("alice".into(), "email".into())],
                add_roles: vec!["r1".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        svc.add_policy(PolicyRule {
            name: "p".into(),
            name_display: "p".into(),
            description: None,
            actor_check: Some(ActorCheck {
                attributes: vec![KvCheck::has("has-role", vec!["r1".into()])],
                ..Default::default()
            }),
            env_attribute_checks: vec![],
            target_check: None,
            decision: Dec::Allow,
        })
        .await
        .unwrap();

        let req_alice = CheckRequest {
            actor_name: "alice".into(),
            actor_type: "email".into(),
            target_name: "anything".into(),
            target_type: "t".into(),
            target_action: "a".into(),
            ..Default::default()
        };
        assert_eq!(svc.check(&req_alice), Dec::Allow);
    }

    #[tokio::test]
    async fn write_is_visible_to_subsequent_check_on_same_node() {
        let (svc, _dir) = service().await;
        svc.add_policy(PolicyRule {
            name: "p".into(),
            name_display: "p".into(),
            description: None,
            actor_check: None,
            env_attribute_checks: vec![],
            target_check: None,
            decision: Dec::Allow,
        })
        .await
        .unwrap();
        let req = CheckRequest {
            actor_name: "u".into(),
            actor_type: "t".into(),
            target_name: "x".into(),
            target_type: "y".into(),
            target_action: "z".into(),
            ..Default::default()
        };
        assert_eq!(svc.check(&req), Dec::Allow);
    }

    #[tokio::test]
    async fn modify_group_with_missing_role_leaves_registry_unchanged_and_reports_reference_missing() {
        let (svc, _dir) = service().await;
        svc.add_group("g1", None).await.unwrap();
        let err = svc
            .modify_group("g1", GroupEdit { add_roles: vec!["nosuch".into()], ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::ReferenceMissing(_)));
        let groups = svc.get_groups(&GroupFilter { name: Some("g1".into()), ..Default::default() });
        assert!(groups[0].roles.is_empty());
    }
}
