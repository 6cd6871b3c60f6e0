//! Single-node storage driver: one JSON file per [`EntityKind`] under a root directory,
//! each written through a temp-file-then-rename (same discipline as the teacher's
//! `kv.rs::save_snapshot`, which writes a `.bin.tmp` sibling and renames it over the
//! real path so a reader never observes a half-written file). A corrupt or missing file
//! for one kind is logged and treated as empty rather than failing the whole load, so
//! damage to `roles.json` never prevents `targets.json` from loading (spec §6).

use super::{ChangeNotice, EntityKind, Snapshot, StorageDriver};
use crate::error::{GateError, GateResult};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

pub struct FileDriver {
    root: PathBuf,
}

impl FileDriver {
    pub fn new<P: AsRef<Path>>(root: P) -> GateResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|e| GateError::storage(format!("create storage root: {e}")))?;
        Ok(Self { root })
    }

    fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.root.join(format!("{}.json", kind.stem()))
    }

    /// Loads one kind's file in isolation. A missing file is empty; a corrupt one is
    /// logged and treated as empty so the other kinds still load.
    async fn load_kind<T: DeserializeOwned>(&self, kind: EntityKind) -> Vec<T> {
        let path = self.path_for(kind);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::error!(kind = kind.stem(), path = %path.display(), error = %e, "failed to read entity file, treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(kind = kind.stem(), path = %path.display(), error = %e, "failed to parse entity file, treating as empty");
                Vec::new()
            }
        }
    }

    async fn apply_kind<T: Serialize + Sync>(&self, kind: EntityKind, items: &[T]) -> GateResult<()> {
        let path = self.path_for(kind);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(items).map_err(|e| GateError::internal(format!("encode {}: {e}", kind.stem())))?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| GateError::storage(format!("write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| GateError::storage(format!("rename {} -> {}: {e}", tmp.display(), path.display())))?;
        Ok(())
    }
}

#[async_trait]
impl StorageDriver for FileDriver {
    async fn load(&self) -> GateResult<Snapshot> {
        Ok(Snapshot {
            targets: self.load_kind(EntityKind::Targets).await,
            actors: self.load_kind(EntityKind::Actors).await,
            groups: self.load_kind(EntityKind::Groups).await,
            roles: self.load_kind(EntityKind::Roles).await,
            policies: self.load_kind(EntityKind::Policies).await,
        })
    }

    async fn apply(&self, snapshot: &Snapshot) -> GateResult<()> {
        self.apply_kind(EntityKind::Targets, &snapshot.targets).await?;
        self.apply_kind(EntityKind::Actors, &snapshot.actors).await?;
        self.apply_kind(EntityKind::Groups, &snapshot.groups).await?;
        self.apply_kind(EntityKind::Roles, &snapshot.roles).await?;
        self.apply_kind(EntityKind::Policies, &snapshot.policies).await?;
        Ok(())
    }

    fn watch(&self) -> BoxStream<'static, ChangeNotice> {
        // Single node: there is no other writer to notice. Spec §6 treats this as the
        // common case; the stream simply never yields.
        Box::pin(stream::pending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::model::{Actor, Target};
    use std::collections::{HashMap, HashSet};

    #[tokio::test]
    async fn round_trips_an_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FileDriver::new(dir.path()).unwrap();
        let loaded = driver.load().await.unwrap();
        assert!(loaded.targets.is_empty());
    }

    #[tokio::test]
    async fn round_trips_a_populated_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FileDriver::new(dir.path()).unwrap();
        let snapshot = Snapshot {
            targets: vec![Target {
                name: "maindb".into(),
                name_display: "MainDB".into(),
                type_: "db".into(),
                type_display: "DB".into(),
                actions: HashSet::from(["read".into()]),
                attributes: HashMap::new(),
            }],
            actors: vec![Actor {
                name: "alice".into(),
                name_display: "Alice".into(),
                type_: "email".into(),
                type_display: "Email".into(),
                attributes: HashMap::new(),
            }],
            groups: vec![],
            roles: vec![],
            policies: vec![],
        };
        driver.apply(&snapshot).await.unwrap();
        let loaded = driver.load().await.unwrap();
        assert_eq!(loaded.targets.len(), 1);
        assert_eq!(loaded.targets[0].name, "maindb");
        assert_eq!(loaded.actors[0].name, "alice");
    }

    #[tokio::test]
    async fn apply_writes_one_file_per_entity_kind() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FileDriver::new(dir.path()).unwrap();
        driver.apply(&Snapshot::default()).await.unwrap();
        for kind in EntityKind::ALL {
            assert!(dir.path().join(format!("{}.json", kind.stem())).exists());
            assert!(!dir.path().join(format!("{}.json.tmp", kind.stem())).exists());
        }
    }

    #[tokio::test]
    async fn corrupt_file_for_one_kind_does_not_prevent_loading_others() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FileDriver::new(dir.path()).unwrap();
        driver.apply(&Snapshot::from(&{
            let mut state = crate::registry::RegistryState::default();
            state.add_target("maindb", "db").unwrap();
            state.add_actor("alice", "email").unwrap();
            state
        })).await.unwrap();

        tokio::fs::write(dir.path().join("roles.json"), b"not valid json{{{").await.unwrap();

        let loaded = driver.load().await.unwrap();
        assert_eq!(loaded.targets.len(), 1);
        assert_eq!(loaded.actors.len(), 1);
        assert!(loaded.roles.is_empty());
    }
}
