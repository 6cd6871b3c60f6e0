//! Environment-driven configuration (spec §6, ambient addition per SPEC_FULL.md §7).
//!
//! Named the way clarium's `main.rs` reads `CLARIUM_HTTP_PORT`/`CLARIUM_PG_PORT`/
//! `CLARIUM_DB_FOLDER`: a handful of env vars, sensible defaults, logged once at
//! startup.

use std::path::PathBuf;

/// `GATESTORAGE` selects the storage backend (spec §6):
/// - `file:{absolute path}` — filesystem backend rooted at path; default
///   `/tmp/gatehouse` when unset.
/// - `etcd:{url}` — connect to etcd at the given endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    File(PathBuf),
    Etcd(String),
}

pub const DEFAULT_FILE_ROOT: &str = "/tmp/gatehouse";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:50051";

impl StorageConfig {
    /// Parses the `GATESTORAGE` env var value. Unset is not an error; it defaults to
    /// the local file backend (spec §6).
    pub fn parse(raw: Option<&str>) -> Result<Self, String> {
        let raw = match raw {
            None => return Ok(StorageConfig::File(PathBuf::from(DEFAULT_FILE_ROOT))),
            Some(r) => r,
        };
        if let Some(path) = raw.strip_prefix("file:") {
            if path.is_empty() {
                return Err("GATESTORAGE=file: requires a path".to_string());
            }
            return Ok(StorageConfig::File(PathBuf::from(path)));
        }
        if let Some(url) = raw.strip_prefix("etcd:") {
            if url.is_empty() {
                return Err("GATESTORAGE=etcd: requires a url".to_string());
            }
            return Ok(StorageConfig::Etcd(url.to_string()));
        }
        Err(format!("unrecognized GATESTORAGE value '{raw}' (expected file:... or etcd:...)"))
    }

    pub fn from_env() -> Result<Self, String> {
        Self::parse(std::env::var("GATESTORAGE").ok().as_deref())
    }
}

/// `GATEHOUSE_BIND` gives the gRPC listen address; transport plumbing a running
/// service needs but the distilled spec didn't state (SPEC_FULL.md §7).
pub fn bind_addr_from_env() -> String {
    std::env::var("GATEHOUSE_BIND").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_defaults_to_file_backend() {
        assert_eq!(StorageConfig::parse(None).unwrap(), StorageConfig::File(PathBuf::from(DEFAULT_FILE_ROOT)));
    }

    #[test]
    fn parses_file_prefix() {
        assert_eq!(
            StorageConfig::parse(Some("file:/var/lib/gatehouse")).unwrap(),
            StorageConfig::File(PathBuf::from("/var/lib/gatehouse"))
        );
    }

    #[test]
    fn parses_etcd_prefix() {
        assert_eq!(
            StorageConfig::parse(Some("etcd:http://localhost:2379")).unwrap(),
            StorageConfig::Etcd("http://localhost:2379".to_string())
        );
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(StorageConfig::parse(Some("s3:bucket")).is_err());
    }

    #[test]
    fn rejects_empty_path() {
        assert!(StorageConfig::parse(Some("file:")).is_err());
    }
}
