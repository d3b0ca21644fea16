//! Keeps the speaker config file in line with the configured neighbors.
//!
//! The file is treated as a sequence of top-level `neighbor <address> { }`
//! stanzas and opaque text. Only stanzas are ever rewritten; everything else is
//! carried over byte-for-byte and in order.

mod document;
mod stanza;

pub use document::{Document, Segment, Stanza};
pub use stanza::render;

use std::fs;
use std::io::{self, Write};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::NeighborSpec;

/// Insert/replace (`Some`) or remove (`None`) the stanza keyed by `address`
///
/// Returns the new document and whether a stanza for `address` existed before.
/// Applying the same change twice gives the same document both times.
pub fn upsert(document: &str, address: IpAddr, neighbor: Option<&NeighborSpec>) -> (String, bool) {
    let mut doc = Document::parse(document);
    let existed = match neighbor {
        Some(neighbor) => doc.upsert(address, render(address, neighbor)),
        None => doc.remove(address),
    };
    (doc.to_string(), existed)
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Unable to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Unable to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("Config file task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of a reconciliation against the config file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    /// The file contents changed and were replaced
    pub written: bool,
    /// A stanza for this neighbor was present beforehand
    pub existed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Upsert,
    // Only replace an existing stanza
    Update,
    Remove,
}

/// Single writer for one speaker config file
///
/// Every read-modify-write cycle holds `lock`, so concurrent changes can't
/// overwrite each other.
#[derive(Debug)]
pub struct Reconciler {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Reconciler {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Add a neighbor stanza, or replace the existing one
    pub async fn upsert(&self, neighbor: &NeighborSpec) -> Result<Reconciled, ReconcileError> {
        self.apply(neighbor.address, Some(neighbor.clone()), Mode::Upsert)
            .await
    }

    /// Replace an existing neighbor stanza, nothing is written if it doesn't exist
    pub async fn update(&self, neighbor: &NeighborSpec) -> Result<Reconciled, ReconcileError> {
        self.apply(neighbor.address, Some(neighbor.clone()), Mode::Update)
            .await
    }

    pub async fn remove(&self, address: IpAddr) -> Result<Reconciled, ReconcileError> {
        self.apply(address, None, Mode::Remove).await
    }

    /// Neighbor stanzas currently in the config file
    pub async fn neighbors(&self) -> Result<Vec<Stanza>, ReconcileError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let contents = tokio::task::spawn_blocking(move || read_document(&path)).await??;
        Ok(Document::parse(&contents).stanzas().cloned().collect())
    }

    async fn apply(
        &self,
        address: IpAddr,
        neighbor: Option<NeighborSpec>,
        mode: Mode,
    ) -> Result<Reconciled, ReconcileError> {
        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        let reconciled = tokio::task::spawn_blocking(move || {
            let current = read_document(&path)?;
            if mode == Mode::Update && Document::parse(&current).get(address).is_none() {
                return Ok(Reconciled {
                    written: false,
                    existed: false,
                });
            }
            let (updated, existed) = upsert(&current, address, neighbor.as_ref());
            let written = updated != current;
            if written {
                write_document(&path, &updated)?;
            }
            Ok::<_, ReconcileError>(Reconciled { written, existed })
        })
        .await??;

        debug!(
            "Reconciled {} in {} ({:?}): {:?}",
            address,
            self.path.display(),
            mode,
            reconciled
        );
        if reconciled.written {
            info!("Updated {} for neighbor {}", self.path.display(), address);
        }
        Ok(reconciled)
    }
}

/// A config file that doesn't exist yet reads as empty
fn read_document(path: &Path) -> Result<String, ReconcileError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(source) => Err(ReconcileError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write to a temp file next to `path`, then rename it over `path`
///
/// A crash part-way leaves either the old or the new file, never a truncated one.
fn write_document(path: &Path, contents: &str) -> Result<(), ReconcileError> {
    let write_err = |source| ReconcileError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(contents.as_bytes()).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;
    // Temp files are created owner-only, keep whatever the speaker could read before
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(file.path(), metadata.permissions()).map_err(write_err)?;
    }
    file.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Capabilities;

    fn neighbor(address: &str) -> NeighborSpec {
        let mut neighbor = NeighborSpec::new(address.parse().unwrap());
        neighbor.peer_as = Some(65010);
        neighbor
    }

    #[test]
    fn test_upsert_into_empty_document() {
        let spec = neighbor("10.0.0.1");
        let (doc, existed) = upsert("", spec.address, Some(&spec));
        assert!(!existed);
        let parsed = Document::parse(&doc);
        let stanzas: Vec<_> = parsed.stanzas().collect();
        assert_eq!(stanzas.len(), 1);
        assert_eq!(stanzas[0].address(), spec.address);
        assert!(doc.contains("    peer-as 65010;\n"));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let base = "process api {\n    run ./api;\n}\n";
        let mut spec = neighbor("10.0.0.1");
        spec.capability = Some(Capabilities {
            route_refresh: false,
        });
        let (first, existed) = upsert(base, spec.address, Some(&spec));
        assert!(!existed);
        let (second, existed) = upsert(&first, spec.address, Some(&spec));
        assert!(existed);
        assert_eq!(first, second);
        assert!(first.starts_with(base));
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let base = "neighbor 10.0.0.1 {\n    peer-as 1;\n}\n\nneighbor 10.0.0.2 {\n}\n";
        let spec = neighbor("10.0.0.1");
        let (doc, existed) = upsert(base, spec.address, Some(&spec));
        assert!(existed);
        assert_eq!(
            doc,
            "neighbor 10.0.0.1 {\n    peer-as 65010;\n}\n\nneighbor 10.0.0.2 {\n}\n"
        );
    }

    #[test]
    fn test_remove_missing_is_unchanged() {
        let base = "neighbor 10.0.0.2 {\n}\n";
        let (doc, existed) = upsert(base, "10.0.0.1".parse().unwrap(), None);
        assert!(!existed);
        assert_eq!(doc, base);
    }

    #[test]
    fn test_rendered_stanza_is_locatable() {
        let spec = neighbor("2001:db8::1");
        let stanza = render(spec.address, &spec);
        let doc = Document::parse(&stanza);
        assert_eq!(doc.get(spec.address).map(Stanza::text), Some(stanza.as_str()));
        // Same address, different spelling
        assert!(doc.get("2001:0db8::0001".parse().unwrap()).is_some());
    }

    #[tokio::test]
    async fn test_reconciler_file_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exabgp.conf");
        fs::write(&path, "process api {\n}\n").unwrap();
        let reconciler = Reconciler::new(&path);
        let spec = neighbor("10.0.0.1");

        let result = reconciler.upsert(&spec).await.unwrap();
        assert_eq!(
            result,
            Reconciled {
                written: true,
                existed: false
            }
        );
        let result = reconciler.upsert(&spec).await.unwrap();
        assert_eq!(
            result,
            Reconciled {
                written: false,
                existed: true
            }
        );

        let neighbors = reconciler.neighbors().await.unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].attribute("peer-as").as_deref(), Some("65010"));

        let result = reconciler.remove(spec.address).await.unwrap();
        assert!(result.existed && result.written);
        assert_eq!(fs::read_to_string(&path).unwrap(), "process api {\n}\n");

        let result = reconciler.remove(spec.address).await.unwrap();
        assert!(!result.existed && !result.written);
    }

    #[tokio::test]
    async fn test_reconciler_update_requires_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exabgp.conf");
        let reconciler = Reconciler::new(&path);

        let result = reconciler.update(&neighbor("10.0.0.1")).await.unwrap();
        assert!(!result.existed && !result.written);
        assert!(!path.exists());

        reconciler.upsert(&neighbor("10.0.0.1")).await.unwrap();
        let mut changed = neighbor("10.0.0.1");
        changed.peer_as = Some(65099);
        let result = reconciler.update(&changed).await.unwrap();
        assert!(result.existed && result.written);
        assert!(fs::read_to_string(&path).unwrap().contains("peer-as 65099;"));
    }

    #[tokio::test]
    async fn test_reconciler_concurrent_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exabgp.conf");
        let reconciler = std::sync::Arc::new(Reconciler::new(&path));

        let tasks: Vec<_> = (1..=20)
            .map(|i| {
                let reconciler = reconciler.clone();
                tokio::spawn(async move {
                    reconciler
                        .upsert(&neighbor(&format!("10.0.0.{}", i)))
                        .await
                        .unwrap()
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let neighbors = reconciler.neighbors().await.unwrap();
        assert_eq!(neighbors.len(), 20);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_reconciler_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exabgp.conf");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        Reconciler::new(&path)
            .upsert(&neighbor("10.0.0.1"))
            .await
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
