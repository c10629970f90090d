//! I/O boundary traits for testability
//!
//! These traits abstract the collaborators the engine talks to, allowing
//! services to be tested with mock implementations.

use std::io;
use std::path::Path;

use crate::domain::NodeId;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// File names of the entries directly inside `path`.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Rename/move a file.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;

    /// Write via a sibling temp file and rename over the target, so readers
    /// never observe a half-written snapshot.
    fn write_atomic(&self, path: &Path, content: &str) -> io::Result<()> {
        self.ensure_parent(path)?;
        let tmp = path.with_extension("tmp");
        self.write(&tmp, content)?;
        self.rename(&tmp, path)
    }
}

/// Store of resources holding a foreign key into a tree namespace
/// (e.g. operators carrying a `categoryId`).
///
/// Invoked synchronously during delete, before the nodes are detached.
pub trait ReferenceStore: Send + Sync {
    /// Node the store wants orphaned resources moved onto, if any.
    /// The engine resolves it against the forest before deleting.
    fn reassign_target(&self) -> Option<NodeId> {
        None
    }

    /// Move every resource referencing one of `ids` onto `fallback`, or
    /// purge them when `fallback` is `None`. `fallback` always names a
    /// node that survives the delete.
    fn purge_or_reassign(&self, ids: &[NodeId], fallback: Option<NodeId>);
}

/// Reference store for namespaces nothing points into.
#[derive(Debug, Default)]
pub struct NoopReferenceStore;

impl ReferenceStore for NoopReferenceStore {
    fn purge_or_reassign(&self, _ids: &[NodeId], _fallback: Option<NodeId>) {}
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
