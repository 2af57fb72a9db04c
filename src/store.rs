//! File-store abstraction: every filesystem operation the pipeline performs.
//!
//! The processor and the batch driver never touch `tokio::fs` directly; they
//! go through [`FileStore`]. [`LocalStore`] is the real implementation and
//! [`MemoryStore`] keeps a tree of paths in memory so collision handling and
//! failure isolation can be tested without a disk, including injected I/O
//! errors on specific operations.
//!
//! Errors are plain [`std::io::Error`]s so callers can match on
//! [`std::io::ErrorKind::NotFound`] the same way for both implementations.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// Symlink target missing, socket, device, …
    Other,
}

/// One entry returned by [`FileStore::list_dir`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

impl DirEntry {
    /// Final path component as UTF-8, lossily.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Filesystem operations used by the renamer.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Kind of the entry at `path`; `ErrorKind::NotFound` if there is none.
    async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind>;

    /// Read the whole file.
    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate `path` and write `bytes` to it.
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Move `from` to `to`.
    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Create `path` and all missing parents. Succeeds if it already exists.
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Entries directly inside `path`, in the store's natural order.
    async fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
}

// ── Local filesystem ─────────────────────────────────────────────────────

/// [`FileStore`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

fn kind_of(ft: std::fs::FileType) -> EntryKind {
    if ft.is_file() {
        EntryKind::File
    } else if ft.is_dir() {
        EntryKind::Dir
    } else {
        EntryKind::Other
    }
}

#[async_trait]
impl FileStore for LocalStore {
    async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let meta = tokio::fs::symlink_metadata(path).await?;
        Ok(kind_of(meta.file_type()))
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, bytes).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tokio::fs::rename(from, to).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        let mut rd = tokio::fs::read_dir(path).await?;
        while let Some(entry) = rd.next_entry().await? {
            // file_type() does not follow symlinks; a link to a PDF resolves here.
            let kind = match tokio::fs::metadata(entry.path()).await {
                Ok(meta) => kind_of(meta.file_type()),
                Err(_) => EntryKind::Other,
            };
            entries.push(DirEntry {
                path: entry.path(),
                kind,
            });
        }
        Ok(entries)
    }
}

// ── In-memory store ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: BTreeMap<PathBuf, Node>,
    faults: HashMap<(&'static str, PathBuf), io::ErrorKind>,
}

/// In-memory [`FileStore`] for tests.
///
/// Paths are used exactly as given (no normalisation), so tests should build
/// them from one root with `Path::join`.
///
/// Operation names accepted by [`MemoryStore::fail`]: `"entry_kind"`,
/// `"read"`, `"write"`, `"rename"`, `"create_dir_all"`, `"list_dir"`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, creating its parent directories.
    pub fn insert_file(&self, path: impl AsRef<Path>, bytes: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut state = self.lock();
        if let Some(parent) = path.parent() {
            insert_dirs(&mut state.nodes, parent);
        }
        state.nodes.insert(path.to_path_buf(), Node::File(bytes.into()));
    }

    /// Make `operation` on `path` fail with `kind` from now on.
    pub fn fail(&self, operation: &'static str, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.lock()
            .faults
            .insert((operation, path.as_ref().to_path_buf()), kind);
    }

    /// Contents of the file at `path`, if there is one.
    pub fn file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().nodes.get(path.as_ref()) {
            Some(Node::File(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Whether anything (file or directory) exists at `path`.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.lock().nodes.contains_key(path.as_ref())
    }

    /// Names of the files directly inside `dir`, sorted.
    pub fn file_names(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let dir = dir.as_ref();
        self.lock()
            .nodes
            .iter()
            .filter(|(p, n)| matches!(n, Node::File(_)) && p.parent() == Some(dir))
            .filter_map(|(p, _)| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A panic while holding the lock only happens inside a failing test.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_fault(state: &MemoryState, operation: &'static str, path: &Path) -> io::Result<()> {
        match state.faults.get(&(operation, path.to_path_buf())) {
            Some(kind) => Err(io::Error::new(
                *kind,
                format!("injected {operation} failure for {}", path.display()),
            )),
            None => Ok(()),
        }
    }

    fn require_parent_dir(state: &MemoryState, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if parent.as_os_str().is_empty() => Ok(()),
            Some(parent) => match state.nodes.get(parent) {
                Some(Node::Dir) => Ok(()),
                _ => Err(not_found(parent)),
            },
            None => Ok(()),
        }
    }
}

fn insert_dirs(nodes: &mut BTreeMap<PathBuf, Node>, dir: &Path) {
    for ancestor in dir.ancestors() {
        if ancestor.as_os_str().is_empty() {
            continue;
        }
        nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn entry_kind(&self, path: &Path) -> io::Result<EntryKind> {
        let state = self.lock();
        Self::check_fault(&state, "entry_kind", path)?;
        match state.nodes.get(path) {
            Some(Node::File(_)) => Ok(EntryKind::File),
            Some(Node::Dir) => Ok(EntryKind::Dir),
            None => Err(not_found(path)),
        }
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.lock();
        Self::check_fault(&state, "read", path)?;
        match state.nodes.get(path) {
            Some(Node::File(bytes)) => Ok(bytes.clone()),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: is a directory", path.display()),
            )),
            None => Err(not_found(path)),
        }
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        Self::check_fault(&state, "write", path)?;
        Self::require_parent_dir(&state, path)?;
        if let Some(Node::Dir) = state.nodes.get(path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{}: is a directory", path.display()),
            ));
        }
        state.nodes.insert(path.to_path_buf(), Node::File(bytes.to_vec()));
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut state = self.lock();
        Self::check_fault(&state, "rename", from)?;
        Self::require_parent_dir(&state, to)?;
        match state.nodes.get(from) {
            Some(Node::File(_)) => {}
            Some(Node::Dir) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "MemoryStore only renames files",
                ))
            }
            None => return Err(not_found(from)),
        }
        if let Some(node) = state.nodes.remove(from) {
            state.nodes.insert(to.to_path_buf(), node);
        }
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.lock();
        Self::check_fault(&state, "create_dir_all", path)?;
        if let Some(Node::File(_)) = state.nodes.get(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{}: exists and is a file", path.display()),
            ));
        }
        insert_dirs(&mut state.nodes, path);
        Ok(())
    }

    async fn list_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let state = self.lock();
        Self::check_fault(&state, "list_dir", path)?;
        match state.nodes.get(path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("{}: not a directory", path.display()),
                ))
            }
            None => return Err(not_found(path)),
        }
        Ok(state
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .map(|(p, n)| DirEntry {
                path: p.clone(),
                kind: match n {
                    Node::File(_) => EntryKind::File,
                    Node::Dir => EntryKind::Dir,
                },
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_write_requires_parent() {
        let store = MemoryStore::new();
        let err = store
            .write(Path::new("/root/out/a.pdf"), b"x")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);

        store.create_dir_all(Path::new("/root/out")).await.unwrap();
        store.write(Path::new("/root/out/a.pdf"), b"x").await.unwrap();
        assert_eq!(store.file("/root/out/a.pdf").as_deref(), Some(&b"x"[..]));
    }

    #[tokio::test]
    async fn memory_store_create_dir_all_is_idempotent() {
        let store = MemoryStore::new();
        store.create_dir_all(Path::new("/root/in")).await.unwrap();
        store.create_dir_all(Path::new("/root/in")).await.unwrap();
        assert_eq!(
            store.entry_kind(Path::new("/root")).await.unwrap(),
            EntryKind::Dir
        );
    }

    #[tokio::test]
    async fn memory_store_lists_direct_children_only() {
        let store = MemoryStore::new();
        store.insert_file("/root/in/a.pdf", b"a".to_vec());
        store.insert_file("/root/in/sub/b.pdf", b"b".to_vec());

        let entries = store.list_dir(Path::new("/root/in")).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.file_name(), e.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("a.pdf".to_string(), EntryKind::File),
                ("sub".to_string(), EntryKind::Dir)
            ]
        );
    }

    #[tokio::test]
    async fn memory_store_rename_moves_bytes() {
        let store = MemoryStore::new();
        store.insert_file("/root/in/a.pdf", b"pdf".to_vec());
        store.create_dir_all(Path::new("/root/processed")).await.unwrap();

        store
            .rename(Path::new("/root/in/a.pdf"), Path::new("/root/processed/a.pdf"))
            .await
            .unwrap();
        assert!(!store.contains("/root/in/a.pdf"));
        assert_eq!(store.file("/root/processed/a.pdf").as_deref(), Some(&b"pdf"[..]));
    }

    #[tokio::test]
    async fn memory_store_injected_fault() {
        let store = MemoryStore::new();
        store.insert_file("/root/in/a.pdf", b"pdf".to_vec());
        store.fail("read", "/root/in/a.pdf", io::ErrorKind::PermissionDenied);

        let err = store.read(Path::new("/root/in/a.pdf")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn local_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore;
        let sub = dir.path().join("out");
        store.create_dir_all(&sub).await.unwrap();
        store.create_dir_all(&sub).await.unwrap();

        let file = sub.join("a.pdf");
        store.write(&file, b"%PDF-1.4").await.unwrap();
        assert_eq!(store.entry_kind(&file).await.unwrap(), EntryKind::File);
        assert_eq!(store.read(&file).await.unwrap(), b"%PDF-1.4");

        let missing = store.entry_kind(&sub.join("nope.pdf")).await.unwrap_err();
        assert_eq!(missing.kind(), io::ErrorKind::NotFound);

        let listed = store.list_dir(&sub).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name(), "a.pdf");
    }
}
