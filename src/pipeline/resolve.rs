//! Collision-avoidant path resolution.
//!
//! Given `out/250101_shell.pdf`, probe the store and return the first free
//! name among `250101_shell.pdf`, `250101_shell_1.pdf`, `250101_shell_2.pdf`,
//! … Nothing is cached between calls; every resolution probes afresh.

use crate::error::InvoiceError;
use crate::store::FileStore;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Upper bound on suffix attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 10_000;

/// `{dir}/{stem}_{attempt}{ext}` for `desired`.
fn suffixed(desired: &Path, attempt: u32) -> PathBuf {
    let stem = desired
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match desired.extension() {
        Some(ext) => format!("{stem}_{attempt}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{attempt}"),
    };
    desired.with_file_name(name)
}

/// Return `desired` or the first `_N`-suffixed variant that does not exist.
///
/// Only "not found" counts as free. Any other probe error (permission
/// denied, I/O error) is returned immediately and not retried.
pub async fn resolve_unique(
    store: &dyn FileStore,
    desired: &Path,
) -> Result<PathBuf, InvoiceError> {
    if desired.file_name().is_none() {
        return Err(InvoiceError::NoFileName {
            path: desired.to_path_buf(),
        });
    }

    let mut candidate = desired.to_path_buf();
    for attempt in 0..=MAX_ATTEMPTS {
        if attempt > 0 {
            candidate = suffixed(desired, attempt);
        }
        match store.entry_kind(&candidate).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if attempt > 0 {
                    debug!(
                        "{} taken, using {}",
                        desired.display(),
                        candidate.display()
                    );
                }
                return Ok(candidate);
            }
            Err(e) => return Err(InvoiceError::io("probe", candidate, e)),
            Ok(_) => continue,
        }
    }

    Err(InvoiceError::TooManyCollisions {
        path: desired.to_path_buf(),
        attempts: MAX_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn suffixed_inserts_before_extension() {
        assert_eq!(
            suffixed(Path::new("/r/out/250101_shell.pdf"), 3),
            PathBuf::from("/r/out/250101_shell_3.pdf")
        );
        assert_eq!(
            suffixed(Path::new("/r/out/noext"), 1),
            PathBuf::from("/r/out/noext_1")
        );
    }

    #[tokio::test]
    async fn free_path_is_returned_unchanged() {
        let store = MemoryStore::new();
        store.insert_file("/r/out/other.pdf", b"x".to_vec());
        let p = resolve_unique(&store, Path::new("/r/out/250101_shell.pdf"))
            .await
            .unwrap();
        assert_eq!(p, PathBuf::from("/r/out/250101_shell.pdf"));
    }

    #[tokio::test]
    async fn collisions_get_increasing_suffixes() {
        let store = MemoryStore::new();
        let desired = Path::new("/r/out/250101_shell.pdf");
        store.insert_file(desired, b"x".to_vec());

        let first = resolve_unique(&store, desired).await.unwrap();
        assert_eq!(first, PathBuf::from("/r/out/250101_shell_1.pdf"));
        store.insert_file(&first, b"y".to_vec());

        let second = resolve_unique(&store, desired).await.unwrap();
        assert_eq!(second, PathBuf::from("/r/out/250101_shell_2.pdf"));
    }

    #[tokio::test]
    async fn gap_in_suffixes_is_reused() {
        let store = MemoryStore::new();
        store.insert_file("/r/out/a.pdf", b"x".to_vec());
        store.insert_file("/r/out/a_2.pdf", b"x".to_vec());
        let p = resolve_unique(&store, Path::new("/r/out/a.pdf")).await.unwrap();
        assert_eq!(p, PathBuf::from("/r/out/a_1.pdf"));
    }

    #[tokio::test]
    async fn directory_counts_as_taken() {
        let store = MemoryStore::new();
        store.insert_file("/r/out/a.pdf/inner", b"x".to_vec());
        let p = resolve_unique(&store, Path::new("/r/out/a.pdf")).await.unwrap();
        assert_eq!(p, PathBuf::from("/r/out/a_1.pdf"));
    }

    #[tokio::test]
    async fn probe_error_propagates() {
        let store = MemoryStore::new();
        store.fail(
            "entry_kind",
            "/r/out/a.pdf",
            io::ErrorKind::PermissionDenied,
        );
        let err = resolve_unique(&store, Path::new("/r/out/a.pdf"))
            .await
            .unwrap_err();
        match err {
            InvoiceError::Io { operation, source, .. } => {
                assert_eq!(operation, "probe");
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
