//! Recursive discovery of git repositories under a set of root directories.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum LocateError {
    /// Traversal of one root failed for a reason other than a
    /// permission-denied entry.
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },
}

impl std::fmt::Display for LocateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocateError::Walk { root, source } => {
                write!(f, "walking directory {} failed: {}", root.display(), source)
            }
        }
    }
}

impl std::error::Error for LocateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocateError::Walk { source, .. } => Some(source),
        }
    }
}

/// Walk each root depth-first and invoke `on_repo` once per repository found,
/// passing the repository root (the parent of its `.git` directory).
///
/// The marker is detected by name, not contents. The `.git` subtree itself is
/// never descended into, so nested repositories elsewhere in the tree are
/// still found. Permission-denied on an individual entry is swallowed; any
/// other traversal error aborts that root's walk.
pub fn find_repositories<F>(roots: &[PathBuf], mut on_repo: F) -> Result<(), LocateError>
where
    F: FnMut(&Path),
{
    for root in roots {
        let mut walker = WalkDir::new(root).into_iter();
        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_permission_denied(&err) => continue,
                Err(err) => {
                    return Err(LocateError::Walk {
                        root: root.clone(),
                        source: err,
                    })
                }
            };

            if entry.file_type().is_dir() && entry.file_name() == ".git" {
                if let Some(repo) = entry.path().parent() {
                    on_repo(repo);
                }
                walker.skip_current_dir();
            }
        }
    }
    Ok(())
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .map(|e| e.kind() == io::ErrorKind::PermissionDenied)
        .unwrap_or(false)
}
