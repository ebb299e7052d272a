use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during file operations
#[derive(Debug, Error)]
pub enum FileOperationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed { path: PathBuf, source: io::Error },

    #[error("Failed to move {from} to {to}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Failed to copy {from} to {to}: {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("Destination {0} is outside of the media directory")]
    OutsideRoot(PathBuf),
}

/// Represents a planned file operation (rename or copy)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    /// Source file path
    pub source: PathBuf,
    /// Destination file path
    pub destination: PathBuf,
    /// Duplicate suffix applied (if any)
    pub duplicate_suffix: Option<usize>,
}

/// Appends ` (n)` to the file stem, keeping the extension
fn with_suffix(path: &Path, suffix: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{} ({}).{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{} ({})", stem, suffix),
    };
    path.with_file_name(name)
}

/// Plans file operations with duplicate handling via suffix strategy
///
/// `targets` pairs each source file with the destination its metadata
/// renders to, below `root`. With `output_dir` set, destinations are moved
/// from `root` to the output directory (copy mode).
///
/// Files already at their destination are left out. When two files claim
/// the same destination, or the destination is taken on disk, a numeric
/// suffix starting from 2 is added:
/// - First occurrence: `name.ext`
/// - Second occurrence: `name (2).ext`
/// - Third occurrence: `name (3).ext`
pub fn plan_operations(
    targets: &[(PathBuf, PathBuf)],
    root: &Path,
    output_dir: Option<&Path>,
) -> Result<Vec<PlannedOperation>, FileOperationError> {
    let mut claimed: HashSet<PathBuf> = HashSet::new();
    let mut pending = Vec::new();

    for (source, destination) in targets {
        let destination = match output_dir {
            Some(output) => {
                let relative = destination
                    .strip_prefix(root)
                    .map_err(|_| FileOperationError::OutsideRoot(destination.clone()))?;
                output.join(relative)
            }
            None => destination.clone(),
        };

        if output_dir.is_none() && *source == destination {
            debug!(file = %source.display(), "file is already named correctly");
            claimed.insert(destination);
            continue;
        }
        pending.push((source, destination));
    }

    let mut operations = Vec::new();
    for (source, destination) in pending {
        let mut candidate = destination.clone();
        let mut suffix = None;
        let mut next = 2;
        while claimed.contains(&candidate) || (candidate.exists() && candidate != *source) {
            candidate = with_suffix(&destination, next);
            suffix = Some(next);
            next += 1;
        }

        // A suffixed duplicate from an earlier run is already in place
        if candidate == *source {
            debug!(file = %source.display(), "file is already named correctly");
            claimed.insert(candidate);
            continue;
        }

        claimed.insert(candidate.clone());
        operations.push(PlannedOperation {
            source: source.clone(),
            destination: candidate,
            duplicate_suffix: suffix,
        });
    }

    Ok(operations)
}

fn create_parent(path: &Path) -> Result<(), FileOperationError> {
    match path.parent() {
        Some(parent) => {
            fs::create_dir_all(parent).map_err(|source| FileOperationError::CreateDirectoryFailed {
                path: parent.to_path_buf(),
                source,
            })
        }
        None => Ok(()),
    }
}

/// Executes rename operations in place
///
/// Missing destination directories are created. Failures do not stop the
/// remaining operations and are returned.
pub fn execute_rename(operations: &[PlannedOperation]) -> Vec<FileOperationError> {
    let mut errors = Vec::new();

    for op in operations {
        let result = create_parent(&op.destination).and_then(|_| {
            fs::rename(&op.source, &op.destination).map_err(|source| {
                FileOperationError::RenameFailed {
                    from: op.source.clone(),
                    to: op.destination.clone(),
                    source,
                }
            })
        });
        if let Err(e) = result {
            warn!(file = %op.source.display(), error = %e, "rename failed");
            errors.push(e);
        }
    }

    errors
}

/// Executes copy operations to output directory
///
/// Creates the output directory if it doesn't exist.
pub fn execute_copy(
    operations: &[PlannedOperation],
    output_dir: &Path,
) -> Result<Vec<FileOperationError>, FileOperationError> {
    fs::create_dir_all(output_dir)?;

    let mut errors = Vec::new();

    for op in operations {
        let result = create_parent(&op.destination).and_then(|_| {
            fs::copy(&op.source, &op.destination)
                .map(|_| ())
                .map_err(|source| FileOperationError::CopyFailed {
                    from: op.source.clone(),
                    to: op.destination.clone(),
                    source,
                })
        });
        if let Err(e) = result {
            warn!(file = %op.source.display(), error = %e, "copy failed");
            errors.push(e);
        }
    }

    Ok(errors)
}

/// Removes directories left empty after moving files out of them
///
/// Walks up from each source's directory towards `root`, which itself is
/// never removed. Returns the removed directories.
pub fn prune_empty_dirs(operations: &[PlannedOperation], root: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    for op in operations {
        let mut current = op.source.parent();
        while let Some(dir) = current {
            if dir == root || !dir.starts_with(root) {
                break;
            }
            let is_empty = fs::read_dir(dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty {
                break;
            }
            if let Err(e) = fs::remove_dir(dir) {
                warn!(dir = %dir.display(), error = %e, "failed to remove empty directory");
                break;
            }
            debug!(dir = %dir.display(), "removed empty directory");
            removed.push(dir.to_path_buf());
            current = dir.parent();
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(
            with_suffix(Path::new("/tv/Heroes/01 02 - Title.avi"), 2),
            PathBuf::from("/tv/Heroes/01 02 - Title (2).avi")
        );
        assert_eq!(with_suffix(Path::new("/tv/README"), 3), PathBuf::from("/tv/README (3)"));
    }

    #[test]
    fn test_plan_duplicates_get_suffixes() {
        let root = Path::new("/nonexistent/tv");
        let dest = root.join("Heroes/Season 1/01 02 - Title.avi");
        let targets = vec![
            (root.join("a.avi"), dest.clone()),
            (root.join("b.avi"), dest.clone()),
            (root.join("c.avi"), dest.clone()),
        ];

        let ops = plan_operations(&targets, root, None).unwrap();
        let suffixes: Vec<_> = ops.iter().map(|op| op.duplicate_suffix).collect();
        assert_eq!(suffixes, vec![None, Some(2), Some(3)]);
        assert_eq!(
            ops[2].destination,
            root.join("Heroes/Season 1/01 02 - Title (3).avi")
        );
    }

    #[test]
    fn test_plan_skips_correctly_named_files() {
        let root = Path::new("/nonexistent/tv");
        let dest = root.join("Heroes/Season 1/01 02 - Title.avi");
        let targets = vec![
            (root.join("copy.avi"), dest.clone()),
            (dest.clone(), dest.clone()),
        ];

        let ops = plan_operations(&targets, root, None).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].source, root.join("copy.avi"));
        assert_eq!(ops[0].duplicate_suffix, Some(2));
    }

    #[test]
    fn test_plan_avoids_existing_files() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("Heat (1995).avi");
        write(&dest, "other");

        let targets = vec![(dir.path().join("heat.avi"), dest)];
        let ops = plan_operations(&targets, dir.path(), None).unwrap();
        assert_eq!(ops[0].destination, dir.path().join("Heat (1995) (2).avi"));
    }

    #[test]
    fn test_plan_copy_rebases_destinations() {
        let root = Path::new("/nonexistent/tv");
        let output = Path::new("/nonexistent/out");
        let targets = vec![(root.join("a.avi"), root.join("Heroes/Season 1/a.avi"))];

        let ops = plan_operations(&targets, root, Some(output)).unwrap();
        assert_eq!(ops[0].destination, output.join("Heroes/Season 1/a.avi"));

        let outside = vec![(root.join("a.avi"), PathBuf::from("/elsewhere/a.avi"))];
        assert!(matches!(
            plan_operations(&outside, root, Some(output)),
            Err(FileOperationError::OutsideRoot(_))
        ));
    }

    #[test]
    fn test_execute_rename_and_prune() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let source = root.join("incoming/batch/heroes.s01e02.avi");
        write(&source, "video");

        let targets = vec![(source.clone(), root.join("Heroes/Season 1/01 02 - Title.avi"))];
        let ops = plan_operations(&targets, root, None).unwrap();
        let errors = execute_rename(&ops);

        assert!(errors.is_empty());
        assert!(!source.exists());
        assert_eq!(
            fs::read_to_string(root.join("Heroes/Season 1/01 02 - Title.avi")).unwrap(),
            "video"
        );

        let removed = prune_empty_dirs(&ops, root);
        assert_eq!(removed, vec![root.join("incoming/batch"), root.join("incoming")]);
        assert!(root.exists());
    }

    #[test]
    fn test_execute_rename_collects_errors() {
        let dir = TempDir::new().unwrap();
        let ops = vec![PlannedOperation {
            source: dir.path().join("missing.avi"),
            destination: dir.path().join("target.avi"),
            duplicate_suffix: None,
        }];

        let errors = execute_rename(&ops);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], FileOperationError::RenameFailed { .. }));
    }

    #[test]
    fn test_execute_copy_keeps_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("tv/heat.avi");
        write(&source, "video");
        let output = dir.path().join("out");

        let targets = vec![(source.clone(), dir.path().join("tv/Heat (1995).avi"))];
        let ops = plan_operations(&targets, &dir.path().join("tv"), Some(&output)).unwrap();
        let errors = execute_copy(&ops, &output).unwrap();

        assert!(errors.is_empty());
        assert!(source.exists());
        assert!(output.join("Heat (1995).avi").exists());
    }
}
