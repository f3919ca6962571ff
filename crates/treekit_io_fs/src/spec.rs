//! Copy specification models and top-level error types.

use std::collections::HashSet;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopySymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Create a symbolic link at destination (do not copy target bytes).
    CopySymlinks,
}

impl EnumCopySymlinkStrategy {
    /// Map the boolean `preserve_symlinks` flag onto a strategy.
    pub fn from_preserve(if_preserve_symlinks: bool) -> Self {
        if if_preserve_symlinks {
            Self::CopySymlinks
        } else {
            Self::Dereference
        }
    }
}

/// Pattern matching mode for ignore lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Kind of one directory entry, as seen by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumEntryKind {
    /// Symbolic link (never followed when symlinks are preserved).
    Symlink,
    /// Directory.
    Directory,
    /// Regular file.
    RegularFile,
    /// FIFO, socket or device node.
    Other,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region IgnoreSpec

/// Per-directory exclusion predicate.
///
/// Called once for every visited directory with that directory's source path
/// and the names of its immediate entries. Returned names are dropped at this
/// level only; an excluded directory is never entered.
pub trait IgnoreSpec: Send + Sync {
    /// Return the subset of `names` to exclude under `path_dir`.
    fn ignored(&self, path_dir: &Path, names: &[OsString]) -> HashSet<OsString>;
}

impl<F> IgnoreSpec for F
where
    F: Fn(&Path, &[OsString]) -> HashSet<OsString> + Send + Sync,
{
    fn ignored(&self, path_dir: &Path, names: &[OsString]) -> HashSet<OsString> {
        self(path_dir, names)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `copy_tree_with_options`.
#[derive(Clone)]
pub struct SpecCopyOptions {
    /// Symlink handling behavior.
    pub rule_symlink: EnumCopySymlinkStrategy,
    /// Optional per-level exclusion predicate.
    pub ignore: Option<Arc<dyn IgnoreSpec>>,
    /// Copy permission bits and timestamps onto created entries.
    pub if_preserve_metadata: bool,
    /// Copy extended attributes (Linux only; ignored elsewhere).
    pub if_copy_xattrs: bool,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            rule_symlink: EnumCopySymlinkStrategy::Dereference,
            ignore: None,
            if_preserve_metadata: true,
            if_copy_xattrs: true,
        }
    }
}

impl fmt::Debug for SpecCopyOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecCopyOptions")
            .field("rule_symlink", &self.rule_symlink)
            .field("ignore", &self.ignore.as_ref().map(|_| "<IgnoreSpec>"))
            .field("if_preserve_metadata", &self.if_preserve_metadata)
            .field("if_copy_xattrs", &self.if_copy_xattrs)
            .finish()
    }
}

/// Fatal `copy_tree` failure. The first one encountered aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum CopyTreeError {
    /// Source side could not be read (unreadable, permission denied, vanished).
    #[error("Failed to access {}: {source}", .path.display())]
    FilesystemAccess {
        /// Offending source path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Operation not supported by the platform or filesystem.
    #[error("Unsupported operation on {}: {source}", .path.display())]
    UnsupportedOperation {
        /// Destination path the operation targeted.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Destination side could not be written.
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        /// Offending destination path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Source/destination arguments rejected before traversal.
    #[error("Invalid argument {}: {message}", .path.display())]
    InvalidArgument {
        /// Rejected path.
        path: PathBuf,
        /// Reason.
        message: String,
    },
    /// Ignore pattern failed to compile.
    #[error("Invalid pattern in ignore list: {0}")]
    InvalidPattern(String),
}

impl CopyTreeError {
    /// Path the failure is attributed to, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::FilesystemAccess { path, .. }
            | Self::UnsupportedOperation { path, .. }
            | Self::WriteFailure { path, .. }
            | Self::InvalidArgument { path, .. } => Some(path),
            Self::InvalidPattern(_) => None,
        }
    }

    pub(crate) fn access(path: &Path, source: io::Error) -> Self {
        Self::FilesystemAccess {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Self::WriteFailure {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(path: &Path, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::ffi::OsString;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::{CopyTreeError, EnumCopySymlinkStrategy, IgnoreSpec};

    #[test]
    fn closure_is_an_ignore_spec() {
        let ignore = |_: &Path, names: &[OsString]| -> HashSet<OsString> {
            names
                .iter()
                .filter(|n| n.to_string_lossy().starts_with('.'))
                .cloned()
                .collect()
        };
        let names = vec![OsString::from(".git"), OsString::from("src")];
        let excluded = ignore.ignored(Path::new("/x"), &names);
        assert_eq!(excluded, HashSet::from([OsString::from(".git")]));
    }

    #[test]
    fn preserve_flag_maps_to_strategy() {
        assert_eq!(
            EnumCopySymlinkStrategy::from_preserve(true),
            EnumCopySymlinkStrategy::CopySymlinks
        );
        assert_eq!(
            EnumCopySymlinkStrategy::from_preserve(false),
            EnumCopySymlinkStrategy::Dereference
        );
    }

    #[test]
    fn error_message_names_the_path() {
        let err = CopyTreeError::WriteFailure {
            path: PathBuf::from("/dst/a.txt"),
            source: io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "Failed to write /dst/a.txt: disk full");
        assert_eq!(err.path(), Some(Path::new("/dst/a.txt")));
        assert!(CopyTreeError::InvalidPattern("x".to_string()).path().is_none());
    }
}
