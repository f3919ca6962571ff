//! Filesystem operations consumed by the copy engine.
//!
//! Every call the engine makes against the filesystem goes through
//! [`FsBackend`]. The default method bodies are the real operations, so
//! [`StdFsBackend`] is an empty impl and a test double only overrides the
//! calls it wants to fail.

use std::ffi::{OsStr, OsString};
use std::fs::{self, Metadata, Permissions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;

/// Blocking filesystem primitives used by `copy_tree`.
pub trait FsBackend {
    /// Names of the immediate entries of `path`, in enumeration order.
    fn read_dir_names(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut l_names = Vec::new();
        for entry_res in fs::read_dir(path)? {
            l_names.push(entry_res?.file_name());
        }
        Ok(l_names)
    }

    /// Metadata probe that does not follow a final symlink.
    fn symlink_metadata(&self, path: &Path) -> io::Result<Metadata> {
        fs::symlink_metadata(path)
    }

    /// Metadata probe that follows symlinks.
    fn metadata(&self, path: &Path) -> io::Result<Metadata> {
        fs::metadata(path)
    }

    /// Fully resolved absolute form of an existing path.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    /// Raw target of a symlink, unresolved.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    /// Create `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    /// Remove a non-directory entry (file or symlink).
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    /// Open a source file for reading.
    fn open_file(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    /// Create (or truncate) a destination file for writing.
    fn create_file(&self, path: &Path) -> io::Result<Box<dyn Write>> {
        Ok(Box::new(fs::File::create(path)?))
    }

    /// Create `path_link` pointing at `path_target`.
    ///
    /// `if_target_dir` only matters on Windows, where file and directory
    /// links are distinct objects.
    fn symlink(&self, path_target: &Path, path_link: &Path, if_target_dir: bool) -> io::Result<()> {
        #[cfg(unix)]
        {
            let _ = if_target_dir;
            std::os::unix::fs::symlink(path_target, path_link)
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::{symlink_dir, symlink_file};
            if if_target_dir {
                symlink_dir(path_target, path_link)
            } else {
                symlink_file(path_target, path_link)
            }
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = (path_target, path_link, if_target_dir);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "Symbolic links are unsupported on this platform",
            ))
        }
    }

    /// Set permission bits, following symlinks.
    fn set_permissions(&self, path: &Path, permissions: Permissions) -> io::Result<()> {
        fs::set_permissions(path, permissions)
    }

    /// Set permission bits on a symlink itself.
    ///
    /// Linux has no `lchmod`; the kernel answers `EOPNOTSUPP`.
    fn set_symlink_permissions(&self, path: &Path, permissions: Permissions) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::ffi::CString;
            use std::os::unix::ffi::OsStrExt;
            use std::os::unix::fs::PermissionsExt;

            let c_path = CString::new(path.as_os_str().as_bytes())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;
            let mode = (permissions.mode() & 0o7777) as libc::mode_t;
            let res = unsafe {
                libc::fchmodat(
                    libc::AT_FDCWD,
                    c_path.as_ptr(),
                    mode,
                    libc::AT_SYMLINK_NOFOLLOW,
                )
            };
            if res < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
        #[cfg(not(unix))]
        {
            let _ = (path, permissions);
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "Symlink permissions are unsupported on this platform",
            ))
        }
    }

    /// Set access and modification times, following symlinks.
    fn set_times(&self, path: &Path, time_access: FileTime, time_modify: FileTime) -> io::Result<()> {
        filetime::set_file_times(path, time_access, time_modify)
    }

    /// Extended attribute names of `path`.
    fn list_xattrs(&self, path: &Path) -> io::Result<Vec<OsString>> {
        Ok(xattr::list(path)?.collect())
    }

    /// Value of one extended attribute, `None` if absent.
    fn get_xattr(&self, path: &Path, name: &OsStr) -> io::Result<Option<Vec<u8>>> {
        xattr::get(path, name)
    }

    /// Set one extended attribute.
    fn set_xattr(&self, path: &Path, name: &OsStr, value: &[u8]) -> io::Result<()> {
        xattr::set(path, name, value)
    }
}

/// Real filesystem backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFsBackend;

impl FsBackend for StdFsBackend {}
