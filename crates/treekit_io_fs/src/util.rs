use std::fs::Metadata;
use std::io::{self, Read, Write};
use std::path::Path;

use filetime::FileTime;
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use tracing::debug;

use crate::backend::FsBackend;
use crate::spec::{CopyTreeError, EnumCopyPatternMode, SpecCopyOptions};

/// Read buffer for file content copies.
pub(crate) const N_COPY_BUFFER_SIZE: usize = 128 * 1024;

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeCopyPatternSeq {
    Literal(Vec<String>),
    Glob(GlobSet),
    Regex(Vec<Regex>),
}

impl TypeCopyPatternSeq {
    pub(crate) fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(set) => set.is_match(value),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

pub(crate) fn compile_patterns<S: AsRef<str>>(
    patterns: &[S],
    rule_pattern: EnumCopyPatternMode,
) -> Result<TypeCopyPatternSeq, CopyTreeError> {
    match rule_pattern {
        EnumCopyPatternMode::Literal => Ok(TypeCopyPatternSeq::Literal(
            patterns.iter().map(|p| p.as_ref().to_string()).collect(),
        )),
        EnumCopyPatternMode::Glob => {
            let mut builder_glob = GlobSetBuilder::new();
            for pattern in patterns {
                let glob = Glob::new(pattern.as_ref())
                    .map_err(|e| CopyTreeError::InvalidPattern(e.to_string()))?;
                builder_glob.add(glob);
            }
            let set_glob = builder_glob
                .build()
                .map_err(|e| CopyTreeError::InvalidPattern(e.to_string()))?;
            Ok(TypeCopyPatternSeq::Glob(set_glob))
        }
        EnumCopyPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern.as_ref())
                    .map_err(|e| CopyTreeError::InvalidPattern(e.to_string()))?;
                l_regex.push(regex);
            }
            Ok(TypeCopyPatternSeq::Regex(l_regex))
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ErrorClassification

/// True when `error` means "the platform or filesystem cannot do this".
pub(crate) fn is_unsupported_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::Unsupported {
        return true;
    }
    #[cfg(unix)]
    {
        if let Some(code) = error.raw_os_error() {
            return code == libc::ENOTSUP || code == libc::EOPNOTSUPP || code == libc::ENOSYS;
        }
    }
    false
}

/// Extended attribute failures that are skipped rather than fatal.
#[cfg(target_os = "linux")]
fn is_xattr_tolerable(error: &io::Error) -> bool {
    if is_unsupported_error(error) {
        return true;
    }
    matches!(
        error.raw_os_error(),
        Some(libc::EPERM) | Some(libc::ENODATA) | Some(libc::EINVAL)
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Remove whatever non-directory entry sits at `path_dst`.
///
/// A missing entry is fine; an existing directory is left in place and the
/// caller's next write reports the conflict.
fn remove_existing_entry<B: FsBackend + ?Sized>(
    backend: &B,
    path_dst: &Path,
) -> Result<(), CopyTreeError> {
    match backend.symlink_metadata(path_dst) {
        Ok(meta_dst) if meta_dst.file_type().is_dir() => Ok(()),
        Ok(_) => backend
            .remove_file(path_dst)
            .map_err(|e| CopyTreeError::write(path_dst, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CopyTreeError::write(path_dst, e)),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Metadata

/// Copy timestamps, extended attributes and permission bits.
///
/// Mode goes last so a read-only source does not block the xattr writes.
pub(crate) fn apply_metadata<B: FsBackend + ?Sized>(
    backend: &B,
    path_src: &Path,
    path_dst: &Path,
    meta_src: &Metadata,
    spec_cp_options: &SpecCopyOptions,
) -> Result<(), CopyTreeError> {
    if spec_cp_options.if_preserve_metadata {
        let file_time_access = FileTime::from_last_access_time(meta_src);
        let file_time_modify = FileTime::from_last_modification_time(meta_src);
        backend
            .set_times(path_dst, file_time_access, file_time_modify)
            .map_err(|e| CopyTreeError::write(path_dst, e))?;
    }

    #[cfg(target_os = "linux")]
    {
        if spec_cp_options.if_copy_xattrs {
            copy_xattrs_linux(backend, path_src, path_dst)?;
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = path_src;
    }

    if spec_cp_options.if_preserve_metadata {
        backend
            .set_permissions(path_dst, meta_src.permissions())
            .map_err(|e| CopyTreeError::write(path_dst, e))?;
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux<B: FsBackend + ?Sized>(
    backend: &B,
    path_src: &Path,
    path_dst: &Path,
) -> Result<(), CopyTreeError> {
    // xattr calls act on the link itself; read through to the referent.
    let path_src_real = match backend.symlink_metadata(path_src) {
        Ok(meta) if meta.file_type().is_symlink() => backend
            .canonicalize(path_src)
            .map_err(|e| CopyTreeError::access(path_src, e))?,
        _ => path_src.to_path_buf(),
    };

    let l_names = match backend.list_xattrs(&path_src_real) {
        Ok(v) => v,
        Err(e) if is_xattr_tolerable(&e) => return Ok(()),
        Err(e) => return Err(CopyTreeError::access(path_src, e)),
    };

    for name in l_names {
        let raw_value = match backend.get_xattr(&path_src_real, &name) {
            Ok(Some(v)) => v,
            Ok(None) => continue,
            Err(e) if is_xattr_tolerable(&e) => continue,
            Err(e) => return Err(CopyTreeError::access(path_src, e)),
        };
        match backend.set_xattr(path_dst, &name, &raw_value) {
            Ok(()) => {}
            Err(e) if is_xattr_tolerable(&e) => {
                debug!(path = %path_dst.display(), name = ?name, "xattr not settable, skipped");
            }
            Err(e) => return Err(CopyTreeError::write(path_dst, e)),
        }
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region EntryCopy

/// Copy file bytes from `path_file_src` to `path_file_dst`, then its metadata.
///
/// An existing non-directory destination entry is replaced. Read errors are
/// reported against the source, write errors against the destination.
pub(crate) fn copy_file_with_metadata<B: FsBackend + ?Sized>(
    backend: &B,
    path_file_src: &Path,
    path_file_dst: &Path,
    spec_cp_options: &SpecCopyOptions,
) -> Result<u64, CopyTreeError> {
    let meta_src = backend
        .metadata(path_file_src)
        .map_err(|e| CopyTreeError::access(path_file_src, e))?;

    let mut reader = backend
        .open_file(path_file_src)
        .map_err(|e| CopyTreeError::access(path_file_src, e))?;
    remove_existing_entry(backend, path_file_dst)?;
    let n_bytes = {
        let mut writer = backend
            .create_file(path_file_dst)
            .map_err(|e| CopyTreeError::write(path_file_dst, e))?;
        let n_bytes = pump_bytes(&mut reader, &mut writer, path_file_src, path_file_dst)?;
        writer
            .flush()
            .map_err(|e| CopyTreeError::write(path_file_dst, e))?;
        n_bytes
    };
    drop(reader);

    apply_metadata(
        backend,
        path_file_src,
        path_file_dst,
        &meta_src,
        spec_cp_options,
    )?;
    Ok(n_bytes)
}

fn pump_bytes(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<u64, CopyTreeError> {
    let mut buf = vec![0_u8; N_COPY_BUFFER_SIZE];
    let mut n_total: u64 = 0;
    loop {
        let n_read = match reader.read(&mut buf) {
            Ok(0) => return Ok(n_total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyTreeError::access(path_file_src, e)),
        };
        writer
            .write_all(&buf[..n_read])
            .map_err(|e| CopyTreeError::write(path_file_dst, e))?;
        n_total += n_read as u64;
    }
}

/// Result of recreating one symlink.
#[derive(Debug)]
pub(crate) enum EnumSymlinkModeOutcome {
    /// Mode bits copied (or metadata preservation disabled).
    Applied,
    /// The platform refused per-link mode bits; carries the reason.
    Unsupported(CopyTreeError),
}

/// Recreate the symlink at `path_src` as `path_dst` with the same raw target.
pub(crate) fn replicate_symlink<B: FsBackend + ?Sized>(
    backend: &B,
    path_src: &Path,
    path_dst: &Path,
    spec_cp_options: &SpecCopyOptions,
) -> Result<EnumSymlinkModeOutcome, CopyTreeError> {
    let path_target = backend
        .read_link(path_src)
        .map_err(|e| CopyTreeError::access(path_src, e))?;
    let meta_link = backend
        .symlink_metadata(path_src)
        .map_err(|e| CopyTreeError::access(path_src, e))?;

    match backend.symlink_metadata(path_dst) {
        Ok(_) => backend
            .remove_file(path_dst)
            .map_err(|e| CopyTreeError::write(path_dst, e))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(CopyTreeError::write(path_dst, e)),
    }

    let if_target_dir = backend
        .metadata(path_src)
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    backend
        .symlink(&path_target, path_dst, if_target_dir)
        .map_err(|e| CopyTreeError::write(path_dst, e))?;

    if !spec_cp_options.if_preserve_metadata {
        return Ok(EnumSymlinkModeOutcome::Applied);
    }
    match backend.set_symlink_permissions(path_dst, meta_link.permissions()) {
        Ok(()) => Ok(EnumSymlinkModeOutcome::Applied),
        Err(e) if is_unsupported_error(&e) => Ok(EnumSymlinkModeOutcome::Unsupported(
            CopyTreeError::UnsupportedOperation {
                path: path_dst.to_path_buf(),
                source: e,
            },
        )),
        Err(e) => Err(CopyTreeError::write(path_dst, e)),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
