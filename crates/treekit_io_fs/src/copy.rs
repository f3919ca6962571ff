//! Filesystem tree traversal and copy orchestration.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::backend::{FsBackend, StdFsBackend};
use crate::report::{ReportCopy, ReportCopyBuilder};
use crate::spec::{
    CopyTreeError, EnumCopySymlinkStrategy, EnumEntryKind, IgnoreSpec, SpecCopyOptions,
};
use crate::util::{
    EnumSymlinkModeOutcome, apply_metadata, copy_file_with_metadata, replicate_symlink,
};

/// Entry names of one directory level after ignore filtering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecDirListing {
    /// Retained names, in enumeration order.
    pub names: Vec<OsString>,
    /// Names dropped by the ignore predicate, in enumeration order.
    pub names_ignored: Vec<OsString>,
}

#[derive(Debug)]
enum EnumCopyTask {
    /// Ensure the destination directory, then schedule its children.
    Directory {
        path_dir_src: PathBuf,
        path_dir_dst: PathBuf,
    },
    /// Classify one entry and replicate it.
    Entry { path_src: PathBuf, path_dst: PathBuf },
    /// Stamp a freshly created directory once all its children are written.
    FinalizeDirectory {
        path_dir_src: PathBuf,
        path_dir_dst: PathBuf,
    },
}

struct SpecCopyContext<'a, B: FsBackend + ?Sized> {
    backend: &'a B,
    spec_cp_options: &'a SpecCopyOptions,
    builder_cp_report: ReportCopyBuilder,
    l_tasks: Vec<EnumCopyTask>,
    /// Canonical destination root, set once the root directory exists.
    path_dst_root_resolved: Option<PathBuf>,
    cnt_symlink_mode_unsupported: u64,
}

/// Copy a directory tree from `dir_source` into `dir_destination`.
///
/// With `if_preserve_symlinks` source symlinks are recreated with their raw
/// target; otherwise they are followed and their referent is copied. `ignore`
/// is asked once per directory level which names to leave out.
///
/// The destination is merged into: existing entries absent from the source
/// are kept, same-named files are overwritten. The first failure aborts the
/// whole copy and already written entries are left in place.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    if_preserve_symlinks: bool,
    ignore: Option<Arc<dyn IgnoreSpec>>,
) -> Result<(), CopyTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let spec_cp_options = SpecCopyOptions {
        rule_symlink: EnumCopySymlinkStrategy::from_preserve(if_preserve_symlinks),
        ignore,
        ..SpecCopyOptions::default()
    };
    copy_tree_with_options(dir_source, dir_destination, &spec_cp_options).map(|_| ())
}

/// Same as [`copy_tree`], driven by [`SpecCopyOptions`] and returning the
/// run's [`ReportCopy`].
pub fn copy_tree_with_options<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: &SpecCopyOptions,
) -> Result<ReportCopy, CopyTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_tree_with_backend(
        dir_source,
        dir_destination,
        spec_cp_options,
        &StdFsBackend,
    )
}

/// Same as [`copy_tree_with_options`] over an explicit [`FsBackend`].
pub fn copy_tree_with_backend<P, Q, B>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: &SpecCopyOptions,
    backend: &B,
) -> Result<ReportCopy, CopyTreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    B: FsBackend + ?Sized,
{
    run_copy(
        dir_source.as_ref(),
        dir_destination.as_ref(),
        spec_cp_options,
        backend,
    )
}

#[instrument(
    level = "debug",
    skip_all,
    fields(source = %path_dir_src.display(), destination = %path_dir_dst.display())
)]
fn run_copy<B: FsBackend + ?Sized>(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_cp_options: &SpecCopyOptions,
    backend: &B,
) -> Result<ReportCopy, CopyTreeError> {
    validate_arguments(backend, path_dir_src, path_dir_dst)?;

    let mut spec_cp_ctx = SpecCopyContext {
        backend,
        spec_cp_options,
        builder_cp_report: ReportCopyBuilder::default(),
        l_tasks: vec![EnumCopyTask::Directory {
            path_dir_src: path_dir_src.to_path_buf(),
            path_dir_dst: path_dir_dst.to_path_buf(),
        }],
        path_dst_root_resolved: None,
        cnt_symlink_mode_unsupported: 0,
    };

    while let Some(task) = spec_cp_ctx.l_tasks.pop() {
        match task {
            EnumCopyTask::Directory {
                path_dir_src,
                path_dir_dst,
            } => process_directory(&path_dir_src, &path_dir_dst, &mut spec_cp_ctx)?,
            EnumCopyTask::Entry { path_src, path_dst } => {
                process_entry(path_src, path_dst, &mut spec_cp_ctx)?
            }
            EnumCopyTask::FinalizeDirectory {
                path_dir_src,
                path_dir_dst,
            } => finalize_directory(&path_dir_src, &path_dir_dst, &spec_cp_ctx)?,
        }
    }

    if spec_cp_ctx.cnt_symlink_mode_unsupported > 0 {
        spec_cp_ctx.builder_cp_report.add_warning(format!(
            "Symlink permissions not supported here, left at defaults for {} link(s)",
            spec_cp_ctx.cnt_symlink_mode_unsupported
        ));
    }
    let report = spec_cp_ctx.builder_cp_report.build();
    debug!("{report}");
    Ok(report)
}

fn validate_arguments<B: FsBackend + ?Sized>(
    backend: &B,
    path_dir_src: &Path,
    path_dir_dst: &Path,
) -> Result<(), CopyTreeError> {
    match backend.metadata(path_dir_src) {
        Ok(meta_src) if meta_src.is_dir() => {}
        Ok(_) => {
            return Err(CopyTreeError::invalid(
                path_dir_src,
                "Source is not a directory",
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CopyTreeError::invalid(
                path_dir_src,
                "Source does not exist",
            ));
        }
        Err(e) => return Err(CopyTreeError::access(path_dir_src, e)),
    }

    match backend.metadata(path_dir_dst) {
        Ok(meta_dst) if !meta_dst.is_dir() => Err(CopyTreeError::write(
            path_dir_dst,
            io::Error::new(
                io::ErrorKind::NotADirectory,
                "destination exists and is not a directory",
            ),
        )),
        Ok(_) => {
            // Copying a directory onto itself would truncate every file it reads.
            let path_src_resolved = backend
                .canonicalize(path_dir_src)
                .map_err(|e| CopyTreeError::access(path_dir_src, e))?;
            let path_dst_resolved = backend
                .canonicalize(path_dir_dst)
                .map_err(|e| CopyTreeError::write(path_dir_dst, e))?;
            if path_src_resolved == path_dst_resolved {
                return Err(CopyTreeError::write(
                    path_dir_dst,
                    io::Error::new(
                        io::ErrorKind::AlreadyExists,
                        "destination is the source directory",
                    ),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CopyTreeError::write(path_dir_dst, e)),
    }
}

/// List the entries of `path_dir` and apply `ignore` at this level.
///
/// Fails with [`CopyTreeError::FilesystemAccess`] when the directory cannot be
/// read.
pub fn list_entries<B: FsBackend + ?Sized>(
    backend: &B,
    path_dir: &Path,
    ignore: Option<&dyn IgnoreSpec>,
) -> Result<SpecDirListing, CopyTreeError> {
    let l_names = backend
        .read_dir_names(path_dir)
        .map_err(|e| CopyTreeError::access(path_dir, e))?;

    let Some(ignore) = ignore else {
        return Ok(SpecDirListing {
            names: l_names,
            names_ignored: Vec::new(),
        });
    };

    let set_excluded = ignore.ignored(path_dir, &l_names);
    let (names_ignored, names): (Vec<_>, Vec<_>) = l_names
        .into_iter()
        .partition(|name| set_excluded.contains(name));
    Ok(SpecDirListing {
        names,
        names_ignored,
    })
}

/// Classify `path` without following a final symlink.
///
/// Under [`EnumCopySymlinkStrategy::Dereference`] a symlink is classified as
/// its referent instead; a dangling link is then an access error.
pub fn classify_entry<B: FsBackend + ?Sized>(
    backend: &B,
    path: &Path,
    rule_symlink: EnumCopySymlinkStrategy,
) -> Result<EnumEntryKind, CopyTreeError> {
    let meta_entry = backend
        .symlink_metadata(path)
        .map_err(|e| CopyTreeError::access(path, e))?;
    let file_type = meta_entry.file_type();
    if !file_type.is_symlink() {
        return Ok(kind_of(file_type));
    }
    match rule_symlink {
        EnumCopySymlinkStrategy::CopySymlinks => Ok(EnumEntryKind::Symlink),
        EnumCopySymlinkStrategy::Dereference => {
            let meta_target = backend
                .metadata(path)
                .map_err(|e| CopyTreeError::access(path, e))?;
            Ok(kind_of(meta_target.file_type()))
        }
    }
}

fn kind_of(file_type: std::fs::FileType) -> EnumEntryKind {
    if file_type.is_symlink() {
        EnumEntryKind::Symlink
    } else if file_type.is_dir() {
        EnumEntryKind::Directory
    } else if file_type.is_file() {
        EnumEntryKind::RegularFile
    } else {
        EnumEntryKind::Other
    }
}

fn process_directory<B: FsBackend + ?Sized>(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext<'_, B>,
) -> Result<(), CopyTreeError> {
    let if_created = ensure_destination_directory(path_dir_dst, spec_cp_ctx)?;
    if spec_cp_ctx.path_dst_root_resolved.is_none() {
        let path_resolved = spec_cp_ctx
            .backend
            .canonicalize(path_dir_dst)
            .map_err(|e| CopyTreeError::write(path_dir_dst, e))?;
        spec_cp_ctx.path_dst_root_resolved = Some(path_resolved);
    }

    let spec_listing = list_entries(
        spec_cp_ctx.backend,
        path_dir_src,
        spec_cp_ctx.spec_cp_options.ignore.as_deref(),
    )?;
    let n_ignored = spec_listing.names_ignored.len() as u64;
    spec_cp_ctx
        .builder_cp_report
        .add_scanned(spec_listing.names.len() as u64 + n_ignored);
    spec_cp_ctx.builder_cp_report.add_ignored(n_ignored);
    for name in &spec_listing.names_ignored {
        debug!(dir = %path_dir_src.display(), name = ?name, "ignored");
    }

    if if_created {
        spec_cp_ctx.l_tasks.push(EnumCopyTask::FinalizeDirectory {
            path_dir_src: path_dir_src.to_path_buf(),
            path_dir_dst: path_dir_dst.to_path_buf(),
        });
    }
    // Reverse push so the stack pops children in enumeration order.
    for name in spec_listing.names.into_iter().rev() {
        spec_cp_ctx.l_tasks.push(EnumCopyTask::Entry {
            path_src: path_dir_src.join(&name),
            path_dst: path_dir_dst.join(&name),
        });
    }
    Ok(())
}

/// Make sure `path_dir_dst` is a directory. Returns whether it was created.
fn ensure_destination_directory<B: FsBackend + ?Sized>(
    path_dir_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext<'_, B>,
) -> Result<bool, CopyTreeError> {
    let backend = spec_cp_ctx.backend;
    match backend.metadata(path_dir_dst) {
        Ok(meta_dst) if meta_dst.is_dir() => return Ok(false),
        Ok(_) => {
            return Err(CopyTreeError::write(
                path_dir_dst,
                io::Error::new(
                    io::ErrorKind::NotADirectory,
                    "destination exists and is not a directory",
                ),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(CopyTreeError::write(path_dir_dst, e)),
    }

    backend
        .create_dir_all(path_dir_dst)
        .map_err(|e| CopyTreeError::write(path_dir_dst, e))?;
    spec_cp_ctx.builder_cp_report.add_dir_created();
    debug!(path = %path_dir_dst.display(), "created directory");
    Ok(true)
}

// Runs after the children so a read-only mode or an old mtime is not
// disturbed by the writes below it.
fn finalize_directory<B: FsBackend + ?Sized>(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    spec_cp_ctx: &SpecCopyContext<'_, B>,
) -> Result<(), CopyTreeError> {
    let meta_dir_src = spec_cp_ctx
        .backend
        .metadata(path_dir_src)
        .map_err(|e| CopyTreeError::access(path_dir_src, e))?;
    apply_metadata(
        spec_cp_ctx.backend,
        path_dir_src,
        path_dir_dst,
        &meta_dir_src,
        spec_cp_ctx.spec_cp_options,
    )
}

fn process_entry<B: FsBackend + ?Sized>(
    path_src: PathBuf,
    path_dst: PathBuf,
    spec_cp_ctx: &mut SpecCopyContext<'_, B>,
) -> Result<(), CopyTreeError> {
    let backend = spec_cp_ctx.backend;
    let spec_cp_options = spec_cp_ctx.spec_cp_options;
    let enum_kind = classify_entry(backend, &path_src, spec_cp_options.rule_symlink)?;

    match enum_kind {
        EnumEntryKind::Symlink => {
            let outcome = replicate_symlink(backend, &path_src, &path_dst, spec_cp_options)?;
            spec_cp_ctx.builder_cp_report.add_symlink_created();
            debug!(src = %path_src.display(), dst = %path_dst.display(), "created symlink");
            if let EnumSymlinkModeOutcome::Unsupported(error) = outcome {
                debug!("{error}");
                spec_cp_ctx.cnt_symlink_mode_unsupported += 1;
            }
        }
        EnumEntryKind::Directory => {
            if is_destination_root(backend, &path_src, spec_cp_ctx) {
                debug!(path = %path_src.display(), "destination root met inside source, not entered");
                spec_cp_ctx.builder_cp_report.add_skipped();
                return Ok(());
            }
            spec_cp_ctx.l_tasks.push(EnumCopyTask::Directory {
                path_dir_src: path_src,
                path_dir_dst: path_dst,
            });
        }
        EnumEntryKind::RegularFile => {
            let n_bytes = copy_file_with_metadata(backend, &path_src, &path_dst, spec_cp_options)?;
            spec_cp_ctx.builder_cp_report.add_file_copied();
            debug!(src = %path_src.display(), dst = %path_dst.display(), n_bytes, "copied file");
        }
        EnumEntryKind::Other => {
            warn!(path = %path_src.display(), "special file skipped");
            spec_cp_ctx
                .builder_cp_report
                .add_warning(format!("Special file skipped: {}", path_src.display()));
            spec_cp_ctx.builder_cp_report.add_skipped();
        }
    }
    Ok(())
}

/// True when `path_src` is the destination root seen from inside the source.
fn is_destination_root<B: FsBackend + ?Sized>(
    backend: &B,
    path_src: &Path,
    spec_cp_ctx: &SpecCopyContext<'_, B>,
) -> bool {
    let Some(path_dst_root) = spec_cp_ctx.path_dst_root_resolved.as_deref() else {
        return false;
    };
    backend
        .canonicalize(path_src)
        .is_ok_and(|path_resolved| path_resolved == path_dst_root)
}
