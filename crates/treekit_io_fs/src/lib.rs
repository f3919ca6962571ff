//! `treekit_io_fs`:
//! Recursive directory-tree replication.
//!
//! Modules:
//! - `copy`    : traversal and copy orchestration
//! - `spec`    : enums/options/errors and the ignore predicate contract
//! - `ignore`  : pattern-based ignore predicate
//! - `report`  : run-time report model
//! - `backend` : filesystem operations seam
//! - `util`    : shared helper functions

pub mod backend;
pub mod copy;
pub mod ignore;
pub mod report;
pub mod spec;
mod util;

#[cfg(test)]
mod testutils;

pub use backend::{FsBackend, StdFsBackend};
pub use copy::{
    SpecDirListing, classify_entry, copy_tree, copy_tree_with_backend, copy_tree_with_options,
    list_entries,
};
pub use ignore::IgnorePatterns;
pub use report::{ReportCopy, ReportCopyBuilder};
pub use spec::{
    CopyTreeError, EnumCopyPatternMode, EnumCopySymlinkStrategy, EnumEntryKind, IgnoreSpec,
    SpecCopyOptions,
};
