//! Pattern-based [`IgnoreSpec`] implementation.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::Path;

use crate::spec::{CopyTreeError, EnumCopyPatternMode, IgnoreSpec};
use crate::util::{TypeCopyPatternSeq, compile_patterns};

/// Exclude entries whose basename matches any of a list of patterns.
///
/// The same patterns apply at every directory level.
#[derive(Debug, Clone)]
pub struct IgnorePatterns {
    rule_pattern: EnumCopyPatternMode,
    patterns: TypeCopyPatternSeq,
}

impl IgnorePatterns {
    /// Compile `patterns` under `rule_pattern`.
    ///
    /// Fails with [`CopyTreeError::InvalidPattern`] on the first pattern that
    /// does not compile.
    pub fn new<S: AsRef<str>>(
        patterns: &[S],
        rule_pattern: EnumCopyPatternMode,
    ) -> Result<Self, CopyTreeError> {
        Ok(Self {
            rule_pattern,
            patterns: compile_patterns(patterns, rule_pattern)?,
        })
    }

    /// Shorthand for glob patterns.
    pub fn glob<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CopyTreeError> {
        Self::new(patterns, EnumCopyPatternMode::Glob)
    }

    pub fn rule_pattern(&self) -> EnumCopyPatternMode {
        self.rule_pattern
    }

    /// Whether a single basename is excluded.
    pub fn is_match(&self, name: &str) -> bool {
        self.patterns.is_match(name)
    }
}

impl IgnoreSpec for IgnorePatterns {
    fn ignored(&self, _path_dir: &Path, names: &[OsString]) -> HashSet<OsString> {
        names
            .iter()
            .filter(|name| self.is_match(&name.to_string_lossy()))
            .cloned()
            .collect()
    }
}
