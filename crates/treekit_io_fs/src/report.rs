//! Copy report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// Aggregate counters and tolerated warnings for one successful `copy_tree` run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportCopy {
    /// Total enumerated directory entries (before ignore filtering).
    pub cnt_scanned: u64,
    /// Entries dropped by the ignore predicate.
    pub cnt_ignored: u64,
    /// Destination directories created (root included).
    pub cnt_dirs_created: u64,
    /// Regular files copied.
    pub cnt_files_copied: u64,
    /// Symbolic links recreated.
    pub cnt_symlinks_created: u64,
    /// Special entries (FIFO, socket, device) skipped.
    pub cnt_skipped: u64,
    /// Non-fatal conditions tolerated during the run.
    pub warnings: Vec<String>,
}

impl ReportCopy {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_ignored".to_string(), self.cnt_ignored);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_files_copied".to_string(), self.cnt_files_copied);
        dict_counts.insert(
            "cnt_symlinks_created".to_string(),
            self.cnt_symlinks_created,
        );
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} ignored={} dirs={} files={} symlinks={} skipped={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_ignored"],
            dict_counts["cnt_dirs_created"],
            dict_counts["cnt_files_copied"],
            dict_counts["cnt_symlinks_created"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[COPY]"))
    }
}

/// Mutable accumulator for copy statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportCopyBuilder {
    report: ReportCopy,
}

impl ReportCopyBuilder {
    /// Add `value` to the scanned counter.
    pub fn add_scanned(&mut self, value: u64) {
        self.report.cnt_scanned += value;
    }

    /// Add `value` to the ignored counter.
    pub fn add_ignored(&mut self, value: u64) {
        self.report.cnt_ignored += value;
    }

    /// Increment created-directory count by one.
    pub fn add_dir_created(&mut self) {
        self.report.cnt_dirs_created += 1;
    }

    /// Increment copied-file count by one.
    pub fn add_file_copied(&mut self) {
        self.report.cnt_files_copied += 1;
    }

    /// Increment created-symlink count by one.
    pub fn add_symlink_created(&mut self) {
        self.report.cnt_symlinks_created += 1;
    }

    /// Increment skipped count by one.
    pub fn add_skipped(&mut self) {
        self.report.cnt_skipped += 1;
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportCopy {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportCopy, ReportCopyBuilder};

    #[test]
    fn report_copy_to_dict_and_format() {
        let report = ReportCopy {
            cnt_scanned: 9,
            cnt_ignored: 2,
            cnt_dirs_created: 3,
            cnt_files_copied: 4,
            cnt_symlinks_created: 1,
            cnt_skipped: 0,
            warnings: vec!["w".to_string()],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_scanned"], 9);
        assert_eq!(dict_counts["cnt_ignored"], 2);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[COPY]");
        assert_eq!(
            txt,
            "[COPY] scanned=9 ignored=2 dirs=3 files=4 symlinks=1 skipped=0 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn builder_accumulates() {
        let mut builder = ReportCopyBuilder::default();
        builder.add_scanned(3);
        builder.add_ignored(1);
        builder.add_dir_created();
        builder.add_file_copied();
        builder.add_file_copied();
        builder.add_warning("lchmod unsupported".to_string());

        let report = builder.build();
        assert_eq!(report.cnt_scanned, 3);
        assert_eq!(report.cnt_ignored, 1);
        assert_eq!(report.cnt_dirs_created, 1);
        assert_eq!(report.cnt_files_copied, 2);
        assert_eq!(report.cnt_symlinks_created, 0);
        assert_eq!(report.warning_count(), 1);
    }
}
