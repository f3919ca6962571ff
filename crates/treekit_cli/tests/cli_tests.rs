//! End-to-end tests for the `treekit-copy` binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn treekit_copy() -> Command {
    Command::cargo_bin("treekit-copy").unwrap()
}

#[test]
fn test_help_runs() {
    treekit_copy()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--symlinks"));
}

#[test]
fn test_version_runs() {
    treekit_copy().arg("--version").assert().success();
}

#[test]
fn test_missing_positional_args_fail() {
    treekit_copy().assert().failure();
}

#[test]
fn test_invalid_pattern_mode_rejected() {
    treekit_copy()
        .args(["--pattern-mode", "fuzzy", "src", "dst"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_copy_tree_with_summary() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    std::fs::create_dir_all(src.join("sub")).unwrap();
    std::fs::write(src.join("a.txt"), "a").unwrap();
    std::fs::write(src.join("sub/b.txt"), "b").unwrap();

    treekit_copy()
        .arg("--summary")
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stdout(predicate::str::contains("[COPY]").and(predicate::str::contains("files=2")));

    assert_eq!(std::fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
    assert_eq!(std::fs::read_to_string(dst.join("sub/b.txt")).unwrap(), "b");
}

#[test]
fn test_ignore_patterns_are_applied() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    std::fs::create_dir_all(src.join("target")).unwrap();
    std::fs::write(src.join("target/out.bin"), "bin").unwrap();
    std::fs::write(src.join("main.rs"), "fn main() {}").unwrap();
    std::fs::write(src.join("main.o"), "obj").unwrap();

    treekit_copy()
        .args(["--ignore", "target", "--ignore", "*.o"])
        .arg(&src)
        .arg(&dst)
        .assert()
        .success();

    assert!(dst.join("main.rs").is_file());
    assert!(!dst.join("main.o").exists());
    assert!(!dst.join("target").exists());
}

#[test]
fn test_regex_pattern_mode() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("keep.txt"), "k").unwrap();
    std::fs::write(src.join("tmp_123"), "t").unwrap();

    treekit_copy()
        .args(["--pattern-mode", "regex", "--ignore", r"^tmp_\d+$"])
        .arg(&src)
        .arg(&dst)
        .assert()
        .success();

    assert!(dst.join("keep.txt").is_file());
    assert!(!dst.join("tmp_123").exists());
}

#[test]
fn test_bad_regex_reports_error() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(&src).unwrap();

    treekit_copy()
        .args(["--pattern-mode", "regex", "--ignore", "("])
        .arg(&src)
        .arg(tmp.path().join("dst"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ignore"));
}

#[cfg(unix)]
#[test]
fn test_symlinks_flag_preserves_links() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("b"), "b").unwrap();
    std::os::unix::fs::symlink("b", src.join("a")).unwrap();

    treekit_copy().arg("-s").arg(&src).arg(&dst).assert().success();

    assert_eq!(
        std::fs::read_link(dst.join("a")).unwrap(),
        std::path::PathBuf::from("b")
    );
}

#[cfg(unix)]
#[test]
fn test_many_symlinks_stay_quiet_by_default() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("target"), "t").unwrap();
    for name in ["l1", "l2", "l3", "l4"] {
        std::os::unix::fs::symlink("target", src.join(name)).unwrap();
    }

    treekit_copy()
        .env_remove("TREEKIT_LOG")
        .arg("-s")
        .arg(&src)
        .arg(&dst)
        .assert()
        .success()
        .stderr(predicate::str::contains("WARN").not());

    assert!(std::fs::symlink_metadata(dst.join("l4")).unwrap().file_type().is_symlink());
}

#[cfg(unix)]
#[test]
fn test_default_follows_symlinks() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let dst = tmp.path().join("dst");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("b"), "payload").unwrap();
    std::os::unix::fs::symlink("b", src.join("a")).unwrap();

    treekit_copy().arg(&src).arg(&dst).assert().success();

    let meta = std::fs::symlink_metadata(dst.join("a")).unwrap();
    assert!(meta.file_type().is_file());
    assert_eq!(std::fs::read_to_string(dst.join("a")).unwrap(), "payload");
}

#[test]
fn test_missing_source_fails() {
    let tmp = tempfile::tempdir().unwrap();

    treekit_copy()
        .arg(tmp.path().join("does-not-exist"))
        .arg(tmp.path().join("dst"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Source does not exist"));

    assert!(!tmp.path().join("dst").exists());
}
