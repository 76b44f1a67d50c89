// End-to-end replay of small dump streams against a real temporary
// destination tree. Unit-level behavior of the decoder, parser and resolver
// is covered in the crate's module tests; these exercises run whole streams
// through Replayer::replay the way the pipeline driver feeds it.

use std::fs;
use std::io::Cursor;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use engine::{ReplayError, Replayer};
use tempfile::tempdir;

#[test]
fn namespace_scenario_reconstructs_tree() {
    let dest = tempdir().expect("tempdir");
    let stream = "snapshot ./snap uuid=5b-2f transid=100 parent_uuid=1a parent_transid=90\n\
                  mkdir ./snap/a\n\
                  utimes ./snap/a atime=1 mtime=1 ctime=1\n\
                  mkfile ./snap/a/f\n\
                  write ./snap/a/f offset=0 len=12\n\
                  rename ./snap/a/f dest=./snap/a/g\n\
                  symlink ./snap/a/g-link dest=/etc/hosts\n";

    let applied = Replayer::new(dest.path(), "snap")
        .replay(Cursor::new(stream))
        .expect("replay succeeds");
    assert_eq!(applied, 7);

    assert!(dest.path().join("a").is_dir());
    assert!(!dest.path().join("a/f").exists(), "f was renamed away");
    assert!(dest.path().join("a/g").is_file());
    let target = fs::read_link(dest.path().join("a/g-link")).expect("read link");
    assert_eq!(target, Path::new("/etc/hosts"));
}

#[test]
fn hardlinks_share_an_inode_and_survive_unlink() {
    let dest = tempdir().expect("tempdir");
    let stream = "mkdir ./snap/d\n\
                  mkfile ./snap/d/one\n\
                  link ./snap/d/two dest=d/one\n\
                  unlink ./snap/d/one\n";

    Replayer::new(dest.path(), "snap")
        .replay(Cursor::new(stream))
        .expect("replay succeeds");

    assert!(!dest.path().join("d/one").exists());
    let two = fs::metadata(dest.path().join("d/two")).expect("metadata");
    assert_eq!(two.nlink(), 1);
}

#[test]
fn escaped_names_reach_the_filesystem_decoded() {
    let dest = tempdir().expect("tempdir");
    let stream = "mkdir ./snap/spaced\\ out\n\
                  mkfile ./snap/spaced\\ out/\\061st\n";

    Replayer::new(dest.path(), "snap")
        .replay(Cursor::new(stream))
        .expect("replay succeeds");

    assert!(dest.path().join("spaced out").is_dir());
    assert!(dest.path().join("spaced out/1st").is_file());
}

#[test]
fn traversal_attempt_aborts_before_touching_the_tree() {
    let dest = tempdir().expect("tempdir");
    let probe = dest.path().join("probe");
    fs::write(&probe, b"sentinel").expect("write probe");

    let stream = "unlink ./snap/../probe\n";
    let err = Replayer::new(dest.path().join("inner"), "snap")
        .replay(Cursor::new(stream))
        .expect_err("traversal is fatal");
    assert!(matches!(err, ReplayError::Path { line: 1, .. }));
    assert!(probe.exists(), "nothing outside the root was touched");
}

#[test]
fn malformed_line_aborts_with_its_position() {
    let dest = tempdir().expect("tempdir");
    let stream = "mkdir ./snap/ok\nnot a known record kind\n";
    let err = Replayer::new(dest.path(), "snap")
        .replay(Cursor::new(stream))
        .expect_err("parse failure is fatal");
    assert!(matches!(err, ReplayError::Parse { line: 2, .. }));
    assert!(dest.path().join("ok").is_dir(), "no rollback of prior records");
}
