//! The mutation API: `init`, `mkdir`, `rm`, `rmdir`, `chmod`, `put`,
//! `putdir`, plus the read-only `ls`, `stat`, `find`, `cat`. Each function
//! here is the composition of one or more `engine`/`chunker` calls and
//! corresponds to exactly one row of the preconditions/effects table this
//! crate's data model was built against.

use std::path::Path;

use tracing::{info, warn};

use crate::chunker;
use crate::context::Ctx;
use crate::engine;
use crate::error::{Error, FlistResult};
use crate::hash::{self, Hash128};
use crate::model::{AclRecord, DirNode, Inode};

/// Creates a fresh, empty archive: a root dirnode owned by `acl`. Fails if
/// the catalog already has a root.
pub fn init(ctx: &mut Ctx, acl: AclRecord) -> FlistResult<()> {
    if ctx.catalog.exists(hash::path_key(""))? {
        return Err(Error::AlreadyExists {
            path: "/".to_string(),
        });
    }
    let acl_key = engine::store_acl(ctx, &acl)?;
    let root = DirNode::new_root(acl_key);
    engine::commit(ctx, root, None)?;
    info!("initialized empty archive");
    Ok(())
}

/// Lists the direct children of `path`.
pub fn ls(ctx: &Ctx, path: &str) -> FlistResult<Vec<Inode>> {
    Ok(engine::get(ctx, path)?.inodes)
}

/// Returns the inode for a single path's leaf entry, looked up through its
/// parent directory. Use `ls` on `path` itself if `path` names a directory
/// whose own entry (not its parent's view of it) is needed.
pub fn stat(ctx: &Ctx, path: &str) -> FlistResult<Inode> {
    let normalized = hash::normalize_path(path);
    if normalized.is_empty() {
        return Err(Error::InvalidPath {
            reason: "root has no parent entry to stat; use ls(\"/\") instead".to_string(),
        });
    }
    let parent = engine::get(ctx, &hash::parent_path(&normalized))?;
    let leaf = hash::leaf_name(&normalized);
    parent
        .search(leaf)
        .cloned()
        .ok_or_else(|| Error::NotFound { path: normalized })
}

/// Full recursive listing of every entry reachable from `path`, updating
/// `ctx.stats` with the directory/regular/symlink/special counts and total
/// size encountered along the way.
pub fn find(ctx: &mut Ctx, path: &str) -> FlistResult<Vec<String>> {
    let tree = engine::get_recursive(ctx, path)?;
    let mut paths = Vec::new();
    find_in_tree(&tree, &mut ctx.stats, &mut paths);
    Ok(paths)
}

fn find_in_tree(tree: &crate::model::DirTree, stats: &mut crate::context::Stats, paths: &mut Vec<String>) {
    for inode in &tree.node.inodes {
        let full = if tree.node.path.is_empty() {
            inode.name.clone()
        } else {
            format!("{}/{}", tree.node.path, inode.name)
        };
        paths.push(full);

        match &inode.attributes {
            crate::model::InodeAttributes::Dir(_) => stats.record_directory(),
            crate::model::InodeAttributes::File(_) => stats.record_regular(inode.size),
            crate::model::InodeAttributes::Link(_) => stats.record_symlink(),
            crate::model::InodeAttributes::Special(_) => stats.record_special(),
        }
    }
    for child in &tree.children {
        find_in_tree(child, stats, paths);
    }
}

/// Creates an empty directory at `path`. The parent must already exist and
/// must not already contain an entry named `path`'s leaf component.
pub fn mkdir(ctx: &mut Ctx, path: &str, acl: AclRecord) -> FlistResult<()> {
    let normalized = hash::normalize_path(path);
    if normalized.is_empty() {
        return Err(Error::AlreadyExists { path: "/".to_string() });
    }
    let parent_path = hash::parent_path(&normalized);
    let leaf = hash::leaf_name(&normalized);
    let mut parent = engine::get(ctx, &parent_path)?;
    if parent.search(leaf).is_some() {
        return Err(Error::AlreadyExists { path: normalized });
    }

    let acl_key = engine::store_acl(ctx, &acl)?;
    let child = DirNode::new(&normalized, leaf, acl_key);
    parent.append_inode(Inode::new_dir(leaf, child.path_key(), acl_key))?;

    engine::commit(ctx, child, Some(&normalized))?;
    engine::commit(ctx, parent, None)?;
    Ok(())
}

/// Removes a non-directory entry from its parent.
pub fn rm(ctx: &mut Ctx, path: &str) -> FlistResult<()> {
    let normalized = hash::normalize_path(path);
    let parent_path = hash::parent_path(&normalized);
    let leaf = hash::leaf_name(&normalized);
    let mut parent = engine::get(ctx, &parent_path)?;

    let inode = parent
        .search(leaf)
        .ok_or_else(|| Error::NotFound { path: normalized.clone() })?;
    if inode.is_dir() {
        return Err(Error::InvalidPath {
            reason: format!("'{normalized}' is a directory; use rmdir"),
        });
    }

    parent.rm_inode(leaf);
    engine::commit(ctx, parent, None)?;
    Ok(())
}

/// Removes a directory and everything beneath it.
pub fn rmdir(ctx: &mut Ctx, path: &str) -> FlistResult<()> {
    let normalized = hash::normalize_path(path);
    if normalized.is_empty() {
        return Err(Error::InvalidPath {
            reason: "cannot rmdir the root".to_string(),
        });
    }
    let parent_path = hash::parent_path(&normalized);
    let leaf = hash::leaf_name(&normalized);
    let mut parent = engine::get(ctx, &parent_path)?;

    let inode = parent
        .search(leaf)
        .ok_or_else(|| Error::NotFound { path: normalized.clone() })?;
    if !inode.is_dir() {
        return Err(Error::InvalidPath {
            reason: format!("'{normalized}' is not a directory; use rm"),
        });
    }

    let target = engine::get(ctx, &normalized)?;
    engine::rm_recursively(ctx, &target)?;

    parent.rm_inode(leaf);
    engine::commit(ctx, parent, None)?;
    Ok(())
}

/// Replaces the permission bits of the entry at `path`, preserving
/// `uname`/`gname` and every bit above the low 9 (setuid/setgid/sticky are
/// not modeled, so there are none to preserve beyond the mask itself —
/// `mode` is taken as the complete low-9-bit permission word).
pub fn chmod(ctx: &mut Ctx, path: &str, mode: u16) -> FlistResult<()> {
    let normalized = hash::normalize_path(path);
    let mode = mode & 0o777;

    if normalized.is_empty() {
        let mut root = engine::get(ctx, "")?;
        let acl = engine::resolve_acl(ctx, root.acl_key())?;
        let new_key = engine::store_acl(ctx, &acl.with_mode(mode))?;
        root.acl_key = *new_key.as_bytes();
        engine::commit(ctx, root, None)?;
        return Ok(());
    }

    let parent_path = hash::parent_path(&normalized);
    let leaf = hash::leaf_name(&normalized);
    let mut parent = engine::get(ctx, &parent_path)?;
    let inode = parent
        .search_mut(leaf)
        .ok_or_else(|| Error::NotFound { path: normalized.clone() })?;

    let acl = engine::resolve_acl(ctx, inode.acl_key())?;
    let new_key = engine::store_acl(ctx, &acl.with_mode(mode))?;
    inode.acl_key = *new_key.as_bytes();

    if inode.is_dir() {
        let mut child = engine::get(ctx, &normalized)?;
        child.acl_key = *new_key.as_bytes();
        engine::commit(ctx, child, Some(&normalized))?;
    }

    engine::commit(ctx, parent, None)?;
    Ok(())
}

/// Uploads a local file's contents and links it into the archive at
/// `path`, overwriting any existing entry of the same name.
pub fn put(ctx: &mut Ctx, path: &str, local_path: &Path, acl: AclRecord) -> FlistResult<()> {
    if !ctx.has_backend() {
        warn!("no backend configured: chunks will be computed and stored, but not uploaded");
    }
    let normalized = hash::normalize_path(path);
    let parent_path = hash::parent_path(&normalized);
    let leaf = hash::leaf_name(&normalized);
    let mut parent = engine::get(ctx, &parent_path)?;
    parent.rm_inode(leaf);

    let acl_record = acl.clone();
    engine::store_acl(ctx, &acl_record)?;
    let inode = chunker::inode_from_localfile(ctx, leaf, local_path, &acl_record)?;
    parent.append_inode(inode)?;

    engine::commit(ctx, parent, None)?;
    Ok(())
}

/// Recursively uploads a local directory tree and links it into the
/// archive at `path`.
pub fn putdir(ctx: &mut Ctx, path: &str, local_path: &Path, acl: AclRecord) -> FlistResult<()> {
    if !ctx.has_backend() {
        warn!("no backend configured: chunks will be computed and stored, but not uploaded");
    }
    let normalized = hash::normalize_path(path);
    let parent_path = hash::parent_path(&normalized);
    let leaf = hash::leaf_name(&normalized);
    let mut parent = engine::get(ctx, &parent_path)?;
    if parent.search(leaf).is_some() {
        return Err(Error::AlreadyExists { path: normalized });
    }

    engine::store_acl(ctx, &acl)?;
    let child = chunker::inode_from_localdir(ctx, local_path, &normalized, &acl)?;
    parent.append_inode(Inode::new_dir(leaf, child.path_key(), Hash128::from_bytes(acl.key)))?;
    ctx.stats.record_directory();

    engine::commit(ctx, parent, None)?;
    Ok(())
}

/// Downloads and decrypts a file's full contents.
pub fn cat(ctx: &Ctx, path: &str) -> FlistResult<Vec<u8>> {
    let inode = stat(ctx, path)?;
    match inode.attributes {
        crate::model::InodeAttributes::File(attrs) => chunker::assemble(ctx, &attrs.blocks),
        _ => Err(Error::InvalidPath {
            reason: format!("'{path}' is not a regular file"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> (Ctx, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let catalog = crate::catalog::Catalog::open(dir.path().join("flist.db")).unwrap();
        let mut ctx = Ctx::new(catalog);
        ctx.backend = Some(std::sync::Arc::new(flist_store_memory::MemoryBackend::new()));
        (ctx, dir)
    }

    fn acl() -> AclRecord {
        AclRecord::new("user", "user", 0o755)
    }

    #[test]
    fn init_twice_fails() {
        let (mut ctx, _dir) = ctx();
        init(&mut ctx, acl()).unwrap();
        assert!(matches!(init(&mut ctx, acl()).unwrap_err(), Error::AlreadyExists { .. }));
    }

    #[test]
    fn mkdir_then_ls_root_shows_entry() {
        let (mut ctx, _dir) = ctx();
        init(&mut ctx, acl()).unwrap();
        mkdir(&mut ctx, "/bin", acl()).unwrap();
        let entries = ls(&ctx, "/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "bin");
        assert!(entries[0].is_dir());
    }

    #[test]
    fn mkdir_duplicate_name_fails() {
        let (mut ctx, _dir) = ctx();
        init(&mut ctx, acl()).unwrap();
        mkdir(&mut ctx, "/bin", acl()).unwrap();
        assert!(matches!(mkdir(&mut ctx, "/bin", acl()).unwrap_err(), Error::AlreadyExists { .. }));
    }

    #[test]
    fn put_and_cat_round_trips_small_file() {
        let (mut ctx, dir) = ctx();
        init(&mut ctx, acl()).unwrap();

        let local = dir.path().join("hello.txt");
        std::fs::write(&local, b"hello world").unwrap();
        put(&mut ctx, "/hello.txt", &local, acl()).unwrap();

        let contents = cat(&ctx, "/hello.txt").unwrap();
        assert_eq!(contents, b"hello world");
    }

    #[test]
    fn chmod_changes_mode_and_preserves_identity() {
        let (mut ctx, _dir) = ctx();
        init(&mut ctx, acl()).unwrap();
        mkdir(&mut ctx, "/bin", acl()).unwrap();

        chmod(&mut ctx, "/bin", 0o700).unwrap();
        let inode = stat(&ctx, "/bin").unwrap();
        let updated_acl = engine::resolve_acl(&ctx, inode.acl_key()).unwrap();
        assert_eq!(updated_acl.mode, 0o700);
        assert_eq!(updated_acl.uname, "user");

        chmod(&mut ctx, "/bin", 0o755).unwrap();
        let inode = stat(&ctx, "/bin").unwrap();
        let restored_acl = engine::resolve_acl(&ctx, inode.acl_key()).unwrap();
        assert_eq!(restored_acl.mode, 0o755);
    }

    #[test]
    fn rmdir_removes_subtree_without_touching_siblings() {
        let (mut ctx, dir) = ctx();
        init(&mut ctx, acl()).unwrap();
        mkdir(&mut ctx, "/a", acl()).unwrap();
        mkdir(&mut ctx, "/b", acl()).unwrap();
        mkdir(&mut ctx, "/a/c", acl()).unwrap();
        let local = dir.path().join("f.txt");
        std::fs::write(&local, b"data").unwrap();
        put(&mut ctx, "/a/c/f.txt", &local, acl()).unwrap();

        rmdir(&mut ctx, "/a").unwrap();

        let root_entries = ls(&ctx, "/").unwrap();
        assert_eq!(root_entries.len(), 1);
        assert_eq!(root_entries[0].name, "b");
        assert!(matches!(stat(&ctx, "/a").unwrap_err(), Error::NotFound { .. }));
    }

    #[test]
    fn find_lists_every_entry_and_updates_stats() {
        let (mut ctx, dir) = ctx();
        init(&mut ctx, acl()).unwrap();
        mkdir(&mut ctx, "/a", acl()).unwrap();
        let local = dir.path().join("needle.txt");
        std::fs::write(&local, b"12345").unwrap();
        put(&mut ctx, "/a/needle.txt", &local, acl()).unwrap();

        let mut paths = find(&mut ctx, "/").unwrap();
        paths.sort();
        assert_eq!(paths, vec!["a", "a/needle.txt"]);
        assert_eq!(ctx.stats.directory, 1);
        assert_eq!(ctx.stats.regular, 1);
        assert_eq!(ctx.stats.total_size, 5);
    }
}
