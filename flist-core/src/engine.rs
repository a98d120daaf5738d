//! The directory engine: load, commit, and recursive-load/remove over
//! dirnodes in the catalog.
//!
//! Grounded in the traversal shape of `s5_fs/src/gc.rs` (iterative walks
//! keyed by content hash, conservative about missing data) and in the
//! reference implementation's `flist_read.c` load/commit pair, but
//! expressed as ordinary synchronous functions rather than the teacher's
//! actor/channel plumbing — this engine has no internal concurrency to
//! coordinate (§5).

use tracing::{debug, trace};

use crate::context::Ctx;
use crate::error::{Error, FlistResult};
use crate::hash::{self, Hash128};
use crate::model::{DirNode, DirTree};

/// Loads the dirnode at `path`, or `Error::NotFound` if no such directory
/// has been committed.
pub fn get(ctx: &Ctx, path: &str) -> FlistResult<DirNode> {
    let normalized = hash::normalize_path(path);
    let key = hash::path_key(&normalized);
    let bytes = ctx
        .catalog
        .sget(key)?
        .ok_or_else(|| Error::NotFound { path: normalized.clone() })?;
    DirNode::from_bytes(&bytes).map_err(|e| Error::CorruptArchive {
        detail: format!("dirnode at '{normalized}' failed to decode: {e}"),
    })
}

/// Loads `path` and, for every child inode that is itself a directory,
/// recursively loads its subtree. Missing subdirectories are a corrupt
/// archive (a dir-typed inode's `subdirkey` must always resolve, invariant
/// 2), not a tolerated gap.
pub fn get_recursive(ctx: &Ctx, path: &str) -> FlistResult<DirTree> {
    let node = get(ctx, path)?;
    load_tree(ctx, node)
}

fn load_tree(ctx: &Ctx, node: DirNode) -> FlistResult<DirTree> {
    let mut children = Vec::new();
    for inode in &node.inodes {
        if let Some(subdirkey) = inode.subdirkey() {
            let child_path = if node.path.is_empty() {
                inode.name.clone()
            } else {
                format!("{}/{}", node.path, inode.name)
            };
            let bytes = ctx.catalog.sget(subdirkey)?.ok_or_else(|| Error::CorruptArchive {
                detail: format!("dir entry '{child_path}' has no resolvable subdirectory"),
            })?;
            let child_node = DirNode::from_bytes(&bytes).map_err(|e| Error::CorruptArchive {
                detail: format!("subdirectory '{child_path}' failed to decode: {e}"),
            })?;
            children.push(load_tree(ctx, child_node)?);
        }
    }
    Ok(DirTree { node, children })
}

/// Loads the parent dirnode of `node`, or `None` if `node` is the root.
pub fn get_parent(ctx: &Ctx, node: &DirNode) -> FlistResult<Option<DirNode>> {
    if node.path.is_empty() {
        return Ok(None);
    }
    Ok(Some(get(ctx, &node.parent)?))
}

/// Persists `node`, then walks upward re-pointing each ancestor's
/// `subdirkey` entry at the freshly written child, stopping at `stop_at`
/// (inclusive) or at the root if `stop_at` is `None`.
///
/// The write order is leaf-first, root-last: every ancestor above the
/// point of mutation is rewritten only after its child is durably on
/// disk, so a crash mid-commit always leaves the pre-mutation tree intact
/// and reachable from root (property 7).
pub fn commit(ctx: &Ctx, mut node: DirNode, stop_at: Option<&str>) -> FlistResult<()> {
    loop {
        let key = node.path_key();
        let bytes = node.to_bytes().map_err(|e| Error::CorruptArchive {
            detail: format!("failed to encode dirnode '{}': {e}", node.path),
        })?;
        trace!(path = %node.path, bytes = bytes.len(), "writing dirnode");
        ctx.catalog.sset(key, &bytes)?;

        let reached_stop = stop_at.is_some_and(|p| p == node.path);
        if node.path.is_empty() || reached_stop {
            break;
        }

        let mut parent = get(ctx, &node.parent)?;
        let subdirkey = node.path_key();
        let leaf = hash::leaf_name(&node.path);
        match parent.search_mut(leaf) {
            Some(inode) => {
                if let crate::model::InodeAttributes::Dir(attrs) = &mut inode.attributes {
                    attrs.subdirkey = *subdirkey.as_bytes();
                } else {
                    return Err(Error::CorruptArchive {
                        detail: format!("'{}' is not a directory entry in its parent", node.path),
                    });
                }
            }
            None => {
                return Err(Error::CorruptArchive {
                    detail: format!("parent of '{}' has no entry named '{leaf}'", node.path),
                });
            }
        }
        node = parent;
    }
    debug!(path_depth = node.path.matches('/').count(), "commit complete");
    Ok(())
}

/// Removes every dirnode reachable from `node`, depth-first, post-order.
/// Does not touch `node`'s parent — the caller is responsible for
/// detaching `node`'s own inode from its parent and committing that
/// separately (the precondition of `rmdir` in the mutation API).
pub fn rm_recursively(ctx: &Ctx, node: &DirNode) -> FlistResult<()> {
    for inode in &node.inodes {
        if let Some(subdirkey) = inode.subdirkey() {
            if let Some(bytes) = ctx.catalog.sget(subdirkey)? {
                let child = DirNode::from_bytes(&bytes).map_err(|e| Error::CorruptArchive {
                    detail: format!("subdirectory of '{}' failed to decode: {e}", node.path),
                })?;
                rm_recursively(ctx, &child)?;
            }
        }
    }
    ctx.catalog.sdel(node.path_key())?;
    Ok(())
}

/// Resolves an inode's ACL to its `(uname, gname, mode)` triple.
pub fn resolve_acl(ctx: &Ctx, acl_key: Hash128) -> FlistResult<crate::model::AclRecord> {
    let bytes = ctx
        .catalog
        .sget(acl_key)?
        .ok_or_else(|| Error::CorruptArchive {
            detail: format!("acl key {acl_key} has no record"),
        })?;
    crate::model::AclRecord::from_bytes(&bytes).map_err(|e| Error::CorruptArchive {
        detail: format!("acl record failed to decode: {e}"),
    })
}

/// Writes `acl`, keyed by its own derived key, if not already present
/// (ACL records are deduplicated by content, invariant 4).
pub fn store_acl(ctx: &Ctx, acl: &crate::model::AclRecord) -> FlistResult<Hash128> {
    let key = acl.key();
    if !ctx.catalog.exists(key)? {
        let bytes = acl.to_bytes().map_err(|e| Error::CorruptArchive {
            detail: format!("failed to encode acl record: {e}"),
        })?;
        ctx.catalog.sset(key, &bytes)?;
    }
    Ok(key)
}
