//! Pure data structures and on-disk (CBOR) schema for dirnodes, inodes, and
//! ACL records. Contains no I/O; shared across the directory engine and the
//! catalog. The wire format stands in for the reference implementation's
//! Cap'n Proto schema: every record is a self-describing, tagged CBOR value
//! with explicit field indices, so unknown future fields can be added
//! without breaking old readers and unknown tags are rejected by
//! construction (an unrecognized union discriminant fails to decode).

use minicbor::{CborLen, Decode, Encode};

use crate::hash::Hash128;

/// Current on-disk schema marker. Bumped if the record layout ever changes
/// in an incompatible way.
const DIRNODE_MAGIC: &str = "flist.dir/1";

#[derive(Encode, Decode, CborLen, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cbor(map)]
pub struct Timestamp {
    #[n(0)]
    pub seconds: u32,
    #[n(1)]
    pub nanos: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let dur = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp {
            seconds: dur.as_secs() as u32,
            nanos: dur.subsec_nanos(),
        }
    }
}

/// One `(chunk_id, cipher_key)` pair in a file inode's chunk manifest.
#[derive(Encode, Decode, CborLen, Clone, Debug, PartialEq, Eq)]
#[cbor(map)]
pub struct ChunkRef {
    /// Content hash of the ciphertext; the backend key.
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    pub hash: [u8; 16],
    /// Content hash of the plaintext; also the symmetric decryption key.
    #[n(1)]
    #[cbor(with = "minicbor::bytes")]
    pub key: [u8; 16],
}

impl ChunkRef {
    pub fn hash(&self) -> Hash128 {
        Hash128::from_bytes(self.hash)
    }

    pub fn key(&self) -> Hash128 {
        Hash128::from_bytes(self.key)
    }
}

#[repr(u8)]
#[derive(Encode, Decode, CborLen, Clone, Copy, Debug, PartialEq, Eq)]
#[cbor(index_only)]
pub enum SpecialKind {
    #[n(0)]
    Socket = 0,
    #[n(1)]
    Block = 1,
    #[n(2)]
    Char = 2,
    #[n(3)]
    Fifo = 3,
}

#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(map)]
pub struct DirAttrs {
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    pub subdirkey: [u8; 16],
}

#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(map)]
pub struct FileAttrs {
    #[n(0)]
    pub blocksize: u32,
    #[n(1)]
    pub blocks: Vec<ChunkRef>,
}

#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(map)]
pub struct LinkAttrs {
    #[n(0)]
    pub target: String,
}

#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(map)]
pub struct SpecialAttrs {
    #[n(0)]
    pub kind: SpecialKind,
    #[n(1)]
    pub data: String,
}

/// The tagged union carried by every inode. An unrecognized discriminant is
/// rejected at decode time by `minicbor`'s generated variant match, which is
/// how this schema satisfies "decoding must reject unknown tags" without any
/// extra validation code.
#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(flat)]
pub enum InodeAttributes {
    #[n(1)]
    Dir(#[n(0)] DirAttrs),
    #[n(2)]
    File(#[n(0)] FileAttrs),
    #[n(3)]
    Link(#[n(0)] LinkAttrs),
    #[n(4)]
    Special(#[n(0)] SpecialAttrs),
}

/// One directory entry: a name plus common metadata plus a variant payload.
#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(map)]
pub struct Inode {
    #[n(0)]
    pub name: String,
    #[n(1)]
    pub size: u64,
    #[n(2)]
    pub ctime: Timestamp,
    #[n(3)]
    pub mtime: Timestamp,
    #[n(4)]
    #[cbor(with = "minicbor::bytes")]
    pub acl_key: [u8; 16],
    #[n(5)]
    pub attributes: InodeAttributes,
}

impl Inode {
    pub fn new_dir(name: impl Into<String>, subdirkey: Hash128, acl_key: Hash128) -> Self {
        let now = Timestamp::now();
        Inode {
            name: name.into(),
            size: 0,
            ctime: now,
            mtime: now,
            acl_key: (*acl_key.as_bytes()),
            attributes: InodeAttributes::Dir(DirAttrs {
                subdirkey: *subdirkey.as_bytes(),
            }),
        }
    }

    pub fn new_file(
        name: impl Into<String>,
        blocksize: u32,
        blocks: Vec<ChunkRef>,
        size: u64,
        acl_key: Hash128,
    ) -> Self {
        let now = Timestamp::now();
        Inode {
            name: name.into(),
            size,
            ctime: now,
            mtime: now,
            acl_key: (*acl_key.as_bytes()),
            attributes: InodeAttributes::File(FileAttrs { blocksize, blocks }),
        }
    }

    pub fn new_symlink(name: impl Into<String>, target: impl Into<String>, acl_key: Hash128) -> Self {
        let now = Timestamp::now();
        Inode {
            name: name.into(),
            size: 0,
            ctime: now,
            mtime: now,
            acl_key: (*acl_key.as_bytes()),
            attributes: InodeAttributes::Link(LinkAttrs {
                target: target.into(),
            }),
        }
    }

    pub fn new_special(
        name: impl Into<String>,
        kind: SpecialKind,
        data: impl Into<String>,
        acl_key: Hash128,
    ) -> Self {
        let now = Timestamp::now();
        Inode {
            name: name.into(),
            size: 0,
            ctime: now,
            mtime: now,
            acl_key: (*acl_key.as_bytes()),
            attributes: InodeAttributes::Special(SpecialAttrs {
                kind,
                data: data.into(),
            }),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.attributes, InodeAttributes::Dir(_))
    }

    pub fn subdirkey(&self) -> Option<Hash128> {
        match &self.attributes {
            InodeAttributes::Dir(d) => Some(Hash128::from_bytes(d.subdirkey)),
            _ => None,
        }
    }

    pub fn acl_key(&self) -> Hash128 {
        Hash128::from_bytes(self.acl_key)
    }
}

/// A directory, as persisted in the catalog's `entries` table.
#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(map)]
pub struct DirNode {
    #[n(0)]
    magic: String,
    /// Full normalized path ("location" in the spec).
    #[n(1)]
    pub path: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub parent: String,
    #[n(4)]
    #[cbor(with = "minicbor::bytes")]
    pub acl_key: [u8; 16],
    #[n(5)]
    pub ctime: Timestamp,
    #[n(6)]
    pub mtime: Timestamp,
    #[n(7)]
    pub size: u64,
    /// Insertion order is the canonical order; this is a plain `Vec`, not a
    /// sorted map, precisely so encoding stays deterministic without
    /// reordering children.
    #[n(8)]
    pub inodes: Vec<Inode>,
}

impl DirNode {
    pub fn new(path: impl Into<String>, name: impl Into<String>, acl_key: Hash128) -> Self {
        let path = path.into();
        let parent = crate::hash::parent_path(&path);
        let now = Timestamp::now();
        DirNode {
            magic: DIRNODE_MAGIC.to_string(),
            path,
            name: name.into(),
            parent,
            acl_key: *acl_key.as_bytes(),
            ctime: now,
            mtime: now,
            size: 0,
            inodes: Vec::new(),
        }
    }

    pub fn new_root(acl_key: Hash128) -> Self {
        Self::new("", "", acl_key)
    }

    pub fn path_key(&self) -> Hash128 {
        crate::hash::path_key(&self.path)
    }

    pub fn acl_key(&self) -> Hash128 {
        Hash128::from_bytes(self.acl_key)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, minicbor::encode::Error<std::convert::Infallible>> {
        minicbor::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<DirNode, minicbor::decode::Error> {
        minicbor::decode(bytes)
    }

    /// Appends `inode` to this dirnode, rejecting a duplicate name
    /// (invariant 3: names unique within a dirnode). The caller must
    /// `dirnode_rm_inode` first if it intends to replace an entry.
    pub fn append_inode(&mut self, inode: Inode) -> Result<(), crate::Error> {
        if self.inodes.iter().any(|i| i.name == inode.name) {
            return Err(crate::Error::AlreadyExists {
                path: format!("{}/{}", self.path, inode.name),
            });
        }
        self.mtime = Timestamp::now();
        self.inodes.push(inode);
        Ok(())
    }

    pub fn search(&self, name: &str) -> Option<&Inode> {
        self.inodes.iter().find(|i| i.name == name)
    }

    pub fn search_mut(&mut self, name: &str) -> Option<&mut Inode> {
        self.inodes.iter_mut().find(|i| i.name == name)
    }

    /// Removes and returns the inode named `name`, if present.
    pub fn rm_inode(&mut self, name: &str) -> Option<Inode> {
        let idx = self.inodes.iter().position(|i| i.name == name)?;
        self.mtime = Timestamp::now();
        Some(self.inodes.remove(idx))
    }
}

/// A deduplicated `(uname, gname, mode)` permission record.
#[derive(Encode, Decode, CborLen, Clone, Debug, PartialEq, Eq)]
#[cbor(map)]
pub struct AclRecord {
    #[n(0)]
    pub uname: String,
    #[n(1)]
    pub gname: String,
    #[n(2)]
    pub mode: u16,
    #[n(3)]
    #[cbor(with = "minicbor::bytes")]
    pub key: [u8; 16],
}

impl AclRecord {
    pub fn new(uname: impl Into<String>, gname: impl Into<String>, mode: u16) -> Self {
        let uname = uname.into();
        let gname = gname.into();
        let key = crate::hash::acl_key(&uname, &gname, mode);
        AclRecord {
            uname,
            gname,
            mode,
            key: *key.as_bytes(),
        }
    }

    pub fn key(&self) -> Hash128 {
        Hash128::from_bytes(self.key)
    }

    /// Returns a copy of this record with `mode` replaced, preserving
    /// `uname`/`gname` and re-deriving the key. Used by `chmod`, which must
    /// leave every ACL field other than `mode` unchanged.
    pub fn with_mode(&self, mode: u16) -> Self {
        AclRecord::new(self.uname.clone(), self.gname.clone(), mode)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, minicbor::encode::Error<std::convert::Infallible>> {
        minicbor::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<AclRecord, minicbor::decode::Error> {
        minicbor::decode(bytes)
    }
}

/// A directory and its already-loaded children, returned by
/// `Engine::get_recursive`. This tree is a traversal convenience only — it
/// is never itself persisted, and the ownership edge for a child directory
/// remains the `subdirkey` reference resolved through the catalog.
#[derive(Debug)]
pub struct DirTree {
    pub node: DirNode,
    pub children: Vec<DirTree>,
}
