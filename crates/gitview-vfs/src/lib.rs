//! A read-only filesystem view over a git tree.
//!
//! [`GitFs`] walks a root [`Tree`] as a hierarchy: `open` reads a file's
//! blob, `stat`/`lstat` describe a node (following symlinks or not), and
//! `read_dir` lists a directory. Symlink targets are blob contents,
//! resolved relative to the link's parent directory, with a bounded
//! follow depth.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::time::SystemTime;

use bstr::{BString, ByteSlice};
use gitview_hash::ObjectId;
use gitview_object::{Blob, Mode, Object, Tree, TreeEntry};
use gitview_odb::{OdbError, Repository};

/// How many symlinks a single resolution may traverse.
const MAX_SYMLINK_DEPTH: usize = 40;

/// Errors from filesystem-view operations.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("is a directory: {0}")]
    IsDirectory(String),

    #[error("not a directory: {0}")]
    NotDirectory(String),

    #[error("not a blob: {0}")]
    NotBlob(String),

    #[error("too many levels of symbolic links: {0}")]
    TooManyLinks(String),

    #[error("corrupt repository: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Odb(#[from] OdbError),
}

/// Metadata for a node in the tree, in the shape of a directory entry.
#[derive(Debug, Clone)]
pub struct FileInfo {
    name: BString,
    id: ObjectId,
    mode: Mode,
    size: u64,
}

impl FileInfo {
    /// The node's name (empty for the root directory).
    pub fn name(&self) -> &BString {
        &self.name
    }

    /// The object id behind this node.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Raw permission bits.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Size: byte length for blobs, entry count for directories.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_dir(&self) -> bool {
        self.mode.is_dir()
    }

    pub fn is_symlink(&self) -> bool {
        self.mode.is_symlink()
    }

    /// Modification time is not tracked by the object model; a fixed
    /// sentinel keeps the value deterministic.
    pub fn mod_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }
}

/// An open file: a seekable reader over a blob's bytes.
#[derive(Debug)]
pub struct BlobFile {
    cursor: Cursor<Vec<u8>>,
}

impl BlobFile {
    fn new(data: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Total length of the file in bytes.
    pub fn len(&self) -> u64 {
        self.cursor.get_ref().len() as u64
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }
}

impl Read for BlobFile {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for BlobFile {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

/// The result of resolving a path: the root itself, or an entry together
/// with the normalized path it was found at.
enum Located {
    Root,
    Entry(TreeEntry, String),
}

/// A read-only filesystem rooted at a tree object.
pub struct GitFs {
    repo: Repository,
    root: ObjectId,
}

impl GitFs {
    /// Create a view over the tree named by `root`.
    pub fn new(repo: Repository, root: ObjectId) -> Self {
        Self { repo, root }
    }

    /// Open a file for reading, following symlinks.
    pub fn open(&self, path: &str) -> Result<BlobFile, VfsError> {
        match self.resolve(path, true)? {
            Located::Root => Err(VfsError::IsDirectory(path.to_string())),
            Located::Entry(entry, at) => {
                if entry.mode.is_dir() {
                    return Err(VfsError::IsDirectory(at));
                }
                let blob = self.load_blob(&entry.id, &at)?;
                Ok(BlobFile::new(blob.data))
            }
        }
    }

    /// Describe a node, following symlinks.
    pub fn stat(&self, path: &str) -> Result<FileInfo, VfsError> {
        self.stat_inner(path, true)
    }

    /// Describe a node without following a final symlink.
    pub fn lstat(&self, path: &str) -> Result<FileInfo, VfsError> {
        self.stat_inner(path, false)
    }

    /// List a directory, following symlinks on the way there.
    pub fn read_dir(&self, path: &str) -> Result<Vec<FileInfo>, VfsError> {
        let tree = match self.resolve(path, true)? {
            Located::Root => self.load_tree(&self.root, path)?,
            Located::Entry(entry, at) => {
                if !entry.mode.is_dir() {
                    return Err(VfsError::NotDirectory(at));
                }
                self.load_tree(&entry.id, &at)?
            }
        };
        tree.iter().map(|entry| self.entry_info(entry)).collect()
    }

    fn stat_inner(&self, path: &str, follow: bool) -> Result<FileInfo, VfsError> {
        match self.resolve(path, follow)? {
            Located::Root => {
                let tree = self.load_tree(&self.root, path)?;
                Ok(FileInfo {
                    name: BString::from(""),
                    id: self.root,
                    mode: Mode::from_raw(0o040000),
                    size: tree.len() as u64,
                })
            }
            Located::Entry(entry, _) => self.entry_info(&entry),
        }
    }

    /// Resolve a path to a node, optionally following symlinks, with a
    /// depth bound against link loops.
    fn resolve(&self, path: &str, follow: bool) -> Result<Located, VfsError> {
        let mut current = path.to_string();
        for _ in 0..=MAX_SYMLINK_DEPTH {
            let components = split_path(&current);
            let Some(entry) = self.walk(&components, &current)? else {
                return Ok(Located::Root);
            };

            if entry.mode.is_symlink() && follow {
                let blob = self.load_blob(&entry.id, &current)?;
                let target = String::from_utf8(blob.data)
                    .map_err(|_| VfsError::Corrupt(format!("non-UTF-8 link target at {current}")))?;
                let rebased = join_link(&parent_of(&components), &target);
                current = rebased;
                continue;
            }
            return Ok(Located::Entry(entry, current));
        }
        Err(VfsError::TooManyLinks(path.to_string()))
    }

    /// Walk tree components literally (no symlink handling). Returns
    /// `None` when the path names the root itself.
    fn walk(&self, components: &[&str], path: &str) -> Result<Option<TreeEntry>, VfsError> {
        let Some((last, intermediate)) = components.split_last() else {
            return Ok(None);
        };

        let mut tree = self.load_tree(&self.root, path)?;
        for comp in intermediate {
            let entry = tree
                .find(comp.as_bytes().as_bstr())
                .ok_or_else(|| VfsError::NotFound(path.to_string()))?;
            if !entry.mode.is_dir() {
                return Err(VfsError::NotDirectory(path.to_string()));
            }
            let child = entry.id;
            tree = self.load_tree(&child, path)?;
        }

        tree.find(last.as_bytes().as_bstr())
            .cloned()
            .map(Some)
            .ok_or_else(|| VfsError::NotFound(path.to_string()))
    }

    /// Metadata for one tree entry; loads the target object for its size.
    fn entry_info(&self, entry: &TreeEntry) -> Result<FileInfo, VfsError> {
        let name = entry.name.to_str_lossy().into_owned();
        let size = match self.load_object(&entry.id, &name)? {
            Object::Blob(blob) => blob.len() as u64,
            Object::Tree(tree) => tree.len() as u64,
            _ => 0,
        };
        Ok(FileInfo {
            name: entry.name.clone(),
            id: entry.id,
            mode: entry.mode,
            size,
        })
    }

    fn load_object(&self, id: &ObjectId, context: &str) -> Result<Object, VfsError> {
        let handle = self
            .repo
            .get(id)?
            .ok_or_else(|| VfsError::Corrupt(format!("missing object {id} at {context}")))?;
        Ok(handle.load()?)
    }

    fn load_tree(&self, id: &ObjectId, context: &str) -> Result<Tree, VfsError> {
        match self.load_object(id, context)? {
            Object::Tree(tree) => Ok(tree),
            other => Err(VfsError::Corrupt(format!(
                "{context}: expected tree, found {}",
                other.object_type()
            ))),
        }
    }

    fn load_blob(&self, id: &ObjectId, context: &str) -> Result<Blob, VfsError> {
        match self.load_object(id, context)? {
            Object::Blob(blob) => Ok(blob),
            _ => Err(VfsError::NotBlob(context.to_string())),
        }
    }
}

/// Split a path into components, dropping empty segments and `.`.
fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .collect()
}

/// The directory part of a split path, joined back together.
fn parent_of(components: &[&str]) -> String {
    match components.split_last() {
        Some((_, parents)) => parents.join("/"),
        None => String::new(),
    }
}

/// Join a symlink target onto its parent directory, resolving `.` and
/// `..` lexically and clamping `..` at the root.
fn join_link(parent: &str, target: &str) -> String {
    let mut out: Vec<&str> = split_path(parent);
    for comp in target.split('/') {
        match comp {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            c => out.push(c),
        }
    }
    out.join("/")
}
