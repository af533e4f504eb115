use std::fs;
use std::path::{Path, PathBuf};

use gitview_hash::ObjectId;
use tracing::warn;

use crate::name::validate_ref_name;
use crate::{NamedRef, RefError, RefKind};

/// Read-only ref store over `<repo>/refs/heads/` and `<repo>/refs/tags/`.
pub struct FileRefStore {
    git_dir: PathBuf,
}

impl FileRefStore {
    /// Create a ref store for a bare-like repository directory.
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    /// Resolve a single named ref. Returns `Ok(None)` if the ref file does
    /// not exist.
    pub fn get(&self, kind: RefKind, name: &str) -> Result<Option<NamedRef>, RefError> {
        validate_ref_name(name)?;
        let path = self.refs_dir(kind).join(name);
        match read_ref_file(&path) {
            Ok(id) => Ok(Some(NamedRef {
                kind,
                name: name.to_string(),
                id,
            })),
            Err(RefError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Enumerate all refs of one kind, walking subdirectories.
    pub fn iter(&self, kind: RefKind) -> Result<Vec<NamedRef>, RefError> {
        let root = self.refs_dir(kind);
        if !root.is_dir() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        walk_refs(&root, "", kind, &mut out)?;
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn refs_dir(&self, kind: RefKind) -> PathBuf {
        self.git_dir.join("refs").join(kind.dir_name())
    }
}

/// Recursively collect refs under `dir`; `prefix` is the name built so far.
fn walk_refs(
    dir: &Path,
    prefix: &str,
    kind: RefKind,
    out: &mut Vec<NamedRef>,
) -> Result<(), RefError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            warn!(path = %entry.path().display(), "skipping non-UTF-8 ref name");
            continue;
        };
        let ref_name = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };

        if entry.file_type()?.is_dir() {
            walk_refs(&entry.path(), &ref_name, kind, out)?;
        } else {
            match read_ref_file(&entry.path()) {
                Ok(id) => out.push(NamedRef {
                    kind,
                    name: ref_name,
                    id,
                }),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "could not read ref");
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

/// Read and parse a ref file: exactly 41 bytes, 40 hex digits plus `\n`.
fn read_ref_file(path: &Path) -> Result<ObjectId, RefError> {
    let buf = fs::read(path)?;
    if buf.len() != 41 || buf[40] != b'\n' {
        return Err(RefError::InvalidRef(path.display().to_string()));
    }
    let hex = std::str::from_utf8(&buf[..40])
        .map_err(|_| RefError::InvalidRef(path.display().to_string()))?;
    ObjectId::from_hex(hex).map_err(|_| RefError::InvalidRef(path.display().to_string()))
}
