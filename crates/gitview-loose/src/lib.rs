//! Loose object storage: locate and inflate single-object files.
//!
//! Each loose object lives at `objects/XX/YYYY...` where `XX` is the first
//! byte of the id in hex and `YYYY...` is the rest. The file content is
//! zlib-compressed `"<kind> <size>\0<payload>"`.
//!
//! This store is read-only.

mod enumerate;
mod read;

pub use enumerate::LooseObjectIter;

use std::path::{Path, PathBuf};

use gitview_hash::ObjectId;

/// Reader for a loose object directory (`<repo>/objects/`).
pub struct LooseStore {
    /// Path to the objects directory.
    objects_dir: PathBuf,
}

impl LooseStore {
    /// Open the loose object store at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the file path for a given id.
    pub fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.objects_dir.join(id.loose_path())
    }

    /// Check if a loose object exists.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.object_path(id).is_file()
    }
}

/// Errors from loose object operations.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("corrupt loose object {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("decompression error for {id}: {source}")]
    Decompress {
        id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("object parse error: {0}")]
    Object(#[from] gitview_object::ObjectError),

    #[error("hash error: {0}")]
    Hash(#[from] gitview_hash::HashError),
}
