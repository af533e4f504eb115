//! Named references: branches and tags, resolved from files on disk.
//!
//! A ref file at `refs/heads/<name>` or `refs/tags/<name>` is exactly 41
//! bytes: 40 hex digits naming an object, then a line feed. Names may
//! contain `/` (subdirectories), so enumeration walks recursively.
//!
//! This store is read-only: no ref creation, update, or deletion.

mod files;
mod name;

pub use files::FileRefStore;
pub use name::validate_ref_name;

use gitview_hash::ObjectId;

/// The two ref namespaces this store serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// A branch under `refs/heads/`.
    Head,
    /// A tag under `refs/tags/`.
    Tag,
}

impl RefKind {
    /// The directory name under `refs/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Head => "heads",
            Self::Tag => "tags",
        }
    }
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A resolved named reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRef {
    pub kind: RefKind,
    /// Path-like name relative to the namespace, e.g. `main` or
    /// `release/1.2`.
    pub name: String,
    pub id: ObjectId,
}

/// Errors from ref operations.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("invalid ref file {0}")]
    InvalidRef(String),

    #[error("invalid ref name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
