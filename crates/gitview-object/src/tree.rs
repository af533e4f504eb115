use bstr::{BStr, BString, ByteSlice};
use gitview_hash::ObjectId;

use crate::ObjectError;

/// Permission bits of a tree entry, kept as the raw octal value.
///
/// The bits that matter to the read path: `0o040000` marks a directory,
/// `0o020000` a symbolic link, and the low 9 bits are the POSIX mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(u32);

impl Mode {
    /// Parse from ASCII octal bytes as they appear on disk (e.g. `b"100644"`,
    /// `b"40000"` — no leading zero for directories).
    pub fn from_octal(s: &[u8]) -> Result<Self, ObjectError> {
        if s.is_empty() {
            return Err(ObjectError::InvalidTreeEntry {
                offset: 0,
                reason: "empty mode".into(),
            });
        }
        let mut val: u32 = 0;
        for &b in s {
            if !(b'0'..=b'7').contains(&b) {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: 0,
                    reason: format!("non-octal mode byte {:#04x}", b),
                });
            }
            val = val
                .checked_mul(8)
                .and_then(|v| v.checked_add(u32::from(b - b'0')))
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: 0,
                    reason: "mode overflows u32".into(),
                })?;
        }
        Ok(Self(val))
    }

    /// Create from the raw numeric value.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw numeric value.
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Is the directory bit set?
    pub fn is_dir(&self) -> bool {
        self.0 & 0o040000 != 0
    }

    /// Is the symlink bit set?
    pub fn is_symlink(&self) -> bool {
        self.0 & 0o020000 != 0
    }

    /// The POSIX permission bits (lower 9).
    pub fn permissions(&self) -> u32 {
        self.0 & 0o777
    }
}

/// A single entry in a git tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: Mode,
    pub name: BString,
    pub id: ObjectId,
}

/// A git tree object — a directory listing.
///
/// Entries are kept in the order they appear on disk. A valid tree is
/// sorted by git's rules (directories compare as if terminated by `/`),
/// but this parser preserves whatever order the object carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Parse tree content from the binary format.
    ///
    /// Each entry is `<mode-ascii> <name>\0<id-bytes>`.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < content.len() {
            let space_pos = content[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing space after mode".into(),
                })?
                + pos;

            let mode =
                Mode::from_octal(&content[pos..space_pos]).map_err(|_| {
                    ObjectError::InvalidTreeEntry {
                        offset: pos,
                        reason: "invalid mode".into(),
                    }
                })?;

            let name_start = space_pos + 1;
            let null_pos = content[name_start..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: name_start,
                    reason: "missing null after name".into(),
                })?
                + name_start;

            let name = BString::from(&content[name_start..null_pos]);

            let id_start = null_pos + 1;
            if id_start + 20 > content.len() {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: id_start,
                    reason: "truncated object id".into(),
                });
            }
            let id = ObjectId::from_bytes(&content[id_start..id_start + 20])?;

            entries.push(TreeEntry { mode, name, id });
            pos = id_start + 20;
        }

        Ok(Self { entries })
    }

    /// Lookup an entry by name.
    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }

    /// Iterate entries in on-disk order.
    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
