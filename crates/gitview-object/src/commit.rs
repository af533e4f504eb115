use bstr::{BStr, BString, ByteSlice};
use gitview_hash::ObjectId;

use crate::{ObjectError, Stamp};

/// A git commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Id of the root tree.
    pub tree: ObjectId,
    /// Parent commit ids, in header order. Empty for a root commit, more
    /// than one for a merge.
    pub parents: Vec<ObjectId>,
    /// Author identity and timestamp.
    pub author: Stamp,
    /// Committer identity and timestamp.
    pub committer: Stamp,
    /// Commit message (everything after the blank line separator).
    pub message: BString,
}

impl Commit {
    /// Parse commit payload bytes (no object header).
    ///
    /// Recognized headers are `tree`, `parent`, `author`, and `committer`;
    /// anything else (including indented continuation lines such as GPG
    /// signatures) is skipped.
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut tree: Option<ObjectId> = None;
        let mut parents = Vec::new();
        let mut author: Option<Stamp> = None;
        let mut committer: Option<Stamp> = None;

        let data = content;
        let mut pos = 0;

        loop {
            if pos >= data.len() {
                // No message; unusual but possible.
                break;
            }

            // A blank line separates headers from the message.
            if data[pos] == b'\n' {
                pos += 1;
                break;
            }

            let line_end = data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| p + pos)
                .unwrap_or(data.len());
            let line = &data[pos..line_end];
            pos = if line_end < data.len() {
                line_end + 1
            } else {
                data.len()
            };

            // Continuation line of a multi-line header we do not keep.
            if line.first() == Some(&b' ') {
                continue;
            }

            let Some(space_pos) = line.iter().position(|&b| b == b' ') else {
                continue;
            };
            let key = &line[..space_pos];
            let value = &line[space_pos + 1..];

            match key {
                b"tree" => {
                    tree = Some(parse_id(value, "tree")?);
                }
                b"parent" => {
                    parents.push(parse_id(value, "parent")?);
                }
                b"author" => {
                    author = Some(Stamp::parse(BStr::new(value))?);
                }
                b"committer" => {
                    committer = Some(Stamp::parse(BStr::new(value))?);
                }
                _ => {}
            }
        }

        let tree = tree.ok_or(ObjectError::MissingCommitField { field: "tree" })?;
        let author = author.ok_or(ObjectError::MissingCommitField { field: "author" })?;
        let committer = committer.ok_or(ObjectError::MissingCommitField { field: "committer" })?;

        Ok(Self {
            tree,
            parents,
            author,
            committer,
            message: BString::from(&data[pos..]),
        })
    }

    /// Get the first parent (or None for root commits).
    pub fn first_parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    /// Is this a merge commit? (more than one parent)
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Is this a root commit? (no parents)
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Get just the summary (first line) of the message.
    pub fn summary(&self) -> &BStr {
        let msg: &[u8] = self.message.as_ref();
        match msg.find_byte(b'\n') {
            Some(pos) => BStr::new(&msg[..pos]),
            None => BStr::new(msg),
        }
    }
}

fn parse_id(value: &[u8], field: &'static str) -> Result<ObjectId, ObjectError> {
    let hex = std::str::from_utf8(value)
        .map_err(|_| ObjectError::InvalidHeader(format!("non-UTF8 {field} id")))?;
    Ok(ObjectId::from_hex(hex)?)
}
