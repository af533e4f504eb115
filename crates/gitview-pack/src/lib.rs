//! Packfile reading: `.idx` v2 lookup, entry header decoding, delta
//! resolution, and payload inflation.
//!
//! A pack stores many objects, most as deltas against another object in
//! the same pack (offset delta) or against an object named by id
//! (ref delta). The paired `.idx` file maps sorted ids to pack offsets
//! through a 256-entry fan-out table. This crate reads both; it never
//! writes or repacks.

pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;

use gitview_hash::ObjectId;
use gitview_object::ObjectType;

/// Errors that can occur while reading packs.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("invalid pack index: {0}")]
    InvalidIndex(String),

    #[error("unsupported pack index version: {0}")]
    UnsupportedIndexVersion(u32),

    #[error("unsupported pack version: {0}")]
    UnsupportedPackVersion(u32),

    #[error("invalid delta at offset {offset}: {reason}")]
    InvalidDelta { offset: u64, reason: String },

    #[error("delta at offset {offset} reconstructs {actual}, index says {expected}")]
    DeltaMismatch {
        offset: u64,
        expected: ObjectId,
        actual: ObjectId,
    },

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error("delta chain too deep (>{max_depth} levels) at offset {offset}")]
    DeltaChainTooDeep { offset: u64, max_depth: usize },

    #[error("corrupt pack entry at offset {0}")]
    CorruptEntry(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] gitview_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] gitview_hash::HashError),
}

/// Type of a packed object entry, as encoded in the 3-bit header tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta whose base is at a relative offset within the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta whose base is named by a full object id.
    RefDelta { base_id: ObjectId },
}

impl PackEntryType {
    /// Convert a non-delta entry type to an ObjectType.
    pub fn to_object_type(self) -> Option<ObjectType> {
        match self {
            Self::Commit => Some(ObjectType::Commit),
            Self::Tree => Some(ObjectType::Tree),
            Self::Blob => Some(ObjectType::Blob),
            Self::Tag => Some(ObjectType::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }

    /// Type number as used in pack entry headers.
    pub fn type_number(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
            Self::OfsDelta { .. } => 6,
            Self::RefDelta { .. } => 7,
        }
    }
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const IDX_VERSION: u32 = 2;

/// Maximum delta chain depth before we report corruption.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 50;
