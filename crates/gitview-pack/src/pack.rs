//! PackFile: reading `.pack` files and resolving delta chains.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use flate2::bufread::ZlibDecoder;
use gitview_hash::ObjectId;
use gitview_object::ObjectType;
use memmap2::Mmap;

use crate::entry::parse_entry_header;
use crate::index::PackIndex;
use crate::{
    delta, PackEntryType, PackError, MAX_DELTA_CHAIN_DEPTH, PACK_HEADER_SIZE, PACK_SIGNATURE,
    PACK_VERSION,
};

/// A fully resolved packed object: its kind and payload bytes.
pub type ResolvedObject = (ObjectType, Arc<Vec<u8>>);

/// Callback used to locate a ref-delta base that lives outside this pack
/// (in another pack, the loose store, or a plugin backend).
///
/// `depth` is how many further delta links the lookup may traverse. A
/// resolver that reaches into another pack must honor it, so one budget
/// bounds the whole chain no matter how many backends it crosses.
pub type BaseResolver<'a> =
    dyn Fn(&ObjectId, usize) -> Result<Option<(ObjectType, Vec<u8>)>, PackError> + 'a;

/// A memory-mapped packfile with its index and a cache of resolved objects.
#[derive(Debug)]
pub struct PackFile {
    data: Mmap,
    index: PackIndex,
    pack_path: PathBuf,
    num_objects: u32,
    /// Resolved objects by pack offset. Grow-only; each offset is written
    /// at most once.
    cache: RwLock<HashMap<u64, ResolvedObject>>,
}

impl PackFile {
    /// Open a pack file and its associated `.idx`.
    pub fn open(pack_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref().to_path_buf();
        let idx_path = pack_path.with_extension("idx");

        let file = std::fs::File::open(&pack_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE {
            return Err(PackError::InvalidHeader("file too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedPackVersion(version));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let index = PackIndex::open(&idx_path)?;
        if index.num_objects() != num_objects {
            return Err(PackError::InvalidHeader(format!(
                "pack has {} objects but index has {}",
                num_objects,
                index.num_objects()
            )));
        }

        Ok(Self {
            data,
            index,
            pack_path,
            num_objects,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Look up the pack offset of an id.
    pub fn offset_of(&self, id: &ObjectId) -> Result<Option<u64>, PackError> {
        self.index.lookup(id)
    }

    /// Check if this pack contains the given id.
    pub fn contains(&self, id: &ObjectId) -> bool {
        matches!(self.index.lookup(id), Ok(Some(_)))
    }

    /// Read an object by id. Returns `None` if the id is not in this pack.
    pub fn read_object(&self, id: &ObjectId) -> Result<Option<ResolvedObject>, PackError> {
        self.read_object_with_resolver(id, &|_, _| Ok(None))
    }

    /// Read an object by id, with an external resolver for ref-delta bases
    /// that live outside this pack.
    pub fn read_object_with_resolver(
        &self,
        id: &ObjectId,
        resolver: &BaseResolver<'_>,
    ) -> Result<Option<ResolvedObject>, PackError> {
        match self.index.lookup(id)? {
            Some(offset) => self.read_at_offset_with_resolver(offset, resolver).map(Some),
            None => Ok(None),
        }
    }

    /// Read the object at a known pack offset.
    pub fn read_at_offset(&self, offset: u64) -> Result<ResolvedObject, PackError> {
        self.read_at_offset_with_resolver(offset, &|_, _| Ok(None))
    }

    /// Read the object at a known pack offset with a full delta budget of
    /// [`MAX_DELTA_CHAIN_DEPTH`] links.
    pub fn read_at_offset_with_resolver(
        &self,
        offset: u64,
        resolver: &BaseResolver<'_>,
    ) -> Result<ResolvedObject, PackError> {
        self.read_at_offset_bounded(offset, resolver, MAX_DELTA_CHAIN_DEPTH)
    }

    /// Read the object at a known pack offset, resolving its delta chain
    /// with at most `budget` delta links left to traverse.
    ///
    /// The chain is collected iteratively (never recursively) and applied
    /// innermost-first. Every link consumes one unit of the budget, and a
    /// link that leaves the pack hands the remainder to the resolver, so
    /// chains that hop between packs stay bounded too. An exhausted budget
    /// is a corruption signal: a chain that long is a cycle in practice.
    /// Each patched object whose offset the index knows is verified
    /// against the id the index declares for it.
    pub fn read_at_offset_bounded(
        &self,
        offset: u64,
        resolver: &BaseResolver<'_>,
        budget: usize,
    ) -> Result<ResolvedObject, PackError> {
        // Deltas between `offset` and the base, outermost first.
        let mut chain: Vec<(u64, Vec<u8>)> = Vec::new();
        let mut cur = offset;

        let (kind, mut data) = loop {
            if let Some(hit) = self.cached(cur) {
                break hit;
            }
            if cur as usize >= self.data.len() {
                return Err(PackError::CorruptEntry(cur));
            }
            let entry = parse_entry_header(&self.data[cur as usize..], cur)?;
            let payload = self.inflate(entry.data_offset, entry.uncompressed_size, cur)?;

            match entry.entry_type {
                PackEntryType::OfsDelta { base_offset } => {
                    if chain.len() >= budget {
                        return Err(PackError::DeltaChainTooDeep {
                            offset,
                            max_depth: MAX_DELTA_CHAIN_DEPTH,
                        });
                    }
                    chain.push((cur, payload));
                    cur = base_offset;
                }
                PackEntryType::RefDelta { base_id } => {
                    if chain.len() >= budget {
                        return Err(PackError::DeltaChainTooDeep {
                            offset,
                            max_depth: MAX_DELTA_CHAIN_DEPTH,
                        });
                    }
                    if let Some(base_offset) = self.index.lookup(&base_id)? {
                        chain.push((cur, payload));
                        cur = base_offset;
                    } else {
                        // This link is spent; whatever budget is left
                        // rides along into the other backend.
                        let remaining = budget - chain.len() - 1;
                        match resolver(&base_id, remaining)? {
                            Some((kind, bytes)) => {
                                chain.push((cur, payload));
                                break (kind, Arc::new(bytes));
                            }
                            None => return Err(PackError::MissingBase(base_id)),
                        }
                    }
                }
                other => {
                    let kind = other.to_object_type().ok_or(PackError::CorruptEntry(cur))?;
                    let resolved = Arc::new(payload);
                    self.cache_insert(cur, kind, resolved.clone());
                    break (kind, resolved);
                }
            }
        };

        // Apply the deltas back out toward the requested offset. The kind
        // of every reconstructed object is the kind of the resolved base.
        for (delta_offset, delta_bytes) in chain.iter().rev() {
            let (patched, actual) = delta::apply(kind, &data, delta_bytes, *delta_offset)?;
            if let Some(position) = self.index.position_of_offset(*delta_offset) {
                let expected = self.index.id_at(position)?;
                if expected != actual {
                    return Err(PackError::DeltaMismatch {
                        offset: *delta_offset,
                        expected,
                        actual,
                    });
                }
            }
            let resolved = Arc::new(patched);
            self.cache_insert(*delta_offset, kind, resolved.clone());
            data = resolved;
        }

        Ok((kind, data))
    }

    /// Get the number of objects in this pack.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Get the pack index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Get the path to the .pack file.
    pub fn path(&self) -> &Path {
        &self.pack_path
    }

    fn cached(&self, offset: u64) -> Option<ResolvedObject> {
        self.cache.read().unwrap().get(&offset).cloned()
    }

    fn cache_insert(&self, offset: u64, kind: ObjectType, data: Arc<Vec<u8>>) {
        self.cache
            .write()
            .unwrap()
            .entry(offset)
            .or_insert((kind, data));
    }

    /// Inflate the zlib stream at `data_offset`, expecting exactly
    /// `expected_size` bytes.
    fn inflate(
        &self,
        data_offset: u64,
        expected_size: usize,
        entry_offset: u64,
    ) -> Result<Vec<u8>, PackError> {
        let start = data_offset as usize;
        if start > self.data.len() {
            return Err(PackError::CorruptEntry(entry_offset));
        }
        let mut decoder = ZlibDecoder::new(&self.data[start..]);
        let mut buf = Vec::with_capacity(expected_size);
        decoder
            .read_to_end(&mut buf)
            .map_err(|_| PackError::CorruptEntry(entry_offset))?;
        if buf.len() != expected_size {
            return Err(PackError::CorruptEntry(entry_offset));
        }
        Ok(buf)
    }
}
