use gitview_hash::ObjectId;
use gitview_object::ObjectType;
use gitview_ref::{NamedRef, RefKind};

use crate::{ObjectHandle, OdbError};

/// A pluggable read-only source of objects and (optionally) named refs.
///
/// Implementations include the loose-object directory, single pack files,
/// and remote blob stores. A miss is `Ok(None)`, never an error; the
/// facade uses it to fall through to the next backend.
pub trait Backend: Send + Sync {
    /// Look up an object by id.
    fn get(&self, id: &ObjectId) -> Result<Option<ObjectHandle>, OdbError>;

    /// Resolve a named ref. Backends without refs always miss.
    fn get_named(&self, _kind: RefKind, _name: &str) -> Result<Option<NamedRef>, OdbError> {
        Ok(None)
    }

    /// Push every object id this backend holds to `sink`, stopping early
    /// if the sink returns `false`.
    fn enumerate_to(&self, sink: &mut dyn FnMut(ObjectId) -> bool) -> Result<(), OdbError>;

    /// Fetch an object's kind and payload for use as a delta base.
    ///
    /// `depth` is how many further delta links the fetch may traverse
    /// before the chain counts as corrupt. Backends that store objects
    /// whole can ignore it; a pack backend must pass it through so one
    /// budget covers a chain that hops between packs.
    fn get_base(
        &self,
        id: &ObjectId,
        _depth: usize,
    ) -> Result<Option<(ObjectType, Vec<u8>)>, OdbError> {
        match self.get(id)? {
            Some(handle) => Ok(Some((handle.kind()?, handle.payload()?.to_vec()))),
            None => Ok(None),
        }
    }

    /// Enumerate named refs of one kind. `Ok(None)` means this backend
    /// does not support name enumeration (distinct from having none).
    fn name_enumerate(&self, _kind: RefKind) -> Result<Option<Vec<NamedRef>>, OdbError> {
        Ok(None)
    }
}
