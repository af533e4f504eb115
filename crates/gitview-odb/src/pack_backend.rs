use std::sync::{Arc, Weak};

use gitview_hash::ObjectId;
use gitview_object::ObjectType;
use gitview_pack::pack::PackFile;

use crate::{resolve_base, Backend, BackendList, ObjectHandle, OdbError};

/// Backend over a single pack file.
///
/// Holds a weak reference to the repository's backend list so ref-delta
/// bases that live outside this pack (another pack, the loose store, a
/// plugin) can be resolved. The reference is weak to keep the backend
/// list from owning itself through its own entries.
pub struct PackBackend {
    pack: Arc<PackFile>,
    siblings: Weak<BackendList>,
}

impl PackBackend {
    pub(crate) fn new(pack: Arc<PackFile>, siblings: Weak<BackendList>) -> Self {
        Self { pack, siblings }
    }

    /// The underlying pack.
    pub fn pack(&self) -> &PackFile {
        &self.pack
    }
}

impl Backend for PackBackend {
    fn get(&self, id: &ObjectId) -> Result<Option<ObjectHandle>, OdbError> {
        let Some(offset) = self.pack.offset_of(id)? else {
            return Ok(None);
        };
        let pack = self.pack.clone();
        let siblings = self.siblings.clone();
        Ok(Some(ObjectHandle::new(*id, move || {
            let resolver =
                |base: &ObjectId, depth: usize| resolve_base(&siblings, base, depth);
            let (kind, data) = pack.read_at_offset_with_resolver(offset, &resolver)?;
            Ok((kind, data.to_vec()))
        })))
    }

    fn enumerate_to(&self, sink: &mut dyn FnMut(ObjectId) -> bool) -> Result<(), OdbError> {
        for (id, _offset) in self.pack.index().iter() {
            if !sink(id) {
                return Ok(());
            }
        }
        Ok(())
    }

    /// Resolve within the leftover budget of the chain that asked, so a
    /// chain spanning several packs cannot outrun the depth cap.
    fn get_base(
        &self,
        id: &ObjectId,
        depth: usize,
    ) -> Result<Option<(ObjectType, Vec<u8>)>, OdbError> {
        let Some(offset) = self.pack.offset_of(id)? else {
            return Ok(None);
        };
        let resolver = |base: &ObjectId, d: usize| resolve_base(&self.siblings, base, d);
        let (kind, data) = self.pack.read_at_offset_bounded(offset, &resolver, depth)?;
        Ok(Some((kind, data.to_vec())))
    }
}
