use std::collections::HashMap;
use std::sync::RwLock;

use gitview_hash::{HashError, Hasher, ObjectId};
use gitview_object::ObjectType;
use gitview_ref::{NamedRef, RefKind};

use crate::{Backend, ObjectHandle, OdbError};

/// An in-memory backend holding full objects keyed by id.
///
/// The shape a remote blob-store plugin takes: objects arrive as complete
/// `"<kind> <len>\0<payload>"` blobs addressed by their SHA-1, with no
/// packs or deltas involved. Also convenient for assembling small object
/// graphs in tests.
pub struct MemoryStore {
    objects: RwLock<HashMap<ObjectId, (ObjectType, Vec<u8>)>>,
    refs: RwLock<HashMap<(RefKind, String), ObjectId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            refs: RwLock::new(HashMap::new()),
        }
    }

    /// Insert an object, returning the id it hashes to.
    pub fn insert(&self, kind: ObjectType, payload: &[u8]) -> Result<ObjectId, HashError> {
        let id = Hasher::hash_object(kind.as_str(), payload)?;
        self.objects
            .write()
            .unwrap()
            .insert(id, (kind, payload.to_vec()));
        Ok(id)
    }

    /// Point a named ref at an object.
    pub fn insert_ref(&self, kind: RefKind, name: &str, id: ObjectId) {
        self.refs
            .write()
            .unwrap()
            .insert((kind, name.to_string()), id);
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Whether the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.read().unwrap().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryStore {
    fn get(&self, id: &ObjectId) -> Result<Option<ObjectHandle>, OdbError> {
        match self.objects.read().unwrap().get(id) {
            Some((kind, payload)) => Ok(Some(ObjectHandle::resolved(
                *id,
                *kind,
                payload.clone(),
            ))),
            None => Ok(None),
        }
    }

    fn get_named(&self, kind: RefKind, name: &str) -> Result<Option<NamedRef>, OdbError> {
        Ok(self
            .refs
            .read()
            .unwrap()
            .get(&(kind, name.to_string()))
            .map(|id| NamedRef {
                kind,
                name: name.to_string(),
                id: *id,
            }))
    }

    fn enumerate_to(&self, sink: &mut dyn FnMut(ObjectId) -> bool) -> Result<(), OdbError> {
        let mut ids: Vec<ObjectId> = self.objects.read().unwrap().keys().copied().collect();
        ids.sort();
        for id in ids {
            if !sink(id) {
                return Ok(());
            }
        }
        Ok(())
    }

    fn name_enumerate(&self, kind: RefKind) -> Result<Option<Vec<NamedRef>>, OdbError> {
        let mut refs: Vec<NamedRef> = self
            .refs
            .read()
            .unwrap()
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((k, name), id)| NamedRef {
                kind: *k,
                name: name.clone(),
                id: *id,
            })
            .collect();
        refs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(refs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let store = MemoryStore::new();
        let id = store.insert(ObjectType::Blob, b"hello").unwrap();
        let handle = store.get(&id).unwrap().unwrap();
        assert_eq!(handle.kind().unwrap(), ObjectType::Blob);
        assert_eq!(handle.payload().unwrap(), b"hello");
    }

    #[test]
    fn miss_for_unknown_id() {
        let store = MemoryStore::new();
        let id = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        assert!(store.get(&id).unwrap().is_none());
    }

    #[test]
    fn named_refs() {
        let store = MemoryStore::new();
        let id = store.insert(ObjectType::Blob, b"x").unwrap();
        store.insert_ref(RefKind::Head, "main", id);

        let r = store.get_named(RefKind::Head, "main").unwrap().unwrap();
        assert_eq!(r.id, id);
        assert!(store.get_named(RefKind::Tag, "main").unwrap().is_none());

        let heads = store.name_enumerate(RefKind::Head).unwrap().unwrap();
        assert_eq!(heads.len(), 1);
    }
}
