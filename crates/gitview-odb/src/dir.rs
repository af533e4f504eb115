use std::path::Path;
use std::sync::Arc;

use gitview_hash::ObjectId;
use gitview_loose::LooseStore;
use gitview_ref::{FileRefStore, NamedRef, RefKind};
use tracing::debug;

use crate::{Backend, ObjectHandle, OdbError};

/// Backend over a bare-like repository directory: loose objects under
/// `objects/` and refs under `refs/`.
pub struct DirStore {
    loose: Arc<LooseStore>,
    refs: FileRefStore,
    verify: bool,
}

impl DirStore {
    /// Open a directory containing `objects/` and `refs/`.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            loose: Arc::new(LooseStore::open(dir.join("objects"))),
            refs: FileRefStore::new(dir),
            verify: false,
        }
    }

    /// Enable hash verification: every loose read recomputes the SHA-1 of
    /// `"<kind> <len>\0<payload>"` and compares it against the id.
    pub fn verifying(mut self) -> Self {
        self.verify = true;
        self
    }
}

impl Backend for DirStore {
    fn get(&self, id: &ObjectId) -> Result<Option<ObjectHandle>, OdbError> {
        if !self.loose.contains(id) {
            return Ok(None);
        }
        let loose = self.loose.clone();
        let id = *id;
        let verify = self.verify;
        Ok(Some(ObjectHandle::new(id, move || {
            let read = if verify {
                loose.read_verified(&id)?
            } else {
                loose.read_raw(&id)?
            };
            // The file existed at lookup time; vanishing between then and
            // now surfaces as a read error, not a miss.
            read.ok_or_else(|| {
                OdbError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("loose object {id} disappeared"),
                ))
            })
        })))
    }

    fn get_named(&self, kind: RefKind, name: &str) -> Result<Option<NamedRef>, OdbError> {
        Ok(self.refs.get(kind, name)?)
    }

    fn enumerate_to(&self, sink: &mut dyn FnMut(ObjectId) -> bool) -> Result<(), OdbError> {
        for result in self.loose.iter()? {
            match result {
                Ok(id) => {
                    if !sink(id) {
                        debug!("loose enumeration cancelled by sink");
                        return Ok(());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn name_enumerate(&self, kind: RefKind) -> Result<Option<Vec<NamedRef>>, OdbError> {
        Ok(Some(self.refs.iter(kind)?))
    }
}
