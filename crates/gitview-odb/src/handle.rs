use std::fmt;
use std::sync::OnceLock;

use gitview_hash::ObjectId;
use gitview_object::{Object, ObjectType};

use crate::OdbError;

type Fetch = Box<dyn Fn() -> Result<(ObjectType, Vec<u8>), OdbError> + Send + Sync>;

/// A lazy handle to an object located in some backend.
///
/// Constructing a handle performs no payload I/O; the backend-specific
/// producer runs on the first call to [`kind`](Self::kind),
/// [`payload`](Self::payload), or [`load`](Self::load), and its result is
/// cached for the life of the handle.
pub struct ObjectHandle {
    id: ObjectId,
    cell: OnceLock<(ObjectType, Vec<u8>)>,
    fetch: Fetch,
}

impl ObjectHandle {
    /// Create a handle whose payload is produced on demand.
    pub fn new(
        id: ObjectId,
        fetch: impl Fn() -> Result<(ObjectType, Vec<u8>), OdbError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            cell: OnceLock::new(),
            fetch: Box::new(fetch),
        }
    }

    /// Create a handle over an already-resolved object.
    pub fn resolved(id: ObjectId, kind: ObjectType, payload: Vec<u8>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set((kind, payload));
        Self {
            id,
            cell,
            fetch: Box::new(move || {
                // Unreachable in practice: the cell is pre-populated.
                Err(OdbError::Corrupt {
                    id,
                    reason: "resolved handle re-fetched".into(),
                })
            }),
        }
    }

    /// The id this handle was looked up by.
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The object kind. May perform the deferred read.
    pub fn kind(&self) -> Result<ObjectType, OdbError> {
        Ok(self.fetched()?.0)
    }

    /// The raw payload bytes (after inflation and delta resolution,
    /// excluding the `"<kind> <len>\0"` preamble). May perform the
    /// deferred read.
    pub fn payload(&self) -> Result<&[u8], OdbError> {
        Ok(&self.fetched()?.1)
    }

    /// Parse the payload into a typed object.
    pub fn load(&self) -> Result<Object, OdbError> {
        let (kind, payload) = self.fetched()?;
        Ok(Object::parse_content(*kind, payload)?)
    }

    fn fetched(&self) -> Result<&(ObjectType, Vec<u8>), OdbError> {
        if let Some(v) = self.cell.get() {
            return Ok(v);
        }
        let v = (self.fetch)()?;
        Ok(self.cell.get_or_init(|| v))
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ObjectHandle");
        s.field("id", &self.id);
        match self.cell.get() {
            Some((kind, payload)) => {
                s.field("kind", kind).field("len", &payload.len());
            }
            None => {
                s.field("state", &"unloaded");
            }
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn some_id() -> ObjectId {
        ObjectId::from_hex("da39a3ee5e6b4b0d3255bfef95601890afd80709").unwrap()
    }

    #[test]
    fn fetch_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = ObjectHandle::new(some_id(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok((ObjectType::Blob, b"payload".to_vec()))
        });

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(handle.kind().unwrap(), ObjectType::Blob);
        assert_eq!(handle.payload().unwrap(), b"payload");
        assert_eq!(handle.kind().unwrap(), ObjectType::Blob);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fetch_errors_propagate_and_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = ObjectHandle::new(some_id(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(OdbError::Io(std::io::Error::other("transient")))
            } else {
                Ok((ObjectType::Blob, b"ok".to_vec()))
            }
        });

        assert!(handle.payload().is_err());
        assert_eq!(handle.payload().unwrap(), b"ok");
    }

    #[test]
    fn resolved_handle_never_fetches() {
        let handle = ObjectHandle::resolved(some_id(), ObjectType::Blob, b"here".to_vec());
        assert_eq!(handle.payload().unwrap(), b"here");
        assert_eq!(handle.kind().unwrap(), ObjectType::Blob);
    }

    #[test]
    fn load_parses_payload() {
        let handle = ObjectHandle::resolved(some_id(), ObjectType::Blob, b"typed".to_vec());
        match handle.load().unwrap() {
            Object::Blob(blob) => assert_eq!(blob.data, b"typed"),
            other => panic!("expected blob, got {:?}", other.object_type()),
        }
    }
}
