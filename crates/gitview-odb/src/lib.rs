//! Unified read-only object database.
//!
//! A [`Repository`] multiplexes content-addressed reads over an ordered
//! list of [`Backend`]s: a loose-object directory, any number of packs,
//! and arbitrary plugin stores (e.g. a remote blob store). The first
//! backend that knows an id wins. Named refs (branches and tags) resolve
//! through the same backend list.

mod backend;
mod dir;
mod enumerate;
mod handle;
mod memory;
mod pack_backend;

pub use backend::Backend;
pub use dir::DirStore;
pub use enumerate::ObjectIds;
pub use handle::ObjectHandle;
pub use memory::MemoryStore;
pub use pack_backend::PackBackend;

use std::path::Path;
use std::sync::{Arc, RwLock, Weak};

use gitview_hash::ObjectId;
use gitview_pack::pack::PackFile;
use gitview_ref::{NamedRef, RefKind};
use tracing::{debug, warn};

/// Errors from the object database facade.
#[derive(Debug, thiserror::Error)]
pub enum OdbError {
    #[error("no such branch: {0}")]
    NoBranch(String),

    #[error("no such tag: {0}")]
    NoTag(String),

    #[error("corrupt object {id}: {reason}")]
    Corrupt { id: ObjectId, reason: String },

    #[error(transparent)]
    Loose(#[from] gitview_loose::LooseError),

    #[error(transparent)]
    Pack(#[from] gitview_pack::PackError),

    #[error(transparent)]
    Ref(#[from] gitview_ref::RefError),

    #[error(transparent)]
    Object(#[from] gitview_object::ObjectError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The ordered backend list, shared with handles and pack resolvers.
pub(crate) type BackendList = RwLock<Vec<Arc<dyn Backend>>>;

/// A read-only git repository: an ordered collection of object/ref
/// backends behind one lookup path.
///
/// Cloning is cheap and shares the backend list.
#[derive(Clone)]
pub struct Repository {
    backends: Arc<BackendList>,
}

impl Repository {
    /// Create an empty repository with no backends.
    pub fn new() -> Self {
        Self {
            backends: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Open a bare-like directory: installs a [`DirStore`] for loose
    /// objects and refs, plus one pack backend per
    /// `objects/pack/*.pack`.
    ///
    /// Packs that fail to open are skipped with a warning so one corrupt
    /// index does not take down the whole repository.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        let dir = dir.as_ref();
        let repo = Self::new();
        repo.add_backend(Arc::new(DirStore::open(dir)));

        let pack_dir = dir.join("objects").join("pack");
        if pack_dir.is_dir() {
            let mut paths: Vec<_> = std::fs::read_dir(&pack_dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "pack"))
                .collect();
            paths.sort();
            for path in paths {
                if let Err(e) = repo.add_pack(&path) {
                    warn!(pack = %path.display(), error = %e, "skipping unreadable pack");
                }
            }
        }

        Ok(repo)
    }

    /// Append a backend. Lookup order is insertion order.
    pub fn add_backend(&self, backend: Arc<dyn Backend>) {
        self.backends.write().unwrap().push(backend);
    }

    /// Open a pack file and append it as a backend. Ref-delta bases that
    /// are not in the pack are resolved through this repository's other
    /// backends.
    pub fn add_pack(&self, path: impl AsRef<Path>) -> Result<(), OdbError> {
        let pack = Arc::new(PackFile::open(path)?);
        let backend = PackBackend::new(pack, Arc::downgrade(&self.backends));
        self.add_backend(Arc::new(backend));
        Ok(())
    }

    /// Look up an object by id. Backends are queried in order; the first
    /// non-miss wins. `Ok(None)` means no backend knows the id.
    pub fn get(&self, id: &ObjectId) -> Result<Option<ObjectHandle>, OdbError> {
        for backend in self.snapshot() {
            if let Some(handle) = backend.get(id)? {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    /// Stream every object id from every backend.
    ///
    /// The sequence is finite, non-restartable, preserves backend order,
    /// and may contain duplicates when an object lives in several
    /// backends. Dropping the iterator cancels the underlying walk.
    pub fn enumerate(&self) -> ObjectIds {
        enumerate::spawn(self.snapshot())
    }

    /// Resolve a branch name.
    pub fn branch(&self, name: &str) -> Result<NamedRef, OdbError> {
        self.named(RefKind::Head, name)?
            .ok_or_else(|| OdbError::NoBranch(name.to_string()))
    }

    /// Resolve a tag name.
    pub fn tag(&self, name: &str) -> Result<NamedRef, OdbError> {
        self.named(RefKind::Tag, name)?
            .ok_or_else(|| OdbError::NoTag(name.to_string()))
    }

    /// All branches, unioned over backends that enumerate names.
    pub fn branches(&self) -> Result<Vec<NamedRef>, OdbError> {
        self.named_all(RefKind::Head)
    }

    /// All tags, unioned over backends that enumerate names.
    pub fn tags(&self) -> Result<Vec<NamedRef>, OdbError> {
        self.named_all(RefKind::Tag)
    }

    fn named(&self, kind: RefKind, name: &str) -> Result<Option<NamedRef>, OdbError> {
        for backend in self.snapshot() {
            if let Some(r) = backend.get_named(kind, name)? {
                return Ok(Some(r));
            }
        }
        Ok(None)
    }

    fn named_all(&self, kind: RefKind) -> Result<Vec<NamedRef>, OdbError> {
        let mut out = Vec::new();
        for backend in self.snapshot() {
            if let Some(mut refs) = backend.name_enumerate(kind)? {
                out.append(&mut refs);
            }
        }
        Ok(out)
    }

    /// Clone the current backend list so no lock is held across backend
    /// calls (which may re-enter the repository for ref-delta bases).
    fn snapshot(&self) -> Vec<Arc<dyn Backend>> {
        self.backends.read().unwrap().clone()
    }
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

/// Search a backend list for a ref-delta base, with `depth` delta links
/// left to spend. Pack errors propagate so an exhausted delta budget
/// surfaces as the chain-depth error it is; any other backend failure is
/// logged and treated as a miss, falling through to the next backend.
pub(crate) fn resolve_base(
    backends: &Weak<BackendList>,
    id: &ObjectId,
    depth: usize,
) -> Result<Option<(gitview_object::ObjectType, Vec<u8>)>, gitview_pack::PackError> {
    let Some(list) = backends.upgrade() else {
        return Ok(None);
    };
    let snapshot: Vec<Arc<dyn Backend>> = match list.read() {
        Ok(guard) => guard.clone(),
        Err(_) => return Ok(None),
    };
    for backend in snapshot {
        match backend.get_base(id, depth) {
            Ok(Some(found)) => return Ok(Some(found)),
            Ok(None) => {}
            Err(OdbError::Pack(e)) => return Err(e),
            Err(e) => {
                debug!(id = %id, error = %e, "backend failed during delta base lookup");
            }
        }
    }
    Ok(None)
}
