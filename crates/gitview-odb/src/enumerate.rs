use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread;

use gitview_hash::ObjectId;
use tracing::debug;

use crate::Backend;

/// Bounded buffer between the producer thread and the consuming iterator.
const CHANNEL_CAPACITY: usize = 10_000;

/// A finite, non-restartable stream of object ids.
///
/// Backends are walked in order on a producer thread; ids arrive through
/// a bounded channel. Dropping the iterator closes the channel, which the
/// producer observes on its next send and stops promptly.
pub struct ObjectIds {
    rx: Receiver<ObjectId>,
}

impl Iterator for ObjectIds {
    type Item = ObjectId;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.recv().ok()
    }
}

/// Start the producer thread for the given backend snapshot.
pub(crate) fn spawn(backends: Vec<Arc<dyn Backend>>) -> ObjectIds {
    let (tx, rx) = sync_channel(CHANNEL_CAPACITY);

    thread::spawn(move || {
        for backend in backends {
            let mut cancelled = false;
            let result = backend.enumerate_to(&mut |id| {
                if tx.send(id).is_err() {
                    cancelled = true;
                    return false;
                }
                true
            });
            if let Err(e) = result {
                debug!(error = %e, "backend enumeration failed");
            }
            if cancelled {
                return;
            }
        }
    });

    ObjectIds { rx }
}
