use std::sync::{Mutex, MutexGuard};

/// Versioned policy weights shared between the trainer and collectors.
///
/// Version 0 is the untrained initial policy. Each [`publish`](Self::publish)
/// replaces the whole weight set under one lock, so readers see either the
/// old or the new snapshot.
pub struct PolicyStore<W> {
    inner: Mutex<(u64, W)>,
}

impl<W: Clone> PolicyStore<W> {
    pub fn new(initial: W) -> Self {
        PolicyStore {
            inner: Mutex::new((0, initial)),
        }
    }

    /// Start from a restored policy at a known version.
    pub fn with_version(weights: W, version: u64) -> Self {
        PolicyStore {
            inner: Mutex::new((version, weights)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, (u64, W)> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install new weights and return the new version.
    pub fn publish(&self, weights: W) -> u64 {
        let mut guard = self.lock();
        guard.0 += 1;
        guard.1 = weights;
        guard.0
    }

    pub fn version(&self) -> u64 {
        self.lock().0
    }

    pub fn snapshot(&self) -> (u64, W) {
        let guard = self.lock();
        (guard.0, guard.1.clone())
    }

    /// Clone the weights only if they are newer than `seen`.
    pub fn snapshot_if_newer(&self, seen: u64) -> Option<(u64, W)> {
        let guard = self.lock();
        (guard.0 > seen).then(|| (guard.0, guard.1.clone()))
    }
}
