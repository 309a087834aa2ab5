use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::ai::Transition;

/// Fixed-capacity ring buffer for storing training transitions.
///
/// Transitions are stored behind `Arc` so sampling under a lock only bumps
/// reference counts.
pub struct ReplayBuffer {
    buffer: Vec<Arc<Transition>>,
    capacity: usize,
    position: usize,
    len: usize,
    rng: StdRng,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_os_rng())
    }

    pub fn seeded(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        assert!(capacity > 0, "Replay capacity must be positive");
        ReplayBuffer {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
            len: 0,
            rng,
        }
    }

    /// Add a transition to the buffer. Overwrites oldest when full.
    pub fn push(&mut self, transition: Transition) {
        let transition = Arc::new(transition);
        if self.buffer.len() < self.capacity {
            self.buffer.push(transition);
        } else {
            self.buffer[self.position] = transition;
        }
        self.position = (self.position + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Sample `batch_size` distinct transitions uniformly at random.
    ///
    /// Panics when fewer than `batch_size` transitions are stored; callers
    /// check [`len`](Self::len) first.
    pub fn sample(&mut self, batch_size: usize) -> Vec<Arc<Transition>> {
        assert!(batch_size <= self.len, "Not enough transitions to sample");
        let indices = index::sample(&mut self.rng, self.len, batch_size);
        indices.iter().map(|i| Arc::clone(&self.buffer[i])).collect()
    }

    /// Stored transitions from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> + '_ {
        let start = if self.len < self.capacity {
            0
        } else {
            self.position
        };
        (0..self.len).map(move |i| self.buffer[(start + i) % self.capacity].as_ref())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Replay buffer shared between collector workers and the trainer.
///
/// Every operation takes the lock once, so appends and samples never
/// observe each other half-done. Appends wake a trainer blocked in
/// [`wait_for_len`](Self::wait_for_len).
pub struct SharedReplay {
    inner: Mutex<ReplayBuffer>,
    grown: Condvar,
}

impl SharedReplay {
    pub fn new(buffer: ReplayBuffer) -> Self {
        SharedReplay {
            inner: Mutex::new(buffer),
            grown: Condvar::new(),
        }
    }

    // push/sample never panic mid-update, so a poisoned ring is still consistent.
    fn lock(&self) -> MutexGuard<'_, ReplayBuffer> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn push(&self, transition: Transition) {
        self.lock().push(transition);
        self.grown.notify_all();
    }

    pub fn push_all(&self, transitions: impl IntoIterator<Item = Transition>) {
        {
            let mut buffer = self.lock();
            for t in transitions {
                buffer.push(t);
            }
        }
        self.grown.notify_all();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sample under the lock. Same precondition as [`ReplayBuffer::sample`].
    pub fn sample(&self, batch_size: usize) -> Vec<Arc<Transition>> {
        self.lock().sample(batch_size)
    }

    /// Block until at least `min_len` transitions are stored or `timeout`
    /// elapses. Returns whether the buffer is large enough.
    pub fn wait_for_len(&self, min_len: usize, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .grown
            .wait_timeout_while(guard, timeout, |b| b.len() < min_len)
            .unwrap_or_else(|e| e.into_inner());
        guard.len() >= min_len
    }

    /// Wake every waiter, e.g. on shutdown.
    pub fn notify_all(&self) {
        self.grown.notify_all();
    }

    /// Stored transitions from oldest to newest, cloned out of the lock.
    pub fn snapshot(&self) -> Vec<Transition> {
        self.lock().iter().cloned().collect()
    }
}
