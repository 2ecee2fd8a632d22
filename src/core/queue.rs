//! Bounded FIFO queue of ready job handles.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::core::error::PoolError;
use crate::core::job::{same_job, JobHandle};

struct Ring {
    entries: VecDeque<JobHandle>,
    enabled: bool,
}

/// FIFO of ready job handles with a capacity bound and an enable/disable
/// lifecycle.
///
/// The queue starts disabled. Disabling wakes every blocked insert and
/// extract with failure; extraction drains any backlog before reporting the
/// shutdown. [`lock`](Self::lock) exposes the coarse lock under which the
/// pool runs the post-dispatch closure, so the re-enqueue decision cannot
/// interleave with submissions from other producers.
pub struct DispatchQueue {
    ring: Mutex<Ring>,
    entries: Condvar,
    space: Condvar,
    capacity: usize,
}

impl DispatchQueue {
    /// Creates a disabled queue holding at most `capacity` handles.
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity >= 1);
        Self {
            ring: Mutex::new(Ring { entries: VecDeque::with_capacity(capacity), enabled: false }),
            entries: Condvar::new(),
            space: Condvar::new(),
            capacity,
        }
    }

    /// Opens the queue for inserts and extracts.
    pub fn enable(&self) {
        let mut ring = self.ring.lock();
        ring.enabled = true;
    }

    /// Closes the queue; blocked inserts and extracts fail. The backlog is
    /// kept and handed out by `extract` until empty.
    pub fn disable(&self) {
        let mut ring = self.ring.lock();
        ring.enabled = false;
        self.entries.notify_all();
        self.space.notify_all();
    }

    /// Head-of-line insertion, exempt from the capacity wait.
    ///
    /// This is the privileged-producer path and the closure re-enqueue path;
    /// neither may block or fail.
    pub fn post(&self, job: JobHandle) {
        let mut ring = self.ring.lock();
        ring.entries.push_front(job);
        self.entries.notify_one();
    }

    /// Tail insertion; blocks up to `wait` while the queue is full.
    pub fn insert(&self, job: JobHandle, wait: Duration) -> Result<(), PoolError> {
        let deadline = Instant::now().checked_add(wait);
        let mut ring = self.ring.lock();
        loop {
            if !ring.enabled {
                return Err(PoolError::Shutdown);
            }
            if ring.entries.len() < self.capacity {
                ring.entries.push_back(job);
                self.entries.notify_one();
                return Ok(());
            }
            match deadline {
                None => self.space.wait(&mut ring),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline
                        || self.space.wait_for(&mut ring, deadline - now).timed_out()
                    {
                        // Re-check once: the timeout may race a removal.
                        if ring.enabled && ring.entries.len() < self.capacity {
                            ring.entries.push_back(job);
                            self.entries.notify_one();
                            return Ok(());
                        }
                        return if ring.enabled {
                            Err(PoolError::QueueFull)
                        } else {
                            Err(PoolError::Shutdown)
                        };
                    }
                }
            }
        }
    }

    /// Pops the head, blocking up to `wait` while the queue is empty.
    ///
    /// Returns `None` when the wait expires, or once the queue is disabled
    /// and drained. [`Duration::MAX`] waits until shutdown.
    pub fn extract(&self, wait: Duration) -> Option<JobHandle> {
        let deadline = Instant::now().checked_add(wait);
        let mut ring = self.ring.lock();
        loop {
            if let Some(job) = ring.entries.pop_front() {
                self.space.notify_one();
                return Some(job);
            }
            if !ring.enabled {
                return None;
            }
            match deadline {
                None => self.entries.wait(&mut ring),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline
                        || self.entries.wait_for(&mut ring, deadline - now).timed_out()
                    {
                        let job = ring.entries.pop_front();
                        if job.is_some() {
                            self.space.notify_one();
                        }
                        return job;
                    }
                }
            }
        }
    }

    /// Removes `job` wherever it sits in the queue.
    pub fn remove(&self, job: &JobHandle) -> bool {
        let mut ring = self.ring.lock();
        match ring.entries.iter().position(|entry| same_job(entry, job)) {
            Some(index) => {
                ring.entries.remove(index);
                self.space.notify_one();
                true
            }
            None => false,
        }
    }

    /// True when `job` is currently queued.
    pub fn has_entry(&self, job: &JobHandle) -> bool {
        let ring = self.ring.lock();
        ring.entries.iter().any(|entry| same_job(entry, job))
    }

    /// Number of queued handles.
    pub fn len(&self) -> usize {
        self.ring.lock().entries.len()
    }

    /// True when no handles are queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the coarse queue lock for the closure window.
    ///
    /// Every other queue operation blocks until the guard drops.
    pub fn lock(&self) -> QueueGuard<'_> {
        QueueGuard { ring: self.ring.lock(), entries: &self.entries }
    }
}

/// Exclusive access to the queue during the post-dispatch closure.
pub struct QueueGuard<'a> {
    ring: MutexGuard<'a, Ring>,
    entries: &'a Condvar,
}

impl QueueGuard<'_> {
    /// Head-of-line insertion while the queue is held.
    pub fn post(&mut self, job: JobHandle) {
        self.ring.entries.push_front(job);
        self.entries.notify_one();
    }
}
