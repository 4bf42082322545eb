//! Admission limiter — a counting semaphore bounding active directory visits.
//!
//! Recursion spawns one task per directory, so the task count is unbounded.
//! What is bounded is how many of those tasks are past admission at once.
//! The peak is tracked so tests and the run summary can check the bound.
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct AdmissionLimiter {
    capacity: usize,
    active: Mutex<usize>,
    released: Condvar,
    peak: AtomicUsize,
}

impl AdmissionLimiter {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            active: Mutex::new(0),
            released: Condvar::new(),
            peak: AtomicUsize::new(0),
        }
    }

    /// Block until a slot is free, then take it. The slot is returned when
    /// the permit drops.
    pub fn acquire(&self) -> AdmissionPermit<'_> {
        let mut active = self.active.lock();
        while *active >= self.capacity {
            self.released.wait(&mut active);
        }
        *active += 1;
        self.peak.fetch_max(*active, Ordering::Relaxed);
        AdmissionPermit { limiter: self }
    }

    fn release(&self) {
        let mut active = self.active.lock();
        *active -= 1;
        drop(active);
        self.released.notify_one();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held.
    pub fn active(&self) -> usize {
        *self.active.lock()
    }

    /// Highest number of slots ever held at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

/// A held admission slot.
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct AdmissionPermit<'a> {
    limiter: &'a AdmissionLimiter,
}

impl Drop for AdmissionPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}
