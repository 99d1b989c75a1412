use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single status code counter guarded by its own lock.
#[derive(Debug, Default)]
pub struct Counter {
    value: Mutex<u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        *self.lock() += 1;
    }

    pub fn reset(&self) {
        *self.lock() = 0;
    }

    pub fn get(&self) -> u64 {
        *self.lock()
    }

    // A plain integer cannot be left half-written, so a poisoned guard is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
