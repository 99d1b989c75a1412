use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::counter::Counter;
use crate::measurement::StatusCounts;

/// Status code counters observed within one second.
///
/// The map lock only guards insertion of new status codes. Increments take
/// the map's read side plus the per-code [`Counter`] lock, so concurrent
/// increments of different codes never wait on each other.
#[derive(Debug)]
pub struct Bucket {
    counters: RwLock<HashMap<u16, Counter>>,
}

impl Bucket {
    /// Create a bucket holding a single zeroed counter for `status`.
    pub fn new(status: u16) -> Self {
        let mut counters = HashMap::new();
        counters.insert(status, Counter::new());
        Self {
            counters: RwLock::new(counters),
        }
    }

    /// Insert a zeroed counter for `status`. Returns `false` when one already exists.
    pub fn add_status(&self, status: u16) -> bool {
        if self.read().contains_key(&status) {
            return false;
        }

        let mut counters = self.write();
        if counters.contains_key(&status) {
            return false;
        }
        counters.insert(status, Counter::new());
        true
    }

    /// Increment the counter for `status`, creating it on first use.
    pub fn count_up(&self, status: u16) {
        {
            let counters = self.read();
            if let Some(counter) = counters.get(&status) {
                counter.increment();
                return;
            }
        }

        // Another caller may have inserted the code between the two locks;
        // `entry` keeps whichever counter got there first.
        self.write().entry(status).or_default().increment();
    }

    /// Current count for `status`, or 0 if it was never observed. Does not insert.
    pub fn get(&self, status: u16) -> u64 {
        self.read().get(&status).map(Counter::get).unwrap_or(0)
    }

    /// Zero every counter without removing any status code.
    pub fn reset(&self) {
        for counter in self.read().values() {
            counter.reset();
        }
    }

    /// Copy of the current counts, detached from later increments.
    pub fn snapshot(&self) -> StatusCounts {
        self.read()
            .iter()
            .map(|(status, counter)| (*status, counter.get()))
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<u16, Counter>> {
        self.counters.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<u16, Counter>> {
        self.counters.write().unwrap_or_else(PoisonError::into_inner)
    }
}
