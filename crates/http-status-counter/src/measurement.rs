use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime};

use crate::bucket::Bucket;
use crate::error::{MeasurementError, Result};

/// Counts per status code within one second.
pub type StatusCounts = HashMap<u16, u64>;

/// Counts per status code, keyed by epoch second.
pub type Records = BTreeMap<i64, StatusCounts>;

const HTTP_OK: u16 = 200;

/// UNIX seconds for `at`. Times before the epoch map to 0.
pub fn epoch_secs(at: SystemTime) -> i64 {
    let secs = at
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Thread-safe store of per-second status code buckets.
///
/// The store lock is taken for writing only to insert or remove buckets.
/// Increments hold it for reading while the bucket's own locks do the work,
/// so request handlers only serialize on the first response of a new second.
#[derive(Debug)]
pub struct Measurement {
    buckets: RwLock<BTreeMap<i64, Bucket>>,
}

impl Default for Measurement {
    fn default() -> Self {
        Self::new()
    }
}

impl Measurement {
    /// Create a store seeded with a zeroed `200` counter for the current second.
    pub fn new() -> Self {
        Self::new_at(SystemTime::now())
    }

    /// Create a store seeded with a zeroed `200` counter for the second of `at`.
    pub fn new_at(at: SystemTime) -> Self {
        let mut buckets = BTreeMap::new();
        buckets.insert(epoch_secs(at), Bucket::new(HTTP_OK));
        Self {
            buckets: RwLock::new(buckets),
        }
    }

    /// Record one response with `status` in the current second.
    pub fn count_up(&self, status: u16) {
        self.count_up_at(status, SystemTime::now());
    }

    /// Record one response with `status` in the second of `at`.
    pub fn count_up_at(&self, status: u16, at: SystemTime) {
        let epoch = epoch_secs(at);

        {
            let buckets = self.read();
            if let Some(bucket) = buckets.get(&epoch) {
                bucket.count_up(status);
                return;
            }
        }

        let mut buckets = self.write();
        buckets
            .entry(epoch)
            .or_insert_with(|| {
                log::debug!("created bucket at {epoch} for status {status}");
                Bucket::new(status)
            })
            .count_up(status);
    }

    /// Insert a bucket at `epoch` seeded with a zeroed `status` counter.
    /// Returns `false` if the epoch was already recorded.
    pub fn add_bucket_at(&self, epoch: i64, status: u16) -> bool {
        let mut buckets = self.write();
        if buckets.contains_key(&epoch) {
            return false;
        }
        buckets.insert(epoch, Bucket::new(status));
        true
    }

    /// Copy of the counts recorded at `epoch`.
    pub fn get_records_at(&self, epoch: i64) -> Result<StatusCounts> {
        self.read()
            .get(&epoch)
            .map(Bucket::snapshot)
            .ok_or(MeasurementError::NotFound {
                from: epoch,
                to: epoch.saturating_add(1),
            })
    }

    /// Copies of every bucket with `from <= epoch < to`.
    pub fn extract(&self, from: i64, to: i64) -> Result<Records> {
        let invalid = |reason| MeasurementError::InvalidRange { from, to, reason };
        if from < 1 {
            return Err(invalid("from should be at least 1"));
        }
        if to < 1 {
            return Err(invalid("to should be at least 1"));
        }
        if to <= from {
            return Err(invalid("to should be greater than from"));
        }

        let records: Records = self
            .read()
            .range(from..to)
            .map(|(epoch, bucket)| (*epoch, bucket.snapshot()))
            .collect();

        if records.is_empty() {
            return Err(MeasurementError::NotFound { from, to });
        }
        Ok(records)
    }

    /// Totals per status code across every retained bucket.
    pub fn sum_by_status_codes(&self) -> StatusCounts {
        let buckets = self.read();
        let mut totals = StatusCounts::new();
        for bucket in buckets.values() {
            for (status, count) in bucket.snapshot() {
                *totals.entry(status).or_insert(0) += count;
            }
        }
        totals
    }

    /// Newest recorded epoch, `None` when the store is empty.
    pub fn latest_recorded_at(&self) -> Option<i64> {
        self.read().last_key_value().map(|(epoch, _)| *epoch)
    }

    /// Oldest recorded epoch, `None` when the store is empty.
    pub fn oldest_recorded_at(&self) -> Option<i64> {
        self.read().first_key_value().map(|(epoch, _)| *epoch)
    }

    /// Number of recorded seconds.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove every bucket older than `before`, resetting its counters first.
    /// Returns the number of removed buckets.
    pub fn expire_records(&self, before: i64) -> Result<usize> {
        let expired = {
            let mut buckets = self.write();
            split_before(&mut buckets, before)
        };

        if expired.is_empty() {
            return Err(MeasurementError::NothingExpired { before });
        }

        for bucket in expired.values() {
            bucket.reset();
        }
        log::debug!("expired {} buckets older than {before}", expired.len());
        Ok(expired.len())
    }

    /// Remove every bucket older than `before` and return copies of their counts.
    ///
    /// The copies are taken under the same write lock as the removal, so no
    /// increment can land in a bucket between being read and being dropped.
    pub fn drain_records_before(&self, before: i64) -> Result<Records> {
        let drained: Records = {
            let mut buckets = self.write();
            split_before(&mut buckets, before)
                .into_iter()
                .map(|(epoch, bucket)| (epoch, bucket.snapshot()))
                .collect()
        };

        if drained.is_empty() {
            return Err(MeasurementError::NothingExpired { before });
        }
        log::debug!("drained {} buckets older than {before}", drained.len());
        Ok(drained)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<i64, Bucket>> {
        self.buckets.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<i64, Bucket>> {
        self.buckets.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn split_before(buckets: &mut BTreeMap<i64, Bucket>, before: i64) -> BTreeMap<i64, Bucket> {
    let kept = buckets.split_off(&before);
    std::mem::replace(buckets, kept)
}
