//! Per-second HTTP status code counters.
//!
//! This crate provides the data structure a reverse proxy uses to record how
//! many responses of each status code it has seen, bucketed by the UNIX second
//! in which they were observed:
//! - [`Measurement`] maps epoch seconds to buckets and is shared by every
//!   request handler
//! - each bucket maps status codes to counters with their own locks, so
//!   increments to different seconds or codes do not contend
//!
//! # Example
//!
//! ```rust
//! use http_status_counter::Measurement;
//!
//! let measurement = Measurement::new();
//! measurement.count_up(200);
//! measurement.count_up(404);
//!
//! let totals = measurement.sum_by_status_codes();
//! assert_eq!(totals.get(&200), Some(&1));
//! assert_eq!(totals.get(&404), Some(&1));
//! ```

mod bucket;
mod counter;
mod error;
mod measurement;

pub use bucket::Bucket;
pub use counter::Counter;
pub use error::{MeasurementError, Result};
pub use measurement::{Measurement, Records, StatusCounts, epoch_secs};
