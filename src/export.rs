//! JSON representation of extracted records for monitoring endpoints and logs.

use http_status_counter::{Measurement, Records};
use serde::Serialize;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecondRecord {
    pub recorded_at: i64,
    pub status_codes: Vec<StatusCount>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status_code: u16,
    pub counter: u64,
}

/// Flatten records into one entry per second, oldest first, status codes ascending.
pub fn to_second_records(records: &Records) -> Vec<SecondRecord> {
    records
        .iter()
        .map(|(epoch, counts)| {
            let mut status_codes: Vec<StatusCount> = counts
                .iter()
                .map(|(status, counter)| StatusCount {
                    status_code: *status,
                    counter: *counter,
                })
                .collect();
            status_codes.sort_by_key(|s| s.status_code);
            SecondRecord {
                recorded_at: *epoch,
                status_codes,
            }
        })
        .collect()
}

pub fn convert_records(records: &Records) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&to_second_records(records))
}

/// Every retained bucket, or an empty map when nothing is recorded.
pub fn retained_records(measurement: &Measurement) -> Records {
    let (Some(oldest), Some(latest)) = (
        measurement.oldest_recorded_at(),
        measurement.latest_recorded_at(),
    ) else {
        return Records::new();
    };

    measurement
        .extract(oldest.max(1), latest.saturating_add(1))
        .unwrap_or_default()
}
