//! Periodic export of recorded status counts.
//!
//! Every interval the reporter logs the seconds that have fully elapsed as
//! JSON and then expires them, so memory stays bounded by one interval of
//! traffic. Whatever is left is logged on shutdown.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use http_status_counter::{Measurement, Records, epoch_secs};
use pingora::services::background::BackgroundService;

use crate::export;

pub struct StatusReporter {
    measurement: Arc<Measurement>,
    interval: Duration,
}

impl StatusReporter {
    pub fn new(measurement: Arc<Measurement>, interval: Duration) -> Self {
        Self {
            measurement,
            interval,
        }
    }

    /// Report and remove every second before `now`. Returns what was
    /// reported, or `None` when there was nothing to report.
    pub fn report_due(&self, now: i64) -> Option<Records> {
        match self.measurement.drain_records_before(now) {
            Ok(records) => {
                log_records(&records);
                Some(records)
            }
            Err(e) => {
                log::debug!("Skipping status report: {}", e);
                None
            }
        }
    }

    /// Report everything still retained without expiring it.
    pub fn report_all(&self) -> usize {
        let records = export::retained_records(&self.measurement);
        if !records.is_empty() {
            log_records(&records);
        }
        records.len()
    }
}

fn log_records(records: &Records) {
    match serde_json::to_string(&export::to_second_records(records)) {
        Ok(json) => log::info!("status counts: {}", json),
        Err(e) => log::error!("Failed to encode status counts: {}", e),
    }
}

#[async_trait]
impl BackgroundService for StatusReporter {
    async fn start(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                let reported = self.report_all();
                log::info!("Reported {} remaining seconds on shutdown", reported);
                return;
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    let reported = self.report_all();
                    log::info!("Reported {} remaining seconds on shutdown", reported);
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {
                    self.report_due(epoch_secs(SystemTime::now()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn report_due_expires_reported_seconds() {
        let measurement = Arc::new(Measurement::new_at(at(100)));
        for secs in 100..105 {
            measurement.count_up_at(200, at(secs));
        }
        measurement.count_up_at(500, at(105));
        let reporter = StatusReporter::new(measurement.clone(), Duration::from_secs(5));

        let reported = reporter.report_due(105).unwrap();
        assert_eq!(reported.len(), 5);
        assert_eq!(reported[&100].get(&200), Some(&1));
        assert_eq!(measurement.len(), 1);
        assert_eq!(measurement.oldest_recorded_at(), Some(105));

        assert!(reporter.report_due(105).is_none());
        assert_eq!(measurement.len(), 1);
    }

    #[test]
    fn report_due_on_empty_store_is_skipped() {
        let measurement = Arc::new(Measurement::new_at(at(100)));
        measurement.expire_records(101).unwrap();
        let reporter = StatusReporter::new(measurement, Duration::from_secs(1));

        assert!(reporter.report_due(200).is_none());
        assert_eq!(reporter.report_all(), 0);
    }

    #[test]
    fn late_increments_into_reported_seconds_are_not_lost() {
        let measurement = Arc::new(Measurement::new_at(at(100)));
        let reporter = StatusReporter::new(measurement.clone(), Duration::from_secs(1));
        let workers = 4;
        let per_worker = 20_000;

        let mut reported = 0;
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let measurement = &measurement;
                    s.spawn(move || {
                        for _ in 0..per_worker {
                            measurement.count_up_at(404, at(104));
                        }
                    })
                })
                .collect();

            while handles.iter().any(|h| !h.is_finished()) {
                if let Some(records) = reporter.report_due(105) {
                    reported += records.values().filter_map(|c| c.get(&404)).sum::<u64>();
                }
            }
        });
        if let Some(records) = reporter.report_due(105) {
            reported += records.values().filter_map(|c| c.get(&404)).sum::<u64>();
        }

        assert_eq!(reported, workers * per_worker);
        assert!(measurement.is_empty());
    }

    #[test]
    fn report_all_keeps_records() {
        let measurement = Arc::new(Measurement::new_at(at(100)));
        measurement.count_up_at(404, at(101));
        let reporter = StatusReporter::new(measurement.clone(), Duration::from_secs(1));

        assert_eq!(reporter.report_all(), 2);
        assert_eq!(measurement.len(), 2);
    }

    #[tokio::test]
    async fn start_reports_remaining_on_shutdown() {
        let measurement = Arc::new(Measurement::new_at(at(100)));
        let reporter = StatusReporter::new(measurement.clone(), Duration::from_secs(3600));
        let (tx, rx) = tokio::sync::watch::channel(false);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), reporter.start(rx))
            .await
            .expect("reporter did not stop on shutdown");

        assert_eq!(measurement.len(), 1);
    }
}
