use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use http_status_counter::{Measurement, epoch_secs};
use rand::Rng;

const STATUS_CODES: &[u16] = &[
    100, 101, 102, 103, 200, 201, 202, 203, 204, 205, 206, 207, 208, 226, 300, 301, 302, 303, 304,
    305, 307, 308, 400, 401, 402, 403, 404, 405, 406, 407, 408, 409, 410, 411, 412, 413, 414, 415,
    416, 417, 418, 421, 422, 423, 424, 425, 426, 428, 429, 431, 451, 500, 501, 502, 503, 504, 505,
    506, 507, 508, 510, 511,
];

#[test]
fn sum_matches_independent_tally_across_seconds() {
    let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let measurement = Measurement::new_at(start);
    let expected: Mutex<HashMap<u16, u64>> = Mutex::new(HashMap::new());

    let seconds = 5;
    let per_second = 10_000;
    let workers = 8;

    std::thread::scope(|s| {
        for worker in 0..workers {
            let measurement = &measurement;
            let expected = &expected;
            s.spawn(move || {
                let mut rng = rand::thread_rng();
                let mut local: HashMap<u16, u64> = HashMap::new();
                for second in 0..seconds {
                    let at = start + Duration::from_secs(second);
                    for i in 0..per_second {
                        if i % workers != worker {
                            continue;
                        }
                        let status = STATUS_CODES[rng.gen_range(0..STATUS_CODES.len())];
                        measurement.count_up_at(status, at);
                        *local.entry(status).or_insert(0) += 1;
                    }
                }
                let mut expected = expected.lock().unwrap();
                for (status, count) in local {
                    *expected.entry(status).or_insert(0) += count;
                }
            });
        }
    });

    let expected = expected.into_inner().unwrap();
    let summed = measurement.sum_by_status_codes();

    assert_eq!(measurement.len(), seconds as usize);
    assert_eq!(expected.values().sum::<u64>(), seconds * per_second);
    for (status, count) in &expected {
        assert_eq!(summed.get(status), Some(count), "status {status}");
    }
    // The seed counter is the only entry that may be zero.
    for (status, count) in &summed {
        if !expected.contains_key(status) {
            assert_eq!((*status, *count), (200, 0));
        }
    }
}

#[test]
fn racing_on_a_new_second_creates_one_bucket() {
    let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let next = start + Duration::from_secs(1);
    let measurement = Measurement::new_at(start);

    std::thread::scope(|s| {
        for i in 0..64u16 {
            let measurement = &measurement;
            s.spawn(move || {
                let status = if i % 2 == 0 { 200 } else { 503 };
                for _ in 0..100 {
                    measurement.count_up_at(status, next);
                }
            });
        }
    });

    assert_eq!(measurement.len(), 2);
    let records = measurement.get_records_at(epoch_secs(next)).unwrap();
    assert_eq!(records.get(&200), Some(&3_200));
    assert_eq!(records.get(&503), Some(&3_200));
}

#[test]
fn expiry_while_counting_keeps_current_second() {
    let start = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let current = start + Duration::from_secs(10);
    let measurement = Measurement::new_at(start);
    for offset in 1..10 {
        measurement.count_up_at(200, start + Duration::from_secs(offset));
    }

    std::thread::scope(|s| {
        for _ in 0..4 {
            let measurement = &measurement;
            s.spawn(move || {
                for _ in 0..1_000 {
                    measurement.count_up_at(500, current);
                }
            });
        }
        let measurement = &measurement;
        s.spawn(move || measurement.expire_records(epoch_secs(current)));
    });

    assert_eq!(measurement.len(), 1);
    assert_eq!(measurement.oldest_recorded_at(), Some(epoch_secs(current)));
    assert_eq!(
        measurement
            .get_records_at(epoch_secs(current))
            .unwrap()
            .get(&500),
        Some(&4_000)
    );
}
